//! The common document-iterator contract.

use std::fmt::Debug;

use crate::error::Result;
use crate::query::statistics::SearchStatistics;

/// Dense integer identifier for a document within one index snapshot.
///
/// Ids are assigned from 1; `0` is only ever seen as the pre-start cursor
/// position of an iterator that has not been advanced yet.
pub type DocId = u64;

/// Sentinel meaning "no more documents" / exhausted iterator.
pub const NO_MORE_DOCS: DocId = u64::MAX;

/// Trait implemented by every node of a query's iterator tree.
///
/// The sequence of document ids produced by successive `next()` /
/// `skip_to()` calls is strictly increasing and terminates at
/// [`NO_MORE_DOCS`]. Nodes hold private cursor state and are driven by a
/// single thread; construction (`add_child` on the compound nodes) and
/// traversal are strictly separated phases.
pub trait DocumentIterator: Send + Debug {
    /// The document id at the last successful advance.
    ///
    /// Returns `0` before the first advance and [`NO_MORE_DOCS`] once the
    /// iterator is exhausted.
    fn doc(&self) -> DocId;

    /// Advance to the next matching document.
    ///
    /// Returns `Ok(false)` once exhausted; calling again after exhaustion
    /// stays exhausted. An underlying posting read failure propagates as
    /// an error and is fatal to the query, never treated as exhaustion.
    fn next(&mut self) -> Result<bool>;

    /// Advance to the first matching document >= `target` and return it.
    ///
    /// A target at or behind the current position is a no-op returning
    /// the current position; a target of [`NO_MORE_DOCS`] exhausts.
    /// Returns [`NO_MORE_DOCS`] when no qualifying document remains.
    fn skip_to(&mut self, target: DocId) -> Result<DocId>;

    /// Term frequency at the current document.
    ///
    /// Leaves report the stored posting frequency; compound nodes document
    /// their own aggregation policy.
    fn term_freq(&self) -> u64 {
        1
    }

    /// Estimated number of documents this iterator can produce.
    fn cost(&self) -> u64;

    /// Check if this iterator is exhausted.
    fn is_exhausted(&self) -> bool {
        self.doc() == NO_MORE_DOCS
    }

    /// Accumulate document/collection/max term-frequency statistics for
    /// the properties this subtree covers.
    ///
    /// Accumulators are additive: this is an explicit, separate pass the
    /// executor runs at most once per constructed tree.
    fn collect_statistics(&self, stats: &mut SearchStatistics);
}

/// An iterator that matches no documents.
#[derive(Debug, Default)]
pub struct EmptyDocumentIterator;

impl EmptyDocumentIterator {
    /// Create a new empty iterator.
    pub fn new() -> Self {
        EmptyDocumentIterator
    }
}

impl DocumentIterator for EmptyDocumentIterator {
    fn doc(&self) -> DocId {
        NO_MORE_DOCS
    }

    fn next(&mut self) -> Result<bool> {
        Ok(false)
    }

    fn skip_to(&mut self, _target: DocId) -> Result<DocId> {
        Ok(NO_MORE_DOCS)
    }

    fn term_freq(&self) -> u64 {
        0
    }

    fn cost(&self) -> u64 {
        0
    }

    fn collect_statistics(&self, _stats: &mut SearchStatistics) {}
}

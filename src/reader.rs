//! Posting-sequence cursors and the index snapshot seam.
//!
//! The query layer never sees a storage format. It consumes two traits:
//! [`PostingSequence`], a single-pass forward cursor over one sorted
//! posting list with a better-than-linear `skip_to`, and
//! [`IndexSnapshot`], the frozen view an index manager publishes (max_doc,
//! deleted documents, postings per property and term). [`MemorySnapshot`]
//! is the in-memory implementation used by the engine's own tests and by
//! embedders that build small indexes directly.

use std::fmt::Debug;
use std::sync::Arc;

use ahash::AHashMap;

use crate::error::Result;
use crate::posting::{DeletionBitmap, Posting, PostingList};
use crate::query::iterator::{DocId, NO_MORE_DOCS};
use crate::query::leaf::{AllDocumentIterator, TermIterator};

/// Number of postings per skip block.
pub const DEFAULT_BLOCK_SIZE: usize = 128;

/// Single-pass forward cursor over one sorted posting sequence.
///
/// Sequences are forward-only: once advanced past a document they never
/// revisit it, and `skip_to` with a target at or behind the current
/// position stays put.
pub trait PostingSequence: Send + Debug {
    /// Get the current document ID, or `NO_MORE_DOCS` when exhausted.
    fn doc_id(&self) -> DocId;

    /// Get the term frequency in the current document.
    fn term_freq(&self) -> u64;

    /// Move to the next document.
    fn next(&mut self) -> Result<bool>;

    /// Skip to the first document >= target.
    fn skip_to(&mut self, target: DocId) -> Result<bool>;

    /// Get the cost of iterating through this sequence.
    fn cost(&self) -> u64;
}

/// A block of postings for skip-based advancement.
#[derive(Debug, Clone)]
struct PostingBlock {
    /// Maximum document ID in this block.
    max_doc_id: DocId,
    /// Starting position in the posting list.
    start_position: usize,
}

/// In-memory posting sequence with a block index for skip operations.
///
/// `skip_to` first locates the candidate block by its max bound and only
/// then scans within it, so a skip over a large sequence touches a
/// handful of postings instead of all of them.
#[derive(Debug)]
pub struct BlockPostingSequence {
    /// The posting data, sorted by doc_id.
    postings: Vec<Posting>,
    /// Current position in the posting list.
    position: usize,
    /// Skip blocks over the posting list.
    blocks: Vec<PostingBlock>,
    /// Whether next() or skip_to() has been called at least once.
    started: bool,
}

impl BlockPostingSequence {
    /// Create a sequence with the default block size.
    pub fn new(postings: Vec<Posting>) -> Self {
        Self::with_block_size(postings, DEFAULT_BLOCK_SIZE)
    }

    /// Create a sequence with an explicit block size.
    pub fn with_block_size(postings: Vec<Posting>, block_size: usize) -> Self {
        let blocks = Self::create_blocks(&postings, block_size.max(1));
        BlockPostingSequence {
            postings,
            position: 0,
            blocks,
            started: false,
        }
    }

    /// Create an exhausted sequence.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    fn create_blocks(postings: &[Posting], block_size: usize) -> Vec<PostingBlock> {
        let mut blocks = Vec::new();
        let mut start = 0;

        while start < postings.len() {
            let end = (start + block_size).min(postings.len());
            blocks.push(PostingBlock {
                max_doc_id: postings[end - 1].doc_id,
                start_position: start,
            });
            start = end;
        }

        blocks
    }

    /// Find the block that could contain the target document ID.
    fn find_block(&self, target: DocId) -> Option<usize> {
        let idx = self
            .blocks
            .partition_point(|block| block.max_doc_id < target);
        if idx < self.blocks.len() { Some(idx) } else { None }
    }
}

impl PostingSequence for BlockPostingSequence {
    fn doc_id(&self) -> DocId {
        if self.position < self.postings.len() {
            self.postings[self.position].doc_id
        } else {
            NO_MORE_DOCS
        }
    }

    fn term_freq(&self) -> u64 {
        if self.position < self.postings.len() {
            self.postings[self.position].frequency as u64
        } else {
            0
        }
    }

    fn next(&mut self) -> Result<bool> {
        if self.postings.is_empty() {
            return Ok(false);
        }

        if !self.started {
            // First call positions at the first document
            self.started = true;
            Ok(true)
        } else {
            self.position += 1;
            Ok(self.position < self.postings.len())
        }
    }

    fn skip_to(&mut self, target: DocId) -> Result<bool> {
        if self.started && self.position < self.postings.len() && self.doc_id() >= target {
            return Ok(true);
        }
        self.started = true;

        match self.find_block(target) {
            Some(block_idx) => {
                // Never move backwards past postings already consumed
                let block_start = self.blocks[block_idx].start_position;
                if block_start > self.position {
                    self.position = block_start;
                }
            }
            None => {
                // Target beyond the last posting
                self.position = self.postings.len();
                return Ok(false);
            }
        }

        while self.position < self.postings.len() {
            if self.postings[self.position].doc_id >= target {
                return Ok(true);
            }
            self.position += 1;
        }
        Ok(false)
    }

    fn cost(&self) -> u64 {
        self.postings.len() as u64
    }
}

/// Summary statistics for one term within one property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermInfo {
    /// Number of documents containing the term.
    pub doc_frequency: u64,
    /// Total occurrences across all documents.
    pub total_frequency: u64,
    /// Largest single-document frequency.
    pub max_frequency: u64,
}

/// A frozen, read-only view of an index published for query execution.
///
/// Posting data and the deletion set are immutable for the lifetime of
/// the snapshot; concurrent queries each build their own iterator tree
/// over a shared snapshot (`Arc<dyn IndexSnapshot>`).
pub trait IndexSnapshot: Send + Sync + Debug {
    /// Highest assigned document id at snapshot time.
    fn max_doc(&self) -> DocId;

    /// Number of live (non-deleted) documents.
    fn doc_count(&self) -> u64;

    /// Check if a document is deleted.
    fn is_deleted(&self, doc_id: DocId) -> bool;

    /// Get term statistics for a property and term.
    fn term_info(&self, property: &str, term: &str) -> Result<Option<TermInfo>>;

    /// Get a posting sequence for a property and term.
    fn postings(&self, property: &str, term: &str) -> Result<Option<Box<dyn PostingSequence>>>;

    /// Get the deleted documents as a posting sequence, if any are deleted.
    fn deleted_docs(&self) -> Result<Option<Box<dyn PostingSequence>>>;
}

/// In-memory [`IndexSnapshot`] implementation.
///
/// Built once, then shared read-only. Mutators are only available before
/// the snapshot is handed to queries (ownership enforces this: wrap it in
/// an `Arc` when publishing).
#[derive(Debug)]
pub struct MemorySnapshot {
    /// property -> term -> posting list.
    terms: AHashMap<String, AHashMap<String, PostingList>>,
    /// Logical deletion tracker.
    deletions: DeletionBitmap,
    /// Highest assigned document id.
    max_doc: DocId,
}

impl MemorySnapshot {
    /// Create an empty snapshot covering documents `1..=max_doc`.
    pub fn new(max_doc: DocId) -> Self {
        MemorySnapshot {
            terms: AHashMap::new(),
            deletions: DeletionBitmap::new(max_doc),
            max_doc,
        }
    }

    /// Insert the posting list for a property and term.
    pub fn insert_postings(&mut self, property: &str, term: &str, postings: PostingList) {
        self.terms
            .entry(property.to_string())
            .or_default()
            .insert(term.to_string(), postings);
    }

    /// Mark documents as deleted.
    pub fn delete_documents(&mut self, doc_ids: &[DocId]) -> Result<u64> {
        self.deletions.delete_documents(doc_ids)
    }

    /// Build a term leaf iterator, or `None` if the term is absent.
    pub fn term_iterator(&self, property: &str, term: &str) -> Result<Option<TermIterator>> {
        match self.posting_list(property, term) {
            Some(list) => {
                let info = TermInfo {
                    doc_frequency: list.doc_frequency(),
                    total_frequency: list.total_frequency(),
                    max_frequency: list.max_frequency(),
                };
                let sequence = BlockPostingSequence::new(list.postings().to_vec());
                Ok(Some(TermIterator::new(
                    property,
                    term,
                    Box::new(sequence),
                    info,
                )))
            }
            None => Ok(None),
        }
    }

    /// Build the deletion-filtered all-documents iterator for this snapshot.
    pub fn all_documents(&self) -> Result<AllDocumentIterator> {
        match self.deleted_docs()? {
            Some(deleted) => AllDocumentIterator::with_deletions(deleted, self.max_doc),
            None => Ok(AllDocumentIterator::new(self.max_doc)),
        }
    }

    fn posting_list(&self, property: &str, term: &str) -> Option<&PostingList> {
        self.terms.get(property).and_then(|terms| terms.get(term))
    }
}

impl IndexSnapshot for MemorySnapshot {
    fn max_doc(&self) -> DocId {
        self.max_doc
    }

    fn doc_count(&self) -> u64 {
        self.deletions.live_count()
    }

    fn is_deleted(&self, doc_id: DocId) -> bool {
        self.deletions.is_deleted(doc_id)
    }

    fn term_info(&self, property: &str, term: &str) -> Result<Option<TermInfo>> {
        Ok(self.posting_list(property, term).map(|list| TermInfo {
            doc_frequency: list.doc_frequency(),
            total_frequency: list.total_frequency(),
            max_frequency: list.max_frequency(),
        }))
    }

    fn postings(&self, property: &str, term: &str) -> Result<Option<Box<dyn PostingSequence>>> {
        Ok(self.posting_list(property, term).map(|list| {
            Box::new(BlockPostingSequence::new(list.postings().to_vec()))
                as Box<dyn PostingSequence>
        }))
    }

    fn deleted_docs(&self) -> Result<Option<Box<dyn PostingSequence>>> {
        if self.deletions.deleted_count() == 0 {
            return Ok(None);
        }
        let list = self.deletions.to_posting_list();
        Ok(Some(Box::new(BlockPostingSequence::new(
            list.into_postings(),
        ))))
    }
}

/// Convenience alias for a shared, published snapshot.
pub type SharedSnapshot = Arc<dyn IndexSnapshot>;

#[cfg(test)]
mod tests {
    use super::*;

    fn sequence(doc_ids: &[DocId]) -> BlockPostingSequence {
        let postings = doc_ids.iter().map(|&d| Posting::new(d)).collect();
        BlockPostingSequence::with_block_size(postings, 4)
    }

    #[test]
    fn test_sequence_iteration() {
        let mut seq = sequence(&[1, 3, 5, 7]);

        assert!(seq.next().unwrap());
        assert_eq!(seq.doc_id(), 1);
        assert_eq!(seq.term_freq(), 1);

        assert!(seq.next().unwrap());
        assert_eq!(seq.doc_id(), 3);

        assert!(seq.next().unwrap());
        assert!(seq.next().unwrap());
        assert_eq!(seq.doc_id(), 7);

        assert!(!seq.next().unwrap());
        assert_eq!(seq.doc_id(), NO_MORE_DOCS);
        assert_eq!(seq.term_freq(), 0);
    }

    #[test]
    fn test_sequence_skip_to() {
        let mut seq = sequence(&[1, 3, 5, 7, 9, 12, 15, 20, 30, 40]);

        assert!(seq.skip_to(6).unwrap());
        assert_eq!(seq.doc_id(), 7);

        // Backward target is a no-op
        assert!(seq.skip_to(2).unwrap());
        assert_eq!(seq.doc_id(), 7);

        // Skip across block boundaries
        assert!(seq.skip_to(25).unwrap());
        assert_eq!(seq.doc_id(), 30);

        assert!(!seq.skip_to(50).unwrap());
        assert_eq!(seq.doc_id(), NO_MORE_DOCS);
    }

    #[test]
    fn test_skip_beyond_last_posting_exhausts() {
        let mut seq = sequence(&[1, 3, 5, 7, 9, 12, 15, 20, 30, 40]);

        assert!(!seq.skip_to(100).unwrap());
        assert_eq!(seq.doc_id(), NO_MORE_DOCS);
        // Exhaustion is sticky
        assert!(!seq.next().unwrap());
        assert!(!seq.skip_to(5).unwrap());
    }

    #[test]
    fn test_sequence_skip_then_next() {
        let mut seq = sequence(&[2, 4, 8, 16, 32]);

        assert!(seq.skip_to(8).unwrap());
        assert_eq!(seq.doc_id(), 8);
        assert!(seq.next().unwrap());
        assert_eq!(seq.doc_id(), 16);
    }

    #[test]
    fn test_empty_sequence() {
        let mut seq = BlockPostingSequence::empty();
        assert_eq!(seq.doc_id(), NO_MORE_DOCS);
        assert!(!seq.next().unwrap());
        assert!(!seq.skip_to(5).unwrap());
        assert_eq!(seq.cost(), 0);
    }

    #[test]
    fn test_memory_snapshot() {
        let mut snapshot = MemorySnapshot::new(10);
        snapshot.insert_postings(
            "title",
            "rust",
            PostingList::from_pairs(&[(1, 2), (4, 1), (9, 3)]),
        );
        snapshot.delete_documents(&[4]).unwrap();

        assert_eq!(snapshot.max_doc(), 10);
        assert_eq!(snapshot.doc_count(), 9);
        assert!(snapshot.is_deleted(4));

        let info = snapshot.term_info("title", "rust").unwrap().unwrap();
        assert_eq!(info.doc_frequency, 3);
        assert_eq!(info.total_frequency, 6);
        assert_eq!(info.max_frequency, 3);

        assert!(snapshot.term_info("title", "missing").unwrap().is_none());
        assert!(snapshot.postings("body", "rust").unwrap().is_none());

        let mut deleted = snapshot.deleted_docs().unwrap().unwrap();
        assert!(deleted.next().unwrap());
        assert_eq!(deleted.doc_id(), 4);
        assert!(!deleted.next().unwrap());
    }
}

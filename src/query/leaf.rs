//! Leaf iterators: term postings and the deletion-filtered identity range.

use crate::error::Result;
use crate::query::iterator::{DocId, DocumentIterator, NO_MORE_DOCS};
use crate::query::statistics::SearchStatistics;
use crate::reader::{PostingSequence, TermInfo};

/// Leaf iterator over one term's posting sequence within one property.
///
/// `next()` / `skip_to()` delegate to the sequence's own cursor, so skip
/// behavior is whatever the sequence supports (block skips for the
/// in-memory sequence). This is the efficiency baseline the compound
/// nodes must not regress below.
#[derive(Debug)]
pub struct TermIterator {
    /// Property (field) the term was indexed under.
    property: String,
    /// The term itself.
    term: String,
    /// Cursor over the term's postings.
    sequence: Box<dyn PostingSequence>,
    /// Sequence-level statistics, captured so the statistics pass does
    /// not consume the single-pass cursor.
    info: TermInfo,
    /// Cached cost.
    cost: u64,
    /// Whether traversal has started.
    started: bool,
    /// Whether the sequence is spent.
    exhausted: bool,
}

impl TermIterator {
    /// Create a term leaf over a posting sequence.
    pub fn new(
        property: &str,
        term: &str,
        sequence: Box<dyn PostingSequence>,
        info: TermInfo,
    ) -> Self {
        let cost = sequence.cost();
        TermIterator {
            property: property.to_string(),
            term: term.to_string(),
            sequence,
            info,
            cost,
            started: false,
            exhausted: false,
        }
    }

    /// Property this leaf covers.
    pub fn property(&self) -> &str {
        &self.property
    }

    /// Term this leaf covers.
    pub fn term(&self) -> &str {
        &self.term
    }
}

impl DocumentIterator for TermIterator {
    fn doc(&self) -> DocId {
        if self.exhausted {
            NO_MORE_DOCS
        } else if !self.started {
            0
        } else {
            self.sequence.doc_id()
        }
    }

    fn next(&mut self) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        self.started = true;
        let has_next = self.sequence.next()?;
        if !has_next {
            self.exhausted = true;
        }
        Ok(has_next)
    }

    fn skip_to(&mut self, target: DocId) -> Result<DocId> {
        if self.exhausted {
            return Ok(NO_MORE_DOCS);
        }
        if self.started && target <= self.doc() {
            return Ok(self.doc());
        }
        self.started = true;
        if target == NO_MORE_DOCS || !self.sequence.skip_to(target)? {
            self.exhausted = true;
            return Ok(NO_MORE_DOCS);
        }
        Ok(self.sequence.doc_id())
    }

    fn term_freq(&self) -> u64 {
        if self.exhausted || !self.started {
            0
        } else {
            self.sequence.term_freq()
        }
    }

    fn cost(&self) -> u64 {
        self.cost
    }

    fn collect_statistics(&self, stats: &mut SearchStatistics) {
        stats.add_document_frequency(&self.property, &self.term, self.info.doc_frequency);
        stats.add_collection_term_frequency(&self.property, &self.term, self.info.total_frequency);
        stats.record_max_term_frequency(&self.property, &self.term, self.info.max_frequency);
    }
}

/// Iterator over every live document in `[1, max_doc]`.
///
/// Filters the identity range against the snapshot's deletion sequence
/// with two monotone cursors. Invariant: `current_deleted` is always the
/// smallest deletion entry >= `current_doc` seen so far, so the lock-step
/// loop never re-examines a deleted document and never skips a live one.
///
/// The iteration count here is much higher than for any term leaf, so the
/// no-deletions case keeps a pure-arithmetic fast path.
#[derive(Debug)]
pub struct AllDocumentIterator {
    /// Deletion sequence cursor, if the snapshot has deletions.
    deleted: Option<Box<dyn PostingSequence>>,
    /// Own position; 0 before the first advance.
    current_doc: DocId,
    /// Position within the deletion sequence.
    current_deleted: DocId,
    /// Highest assigned document id (inclusive bound).
    max_doc: DocId,
    /// Whether the range is spent.
    exhausted: bool,
}

impl AllDocumentIterator {
    /// Create an iterator over `[1, max_doc]` with no deletions.
    pub fn new(max_doc: DocId) -> Self {
        AllDocumentIterator {
            deleted: None,
            current_doc: 0,
            current_deleted: NO_MORE_DOCS,
            max_doc,
            exhausted: false,
        }
    }

    /// Create an iterator over `[1, max_doc]` minus a deletion sequence.
    ///
    /// Primes the deletion cursor to its first entry; an empty sequence
    /// degrades to the no-deletions fast path.
    pub fn with_deletions(mut deleted: Box<dyn PostingSequence>, max_doc: DocId) -> Result<Self> {
        let current_deleted = if deleted.next()? {
            deleted.doc_id()
        } else {
            NO_MORE_DOCS
        };
        Ok(AllDocumentIterator {
            deleted: Some(deleted),
            current_doc: 0,
            current_deleted,
            max_doc,
            exhausted: false,
        })
    }

    fn within_bounds(&mut self) -> bool {
        if self.current_doc > self.max_doc {
            self.exhausted = true;
            false
        } else {
            true
        }
    }

    /// Advance the deletion cursor one entry, in lock-step with
    /// `current_doc`, until the two diverge.
    fn move_past_deleted(&mut self) -> Result<bool> {
        if let Some(deleted) = self.deleted.as_mut() {
            loop {
                self.current_doc += 1;
                self.current_deleted = if deleted.next()? {
                    deleted.doc_id()
                } else {
                    NO_MORE_DOCS
                };
                if self.current_doc != self.current_deleted || self.current_doc > self.max_doc {
                    break;
                }
            }
        }
        Ok(self.within_bounds())
    }

    /// Catch the deletion cursor up to `current_doc` with its own skip.
    fn catch_up_deleted(&mut self) -> Result<()> {
        if let Some(deleted) = self.deleted.as_mut() {
            self.current_deleted = if deleted.skip_to(self.current_doc)? {
                deleted.doc_id()
            } else {
                NO_MORE_DOCS
            };
        }
        Ok(())
    }
}

impl DocumentIterator for AllDocumentIterator {
    fn doc(&self) -> DocId {
        if self.exhausted {
            NO_MORE_DOCS
        } else {
            self.current_doc
        }
    }

    fn next(&mut self) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        self.current_doc += 1;

        if self.deleted.is_none() {
            return Ok(self.within_bounds());
        }

        if self.current_doc == self.current_deleted {
            self.move_past_deleted()
        } else if self.current_doc < self.current_deleted {
            Ok(self.within_bounds())
        } else {
            // Deletion cursor fell behind (a skip moved us past it);
            // catch it up with its own skip, not a linear walk.
            self.catch_up_deleted()?;
            if self.current_doc == self.current_deleted {
                self.move_past_deleted()
            } else {
                Ok(self.within_bounds())
            }
        }
    }

    fn skip_to(&mut self, target: DocId) -> Result<DocId> {
        if self.exhausted {
            return Ok(NO_MORE_DOCS);
        }
        if self.current_doc > 0 && target <= self.current_doc {
            return Ok(self.current_doc);
        }
        if target == NO_MORE_DOCS {
            self.current_doc = NO_MORE_DOCS;
            self.exhausted = true;
            return Ok(NO_MORE_DOCS);
        }

        self.current_doc = self.current_doc.max(target).max(1);

        if self.current_deleted < self.current_doc {
            self.catch_up_deleted()?;
        }
        if self.current_doc == self.current_deleted {
            self.move_past_deleted()?;
        }

        if self.within_bounds() {
            Ok(self.current_doc)
        } else {
            Ok(NO_MORE_DOCS)
        }
    }

    // A "match all" pseudo-term has no frequency semantics.
    fn term_freq(&self) -> u64 {
        1
    }

    fn cost(&self) -> u64 {
        self.max_doc
    }

    fn collect_statistics(&self, _stats: &mut SearchStatistics) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posting::Posting;
    use crate::reader::BlockPostingSequence;

    fn term_iter(doc_ids: &[DocId]) -> TermIterator {
        let postings: Vec<Posting> = doc_ids.iter().map(|&d| Posting::new(d)).collect();
        let info = TermInfo {
            doc_frequency: doc_ids.len() as u64,
            total_frequency: doc_ids.len() as u64,
            max_frequency: 1,
        };
        TermIterator::new(
            "title",
            "test",
            Box::new(BlockPostingSequence::new(postings)),
            info,
        )
    }

    fn deletions(doc_ids: &[DocId]) -> Box<dyn PostingSequence> {
        let postings: Vec<Posting> = doc_ids.iter().map(|&d| Posting::new(d)).collect();
        Box::new(BlockPostingSequence::new(postings))
    }

    #[test]
    fn test_term_iterator_next() {
        let mut iter = term_iter(&[2, 5, 9]);

        assert_eq!(iter.doc(), 0);
        assert!(iter.next().unwrap());
        assert_eq!(iter.doc(), 2);
        assert!(iter.next().unwrap());
        assert_eq!(iter.doc(), 5);
        assert!(iter.next().unwrap());
        assert_eq!(iter.doc(), 9);
        assert!(!iter.next().unwrap());
        assert_eq!(iter.doc(), NO_MORE_DOCS);
        assert!(iter.is_exhausted());
        // Idempotent after exhaustion
        assert!(!iter.next().unwrap());
    }

    #[test]
    fn test_term_iterator_skip_to() {
        let mut iter = term_iter(&[2, 5, 9, 14, 21]);

        assert_eq!(iter.skip_to(5).unwrap(), 5);
        // Same target again: no double-advance
        assert_eq!(iter.skip_to(5).unwrap(), 5);
        // Backward target: no-op
        assert_eq!(iter.skip_to(3).unwrap(), 5);
        assert_eq!(iter.skip_to(10).unwrap(), 14);
        assert_eq!(iter.skip_to(NO_MORE_DOCS).unwrap(), NO_MORE_DOCS);
        assert!(iter.is_exhausted());
    }

    #[test]
    fn test_term_iterator_statistics() {
        let postings = vec![Posting::with_frequency(1, 2), Posting::with_frequency(4, 5)];
        let info = TermInfo {
            doc_frequency: 2,
            total_frequency: 7,
            max_frequency: 5,
        };
        let iter = TermIterator::new(
            "body",
            "rust",
            Box::new(BlockPostingSequence::new(postings)),
            info,
        );

        let mut stats = SearchStatistics::new();
        iter.collect_statistics(&mut stats);
        assert_eq!(stats.document_frequency("body", "rust"), 2);
        assert_eq!(stats.collection_term_frequency("body", "rust"), 7);
        assert_eq!(stats.max_term_frequency("body", "rust"), 5);
    }

    #[test]
    fn test_all_documents_no_deletions() {
        let mut iter = AllDocumentIterator::new(3);

        assert!(iter.next().unwrap());
        assert_eq!(iter.doc(), 1);
        assert!(iter.next().unwrap());
        assert_eq!(iter.doc(), 2);
        assert!(iter.next().unwrap());
        assert_eq!(iter.doc(), 3);
        assert!(!iter.next().unwrap());
        assert!(iter.is_exhausted());
    }

    #[test]
    fn test_all_documents_with_deletions() {
        // max_doc = 10, deletions {3, 7}
        let mut iter = AllDocumentIterator::with_deletions(deletions(&[3, 7]), 10).unwrap();

        let mut emitted = Vec::new();
        while iter.next().unwrap() {
            emitted.push(iter.doc());
        }
        assert_eq!(emitted, vec![1, 2, 4, 5, 6, 8, 9, 10]);
        assert_eq!(iter.doc(), NO_MORE_DOCS);
    }

    #[test]
    fn test_all_documents_adjacent_deletions() {
        let mut iter =
            AllDocumentIterator::with_deletions(deletions(&[1, 2, 3, 5, 6]), 7).unwrap();

        let mut emitted = Vec::new();
        while iter.next().unwrap() {
            emitted.push(iter.doc());
        }
        assert_eq!(emitted, vec![4, 7]);
    }

    #[test]
    fn test_all_documents_skip_to() {
        let mut iter = AllDocumentIterator::with_deletions(deletions(&[3, 7, 8]), 10).unwrap();

        // Skip onto a deleted document lands on the next live one
        assert_eq!(iter.skip_to(3).unwrap(), 4);
        // Backward target is a no-op
        assert_eq!(iter.skip_to(2).unwrap(), 4);
        // Skip into a deleted run
        assert_eq!(iter.skip_to(7).unwrap(), 9);
        assert!(iter.next().unwrap());
        assert_eq!(iter.doc(), 10);
        assert!(!iter.next().unwrap());
    }

    #[test]
    fn test_all_documents_skip_past_max_doc() {
        let mut iter = AllDocumentIterator::new(5);
        assert_eq!(iter.skip_to(9).unwrap(), NO_MORE_DOCS);
        assert!(iter.is_exhausted());
        // EOF is sticky
        assert!(!iter.next().unwrap());
        assert_eq!(iter.skip_to(2).unwrap(), NO_MORE_DOCS);
    }

    #[test]
    fn test_all_documents_everything_deleted() {
        let mut iter = AllDocumentIterator::with_deletions(deletions(&[1, 2, 3]), 3).unwrap();
        assert!(!iter.next().unwrap());
        assert!(iter.is_exhausted());
    }
}

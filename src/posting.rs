//! Posting lists and logical deletion tracking.
//!
//! A posting list is the sorted, deduplicated sequence of document ids in
//! which a term occurs, each entry carrying the term frequency for that
//! document. The deletion bitmap tracks documents logically removed from a
//! frozen snapshot and exports them as a sorted posting list so the query
//! layer can consult deletions exactly like any other posting sequence.

use bit_vec::BitVec;
use serde::{Deserialize, Serialize};

use crate::error::{PilumError, Result};
use crate::query::iterator::DocId;

/// A single posting in a posting list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    /// Document ID.
    pub doc_id: DocId,
    /// Term frequency in the document.
    pub frequency: u32,
}

impl Posting {
    /// Create a new posting with frequency 1.
    pub fn new(doc_id: DocId) -> Self {
        Posting {
            doc_id,
            frequency: 1,
        }
    }

    /// Create a posting with an explicit frequency.
    pub fn with_frequency(doc_id: DocId, frequency: u32) -> Self {
        Posting { doc_id, frequency }
    }
}

/// A posting list for a specific term.
///
/// Postings stay sorted by document id with no duplicates; adding a
/// posting for an existing document merges frequencies. The list keeps
/// running totals so statistics collection never has to walk it.
#[derive(Debug, Clone, Default)]
pub struct PostingList {
    /// The postings in this list, sorted by doc_id.
    postings: Vec<Posting>,
    /// Total frequency across all documents (collection term frequency).
    total_frequency: u64,
    /// Number of documents containing this term (document frequency).
    doc_frequency: u64,
    /// Largest single-document frequency observed.
    max_frequency: u64,
}

impl PostingList {
    /// Create a new empty posting list.
    pub fn new() -> Self {
        PostingList::default()
    }

    /// Build a posting list from (doc_id, frequency) pairs.
    pub fn from_pairs(pairs: &[(DocId, u32)]) -> Self {
        let mut list = PostingList::new();
        for &(doc_id, frequency) in pairs {
            list.add_posting(Posting::with_frequency(doc_id, frequency));
        }
        list
    }

    /// Build a posting list of frequency-1 entries from document ids.
    pub fn from_doc_ids(doc_ids: &[DocId]) -> Self {
        let mut list = PostingList::new();
        for &doc_id in doc_ids {
            list.add_posting(Posting::new(doc_id));
        }
        list
    }

    /// Add a posting to this list, keeping doc_id order.
    pub fn add_posting(&mut self, posting: Posting) {
        self.total_frequency += posting.frequency as u64;

        match self
            .postings
            .binary_search_by_key(&posting.doc_id, |p| p.doc_id)
        {
            Ok(pos) => {
                // Document already present, merge frequencies
                let existing = &mut self.postings[pos];
                existing.frequency += posting.frequency;
                self.max_frequency = self.max_frequency.max(existing.frequency as u64);
            }
            Err(pos) => {
                self.doc_frequency += 1;
                self.max_frequency = self.max_frequency.max(posting.frequency as u64);
                self.postings.insert(pos, posting);
            }
        }
    }

    /// Get the number of postings in the list.
    pub fn len(&self) -> usize {
        self.postings.len()
    }

    /// Check if the posting list is empty.
    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    /// Document frequency (number of documents containing the term).
    pub fn doc_frequency(&self) -> u64 {
        self.doc_frequency
    }

    /// Collection term frequency (total occurrences across all documents).
    pub fn total_frequency(&self) -> u64 {
        self.total_frequency
    }

    /// Maximum single-document term frequency.
    pub fn max_frequency(&self) -> u64 {
        self.max_frequency
    }

    /// Get an iterator over the postings.
    pub fn iter(&'_ self) -> std::slice::Iter<'_, Posting> {
        self.postings.iter()
    }

    /// Consume the list and return the sorted postings.
    pub fn into_postings(self) -> Vec<Posting> {
        self.postings
    }

    /// Borrow the sorted postings.
    pub fn postings(&self) -> &[Posting] {
        &self.postings
    }
}

/// A bitmap-based deletion tracker for one index snapshot.
///
/// Bit set means deleted. Document ids are assigned from 1, so the bitmap
/// covers `[1, max_doc]`.
#[derive(Debug, Clone)]
pub struct DeletionBitmap {
    /// Bitmap of deleted documents, index 0 unused.
    deleted_docs: BitVec,
    /// Highest assigned document id in the snapshot.
    max_doc: DocId,
    /// Number of deleted documents.
    deleted_count: u64,
}

impl DeletionBitmap {
    /// Create a deletion bitmap for a snapshot with the given max_doc.
    pub fn new(max_doc: DocId) -> Self {
        DeletionBitmap {
            deleted_docs: BitVec::from_elem(max_doc as usize + 1, false),
            max_doc,
            deleted_count: 0,
        }
    }

    /// Mark a document as deleted. Returns true if it was live before.
    pub fn delete_document(&mut self, doc_id: DocId) -> Result<bool> {
        if doc_id == 0 || doc_id > self.max_doc {
            return Err(PilumError::index(format!(
                "Document ID {doc_id} out of range 1..={}",
                self.max_doc
            )));
        }

        let was_already_deleted = self.deleted_docs.get(doc_id as usize).unwrap_or(false);
        if !was_already_deleted {
            self.deleted_docs.set(doc_id as usize, true);
            self.deleted_count += 1;
        }

        Ok(!was_already_deleted)
    }

    /// Mark multiple documents as deleted. Returns how many were live.
    pub fn delete_documents(&mut self, doc_ids: &[DocId]) -> Result<u64> {
        let mut deleted = 0;
        for &doc_id in doc_ids {
            if self.delete_document(doc_id)? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    /// Check if a document is deleted.
    pub fn is_deleted(&self, doc_id: DocId) -> bool {
        if doc_id > self.max_doc {
            return false;
        }
        self.deleted_docs.get(doc_id as usize).unwrap_or(false)
    }

    /// Highest assigned document id.
    pub fn max_doc(&self) -> DocId {
        self.max_doc
    }

    /// Number of deleted documents.
    pub fn deleted_count(&self) -> u64 {
        self.deleted_count
    }

    /// Number of live (non-deleted) documents.
    pub fn live_count(&self) -> u64 {
        self.max_doc - self.deleted_count
    }

    /// Deletion ratio (0.0 to 1.0).
    pub fn deletion_ratio(&self) -> f64 {
        if self.max_doc == 0 {
            0.0
        } else {
            self.deleted_count as f64 / self.max_doc as f64
        }
    }

    /// Export the deleted documents as a sorted posting list.
    ///
    /// Each entry carries frequency 1; the list is what the query layer
    /// consults when filtering deletions out of "match all" traversal.
    pub fn to_posting_list(&self) -> PostingList {
        let mut list = PostingList::new();
        for (i, bit) in self.deleted_docs.iter().enumerate() {
            if bit {
                list.add_posting(Posting::new(i as DocId));
            }
        }
        list
    }
}

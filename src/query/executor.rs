//! Driving an iterator tree to produce results.
//!
//! Latency policies (row limits) live here, layered above the algebra;
//! the iterator nodes themselves never time out or truncate. Cancelling a
//! query means dropping its tree; nothing here holds external resources.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::query::iterator::{DocId, DocumentIterator};
use crate::query::statistics::SearchStatistics;

/// A matching document produced by the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryMatch {
    /// Matching document id.
    pub doc_id: DocId,
    /// Term frequency reported by the root node at this document.
    pub term_freq: u64,
}

/// Executor configuration.
#[derive(Debug, Clone, Default)]
pub struct ExecutorConfig {
    /// Stop after this many matches; `None` enumerates to exhaustion.
    pub max_matches: Option<usize>,
}

/// Drives the root of an iterator tree.
#[derive(Debug, Clone, Default)]
pub struct QueryExecutor {
    config: ExecutorConfig,
}

impl QueryExecutor {
    /// Create an executor that enumerates to exhaustion.
    pub fn new() -> Self {
        QueryExecutor {
            config: ExecutorConfig::default(),
        }
    }

    /// Create an executor with a configuration.
    pub fn with_config(config: ExecutorConfig) -> Self {
        QueryExecutor { config }
    }

    /// Enumerate matching document ids in ascending order.
    pub fn collect_doc_ids(&self, root: &mut dyn DocumentIterator) -> Result<Vec<DocId>> {
        let mut doc_ids = Vec::new();
        while self.wants_more(doc_ids.len()) && root.next()? {
            doc_ids.push(root.doc());
        }
        Ok(doc_ids)
    }

    /// Enumerate matches with the root's term frequency at each document.
    pub fn collect_matches(&self, root: &mut dyn DocumentIterator) -> Result<Vec<QueryMatch>> {
        let mut matches = Vec::new();
        while self.wants_more(matches.len()) && root.next()? {
            matches.push(QueryMatch {
                doc_id: root.doc(),
                term_freq: root.term_freq(),
            });
        }
        Ok(matches)
    }

    /// Run the statistics pass over a constructed tree.
    ///
    /// This is a separate traversal mode from enumeration; running it
    /// twice over the same tree double-counts the additive accumulators.
    pub fn statistics(&self, root: &dyn DocumentIterator) -> SearchStatistics {
        let mut stats = SearchStatistics::new();
        root.collect_statistics(&mut stats);
        stats
    }

    fn wants_more(&self, collected: usize) -> bool {
        match self.config.max_matches {
            Some(limit) => collected < limit,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posting::PostingList;
    use crate::query::boolean::AndIterator;
    use crate::reader::MemorySnapshot;

    fn snapshot() -> MemorySnapshot {
        let mut snapshot = MemorySnapshot::new(10);
        snapshot.insert_postings(
            "title",
            "rust",
            PostingList::from_pairs(&[(1, 1), (2, 3), (5, 2), (8, 1)]),
        );
        snapshot.insert_postings(
            "title",
            "search",
            PostingList::from_pairs(&[(2, 1), (5, 1), (9, 4)]),
        );
        snapshot
    }

    #[test]
    fn test_collect_doc_ids() {
        let snapshot = snapshot();
        let executor = QueryExecutor::new();

        let mut root = snapshot.term_iterator("title", "rust").unwrap().unwrap();
        let doc_ids = executor.collect_doc_ids(&mut root).unwrap();
        assert_eq!(doc_ids, vec![1, 2, 5, 8]);
    }

    #[test]
    fn test_row_limit_cutoff() {
        let snapshot = snapshot();
        let executor = QueryExecutor::with_config(ExecutorConfig {
            max_matches: Some(2),
        });

        let mut root = snapshot.term_iterator("title", "rust").unwrap().unwrap();
        let doc_ids = executor.collect_doc_ids(&mut root).unwrap();
        assert_eq!(doc_ids, vec![1, 2]);
    }

    #[test]
    fn test_collect_matches_reports_term_freq() {
        let snapshot = snapshot();
        let executor = QueryExecutor::new();

        let rust = snapshot.term_iterator("title", "rust").unwrap().unwrap();
        let search = snapshot.term_iterator("title", "search").unwrap().unwrap();
        let mut root =
            AndIterator::try_new(vec![Box::new(rust), Box::new(search)]).unwrap();

        let matches = executor.collect_matches(&mut root).unwrap();
        assert_eq!(
            matches,
            vec![
                QueryMatch {
                    doc_id: 2,
                    term_freq: 4
                },
                QueryMatch {
                    doc_id: 5,
                    term_freq: 3
                },
            ]
        );
    }

    #[test]
    fn test_statistics_pass() {
        let snapshot = snapshot();
        let executor = QueryExecutor::new();

        let rust = snapshot.term_iterator("title", "rust").unwrap().unwrap();
        let search = snapshot.term_iterator("title", "search").unwrap().unwrap();
        let root = AndIterator::try_new(vec![Box::new(rust), Box::new(search)]).unwrap();

        let stats = executor.statistics(&root);
        assert_eq!(stats.document_frequency("title", "rust"), 4);
        assert_eq!(stats.collection_term_frequency("title", "rust"), 7);
        assert_eq!(stats.max_term_frequency("title", "rust"), 3);
        assert_eq!(stats.document_frequency("title", "search"), 3);
        assert_eq!(stats.max_term_frequency("title", "search"), 4);
    }

    #[test]
    fn test_matches_serialize() {
        let m = QueryMatch {
            doc_id: 7,
            term_freq: 2,
        };
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, r#"{"doc_id":7,"term_freq":2}"#);
    }
}

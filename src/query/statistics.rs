//! Term statistics accumulated for relevance scoring.

use ahash::AHashMap;

/// Write-once accumulators for the statistics a scorer consumes.
///
/// Three mappings keyed by property name, then term: document frequency
/// (how many matching documents contain the term in that property),
/// collection term frequency (total occurrences across those documents),
/// and the maximum single-document term frequency observed. Frequencies
/// are additive across subtrees; the max map takes the maximum on merge.
///
/// Populated by `DocumentIterator::collect_statistics` in a single pass
/// over a constructed tree and read once by the scorer; never persisted.
#[derive(Debug, Clone, Default)]
pub struct SearchStatistics {
    /// property -> term -> document frequency.
    document_frequency: AHashMap<String, AHashMap<String, u64>>,
    /// property -> term -> collection term frequency.
    collection_term_frequency: AHashMap<String, AHashMap<String, u64>>,
    /// property -> term -> max single-document term frequency.
    max_term_frequency: AHashMap<String, AHashMap<String, u64>>,
}

impl SearchStatistics {
    /// Create empty accumulators.
    pub fn new() -> Self {
        SearchStatistics::default()
    }

    /// Add to the document frequency of a term within a property.
    pub fn add_document_frequency(&mut self, property: &str, term: &str, df: u64) {
        *self
            .document_frequency
            .entry(property.to_string())
            .or_default()
            .entry(term.to_string())
            .or_insert(0) += df;
    }

    /// Add to the collection term frequency of a term within a property.
    pub fn add_collection_term_frequency(&mut self, property: &str, term: &str, ctf: u64) {
        *self
            .collection_term_frequency
            .entry(property.to_string())
            .or_default()
            .entry(term.to_string())
            .or_insert(0) += ctf;
    }

    /// Record a max term frequency observation for a term within a property.
    pub fn record_max_term_frequency(&mut self, property: &str, term: &str, max_tf: u64) {
        let entry = self
            .max_term_frequency
            .entry(property.to_string())
            .or_default()
            .entry(term.to_string())
            .or_insert(0);
        *entry = (*entry).max(max_tf);
    }

    /// Get the accumulated document frequency, or 0 if never recorded.
    pub fn document_frequency(&self, property: &str, term: &str) -> u64 {
        self.document_frequency
            .get(property)
            .and_then(|terms| terms.get(term))
            .copied()
            .unwrap_or(0)
    }

    /// Get the accumulated collection term frequency, or 0 if never recorded.
    pub fn collection_term_frequency(&self, property: &str, term: &str) -> u64 {
        self.collection_term_frequency
            .get(property)
            .and_then(|terms| terms.get(term))
            .copied()
            .unwrap_or(0)
    }

    /// Get the accumulated max term frequency, or 0 if never recorded.
    pub fn max_term_frequency(&self, property: &str, term: &str) -> u64 {
        self.max_term_frequency
            .get(property)
            .and_then(|terms| terms.get(term))
            .copied()
            .unwrap_or(0)
    }

    /// Check whether nothing has been accumulated yet.
    pub fn is_empty(&self) -> bool {
        self.document_frequency.is_empty()
            && self.collection_term_frequency.is_empty()
            && self.max_term_frequency.is_empty()
    }

    /// Merge another set of accumulators into this one.
    pub fn merge(&mut self, other: &SearchStatistics) {
        for (property, terms) in &other.document_frequency {
            for (term, df) in terms {
                self.add_document_frequency(property, term, *df);
            }
        }
        for (property, terms) in &other.collection_term_frequency {
            for (term, ctf) in terms {
                self.add_collection_term_frequency(property, term, *ctf);
            }
        }
        for (property, terms) in &other.max_term_frequency {
            for (term, max_tf) in terms {
                self.record_max_term_frequency(property, term, *max_tf);
            }
        }
    }

    /// Iterate the properties with any document-frequency entries.
    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.document_frequency.keys().map(|s| s.as_str())
    }
}

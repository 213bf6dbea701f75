//! # Pilum
//!
//! A document-iterator query execution engine for inverted-index search.
//!
//! Pilum implements the traversal core of a boolean/ranked retrieval
//! engine: composable iterators that walk sorted posting lists (term
//! postings, deletion bitmaps, virtual "all documents" ranges) and answer
//! boolean queries while accumulating the statistics a relevance scorer
//! needs.
//!
//! ## Features
//!
//! - Skip-based posting traversal with block indexes
//! - Deletion-aware "match all" iteration over a frozen snapshot
//! - Composable AND / OR / NOT iterator trees
//! - Per-property document/collection/max term-frequency statistics
//! - Snapshot-isolated, single-pass, pull-based execution

pub mod error;
pub mod posting;
pub mod query;
pub mod reader;

pub mod prelude {
    pub use crate::error::{PilumError, Result};
    pub use crate::query::executor::{ExecutorConfig, QueryExecutor, QueryMatch};
    pub use crate::query::iterator::{DocId, DocumentIterator, NO_MORE_DOCS};
    pub use crate::query::statistics::SearchStatistics;
    pub use crate::reader::{IndexSnapshot, MemorySnapshot, PostingSequence};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

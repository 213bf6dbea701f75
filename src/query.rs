//! Query execution: the document-iterator algebra.
//!
//! A query planner builds a tree of [`DocumentIterator`] nodes (term
//! leaves, the deletion-filtered all-documents leaf, and AND / OR / NOT
//! compounds), then the executor drives the root with `next()` and
//! `skip_to()` to enumerate matching document ids in ascending order.

pub mod boolean;
pub mod executor;
pub mod iterator;
pub mod leaf;
pub mod statistics;

pub use boolean::{AndIterator, NotIterator, OrIterator};
pub use executor::{ExecutorConfig, QueryExecutor, QueryMatch};
pub use iterator::{DocId, DocumentIterator, EmptyDocumentIterator, NO_MORE_DOCS};
pub use leaf::{AllDocumentIterator, TermIterator};
pub use statistics::SearchStatistics;

//! Source readers.
//!
//! Two source shapes feed the pipeline: tree-structured XML exports
//! (one record per repeating element) and full-table scans of the
//! embedded store (see [`crate::store::SqliteStore::scan`]).

pub mod xml;

pub use xml::XmlSource;

//! Core types shared across the pipeline.

pub mod descriptor;
pub mod record;
pub mod value;

pub use descriptor::{descriptor_for, default_table_order, TableDescriptor, CLINICAL_TABLES};
pub use record::RawRecord;
pub use value::Value;

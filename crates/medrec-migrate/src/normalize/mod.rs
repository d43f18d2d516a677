//! Record normalization: raw source records into destination rows.
//!
//! One normalizer per clinical table. Each consumes a [`RawRecord`],
//! coerces the fields it knows, checks the table's required fields, and
//! either emits one row in destination column order or rejects the
//! record with a reason. Rejections are counted by the pipeline and
//! never abort a batch.

mod patients;
mod payments;
mod prescriptions;
mod visits;

pub use patients::PatientNormalizer;
pub use payments::PaymentNormalizer;
pub use prescriptions::PrescriptionNormalizer;
pub use visits::VisitNormalizer;

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

use crate::cache::PatientCache;
use crate::core::{RawRecord, Value};

/// Why a record was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Reject {
    /// A required field is absent or unparsable.
    #[error("missing required field {0}")]
    MissingField(&'static str),

    /// A required field is present but invalid.
    #[error("invalid field {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },
}

impl Reject {
    pub fn missing(field: &'static str) -> Self {
        Reject::MissingField(field)
    }

    pub fn invalid(field: &'static str, reason: &'static str) -> Self {
        Reject::InvalidField { field, reason }
    }
}

/// Shared state for one normalization run.
///
/// The run timestamp is captured once at run start so every defaulted
/// creation time within a run agrees.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeContext<'a> {
    /// Calendar date of the run (UTC).
    pub run_date: NaiveDate,

    /// Timestamp of the run (UTC-naive).
    pub run_timestamp: NaiveDateTime,

    /// Patient lookup, present once the patients table has loaded.
    pub patients: Option<&'a PatientCache>,
}

impl<'a> NormalizeContext<'a> {
    /// Context for a run starting at `now`, before any cache exists.
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            run_date: now.date(),
            run_timestamp: now,
            patients: None,
        }
    }

    /// Same context with the patient cache attached.
    pub fn with_patients(self, cache: &'a PatientCache) -> Self {
        Self {
            patients: Some(cache),
            ..self
        }
    }

    /// Run date in ISO form, the default for date-typed creation fields.
    pub fn run_date_iso(&self) -> String {
        self.run_date.to_string()
    }

    /// Run timestamp in ISO form, the default for datetime-typed
    /// creation fields.
    pub fn run_timestamp_iso(&self) -> String {
        self.run_timestamp.format("%Y-%m-%dT%H:%M:%S").to_string()
    }

    /// Run timestamp as epoch milliseconds.
    pub fn run_timestamp_millis(&self) -> i64 {
        self.run_timestamp.and_utc().timestamp_millis()
    }
}

/// Normalize raw records for one destination table.
pub trait RecordNormalizer: Send + Sync {
    /// Destination table name.
    fn table(&self) -> &'static str;

    /// Destination columns, in insert order.
    fn columns(&self) -> &'static [&'static str];

    /// Map one raw record to one destination row, or reject it.
    ///
    /// A returned row always has exactly `columns().len()` values.
    fn normalize(
        &self,
        record: &RawRecord,
        ctx: &NormalizeContext<'_>,
    ) -> std::result::Result<Vec<Value>, Reject>;
}

/// Parse the patient code, the natural key shared by every table.
///
/// Zero is the legacy export's stand-in for "no patient", so it reads
/// as missing.
pub(crate) fn patient_code(record: &RawRecord, field: &'static str) -> Result<i64, Reject> {
    crate::coerce::int(record.text(field))
        .filter(|&code| code != 0)
        .ok_or(Reject::missing(field))
}

//! Patient record normalization.

use super::{patient_code, NormalizeContext, RecordNormalizer, Reject};
use crate::coerce;
use crate::core::{RawRecord, Value};

const COLUMNS: &[&str] = &[
    "code",
    "barcode",
    "created_at",
    "first_name",
    "last_name",
    "age",
    "date_of_birth",
    "address",
    "phone_number",
    "other_info",
    "updated_at",
    "needs_sync",
];

/// Normalizer for the patients table.
///
/// Requires the patient code, an exactly-8-character barcode, and both
/// name parts. The creation date falls back to the run date when the
/// export carries none.
pub struct PatientNormalizer;

impl RecordNormalizer for PatientNormalizer {
    fn table(&self) -> &'static str {
        "patients"
    }

    fn columns(&self) -> &'static [&'static str] {
        COLUMNS
    }

    fn normalize(
        &self,
        record: &RawRecord,
        ctx: &NormalizeContext<'_>,
    ) -> Result<Vec<Value>, Reject> {
        let code = patient_code(record, "CDEP")?;

        let barcode = coerce::trimmed(record.text("CODE_B")).ok_or(Reject::missing("CODE_B"))?;
        if barcode.chars().count() != 8 {
            return Err(Reject::invalid("CODE_B", "barcode must be 8 characters"));
        }

        let first_name = coerce::trimmed(record.text("PRP")).ok_or(Reject::missing("PRP"))?;
        let last_name = coerce::trimmed(record.text("NOMP")).ok_or(Reject::missing("NOMP"))?;

        let created_at = coerce::date(record.text("crée_le"))
            .map(|d| d.to_string())
            .unwrap_or_else(|| ctx.run_date_iso());

        Ok(vec![
            Value::Int(code),
            Value::Text(barcode),
            Value::Text(created_at.clone()),
            Value::Text(first_name),
            Value::Text(last_name),
            Value::from(coerce::int(record.text("AGE"))),
            Value::from(coerce::date(record.text("DATEN"))),
            Value::from(coerce::trimmed(record.text("ADP"))),
            Value::from(coerce::trimmed(record.text("TEL"))),
            Value::from(coerce::trimmed(record.text("INFOR_UTILES"))),
            Value::Text(created_at),
            Value::Int(0),
        ])
    }
}

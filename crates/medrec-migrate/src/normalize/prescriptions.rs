//! Prescription document normalization.

use super::{patient_code, NormalizeContext, RecordNormalizer, Reject};
use crate::coerce;
use crate::core::{RawRecord, Value};

const COLUMNS: &[&str] = &[
    "original_id",
    "patient_code",
    "document_date",
    "patient_age",
    "sequence",
    "patient_sequence",
    "doctor_name",
    "amount",
    "content1",
    "type1",
    "content2",
    "type2",
    "content3",
    "type3",
    "additional_notes",
    "report_title",
    "referred_by",
    "followup_flag",
    "followup_date",
    "followup_day",
    "created_at",
    "updated_at",
];

/// Default document type when the export leaves the first block untyped.
const DEFAULT_DOCUMENT_TYPE: &str = "PRESCRIPTION";

/// Normalizer for the prescriptions table.
///
/// Only the patient code is mandatory; a prescription with no content
/// blocks still loads. Content blocks keep their internal formatting.
pub struct PrescriptionNormalizer;

impl RecordNormalizer for PrescriptionNormalizer {
    fn table(&self) -> &'static str {
        "prescriptions"
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

        let sequence = coerce::int(record.text("SEQ")).unwrap_or(1);
        let amount = coerce::float(record.text("SMONT")).unwrap_or(0.0);
        let followup_flag = coerce::int(record.text("rdvle")).unwrap_or(0);
        let type1 = coerce::trimmed(record.text("ACTEX"))
            .unwrap_or_else(|| DEFAULT_DOCUMENT_TYPE.to_string());

        let now = ctx.run_timestamp_iso();

        Ok(vec![
            Value::from(coerce::int(record.text("N__Enr."))),
            Value::Int(code),
            Value::from(coerce::date(record.text("DATEORD"))),
            Value::from(coerce::int(record.text("AG2"))),
            Value::Int(sequence),
            Value::from(coerce::trimmed(record.text("SEQPAT"))),
            Value::from(coerce::trimmed(record.text("MEDCIN"))),
            Value::Real(amount),
            Value::from(coerce::preserved(record.text("STRAIT"))),
            Value::Text(type1),
            Value::from(coerce::preserved(record.text("strait1"))),
            Value::from(coerce::trimmed(record.text("ACTEX1"))),
            Value::from(coerce::preserved(record.text("strait2"))),
            Value::from(coerce::trimmed(record.text("ACTEX2"))),
            Value::from(coerce::preserved(record.text("strait3"))),
            Value::from(coerce::trimmed(record.text("titre_cr"))),
            Value::from(coerce::trimmed(record.text("ADressé_par"))),
            Value::Int(followup_flag),
            Value::from(coerce::trimmed(record.text("datele"))),
            Value::from(coerce::trimmed(record.text("jourle"))),
            Value::Text(now.clone()),
            Value::Text(now),
        ])
    }
}

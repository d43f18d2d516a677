//! Payment record normalization.

use super::{patient_code, NormalizeContext, RecordNormalizer, Reject};
use crate::coerce;
use crate::core::{RawRecord, Value};

const COLUMNS: &[&str] = &[
    "id",
    "medical_act_id",
    "medical_act_name",
    "amount",
    "user_id",
    "user_name",
    "patient_code",
    "patient_first_name",
    "patient_last_name",
    "payment_time",
    "created_at",
    "updated_at",
    "needs_sync",
    "is_active",
];

/// Normalizer for the payments table.
///
/// Payments denormalize the patient's display name through the patient
/// cache. A cache miss loads the payment with empty name fields rather
/// than rejecting it: the payment itself is still real money.
pub struct PaymentNormalizer;

impl RecordNormalizer for PaymentNormalizer {
    fn table(&self) -> &'static str {
        "payments"
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

        let id = coerce::int(record.text("IDHONORAIRE"))
            .or_else(|| coerce::int(record.text("N__Enr.")));
        let medical_act_id = coerce::int(record.text("cd_acte")).unwrap_or(0);
        let medical_act_name = coerce::trimmed(record.text("ACTE")).unwrap_or_default();
        let amount = coerce::int(record.text("MONATNT")).unwrap_or(0);
        let user_name = coerce::trimmed(record.text("MEDCIN")).unwrap_or_default();

        let payment_time =
            coerce::timestamp_millis(record.text("DATE"), record.text("HORAIR"))
                .unwrap_or_else(|| ctx.run_timestamp_millis());

        let (first_name, last_name) = ctx
            .patients
            .and_then(|cache| cache.get(code))
            .map(|(first, last)| (first.to_string(), last.to_string()))
            .unwrap_or_default();

        Ok(vec![
            Value::from(id),
            Value::Int(medical_act_id),
            Value::Text(medical_act_name),
            Value::Int(amount),
            Value::Text(String::new()),
            Value::Text(user_name),
            Value::Int(code),
            Value::Text(first_name),
            Value::Text(last_name),
            Value::Int(payment_time),
            Value::Int(payment_time),
            Value::Int(payment_time),
            Value::Int(0),
            Value::Int(1),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PatientCache;
    use chrono::NaiveDate;

    fn ctx() -> NormalizeContext<'static> {
        NormalizeContext::new(
            NaiveDate::from_ymd_opt(2024, 6, 1)
                .unwrap()
                .and_hms_opt(16, 45, 0)
                .unwrap(),
        )
    }

    fn record(fields: &[(&str, &str)]) -> RawRecord {
        let mut rec = RawRecord::new();
        for (name, value) in fields {
            rec.push(*name, Value::Text((*value).to_string()));
        }
        rec
    }

    #[test]
    fn test_cache_hit_fills_names() {
        let cache =
            PatientCache::from_entries([(12, ("Jane".to_string(), "Doe".to_string()))]);
        let ctx = ctx().with_patients(&cache);
        let rec = record(&[
            ("CDEP", "12"),
            ("IDHONORAIRE", "301"),
            ("ACTE", "Consultation"),
            ("MONATNT", "2000"),
            ("DATE", "03/04/2023"),
            ("HORAIR", "14:30"),
        ]);
        let row = PaymentNormalizer.normalize(&rec, &ctx).unwrap();
        assert_eq!(row[0], Value::Int(301));
        assert_eq!(row[7], Value::Text("Jane".into()));
        assert_eq!(row[8], Value::Text("Doe".into()));
        assert_eq!(
            row[9],
            Value::Int(
                coerce::timestamp_millis(Some("03/04/2023"), Some("14:30")).unwrap()
            )
        );
    }

    #[test]
    fn test_cache_miss_degrades_to_empty_names() {
        let cache = PatientCache::from_entries([]);
        let ctx = ctx().with_patients(&cache);
        let rec = record(&[("CDEP", "99"), ("MONATNT", "500")]);
        let row = PaymentNormalizer.normalize(&rec, &ctx).unwrap();
        assert_eq!(row[6], Value::Int(99));
        assert_eq!(row[7], Value::Text(String::new()));
        assert_eq!(row[8], Value::Text(String::new()));
        // still a loaded payment, never a rejection
        assert_eq!(row[3], Value::Int(500));
    }

    #[test]
    fn test_id_falls_back_to_record_number() {
        let ctx = ctx();
        let rec = record(&[("CDEP", "12"), ("N__Enr.", "88")]);
        let row = PaymentNormalizer.normalize(&rec, &ctx).unwrap();
        assert_eq!(row[0], Value::Int(88));
    }

    #[test]
    fn test_payment_time_defaults_to_run_time() {
        let ctx = ctx();
        let rec = record(&[("CDEP", "12")]);
        let row = PaymentNormalizer.normalize(&rec, &ctx).unwrap();
        assert_eq!(row[9], Value::Int(ctx.run_timestamp_millis()));
    }

    #[test]
    fn test_missing_patient_code_rejected() {
        let rec = record(&[("MONATNT", "500")]);
        assert_eq!(
            PaymentNormalizer.normalize(&rec, &ctx()),
            Err(Reject::missing("CDEP"))
        );
    }
}

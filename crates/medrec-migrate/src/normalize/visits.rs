//! Visit record normalization.

use super::{patient_code, NormalizeContext, RecordNormalizer, Reject};
use crate::coerce;
use crate::core::{RawRecord, Value};

const COLUMNS: &[&str] = &[
    "original_id",
    "patient_code",
    "visit_sequence",
    "visit_date",
    "doctor_name",
    "reason",
    "diagnosis",
    "conduct",
    // right eye (OD)
    "od_sv",
    "od_av",
    "od_sphere",
    "od_cylinder",
    "od_axis",
    "od_vl",
    "od_k1",
    "od_k2",
    "od_r1",
    "od_r2",
    "od_r0",
    "od_pachy",
    "od_toc",
    "od_notes",
    "od_gonio",
    "od_to",
    "od_laf",
    "od_fo",
    // left eye (OS)
    "os_sv",
    "os_av",
    "os_sphere",
    "os_cylinder",
    "os_axis",
    "os_vl",
    "os_k1",
    "os_k2",
    "os_r1",
    "os_r2",
    "os_r0",
    "os_pachy",
    "os_toc",
    "os_notes",
    "os_gonio",
    "os_to",
    "os_laf",
    "os_fo",
    // shared
    "addition",
    "dip",
    "created_at",
    "updated_at",
    "needs_sync",
    "is_active",
];

/// Normalizer for the visits table.
///
/// Requires the patient code, the visit date and the doctor name. The
/// sequence within a patient's visit history defaults to 1.
pub struct VisitNormalizer;

impl RecordNormalizer for VisitNormalizer {
    fn table(&self) -> &'static str {
        "visits"
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

        let visit_date = coerce::date(record.text("DATECLI")).ok_or(Reject::missing("DATECLI"))?;
        let doctor_name =
            coerce::trimmed(record.text("MEDCIN")).ok_or(Reject::missing("MEDCIN"))?;

        let original_id = coerce::int(record.text("N__Enr."));
        let visit_sequence = coerce::int(record.text("SEQC")).unwrap_or(1);

        let now = ctx.run_timestamp_iso();
        // shorthand for the many optional measurement fields
        let t = |tag: &str| Value::from(coerce::trimmed(record.text(tag)));

        Ok(vec![
            Value::from(original_id),
            Value::Int(code),
            Value::Int(visit_sequence),
            Value::from(visit_date),
            Value::Text(doctor_name),
            t("MOTIF"),
            t("DIIAG"),
            t("CAT"),
            // right eye
            t("SCOD"),
            t("AVOD"),
            t("p1"),
            t("p2"),
            t("AXD"),
            t("VPOD"),
            t("K1_D"),
            t("K2_D"),
            t("R1_d"),
            t("R2_d"),
            t("RAYOND"),
            t("pachy1_D"),
            t("TOOD"),
            t("comentaire_D"),
            t("VAD"),
            t("TOOD"),
            t("LAF"),
            t("FO"),
            // left eye
            t("SCOG"),
            t("AVOG"),
            t("p3"),
            t("p5"),
            t("AXG"),
            t("VPOG"),
            t("K1_G"),
            t("K2_G"),
            t("R1_G"),
            t("R2_G"),
            t("RAYONG"),
            t("pachy1_g"),
            t("TOOG"),
            t("commentaire_G"),
            t("VAG"),
            t("TOOG"),
            t("LAF_G"),
            t("FO_G"),
            // shared
            t("EP"),
            t("EP"),
            Value::Text(now.clone()),
            Value::Text(now),
            Value::Int(1),
            Value::Int(1),
        ])
    }
}

//! End-to-end import tests: XML exports into a fresh embedded store.

use std::path::{Path, PathBuf};

use medrec_migrate::{
    Config, ImportRun, MigrateError, MigrationConfig, RunVerdict, SourceConfig, SqliteStore,
    StoreConfig, TableStage, Value,
};

const SCHEMA: &str = r#"
CREATE TABLE patients (
    code INTEGER PRIMARY KEY,
    barcode TEXT NOT NULL,
    created_at TEXT,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    age INTEGER,
    date_of_birth TEXT,
    address TEXT,
    phone_number TEXT,
    other_info TEXT,
    updated_at TEXT,
    needs_sync INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE visits (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    original_id INTEGER,
    patient_code INTEGER NOT NULL,
    visit_sequence INTEGER NOT NULL DEFAULT 1,
    visit_date TEXT NOT NULL,
    doctor_name TEXT NOT NULL,
    reason TEXT, diagnosis TEXT, conduct TEXT,
    od_sv TEXT, od_av TEXT, od_sphere TEXT, od_cylinder TEXT, od_axis TEXT,
    od_vl TEXT, od_k1 TEXT, od_k2 TEXT, od_r1 TEXT, od_r2 TEXT, od_r0 TEXT,
    od_pachy TEXT, od_toc TEXT, od_notes TEXT, od_gonio TEXT, od_to TEXT,
    od_laf TEXT, od_fo TEXT,
    os_sv TEXT, os_av TEXT, os_sphere TEXT, os_cylinder TEXT, os_axis TEXT,
    os_vl TEXT, os_k1 TEXT, os_k2 TEXT, os_r1 TEXT, os_r2 TEXT, os_r0 TEXT,
    os_pachy TEXT, os_toc TEXT, os_notes TEXT, os_gonio TEXT, os_to TEXT,
    os_laf TEXT, os_fo TEXT,
    addition TEXT, dip TEXT,
    created_at TEXT, updated_at TEXT,
    needs_sync INTEGER NOT NULL DEFAULT 1,
    is_active INTEGER NOT NULL DEFAULT 1
);
CREATE TABLE prescriptions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    original_id INTEGER,
    patient_code INTEGER NOT NULL,
    document_date TEXT,
    patient_age INTEGER,
    sequence INTEGER NOT NULL DEFAULT 1,
    patient_sequence TEXT,
    doctor_name TEXT,
    amount REAL NOT NULL DEFAULT 0,
    content1 TEXT, type1 TEXT, content2 TEXT, type2 TEXT, content3 TEXT, type3 TEXT,
    additional_notes TEXT, report_title TEXT, referred_by TEXT,
    followup_flag INTEGER NOT NULL DEFAULT 0,
    followup_date TEXT, followup_day TEXT,
    created_at TEXT, updated_at TEXT
);
CREATE TABLE payments (
    id INTEGER,
    medical_act_id INTEGER NOT NULL DEFAULT 0,
    medical_act_name TEXT NOT NULL DEFAULT '',
    amount INTEGER NOT NULL DEFAULT 0,
    user_id TEXT NOT NULL DEFAULT '',
    user_name TEXT NOT NULL DEFAULT '',
    patient_code INTEGER NOT NULL,
    patient_first_name TEXT NOT NULL DEFAULT '',
    patient_last_name TEXT NOT NULL DEFAULT '',
    payment_time INTEGER,
    created_at INTEGER,
    updated_at INTEGER,
    needs_sync INTEGER NOT NULL DEFAULT 0,
    is_active INTEGER NOT NULL DEFAULT 1
);
"#;

struct Fixture {
    _dir: tempfile::TempDir,
    export_dir: PathBuf,
    store_path: PathBuf,
}

impl Fixture {
    async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let export_dir = dir.path().join("exports");
        std::fs::create_dir(&export_dir).unwrap();

        // empty exports by default; tests overwrite the ones they use
        for file in ["pat.xml", "vi.xml", "or.xml", "pay.xml"] {
            std::fs::write(export_dir.join(file), "<Export></Export>").unwrap();
        }

        let store_path = dir.path().join("records.db");
        let store = SqliteStore::create(&store_path).await.unwrap();
        for statement in SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
            sqlx::query(statement).execute(store.pool()).await.unwrap();
        }

        Self {
            _dir: dir,
            export_dir,
            store_path,
        }
    }

    fn write_export(&self, file: &str, records: &[&str]) {
        let body: String = records
            .iter()
            .map(|r| format!("<Table_Contenu>{}</Table_Contenu>", r))
            .collect();
        std::fs::write(
            self.export_dir.join(file),
            format!("<Export>{}</Export>", body),
        )
        .unwrap();
    }

    fn config(&self) -> Config {
        Config {
            source: SourceConfig {
                dir: self.export_dir.clone(),
                patients_file: "pat.xml".into(),
                visits_file: "vi.xml".into(),
                prescriptions_file: "or.xml".into(),
                payments_file: "pay.xml".into(),
                record_element: "Table_Contenu".into(),
            },
            store: StoreConfig {
                path: self.store_path.clone(),
            },
            server: None,
            migration: MigrationConfig::default(),
        }
    }

    async fn store(&self) -> SqliteStore {
        SqliteStore::open(&self.store_path).await.unwrap()
    }
}

fn text(value: Option<&Value>) -> &str {
    match value {
        Some(Value::Text(s)) => s,
        other => panic!("expected text, got {:?}", other),
    }
}

#[tokio::test]
async fn test_barcode_rule_end_to_end() {
    let fixture = Fixture::new().await;
    fixture.write_export(
        "pat.xml",
        &[
            "<CDEP>1</CDEP><CODE_B>ABCDEFGH</CODE_B><PRP>Jane</PRP><NOMP>Doe</NOMP>",
            "<CDEP>2</CDEP><CODE_B>BAD</CODE_B><PRP>John</PRP><NOMP>Roe</NOMP>",
        ],
    );

    let summary = ImportRun::new(fixture.config())
        .await
        .unwrap()
        .run()
        .await
        .unwrap();

    let patients = &summary.tables[0];
    assert_eq!(patients.table, "patients");
    assert_eq!(patients.attempted, 2);
    assert_eq!(patients.succeeded, 1);
    assert_eq!(patients.failed, 1);
    assert_eq!(summary.verdict, RunVerdict::SuccessWithErrors);

    let store = fixture.store().await;
    let rows = store.scan("patients").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("code"), Some(&Value::Int(1)));
    assert_eq!(text(rows[0].get("first_name")), "Jane");
}

#[tokio::test]
async fn test_import_replaces_prior_content() {
    let fixture = Fixture::new().await;
    {
        let store = fixture.store().await;
        sqlx::query(
            "INSERT INTO patients (code, barcode, first_name, last_name) \
             VALUES (999, 'STALEROW', 'Old', 'Row')",
        )
        .execute(store.pool())
        .await
        .unwrap();
    }
    fixture.write_export(
        "pat.xml",
        &["<CDEP>1</CDEP><CODE_B>ABCDEFGH</CODE_B><PRP>Jane</PRP><NOMP>Doe</NOMP>"],
    );

    ImportRun::new(fixture.config())
        .await
        .unwrap()
        .run()
        .await
        .unwrap();

    let store = fixture.store().await;
    let rows = store.scan("patients").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("code"), Some(&Value::Int(1)));
}

#[tokio::test]
async fn test_payments_join_patient_cache() {
    let fixture = Fixture::new().await;
    fixture.write_export(
        "pat.xml",
        &["<CDEP>12</CDEP><CODE_B>ABCDEFGH</CODE_B><PRP>Jane</PRP><NOMP>Doe</NOMP>"],
    );
    fixture.write_export(
        "pay.xml",
        &[
            "<CDEP>12</CDEP><IDHONORAIRE>1</IDHONORAIRE><ACTE>Consultation</ACTE>\
             <MONATNT>2000</MONATNT><DATE>03/04/2023</DATE><HORAIR>14:30</HORAIR>",
            // no matching patient: loads with empty names, not rejected
            "<CDEP>77</CDEP><IDHONORAIRE>2</IDHONORAIRE><MONATNT>500</MONATNT>",
        ],
    );

    let summary = ImportRun::new(fixture.config())
        .await
        .unwrap()
        .run()
        .await
        .unwrap();

    let payments = summary.tables.iter().find(|t| t.table == "payments").unwrap();
    assert_eq!(payments.succeeded, 2);
    assert_eq!(payments.failed, 0);

    let store = fixture.store().await;
    let rows = store.scan("payments").await.unwrap();
    assert_eq!(text(rows[0].get("patient_first_name")), "Jane");
    assert_eq!(text(rows[0].get("patient_last_name")), "Doe");
    assert_eq!(text(rows[1].get("patient_first_name")), "");
    assert_eq!(text(rows[1].get("patient_last_name")), "");
}

#[tokio::test]
async fn test_visits_and_prescriptions_import() {
    let fixture = Fixture::new().await;
    fixture.write_export(
        "vi.xml",
        &[
            "<CDEP>5</CDEP><DATECLI>14/02/2022</DATECLI><MEDCIN>Dr. Ayme</MEDCIN>\
             <SEQC>2</SEQC><SCOD>10/10</SCOD>",
            // missing doctor: rejected
            "<CDEP>5</CDEP><DATECLI>15/02/2022</DATECLI>",
        ],
    );
    fixture.write_export(
        "or.xml",
        &["<CDEP>5</CDEP><STRAIT>Timolol 0.5%\n1 drop twice daily</STRAIT><SMONT>150</SMONT>"],
    );

    let summary = ImportRun::new(fixture.config())
        .await
        .unwrap()
        .run()
        .await
        .unwrap();

    let visits = summary.tables.iter().find(|t| t.table == "visits").unwrap();
    assert_eq!(visits.succeeded, 1);
    assert_eq!(visits.failed, 1);
    assert_eq!(visits.stage, TableStage::Loaded);

    let store = fixture.store().await;
    let rows = store.scan("visits").await.unwrap();
    assert_eq!(text(rows[0].get("visit_date")), "2022-02-14");
    assert_eq!(rows[0].get("visit_sequence"), Some(&Value::Int(2)));

    let rows = store.scan("prescriptions").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(text(rows[0].get("type1")), "PRESCRIPTION");
    assert_eq!(rows[0].get("amount"), Some(&Value::Real(150.0)));
}

#[tokio::test]
async fn test_backup_taken_before_import() {
    let fixture = Fixture::new().await;
    let summary = ImportRun::new(fixture.config())
        .await
        .unwrap()
        .run()
        .await
        .unwrap();

    let backup = summary.backup_path.unwrap();
    assert!(backup.is_file());
    assert!(backup
        .file_name()
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("records.db.backup_"));
}

#[tokio::test]
async fn test_missing_export_aborts_before_destruction() {
    let fixture = Fixture::new().await;
    {
        let store = fixture.store().await;
        sqlx::query(
            "INSERT INTO patients (code, barcode, first_name, last_name) \
             VALUES (1, 'ABCDEFGH', 'Jane', 'Doe')",
        )
        .execute(store.pool())
        .await
        .unwrap();
    }
    std::fs::remove_file(fixture.export_dir.join("pay.xml")).unwrap();

    let err = ImportRun::new(fixture.config()).await.unwrap_err();
    assert!(matches!(err, MigrateError::Precondition(_)));

    // nothing was deleted
    let store = fixture.store().await;
    assert_eq!(store.row_count("patients").await.unwrap(), 1);
    // and no backup artifact appeared
    assert!(!dir_has_backup(fixture.store_path.parent().unwrap()));
}

fn dir_has_backup(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().any(|entry| {
        entry
            .unwrap()
            .file_name()
            .to_str()
            .map(|n| n.contains(".backup_"))
            .unwrap_or(false)
    })
}

//! Export rendering without a database

use chrono::{TimeZone, Utc};
use database_layer::{ExportFilters, ExportRow};
use serde_json::json;
use studydesk_server::handlers::export::{attachment_filename, render_csv, render_json, CSV_HEADER};
use uuid::Uuid;

fn row(data_json: &str, hospital_id: Option<Uuid>) -> ExportRow {
    let at = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
    ExportRow {
        submission_id: Uuid::new_v4(),
        form_id: Uuid::new_v4(),
        study_id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        user_email: "coordinator@north.example.org".to_string(),
        user_full_name: "Study Coordinator".to_string(),
        hospital_id,
        data_json: data_json.to_string(),
        created_at: at,
        updated_at: at,
    }
}

#[test]
fn test_filename_uses_timestamp() {
    let now = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
    assert_eq!(attachment_filename(now, "csv"), "export_20240305_140709.csv");
    assert_eq!(attachment_filename(now, "json"), "export_20240305_140709.json");
}

#[test]
fn test_csv_has_header_and_one_line_per_submission() {
    let hospital = Uuid::new_v4();
    let rows = vec![
        row(r#"{"mrn": "0042", "notes": "fever, cough"}"#, Some(hospital)),
        row(r#"{"mrn": "0043"}"#, None),
    ];

    let bytes = render_csv(&rows).unwrap();
    let mut reader = csv::Reader::from_reader(bytes.as_slice());

    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(headers, CSV_HEADER);

    let records: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(records.len(), 2);

    let first = &records[0];
    assert_eq!(&first[0], rows[0].submission_id.to_string());
    assert_eq!(&first[4], "coordinator@north.example.org");
    assert_eq!(&first[5], hospital.to_string());
    assert_eq!(&first[6], "2024-03-05T14:07:09+00:00");
    let data: serde_json::Value = serde_json::from_str(&first[8]).unwrap();
    assert_eq!(data, json!({"mrn": "0042", "notes": "fever, cough"}));

    assert_eq!(&records[1][5], "");
}

#[test]
fn test_unreadable_rows_are_skipped() {
    let rows = vec![row("gAAAAABlegacy-ciphertext", None), row(r#"{"mrn": "7"}"#, None)];

    let bytes = render_csv(&rows).unwrap();
    let mut reader = csv::Reader::from_reader(bytes.as_slice());
    assert_eq!(reader.records().count(), 1);

    let doc = render_json(&rows, &ExportFilters::default(), Utc::now());
    let submissions = doc["submissions"].as_array().unwrap();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0]["id"], json!(rows[1].submission_id));
}

#[test]
fn test_json_document_shape() {
    let study_id = Uuid::new_v4();
    let filters = ExportFilters {
        study_id: Some(study_id),
        start_date: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        ..Default::default()
    };
    let rows = vec![row(r#"{"mrn": "0042"}"#, None)];
    let now = Utc.with_ymd_and_hms(2024, 3, 6, 8, 0, 0).unwrap();

    let doc = render_json(&rows, &filters, now);

    assert_eq!(doc["export_date"], json!("2024-03-06T08:00:00+00:00"));
    assert_eq!(doc["filters"]["study_id"], json!(study_id));
    assert_eq!(doc["filters"]["form_id"], json!(null));
    assert_eq!(doc["filters"]["start_date"], json!("2024-01-01T00:00:00+00:00"));

    let submission = &doc["submissions"][0];
    assert_eq!(submission["data"], json!({"mrn": "0042"}));
    assert_eq!(submission["user"]["full_name"], json!("Study Coordinator"));
    assert_eq!(submission["user"]["hospital_id"], json!(null));
}

use std::fs;

use pretty_assertions::assert_eq;
use routewatch_engine::{export_records, export_stem, rfc3339};
use serde_json::{json, Value};
use tempfile::TempDir;

#[test]
fn export_writes_document_with_count() {
    let temp = TempDir::new().unwrap();
    let records = vec![json!({ "id": 1 }), json!({ "id": 2 })];
    let exported_at = rfc3339(1_700_000_000_000);

    let summary = export_records(temp.path(), "sharp turns", &records, &exported_at).unwrap();

    assert_eq!(summary.record_count, 2);
    assert_eq!(summary.output_path, temp.path().join("sharp turns.json"));
    let written: Value =
        serde_json::from_str(&fs::read_to_string(&summary.output_path).unwrap()).unwrap();
    assert_eq!(
        written,
        json!({
            "exportedAt": "2023-11-14T22:13:20+00:00",
            "count": 2,
            "records": [ { "id": 1 }, { "id": 2 } ]
        })
    );
}

#[test]
fn export_creates_missing_directory() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("exports/nested");

    let summary = export_records(&dir, "results", &[], "now").unwrap();

    assert!(summary.output_path.is_file());
    assert_eq!(summary.record_count, 0);
}

#[test]
fn stems_are_filesystem_safe() {
    assert_eq!(export_stem("routes/r1:blind*spots"), "routes_r1_blind_spots");
    assert_eq!(export_stem("a//b"), "a_b");
    assert_eq!(export_stem("  ..  "), "export");
    assert_eq!(export_stem(&"x".repeat(200)).len(), 80);
}

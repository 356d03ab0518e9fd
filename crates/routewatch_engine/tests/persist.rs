use std::fs;

use routewatch_engine::{ensure_dir, AtomicFileWriter, PersistError};
use tempfile::TempDir;

#[test]
fn creates_missing_state_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("state");
    assert!(!new_dir.exists());
    ensure_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn file_in_place_of_dir_is_rejected() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    assert!(matches!(
        ensure_dir(&file_path),
        Err(PersistError::StateDir(_))
    ));

    let writer = AtomicFileWriter::new(file_path.clone());
    assert!(writer.write("state.json", "{}").is_err());
}

#[test]
fn write_replaces_and_remove_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("state.json", "one").unwrap();
    let second = writer.write("state.json", "two").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "two");

    writer.remove("state.json").unwrap();
    writer.remove("state.json").unwrap();
    assert!(!second.exists());
}

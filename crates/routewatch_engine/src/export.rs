use std::path::{Path, PathBuf};

use routewatch_core::Record;
use serde_json::json;

use crate::persist::{AtomicFileWriter, PersistError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub record_count: usize,
    pub output_path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("could not serialize records: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}

/// Writes normalized records as `{exportedAt, count, records}` JSON to
/// `{dir}/{sanitized label}.json`, replacing an existing export of that name.
pub fn export_records(
    dir: &Path,
    label: &str,
    records: &[Record],
    exported_at: &str,
) -> Result<ExportSummary, ExportError> {
    let document = json!({
        "exportedAt": exported_at,
        "count": records.len(),
        "records": records,
    });
    let content = serde_json::to_string_pretty(&document)?;
    let filename = format!("{}.json", export_stem(label));
    let output_path = AtomicFileWriter::new(dir.to_path_buf()).write(&filename, &content)?;
    Ok(ExportSummary {
        record_count: records.len(),
        output_path,
    })
}

/// Filesystem-safe stem: forbidden characters become `_`, runs of `_`
/// collapse, and the result is capped at 80 bytes.
pub fn export_stem(label: &str) -> String {
    let replaced: String = label
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();

    let mut stem = String::with_capacity(replaced.len());
    for c in replaced.trim_matches(&['_', ' ', '.'][..]).chars() {
        if c == '_' && stem.ends_with('_') {
            continue;
        }
        stem.push(c);
    }
    if stem.is_empty() {
        stem.push_str("export");
    }
    while stem.len() > 80 {
        stem.pop();
    }
    stem
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

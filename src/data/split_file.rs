// ============================================================
// Layer 4 — Split Files (train_seqs.csv / test_seqs.csv)
// ============================================================
// A split file is a one-column CSV:
//
//   text
//   "first sequence, with a comma"
//   second sequence
//
// Quoting follows standard CSV rules (only when needed, with
// doubled inner quotes), handled by the csv crate.

use std::path::Path;

use crate::domain::error::TrainError;

pub const TEXT_COLUMN: &str = "text";

/// Write `texts` under a single `text` header, one row each, in order.
pub fn write_text_column<S: AsRef<str>>(path: &Path, texts: &[S]) -> Result<(), TrainError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;
    writer
        .write_record([TEXT_COLUMN])
        .map_err(|e| csv_error(path, e))?;
    for text in texts {
        writer
            .write_record([text.as_ref()])
            .map_err(|e| csv_error(path, e))?;
    }
    writer.flush().map_err(|e| TrainError::io(path, e))?;

    tracing::debug!("Wrote {} rows to '{}'", texts.len(), path.display());
    Ok(())
}

/// Read the `text` column back from a split file.
pub fn read_text_column(path: &Path) -> Result<Vec<String>, TrainError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| csv_error(path, e))?;

    let headers = reader.headers().map_err(|e| csv_error(path, e))?;
    let column = headers
        .iter()
        .position(|h| h == TEXT_COLUMN)
        .ok_or_else(|| {
            TrainError::Data(format!("'{}' has no '{}' column", path.display(), TEXT_COLUMN))
        })?;

    let mut texts = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(path, e))?;
        texts.push(record.get(column).unwrap_or_default().to_string());
    }
    Ok(texts)
}

fn csv_error(path: &Path, err: csv::Error) -> TrainError {
    let source = match err.into_kind() {
        csv::ErrorKind::Io(io) => io,
        other => std::io::Error::new(std::io::ErrorKind::InvalidData, format!("{other:?}")),
    };
    TrainError::io(path, source)
}

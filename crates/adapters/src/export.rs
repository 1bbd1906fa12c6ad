use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::{Map, Value};
use tabula_core::executor::ColumnMeta;
use tabula_core::value_codec::CellValue;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write export file at {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to serialize JSON export: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn write_csv(path: &Path, document: &str) -> Result<(), ExportError> {
    if has_gz_extension(path) {
        let file = File::create(path).map_err(|source| write_error(path, source))?;
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        encoder
            .write_all(document.as_bytes())
            .map_err(|source| write_error(path, source))?;
        encoder.finish().map_err(|source| write_error(path, source))?;
        return Ok(());
    }
    std::fs::write(path, document).map_err(|source| write_error(path, source))
}

pub fn write_text(path: &Path, document: &str) -> Result<(), ExportError> {
    std::fs::write(path, document).map_err(|source| write_error(path, source))
}

pub fn write_json(
    path: &Path,
    columns: &[ColumnMeta],
    rows: &[Vec<CellValue>],
) -> Result<usize, ExportError> {
    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let mut object = Map::with_capacity(columns.len());
        for (column_index, column) in columns.iter().enumerate() {
            let value = match row.get(column_index) {
                None | Some(CellValue::Null) => Value::Null,
                Some(cell) => Value::String(cell.display_text()),
            };
            object.insert(column.name.clone(), value);
        }
        records.push(Value::Object(object));
    }

    let payload = serde_json::to_string_pretty(&records)?;
    std::fs::write(path, payload).map_err(|source| write_error(path, source))?;
    Ok(rows.len())
}

fn has_gz_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("gz"))
}

fn write_error(path: &Path, source: io::Error) -> ExportError {
    ExportError::Write {
        path: path.display().to_string(),
        source,
    }
}

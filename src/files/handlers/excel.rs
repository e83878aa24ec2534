use calamine::{open_workbook_auto, Data, Range, Reader};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::error::HandlerError;
use crate::files::FilePayload;

/// Records kept from the first sheet.
pub const ROW_LIMIT: usize = 10;

pub async fn handle(path: &Path) -> Result<FilePayload, HandlerError> {
    let path: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || read_first_sheet(&path)).await?
}

fn read_first_sheet(path: &Path) -> Result<FilePayload, HandlerError> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| HandlerError::Format("workbook has no sheets".to_string()))?;
    let range = workbook.worksheet_range(&sheet)?;

    Ok(FilePayload::Table(range_to_records(&range, ROW_LIMIT)))
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => Value::from(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::String(s) => Value::String(s.clone()),
        other => Value::String(other.to_string()),
    }
}

/// First row is the header; blank header cells get pandas-style names.
fn range_to_records(range: &Range<Data>, limit: usize) -> Vec<Map<String, Value>> {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Vec::new();
    };

    let columns: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(idx, cell)| match cell {
            Data::Empty => format!("Unnamed: {}", idx),
            other => other.to_string(),
        })
        .collect();

    rows.take(limit)
        .map(|row| {
            columns
                .iter()
                .zip(row.iter())
                .map(|(column, cell)| (column.clone(), cell_value(cell)))
                .collect()
        })
        .collect()
}

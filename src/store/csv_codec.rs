use csv::{ReaderBuilder, WriterBuilder};
use serde_json::Value;
use tracing::warn;

use super::StoreError;
use crate::record::{self, Record};

/// Read a CSV collection by header name. Rows without `hls_url` are kept as keyless rows.
/// Cells past the header width are kept under `column_<n>` (1-based position).
pub fn decode(text: &str) -> Result<Vec<Record>, StoreError> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row?;
        if row.len() > headers.len() {
            warn!(
                "Line {} has {} cells but the header names {}; keeping the rest as column_N",
                index + 2,
                row.len(),
                headers.len()
            );
        }
        // Short rows leave trailing columns unset; `from_fields` defaults them.
        let names = headers
            .iter()
            .map(str::to_string)
            .chain((headers.len() + 1..).map(overflow_column));
        let cells = row.iter().map(|cell| Value::String(cell.to_string()));
        records.push(Record::from_fields(names.zip(cells)));
    }
    Ok(records)
}

fn overflow_column(position: usize) -> String {
    format!("column_{}", position)
}

/// Core columns first, extras after, `get` as a plain integer.
pub fn encode(records: &[Record]) -> Result<String, StoreError> {
    let columns = record::columns(records);
    let mut writer = WriterBuilder::new().from_writer(Vec::new());

    writer.write_record(&columns)?;
    for record in records {
        writer.write_record(columns.iter().map(|c| record.field(c)))?;
    }

    let bytes = writer.into_inner().map_err(|e| StoreError::Io(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

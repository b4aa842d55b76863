pub mod csv_codec;
pub mod json_codec;
pub mod table;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::ValueEnum;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::record::Record;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("{0} is display-only and cannot be read back")]
    Unreadable(&'static str),
}

/// Persistence and presentation formats for a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Csv,
    Json,
    /// Fixed-width table for the terminal; merges against the CSV collection.
    Table,
}

impl Format {
    /// Extension of the collection this format merges against.
    pub fn extension(self) -> &'static str {
        match self {
            Format::Csv | Format::Table => "csv",
            Format::Json => "json",
        }
    }

    /// Whether output goes to `<program>.<ext>` when no `-o` is given.
    pub fn writes_file_by_default(self) -> bool {
        matches!(self, Format::Json)
    }

    pub fn decode(self, text: &str) -> Result<Vec<Record>, StoreError> {
        match self {
            Format::Csv => csv_codec::decode(text),
            Format::Json => json_codec::decode(text),
            Format::Table => Err(StoreError::Unreadable("table")),
        }
    }

    pub fn encode(self, records: &[Record]) -> Result<String, StoreError> {
        match self {
            Format::Csv => csv_codec::encode(records),
            Format::Json => json_codec::encode(records),
            Format::Table => Ok(table::render(records)),
        }
    }

    /// The format used to read the existing collection.
    fn source(self) -> Format {
        match self {
            Format::Table => Format::Csv,
            other => other,
        }
    }
}

/// Where a run writes its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Stdout,
    File(PathBuf),
}

impl Output {
    pub fn describe(&self) -> String {
        match self {
            Output::Stdout => "stdout".to_string(),
            Output::File(path) => path.display().to_string(),
        }
    }
}

/// Read the existing collection. A missing file is an empty collection;
/// an unreadable or corrupt one is logged and also treated as empty.
pub fn load_existing(path: &Path, format: Format) -> Vec<Record> {
    if !path.exists() {
        debug!("No existing collection at {}", path.display());
        return Vec::new();
    }

    match read_collection(path, format.source()) {
        Ok(records) => {
            info!("Loaded {} existing records from {}", records.len(), path.display());
            records
        }
        Err(e) => {
            warn!("{:#}; starting from an empty collection", e);
            Vec::new()
        }
    }
}

fn read_collection(path: &Path, format: Format) -> anyhow::Result<Vec<Record>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read existing {} {}", format.extension(), path.display()))?;
    let records = format
        .decode(&text)
        .with_context(|| format!("failed to parse existing {} {}", format.extension(), path.display()))?;
    Ok(records)
}

/// Write `contents` to the output. Files are written to a sibling temp file
/// and renamed into place so a failure never leaves a half-written collection.
pub fn write_output(output: &Output, contents: &str) -> Result<(), StoreError> {
    match output {
        Output::Stdout => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(contents.as_bytes())?;
            stdout.flush()?;
        }
        Output::File(path) => write_atomic(path, contents)?,
    }
    Ok(())
}

fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    if let Err(e) = fs::write(&tmp, contents).and_then(|_| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}

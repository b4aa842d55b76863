use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::AppError;

static PROGRAM_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{6,20}$").unwrap());

/// A validated on-demand program ID such as `BR8Z3NX7XM`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgramId(String);

impl ProgramId {
    pub fn new(raw: &str) -> Result<Self, AppError> {
        let id = raw.trim();
        if !PROGRAM_ID_RE.is_match(id) {
            return Err(AppError::InvalidProgramId(id.to_string()));
        }
        Ok(Self(id.to_string()))
    }

    /// Detail page URL for the program's first series. The ID is interpolated as-is.
    pub fn detail_url(&self, base_url: &str) -> String {
        format!("{}?p={}_01", base_url, self.0)
    }

    /// Default file name for a persisted collection, e.g. `BR8Z3NX7XM.csv`.
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{}", self.0, extension)
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

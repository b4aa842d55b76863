use thiserror::Error;

use crate::fetch::FetchError;
use crate::parser::ExtractError;
use crate::store::StoreError;

/// Fatal conditions that end an invocation.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid program ID '{0}'. Provide an ID like BR8Z3NX7XM")]
    InvalidProgramId(String),

    #[error("Error downloading {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("No program entries found in the page.")]
    EmptyExtraction,

    #[error("Error writing {target}: {source}")]
    Write {
        target: String,
        #[source]
        source: StoreError,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Extractor(#[from] ExtractError),
}

impl AppError {
    /// Process exit status for this error: 2 for bad input, 1 for everything else.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::InvalidProgramId(_) => 2,
            _ => 1,
        }
    }
}

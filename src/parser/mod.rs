pub mod metadata;

use scraper::{Html, Selector};
use thiserror::Error;
use tracing::debug;

use crate::record::Record;
use crate::settings::AppConfig;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Invalid player marker {0:?}: {1}")]
    InvalidMarker(String, String),
}

/// Turns one markup document into candidate records. No I/O.
pub trait Extract {
    fn extract(&self, markup: &str) -> Vec<Record>;
}

/// Finds audio player elements by class marker and reads their data attributes.
pub struct PlayerExtractor {
    selector: Selector,
    stream_attr: String,
    metadata_attr: String,
}

impl PlayerExtractor {
    pub fn new(marker: &str, stream_attr: &str, metadata_attr: &str) -> Result<Self, ExtractError> {
        if marker.trim().is_empty() || marker.contains(['"', '\\']) {
            return Err(ExtractError::InvalidMarker(
                marker.to_string(),
                "must be non-empty and free of quotes or backslashes".to_string(),
            ));
        }
        // Substring match on the whole class attribute; a marker inside a longer token also matches.
        let selector = Selector::parse(&format!("[class*=\"{}\"]", marker))
            .map_err(|e| ExtractError::InvalidMarker(marker.to_string(), e.to_string()))?;

        Ok(Self {
            selector,
            stream_attr: stream_attr.to_string(),
            metadata_attr: metadata_attr.to_string(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ExtractError> {
        Self::new(&config.marker, &config.stream_attr, &config.metadata_attr)
    }
}

impl Extract for PlayerExtractor {
    fn extract(&self, markup: &str) -> Vec<Record> {
        let document = Html::parse_document(markup);
        let mut records = Vec::new();

        for element in document.select(&self.selector) {
            let attrs = element.value();
            let hls_url = attrs.attr(&self.stream_attr).map(str::trim).unwrap_or_default();
            if hls_url.is_empty() {
                debug!("Skipping player element without {}", self.stream_attr);
                continue;
            }

            let meta = metadata::parse(attrs.attr(&self.metadata_attr).unwrap_or_default());
            records.push(Record {
                title: meta.title,
                broadcast_date: meta.broadcast_date,
                broadcast_start: meta.broadcast_start,
                hls_url: hls_url.to_string(),
                get: 0,
                ..Default::default()
            });
        }

        records
    }
}

// ── Tests ──

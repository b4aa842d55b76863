use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const CONFIG_FILE: &str = "radio_ondemand";
const ENV_PREFIX: &str = "RADIO_ONDEMAND";

/// Runtime settings: defaults, then `radio_ondemand.toml`, then `RADIO_ONDEMAND_*` env vars.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub marker: String,
    pub stream_attr: String,
    pub metadata_attr: String,
    pub chrome_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder()?
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("base_url", "https://www.nhk.or.jp/radio/ondemand/detail.html")?
            .set_default("user_agent", DEFAULT_USER_AGENT)?
            .set_default("timeout_secs", 30)?
            .set_default("marker", "nol_audio_player")?
            .set_default("stream_attr", "data-hlsurl")?
            .set_default("metadata_attr", "data-content")
    }
}

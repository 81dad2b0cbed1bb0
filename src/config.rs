//! Configuration management for `OrderDesk`.
//!
//! Settings come from two places, environment first:
//! - env vars (via `.env` or the real environment): `ADMIN_ID` (required),
//!   `DATA_DIR`, and `TELOXIDE_TOKEN` (read directly by the bot in `main`,
//!   never stored here);
//! - an optional `orderdesk.toml` next to the binary for the settings that
//!   rarely change.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::{env, fs, path::PathBuf};
use tracing::info;
use url::Url;

/// Default pacing delay between broadcast sends, in milliseconds.
const DEFAULT_BROADCAST_DELAY_MS: u64 = 50;

/// File read for the optional settings.
const CONFIG_FILE: &str = "orderdesk.toml";

/// Resolved application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// The single privileged identity; all admin-only operations check the
    /// inbound sender against it
    pub admin_id: i64,
    /// Directory holding users.json, products.json, and orders.json
    pub data_dir: PathBuf,
    /// Pause between consecutive broadcast sends
    pub broadcast_delay_ms: u64,
    /// Photo URL for the welcome message; text-only welcome when unset
    pub welcome_photo_url: Option<Url>,
}

/// The subset of settings that may live in `orderdesk.toml`.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    data_dir: Option<PathBuf>,
    broadcast_delay_ms: Option<u64>,
    welcome_photo_url: Option<String>,
}

/// Loads the application configuration from `orderdesk.toml` (if present)
/// with environment overrides.
pub fn load_configuration() -> Result<Config> {
    let file = load_file_config()?;

    let admin_id: i64 = env::var("ADMIN_ID")?
        .parse()
        .map_err(|_| Error::Config {
            message: "ADMIN_ID must be a numeric Telegram user id".to_string(),
        })?;

    let data_dir = env::var("DATA_DIR").map_or_else(
        |_| file.data_dir.unwrap_or_else(|| PathBuf::from("data")),
        PathBuf::from,
    );

    let welcome_photo_url = file
        .welcome_photo_url
        .as_deref()
        .map(Url::parse)
        .transpose()
        .map_err(|e| Error::Config {
            message: format!("welcome_photo_url is not a valid URL: {e}"),
        })?;

    let config = Config {
        admin_id,
        data_dir,
        broadcast_delay_ms: file
            .broadcast_delay_ms
            .unwrap_or(DEFAULT_BROADCAST_DELAY_MS),
        welcome_photo_url,
    };
    info!(data_dir = %config.data_dir.display(), "configuration loaded");
    Ok(config)
}

fn load_file_config() -> Result<FileConfig> {
    let path = PathBuf::from(CONFIG_FILE);
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let raw = fs::read_to_string(&path)?;
    toml::from_str(&raw).map_err(|e| Error::Config {
        message: format!("failed to parse {CONFIG_FILE}: {e}"),
    })
}

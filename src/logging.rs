//! File-based tracing setup.
//!
//! The terminal belongs to the UI, so log lines go to
//! `<cache dir>/relay-chat/relay-chat.log` instead of stderr.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use crate::config::APP_DIR;

/// Environment variable holding the log filter, e.g. `relay_chat=debug`.
pub const LOG_ENV: &str = "RELAY_CHAT_LOG";

/// Filter used when `RELAY_CHAT_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Returns the log file path.
pub fn log_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|p| p.join(APP_DIR).join("relay-chat.log"))
}

/// Install the global subscriber writing to [`log_path`].
pub fn init() -> anyhow::Result<PathBuf> {
    let path = log_path().context("could not determine cache directory")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let file = std::fs::File::create(&path)
        .with_context(|| format!("creating {}", path.display()))?;

    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing tracing subscriber: {e}"))?;

    Ok(path)
}

//! Log setup.
//!
//! The terminal is owned by the UI while the browser runs, so log records go
//! to a file instead of stderr.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{AppError, Result};

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_ENV_VAR: &str = "DIRB_LOG";

/// Default log file location: `<cache_dir>/dirb/dirb.log`.
pub fn default_log_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("dirb").join("dirb.log"))
}

/// Build the filter: `$DIRB_LOG` wins over the configured directive.
fn build_filter(configured: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(configured))
}

/// Install the global subscriber writing to `path`.
pub fn init(path: &Path, level: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    fmt()
        .with_env_filter(build_filter(level))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .try_init()
        .map_err(|e| AppError::Config(format!("failed to install logger: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_log_path_ends_with_file_name() {
        if let Some(path) = default_log_path() {
            assert!(path.ends_with("dirb/dirb.log"));
        }
    }

    #[test]
    fn configured_filter_is_used_without_env() {
        if std::env::var(LOG_ENV_VAR).is_err() {
            let filter = build_filter("warn");
            assert_eq!(filter.to_string(), "warn");
        }
    }
}

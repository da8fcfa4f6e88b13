use anyhow::{anyhow, Context, Result};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    /// Append to a file under the user cache directory. Used while the TUI
    /// owns the terminal.
    File,
}

pub fn log_file_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|d| d.join("tabular-wizard").join("tabular-wizard.log"))
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. Returns the log file path when logging to a file.
pub fn init(target: LogTarget) -> Result<Option<PathBuf>> {
    match target {
        LogTarget::Stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| anyhow!("failed to initialise logging: {e}"))?;
            Ok(None)
        }
        LogTarget::File => {
            // No cache directory on this platform: run without logs.
            let Some(path) = log_file_path() else {
                return Ok(None);
            };
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|e| anyhow!("failed to initialise logging: {e}"))?;
            Ok(Some(path))
        }
    }
}

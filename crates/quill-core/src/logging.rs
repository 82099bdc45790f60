//! Log file setup.
//!
//! stdout belongs to command output, so logs go to a daily rolling file under
//! the logs directory. The filter comes from `QUILL_LOG` (EnvFilter syntax).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "QUILL_LOG";
const DEFAULT_FILTER: &str = "warn,quill=info,quill_core=info";
const LOG_FILE_PREFIX: &str = "quill.log";

/// Installs the global subscriber writing to `dir`.
///
/// Keep the returned guard alive for the life of the process; dropping it
/// flushes pending records.
///
/// # Errors
/// Returns an error if the directory cannot be created or a global
/// subscriber is already installed.
pub fn init(dir: &Path) -> Result<WorkerGuard> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter_from_env())
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {e}"))?;

    Ok(guard)
}

fn filter_from_env() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_init_creates_log_directory() {
        let dir = tempdir().unwrap();
        let logs = dir.path().join("logs");

        // Another test may already own the global subscriber; the directory
        // is created either way.
        let _guard = init(&logs);
        assert!(logs.is_dir());
    }
}

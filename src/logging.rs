//! Diagnostic logging.
//!
//! The console view owns the terminal, so while it runs logs go to
//! `train-runner.log` in the system temp directory. In plain mode they go to
//! stderr. The level is read from `RUST_LOG`.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Log file name inside the temp directory
pub const LOG_FILE_NAME: &str = "train-runner.log";

/// Where diagnostics are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    /// Append to the log file (used while the console view is active)
    File,
    /// Write to stderr
    Stderr,
}

impl LogTarget {
    /// Level used when `RUST_LOG` is unset
    ///
    /// Stderr shares the terminal with plain-mode job output, so it only
    /// carries warnings by default.
    pub fn default_level(self) -> &'static str {
        match self {
            LogTarget::File => "info",
            LogTarget::Stderr => "warn",
        }
    }
}

/// Path of the log file used by [`LogTarget::File`]
pub fn log_file_path() -> PathBuf {
    std::env::temp_dir().join(LOG_FILE_NAME)
}

/// Install the global subscriber
///
/// The returned guard flushes buffered file output when dropped and must be
/// kept alive for the whole run.
pub fn init_logging(target: LogTarget) -> Option<WorkerGuard> {
    match target {
        LogTarget::File => {
            let appender = tracing_appender::rolling::never(std::env::temp_dir(), LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let result = tracing_subscriber::fmt()
                .with_env_filter(env_filter(target.default_level()))
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .try_init();
            if let Err(e) = result {
                eprintln!("Warning: Failed to initialize logging: {}", e);
                return None;
            }
            Some(guard)
        }
        LogTarget::Stderr => {
            let result = tracing_subscriber::fmt()
                .with_env_filter(env_filter(target.default_level()))
                .with_writer(std::io::stderr)
                .try_init();
            if let Err(e) = result {
                eprintln!("Warning: Failed to initialize logging: {}", e);
            }
            None
        }
    }
}

/// `RUST_LOG` if set and valid, otherwise `default`
fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_path_is_in_temp_dir() {
        let path = log_file_path();
        assert_eq!(path.parent(), Some(std::env::temp_dir().as_path()));
        assert!(path.ends_with(LOG_FILE_NAME));
    }

    #[test]
    fn log_target_default_level_keeps_stderr_quiet() {
        assert_eq!(LogTarget::File.default_level(), "info");
        assert_eq!(LogTarget::Stderr.default_level(), "warn");
    }
}

//! Utility functions for directory management and logging setup
//!
//! Follows the XDG Base Directory specification for the configuration file.
//!
//! # Directory Structure
//!
//! - Config: `~/.config/fwports/` - `config.json`
//!
//! # Example
//!
//! ```
//! use fwports::utils::{ensure_dirs, get_config_dir};
//!
//! ensure_dirs().expect("Failed to create directories");
//!
//! if let Some(config_path) = get_config_dir() {
//!     // Load configuration from config_path
//! }
//! ```

use directories::ProjectDirs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (falls back to `RUST_LOG`).
pub const LOG_ENV: &str = "FWPORTS_LOG";

pub fn get_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "fwports", "fwports").map(|pd| pd.config_dir().to_path_buf())
}

pub fn ensure_dirs() -> std::io::Result<()> {
    let Some(dir) = get_config_dir() else {
        return Ok(());
    };

    #[cfg(unix)]
    {
        use std::fs::DirBuilder;
        use std::os::unix::fs::DirBuilderExt;

        let mut builder = DirBuilder::new();
        builder.mode(0o700); // User read/write/execute only
        builder.recursive(true);
        builder.create(dir)?;
    }

    #[cfg(not(unix))]
    {
        std::fs::create_dir_all(dir)?;
    }

    Ok(())
}

/// Builds the log filter from `FWPORTS_LOG`, then `RUST_LOG`, then `default_level`.
pub fn log_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Installs the stderr `fmt` subscriber. Safe to call more than once.
pub fn init_logging(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter(default_level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_is_namespaced() {
        if let Some(dir) = get_config_dir() {
            assert!(dir.to_string_lossy().contains("fwports"));
        }
    }

    #[test]
    fn test_log_filter_accepts_bad_default() {
        // An unparsable default falls back instead of panicking
        let _ = log_filter("not a [valid filter");
    }

    #[test]
    fn test_init_logging_twice() {
        init_logging("debug");
        init_logging("warn");
    }
}

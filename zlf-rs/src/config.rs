//! Configuration file support.
//!
//! ```toml
//! [reader]
//! chunk_size = 65536
//! skip_header = true
//!
//! [follow]
//! poll_interval_ms = 500
//!
//! [logging]
//! level = "info"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use zlf_protocol::DEFAULT_CHUNK_SIZE;

/// File name looked up in the working directory when `--config` is absent.
pub(crate) const DEFAULT_CONFIG_FILE: &str = "zlf.toml";

const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration file format.
#[derive(Debug, serde::Deserialize, Default)]
pub(crate) struct ConfigFile {
    #[serde(default)]
    pub reader: ReaderSection,
    #[serde(default)]
    pub follow: FollowSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, serde::Deserialize, Default)]
pub(crate) struct ReaderSection {
    pub chunk_size: Option<usize>,
    pub skip_header: Option<bool>,
}

#[derive(Debug, serde::Deserialize, Default)]
pub(crate) struct FollowSection {
    pub poll_interval_ms: Option<u64>,
}

#[derive(Debug, serde::Deserialize, Default)]
pub(crate) struct LoggingSection {
    pub level: Option<String>,
}

pub(crate) fn load_config(path: &Path) -> Result<ConfigFile, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    let config: ConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// Explicit path > auto-detect > none.
pub(crate) fn resolve_config_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    explicit.or_else(|| {
        let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            Some(default_path)
        } else {
            None
        }
    })
}

/// Settings for reading one capture file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScanSettings {
    pub chunk_size: usize,
    pub skip_header: bool,
    pub follow: bool,
    pub poll_interval: Duration,
}

/// Values given on the command line. `None` defers to the file.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ScanOverrides {
    pub chunk_size: Option<usize>,
    pub no_skip_header: bool,
    pub follow: bool,
    pub poll_interval_ms: Option<u64>,
}

impl ConfigFile {
    /// Merge with command-line values; the command line takes precedence.
    pub fn scan_settings(&self, overrides: ScanOverrides) -> ScanSettings {
        let chunk_size = overrides
            .chunk_size
            .or(self.reader.chunk_size)
            .unwrap_or(DEFAULT_CHUNK_SIZE);
        let skip_header = if overrides.no_skip_header {
            false
        } else {
            self.reader.skip_header.unwrap_or(true)
        };
        let poll_interval_ms = overrides
            .poll_interval_ms
            .or(self.follow.poll_interval_ms)
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS);

        ScanSettings {
            chunk_size,
            skip_header,
            follow: overrides.follow,
            poll_interval: Duration::from_millis(poll_interval_ms),
        }
    }

    /// Default log filter: `--verbose` > file > `info`.
    pub fn log_level(&self, verbose: bool) -> &str {
        if verbose {
            "debug"
        } else {
            self.logging.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConfigFile::default();
        let settings = config.scan_settings(ScanOverrides::default());
        assert_eq!(settings.chunk_size, DEFAULT_CHUNK_SIZE);
        assert!(settings.skip_header);
        assert!(!settings.follow);
        assert_eq!(settings.poll_interval, Duration::from_millis(500));
        assert_eq!(config.log_level(false), "info");
        assert_eq!(config.log_level(true), "debug");
    }

    #[test]
    fn test_file_values() {
        let config: ConfigFile = toml::from_str(
            r#"
            [reader]
            chunk_size = 4096
            skip_header = false

            [follow]
            poll_interval_ms = 250

            [logging]
            level = "trace"
            "#,
        )
        .unwrap();
        let settings = config.scan_settings(ScanOverrides::default());
        assert_eq!(settings.chunk_size, 4096);
        assert!(!settings.skip_header);
        assert_eq!(settings.poll_interval, Duration::from_millis(250));
        assert_eq!(config.log_level(false), "trace");
    }

    #[test]
    fn test_command_line_wins() {
        let config: ConfigFile = toml::from_str(
            r#"
            [reader]
            chunk_size = 4096
            [follow]
            poll_interval_ms = 250
            "#,
        )
        .unwrap();
        let settings = config.scan_settings(ScanOverrides {
            chunk_size: Some(16),
            no_skip_header: true,
            follow: true,
            poll_interval_ms: Some(1000),
        });
        assert_eq!(settings.chunk_size, 16);
        assert!(!settings.skip_header);
        assert!(settings.follow);
        assert_eq!(settings.poll_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_partial_file() {
        let config: ConfigFile = toml::from_str("[logging]\nlevel = \"warn\"\n").unwrap();
        assert_eq!(config.reader.chunk_size, None);
        assert_eq!(config.scan_settings(ScanOverrides::default()).chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn test_load_config_missing_file() {
        assert!(load_config(Path::new("/nonexistent/zlf.toml")).is_err());
    }
}

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration loaded from tailforward.toml.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct HarnessConfig {
    pub monitor: MonitorConfig,
    pub fetch: FetchConfig,
    pub forward: ForwardConfig,
    pub retry: RetryConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub poll_interval_ms: u64,
    pub verbose: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_ms: u64,
    pub accept_invalid_certs: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ForwardConfig {
    pub chunk_limit: usize,
    pub overflow: OverflowPolicy,
    pub sink: SinkKind,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

/// How the forwarder emits a line that is longer than the chunk limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverflowPolicy {
    /// Emit the whole line, terminator included, as one oversized chunk.
    #[default]
    WholeLine,
    /// Emit exactly `chunk_limit` characters and skip the character after them.
    Legacy,
}

/// Where forwarded chunks are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SinkKind {
    #[default]
    Stdout,
    Trace,
}

/// Errors produced while loading or validating configuration.
#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    Invalid {
        field: &'static str,
        reason: String,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "failed to read config {}: {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "failed to parse config {}: {}", path.display(), source)
            }
            ConfigError::Invalid { field, reason } => {
                write!(f, "invalid config value for {field}: {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::Invalid { .. } => None,
        }
    }
}

// --- Default implementations ---

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5000,
            verbose: false,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            accept_invalid_certs: true,
        }
    }
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            chunk_limit: 4090,
            overflow: OverflowPolicy::default(),
            sink: SinkKind::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay_ms: 1000,
            max_delay_ms: 60_000,
        }
    }
}

impl HarnessConfig {
    /// Load config from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };
        toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Reject values the monitor cannot run with. Called once at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.monitor.poll_interval_ms == 0 {
            return Err(invalid("monitor.poll_interval_ms", "must be greater than 0"));
        }
        if self.fetch.timeout_ms == 0 {
            return Err(invalid("fetch.timeout_ms", "must be greater than 0"));
        }
        if self.forward.chunk_limit == 0 {
            return Err(invalid("forward.chunk_limit", "must be greater than 0"));
        }
        if self.retry.max_delay_ms < self.retry.initial_delay_ms {
            return Err(invalid(
                "retry.max_delay_ms",
                "must not be smaller than retry.initial_delay_ms",
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.monitor.poll_interval_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch.timeout_ms)
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = HarnessConfig::default();
        assert_eq!(config.monitor.poll_interval_ms, 5000);
        assert!(!config.monitor.verbose);
        assert_eq!(config.fetch.timeout_ms, 5000);
        assert!(config.fetch.accept_invalid_certs);
        assert_eq!(config.forward.chunk_limit, 4090);
        assert_eq!(config.forward.overflow, OverflowPolicy::WholeLine);
        assert_eq!(config.forward.sink, SinkKind::Stdout);
        assert_eq!(config.retry.max_retries, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = HarnessConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.forward.chunk_limit, 4090);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tailforward.toml");
        std::fs::write(
            &path,
            "[monitor]\npoll_interval_ms = 250\n\n[forward]\noverflow = \"legacy\"\nsink = \"trace\"\n",
        )
        .unwrap();

        let config = HarnessConfig::load(&path).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.forward.overflow, OverflowPolicy::Legacy);
        assert_eq!(config.forward.sink, SinkKind::Trace);
        assert_eq!(config.forward.chunk_limit, 4090);
        assert_eq!(config.fetch_timeout(), Duration::from_millis(5000));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tailforward.toml");
        std::fs::write(&path, "[monitor\npoll_interval_ms = ").unwrap();

        let err = HarnessConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("failed to parse config"));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = HarnessConfig::default();
        config.monitor.poll_interval_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("monitor.poll_interval_ms"));
    }

    #[test]
    fn test_zero_chunk_limit_rejected() {
        let mut config = HarnessConfig::default();
        config.forward.chunk_limit = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "forward.chunk_limit",
                ..
            })
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = HarnessConfig::default();
        config.fetch.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_backoff_bounds_rejected() {
        let mut config = HarnessConfig::default();
        config.retry.initial_delay_ms = 10_000;
        config.retry.max_delay_ms = 500;
        assert!(config.validate().is_err());
    }
}

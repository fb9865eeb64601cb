use crate::config::TelemetryConfig;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

/// Optional YAML file tuning the subscriber, passed with `--logconfig`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LogFileConfig {
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub ansi: bool,
    #[serde(default)]
    pub target: bool,
}

impl LogFileConfig {
    /// Reads the file when it exists; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, TelemetryError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|source| TelemetryError::LogConfig {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;
        serde_yaml::from_str(&raw).map_err(|source| TelemetryError::LogConfig {
            path: path.to_path_buf(),
            source: Box::new(source),
        })
    }
}

#[derive(Debug)]
pub enum TelemetryError {
    EnvFilter { value: String, source: ParseError },
    LogConfig {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::EnvFilter { value, .. } => {
                write!(
                    f,
                    "invalid log level/filter '{}': unable to build EnvFilter",
                    value
                )
            }
            TelemetryError::LogConfig { path, source } => {
                write!(f, "unable to read log config {}: {source}", path.display())
            }
            TelemetryError::Subscriber(err) => write!(f, "telemetry error: {err}"),
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::EnvFilter { source, .. } => Some(source),
            TelemetryError::LogConfig { source, .. } => Some(&**source),
            TelemetryError::Subscriber(err) => Some(&**err),
        }
    }
}

/// Picks the filter directive: the log file level, then `APP_LOG_LEVEL`.
/// `RUST_LOG` still overrides both inside [`init`].
pub fn resolve_level(config: &TelemetryConfig, file: &LogFileConfig) -> String {
    file.level
        .clone()
        .filter(|level| !level.trim().is_empty())
        .unwrap_or_else(|| config.log_level.clone())
}

pub fn init(config: &TelemetryConfig, log_config: Option<&Path>) -> Result<(), TelemetryError> {
    let file = match log_config {
        Some(path) => LogFileConfig::load(path)?,
        None => LogFileConfig::default(),
    };
    let level = resolve_level(config, &file);

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&level).map_err(|source| TelemetryError::EnvFilter {
            value: level.clone(),
            source,
        })?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(file.target)
        .compact()
        .with_ansi(file.ansi)
        .try_init()
        .map_err(TelemetryError::Subscriber)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_log_file_falls_back_to_env_level() {
        let file = LogFileConfig::load(Path::new("./no-such-log-config.yaml"))
            .expect("missing file is not an error");
        let config = TelemetryConfig {
            log_level: "warn".to_string(),
        };
        assert_eq!(resolve_level(&config, &file), "warn");
    }

    #[test]
    fn yaml_level_overrides_env_level() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "level: \"positive_surprise=debug\"\nansi: true").expect("write yaml");

        let parsed = LogFileConfig::load(file.path()).expect("yaml parses");
        assert!(parsed.ansi);
        assert!(!parsed.target);

        let config = TelemetryConfig {
            log_level: "info".to_string(),
        };
        assert_eq!(resolve_level(&config, &parsed), "positive_surprise=debug");
    }

    #[test]
    fn malformed_yaml_reports_path() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "level: [unterminated").expect("write yaml");

        let error = LogFileConfig::load(file.path()).expect_err("invalid yaml");
        assert!(matches!(error, TelemetryError::LogConfig { .. }));
    }
}

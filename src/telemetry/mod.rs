//! Tracing subscriber setup
//!
//! ```rust,ignore
//! use freeset_gateway::telemetry::{init_subscriber, OutputFormat, SubscriberConfig};
//!
//! let config = SubscriberConfig::builder()
//!     .log_level(tracing::Level::DEBUG)
//!     .output_format(OutputFormat::Json)
//!     .build();
//! let _guard = init_subscriber(config)?;
//! ```

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

use crate::error::GatewayError;

pub const LOG_LEVEL_VAR: &str = "GATEWAY_LOG_LEVEL";
pub const LOG_FORMAT_VAR: &str = "GATEWAY_LOG_FORMAT";
pub const LOG_FILE_VAR: &str = "GATEWAY_LOG_FILE";

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    JsonCompact,
}

impl std::str::FromStr for OutputFormat {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "json-compact" => Ok(Self::JsonCompact),
            other => Err(GatewayError::ConfigurationError(format!(
                "Invalid log format: {other}. Valid options: text, json, json-compact"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    pub log_level: tracing::Level,
    pub output_format: OutputFormat,
    /// Also write to stdout when `log_file` is set.
    pub enable_console: bool,
    pub log_file: Option<PathBuf>,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            log_level: tracing::Level::INFO,
            output_format: OutputFormat::Text,
            enable_console: true,
            log_file: None,
        }
    }
}

impl SubscriberConfig {
    pub fn builder() -> SubscriberConfigBuilder {
        SubscriberConfigBuilder::default()
    }

    /// JSON lines to a file only, warnings and above.
    pub fn production(log_file: PathBuf) -> Self {
        Self {
            log_level: tracing::Level::WARN,
            output_format: OutputFormat::Json,
            enable_console: false,
            log_file: Some(log_file),
        }
    }

    fn filter(&self) -> Result<EnvFilter, GatewayError> {
        let level = match self.log_level {
            tracing::Level::TRACE => "trace",
            tracing::Level::DEBUG => "debug",
            tracing::Level::INFO => "info",
            tracing::Level::WARN => "warn",
            tracing::Level::ERROR => "error",
        };
        EnvFilter::try_new(format!("freeset_gateway={level},tower_http={level}"))
            .map_err(|e| GatewayError::ConfigurationError(format!("Invalid log filter: {e}")))
    }

    fn writer(&self) -> Result<(BoxMakeWriter, Option<WorkerGuard>), GatewayError> {
        let Some(path) = self.log_file.as_deref() else {
            return Ok((BoxMakeWriter::new(std::io::stdout), None));
        };
        let (file_writer, guard) = tracing_appender::non_blocking(file_appender(path)?);
        let writer = if self.enable_console {
            BoxMakeWriter::new(file_writer.and(std::io::stdout))
        } else {
            BoxMakeWriter::new(file_writer)
        };
        Ok((writer, Some(guard)))
    }
}

#[derive(Debug, Default)]
pub struct SubscriberConfigBuilder {
    log_level: Option<tracing::Level>,
    output_format: Option<OutputFormat>,
    enable_console: Option<bool>,
    log_file: Option<PathBuf>,
}

impl SubscriberConfigBuilder {
    pub fn log_level(mut self, level: tracing::Level) -> Self {
        self.log_level = Some(level);
        self
    }

    pub fn log_level_str(mut self, level: &str) -> Result<Self, GatewayError> {
        let level = level.trim().parse::<tracing::Level>().map_err(|_| {
            GatewayError::ConfigurationError(format!(
                "Invalid log level: {level}. Valid options: trace, debug, info, warn, error"
            ))
        })?;
        self.log_level = Some(level);
        Ok(self)
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn enable_console(mut self, enable: bool) -> Self {
        self.enable_console = Some(enable);
        self
    }

    pub fn log_file(mut self, path: PathBuf) -> Self {
        self.log_file = Some(path);
        self
    }

    pub fn build(self) -> SubscriberConfig {
        SubscriberConfig {
            log_level: self.log_level.unwrap_or(tracing::Level::INFO),
            output_format: self.output_format.unwrap_or_default(),
            enable_console: self.enable_console.unwrap_or(true),
            log_file: self.log_file,
        }
    }
}

fn file_appender(path: &Path) -> Result<tracing_appender::rolling::RollingFileAppender, GatewayError> {
    let file_name = path.file_name().ok_or_else(|| {
        GatewayError::ConfigurationError(format!("Log file path has no file name: {}", path.display()))
    })?;
    let directory = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    Ok(tracing_appender::rolling::never(directory, file_name))
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the life of the process when `log_file` is set. Calling this after a
/// subscriber is already installed is not an error.
pub fn init_subscriber(config: SubscriberConfig) -> Result<Option<WorkerGuard>, GatewayError> {
    let filter = config.filter()?;
    let (writer, guard) = config.writer()?;

    let init_result = match config.output_format {
        OutputFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(true)
            .json()
            .try_init(),
        OutputFormat::JsonCompact => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_target(true)
            .json()
            .flatten_event(true)
            .try_init(),
        OutputFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_target(true)
            .try_init(),
    };

    match init_result {
        Ok(()) => Ok(guard),
        Err(e) if e.to_string().contains("already been set") => Ok(guard),
        Err(e) => Err(GatewayError::ConfigurationError(format!(
            "Failed to initialize tracing: {e}"
        ))),
    }
}

/// Build a [`SubscriberConfig`] from `GATEWAY_LOG_LEVEL`, `GATEWAY_LOG_FORMAT`
/// and `GATEWAY_LOG_FILE`.
pub fn config_from_lookup<F>(lookup: F) -> Result<SubscriberConfig, GatewayError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut builder = SubscriberConfig::builder();
    if let Some(level) = lookup(LOG_LEVEL_VAR) {
        builder = builder.log_level_str(&level)?;
    }
    if let Some(format) = lookup(LOG_FORMAT_VAR) {
        builder = builder.output_format(format.parse()?);
    }
    if let Some(path) = lookup(LOG_FILE_VAR).filter(|p| !p.trim().is_empty()) {
        builder = builder.log_file(PathBuf::from(path));
    }
    Ok(builder.build())
}

pub fn init_from_env() -> Result<Option<WorkerGuard>, GatewayError> {
    init_subscriber(config_from_lookup(|key| std::env::var(key).ok())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn env_config_parses_all_vars() {
        let config = config_from_lookup(lookup(&[
            (LOG_LEVEL_VAR, "debug"),
            (LOG_FORMAT_VAR, "json-compact"),
            (LOG_FILE_VAR, "/tmp/gateway.log"),
        ]))
        .unwrap();
        assert_eq!(config.log_level, tracing::Level::DEBUG);
        assert_eq!(config.output_format, OutputFormat::JsonCompact);
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/gateway.log")));
    }

    #[test]
    fn empty_env_uses_defaults() {
        let config = config_from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.log_level, tracing::Level::INFO);
        assert_eq!(config.output_format, OutputFormat::Text);
        assert!(config.log_file.is_none());
    }

    #[test]
    fn rejects_unknown_level_and_format() {
        assert!(config_from_lookup(lookup(&[(LOG_LEVEL_VAR, "loud")])).is_err());
        assert!(config_from_lookup(lookup(&[(LOG_FORMAT_VAR, "xml")])).is_err());
    }

    #[test]
    fn log_file_needs_a_file_name() {
        assert!(file_appender(Path::new("/")).is_err());
    }
}

use super::config::{LogFormat, LogLevel};
use parking_lot::RwLock;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid log directive '{0}', expected target=level")]
    InvalidDirective(String),
    #[error("Unknown log level '{level}' in directive for '{target}'")]
    InvalidLevel { target: String, level: String },
    #[error("Failed to build log filter '{filter}': {details}")]
    Filter { filter: String, details: String },
    #[error("Failed to install global subscriber: {0}")]
    Install(String),
}

/// Per-target level override, e.g. `hyper=warn`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogDirective {
    pub target: String,
    pub level: LogLevel,
}

impl LogDirective {
    pub fn new(target: impl Into<String>, level: LogLevel) -> Self {
        Self {
            target: target.into(),
            level,
        }
    }

    pub fn parse(directive: &str) -> Result<Self, LoggingError> {
        let (target, level) = directive
            .split_once('=')
            .filter(|(target, _)| !target.trim().is_empty())
            .ok_or_else(|| LoggingError::InvalidDirective(directive.to_string()))?;

        let level = level
            .parse::<LogLevel>()
            .map_err(|level| LoggingError::InvalidLevel {
                target: target.to_string(),
                level,
            })?;
        Ok(Self::new(target.trim(), level))
    }

    pub fn to_filter_string(&self) -> String {
        format!("{}={}", self.target, self.level.as_str())
    }
}

/// Builds the global `tracing` subscriber: an `EnvFilter` from the base
/// level plus directives, and a compact or JSON `fmt` layer.
pub struct LoggingSystem {
    directives: RwLock<Vec<LogDirective>>,
    format: LogFormat,
}

impl LoggingSystem {
    pub fn new(format: LogFormat) -> Self {
        Self {
            directives: RwLock::new(Vec::new()),
            format,
        }
    }

    pub fn add_directive(&self, directive: &str) -> Result<(), LoggingError> {
        let directive = LogDirective::parse(directive)?;
        self.directives.write().push(directive);
        Ok(())
    }

    /// Quiet the HTTP stack behind the metrics endpoint.
    pub fn add_default_directives(&self) {
        let mut directives = self.directives.write();
        for target in ["hyper", "warp"] {
            directives.push(LogDirective::new(target, LogLevel::Warn));
        }
    }

    pub fn directive_count(&self) -> usize {
        self.directives.read().len()
    }

    pub fn build_filter_string(&self, default_level: LogLevel) -> String {
        let directives = self.directives.read();
        let mut parts = Vec::with_capacity(directives.len() + 1);
        parts.push(default_level.as_str().to_string());
        parts.extend(directives.iter().map(LogDirective::to_filter_string));
        parts.join(",")
    }

    /// `RUST_LOG`, when set, wins over the configured level.
    pub fn initialize(&self, default_level: LogLevel) -> Result<(), LoggingError> {
        let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
            Ok(from_env) if !from_env.trim().is_empty() => from_env,
            _ => self.build_filter_string(default_level),
        };
        let env_filter = EnvFilter::try_new(&filter).map_err(|e| LoggingError::Filter {
            filter: filter.clone(),
            details: e.to_string(),
        })?;

        let registry = tracing_subscriber::registry().with(env_filter);
        let result = match self.format {
            LogFormat::Text => registry
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_names(true)
                        .with_level(true)
                        .compact(),
                )
                .try_init(),
            LogFormat::Json => registry
                .with(
                    fmt::layer()
                        .json()
                        .with_current_span(false)
                        .with_thread_names(true),
                )
                .try_init(),
        };
        result.map_err(|e| LoggingError::Install(e.to_string()))
    }
}

/// Install logging once for the process.
pub fn setup_logging(level: LogLevel, format: LogFormat) -> Result<(), LoggingError> {
    let logging_system = LoggingSystem::new(format);
    logging_system.add_default_directives();
    logging_system.initialize(level)
}

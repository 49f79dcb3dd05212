//! Structured logging setup for pipeline runs.

use tracing::Level;

/// Logging configuration for an embedding application.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Base log level for everything.
    pub level: Level,
    /// Log level for starmart components specifically.
    pub pipeline_level: Level,
    /// Whether to emit JSON lines instead of human-readable output.
    pub json_format: bool,
    /// Environment filter override.
    pub env_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            pipeline_level: Level::DEBUG,
            json_format: false,
            env_filter: None,
        }
    }
}

impl LoggingConfig {
    /// Quiet JSON output for scheduled runs.
    pub fn production() -> Self {
        Self {
            level: Level::WARN,
            pipeline_level: Level::INFO,
            json_format: true,
            env_filter: None,
        }
    }

    /// Verbose plain output for local work.
    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            pipeline_level: Level::DEBUG,
            json_format: false,
            env_filter: None,
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_json_format(mut self, enabled: bool) -> Self {
        self.json_format = enabled;
        self
    }

    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Builds the environment filter string.
    pub fn env_filter(&self) -> String {
        if let Some(ref filter) = self.env_filter {
            filter.clone()
        } else {
            format!(
                "{},starmart={}",
                self.level.as_str().to_lowercase(),
                self.pipeline_level.as_str().to_lowercase()
            )
        }
    }
}

/// Initializes the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured levels when set. Calling this twice
/// returns an error from the subscriber registry.
pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

    let fmt_layer = if config.json_format {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_string() {
        let config = LoggingConfig::default();
        assert_eq!(config.env_filter(), "info,starmart=debug");
    }

    #[test]
    fn test_override_wins() {
        let config = LoggingConfig::default().with_env_filter("warn,datafusion=error");
        assert_eq!(config.env_filter(), "warn,datafusion=error");
    }

    #[test]
    fn test_production_is_json() {
        let config = LoggingConfig::production();
        assert!(config.json_format);
        assert_eq!(config.env_filter(), "warn,starmart=info");
    }
}

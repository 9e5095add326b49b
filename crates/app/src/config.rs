//! Application configuration loaded from environment variables.

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Some(LogFormat::Pretty),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

/// Runtime configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `pretty` or `json` (default: `pretty`)
/// - `BROADCAST_BUFFER`: per-subscriber message buffer (default: `64`)
/// - `BROADCAST_LOG_CAPACITY`: publications kept for inspection, `0` disables (default: `1024`)
/// - `REGISTRY_MAILBOX`: queued requests per handler registry (default: `32`)
/// - `PRINT_METRICS`: log a Prometheus snapshot on exit (default: `false`)
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub log_format: LogFormat,
    pub broadcast_buffer: usize,
    pub broadcast_log_capacity: usize,
    pub registry_mailbox: usize,
    pub print_metrics: bool,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`; unparsable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .and_then(|v| LogFormat::parse(&v))
                .unwrap_or(defaults.log_format),
            broadcast_buffer: lookup("BROADCAST_BUFFER")
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|&n| n > 0)
                .unwrap_or(defaults.broadcast_buffer),
            broadcast_log_capacity: lookup("BROADCAST_LOG_CAPACITY")
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(defaults.broadcast_log_capacity),
            registry_mailbox: lookup("REGISTRY_MAILBOX")
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|&n| n > 0)
                .unwrap_or(defaults.registry_mailbox),
            print_metrics: lookup("PRINT_METRICS")
                .and_then(|v| v.parse::<bool>().ok())
                .unwrap_or(defaults.print_metrics),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            broadcast_buffer: broadcast::memory::DEFAULT_BUFFER,
            broadcast_log_capacity: broadcast::memory::DEFAULT_LOG_CAPACITY,
            registry_mailbox: dispatch::registry::DEFAULT_MAILBOX,
            print_metrics: false,
        }
    }
}

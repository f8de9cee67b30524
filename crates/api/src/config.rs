use std::str::FromStr;
use std::time::Duration;

use aquamine_events::live::RegistryConfig;
use aquamine_events::QueueConfig;

/// Tracing output format, selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development. Alert policy and
/// notification channel credentials are read by their own `from_env`
/// constructors.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for background work, in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Redis URL for cross-instance live events. Unset means in-process.
    pub redis_url: Option<String>,
    /// Optional JSON file overriding the default threshold table.
    pub thresholds_file: Option<String>,
    /// Notification queue sizing.
    pub queue: QueueConfig,
    /// Per outbound notification call timeout in seconds (default: `30`).
    pub notify_send_timeout_secs: u64,
    /// Live client buffering and send timeout.
    pub live: RegistryConfig,
    pub log_format: LogFormat,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                 |
    /// |----------------------------|-------------------------|
    /// | `HOST`                     | `0.0.0.0`               |
    /// | `PORT`                     | `8000`                  |
    /// | `CORS_ORIGINS`             | `http://localhost:3000` |
    /// | `REQUEST_TIMEOUT_SECS`     | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`    | `30`                    |
    /// | `REDIS_URL`                | unset                   |
    /// | `THRESHOLDS_FILE`          | unset                   |
    /// | `NOTIFY_QUEUE_CAPACITY`    | `256`                   |
    /// | `NOTIFY_WORKERS`           | `4`                     |
    /// | `NOTIFY_SEND_TIMEOUT_SECS` | `30`                    |
    /// | `WS_CLIENT_BUFFER`         | `64`                    |
    /// | `WS_SEND_TIMEOUT_MS`       | `2000`                  |
    /// | `LOG_FORMAT`               | `pretty`                |
    ///
    /// Panics on malformed values; misconfiguration should fail at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = parse_env("PORT", 8000);

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let queue_defaults = QueueConfig::default();
        let queue = QueueConfig {
            capacity: parse_env("NOTIFY_QUEUE_CAPACITY", queue_defaults.capacity),
            workers: parse_env("NOTIFY_WORKERS", queue_defaults.workers),
        };

        let live_defaults = RegistryConfig::default();
        let live = RegistryConfig {
            client_buffer: parse_env("WS_CLIENT_BUFFER", live_defaults.client_buffer),
            send_timeout: Duration::from_millis(parse_env(
                "WS_SEND_TIMEOUT_MS",
                live_defaults.send_timeout.as_millis() as u64,
            )),
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS", 30),
            shutdown_timeout_secs: parse_env("SHUTDOWN_TIMEOUT_SECS", 30),
            redis_url: non_empty_env("REDIS_URL"),
            thresholds_file: non_empty_env("THRESHOLDS_FILE"),
            queue,
            notify_send_timeout_secs: parse_env("NOTIFY_SEND_TIMEOUT_SECS", 30),
            live,
            log_format: parse_env("LOG_FORMAT", LogFormat::default()),
        }
    }

    pub fn notify_send_timeout(&self) -> Duration {
        Duration::from_secs(self.notify_send_timeout_secs)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{key} has an invalid value '{raw}': {e}")),
        Err(_) => default,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}

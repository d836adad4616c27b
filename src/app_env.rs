use std::env;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Base URL of the REST API (e.g. https://api.example.com/api)
pub const API_BASE_URL: &str = "API_BASE_URL";
/// URL of the notification WebSocket. The user ID is appended as a query parameter.
pub const WS_URL: &str = "WS_URL";
/// Base URL of the notification history service, which lives outside the main REST API
pub const NOTIFICATION_API_URL: &str = "NOTIFICATION_API_URL";
/// Log level configuration for the application. For formatting info, see [EnvFilter's documentation](https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html)
pub const LOG_LEVEL: &str = "LOG_LEVEL";

/// OpenTelemetry span export URL. Spans are only exported when this is set, typically to
/// http://localhost:4317 when a collector sidecar is running
pub const OTEL_SPAN_EXPORT_URL: &str = "OTEL_SPAN_EXPORT_URL";
/// OpenTelemetry metrics export URL. Only read when [OTEL_SPAN_EXPORT_URL] is also set
pub const OTEL_METRIC_EXPORT_URL: &str = "OTEL_METRIC_EXPORT_URL";

/// Milliseconds to wait before reconnecting the notification WebSocket after an unexpected close
pub const WS_RECONNECT_DELAY_MS: &str = "WS_RECONNECT_DELAY_MS";
/// How many times the notification WebSocket reconnects on its own before giving up
pub const WS_MAX_RECONNECT_ATTEMPTS: &str = "WS_MAX_RECONNECT_ATTEMPTS";

/// Credentials used by the bundled binary to open a session
pub const LOGIN_EMAIL: &str = "LOGIN_EMAIL";
pub const LOGIN_PASSWORD: &str = "LOGIN_PASSWORD";

const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);
const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} must be set")]
    Missing(&'static str),
    #[error("environment variable {name} is not a valid URL: {cause}")]
    BadUrl {
        name: &'static str,
        #[source]
        cause: url::ParseError,
    },
    #[error("environment variable {name} is not a valid number: {value}")]
    BadNumber { name: &'static str, value: String },
}

/// Connection settings for the REST API and the notification channel
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: Url,
    pub ws_url: Url,
    pub notification_api_url: Url,
    pub reconnect_delay: Duration,
    pub max_reconnect_attempts: u32,
}

impl ClientConfig {
    /// Reads the client configuration from the process environment. Call [dotenv::dotenv] first
    /// if values should also come from a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let url_var = |name: &'static str| -> Result<Url, ConfigError> {
            let raw = lookup(name).ok_or(ConfigError::Missing(name))?;
            Url::parse(&raw).map_err(|cause| ConfigError::BadUrl { name, cause })
        };

        let reconnect_delay = match lookup(WS_RECONNECT_DELAY_MS) {
            None => DEFAULT_RECONNECT_DELAY,
            Some(value) => Duration::from_millis(value.parse().map_err(|_| {
                ConfigError::BadNumber {
                    name: WS_RECONNECT_DELAY_MS,
                    value: value.clone(),
                }
            })?),
        };
        let max_reconnect_attempts = match lookup(WS_MAX_RECONNECT_ATTEMPTS) {
            None => DEFAULT_MAX_RECONNECT_ATTEMPTS,
            Some(value) => value.parse().map_err(|_| ConfigError::BadNumber {
                name: WS_MAX_RECONNECT_ATTEMPTS,
                value: value.clone(),
            })?,
        };

        Ok(ClientConfig {
            api_base_url: url_var(API_BASE_URL)?,
            ws_url: url_var(WS_URL)?,
            notification_api_url: url_var(NOTIFICATION_API_URL)?,
            reconnect_delay,
            max_reconnect_attempts,
        })
    }
}

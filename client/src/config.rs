use std::str::FromStr;
use std::time::Duration;

use crate::ClientError;
use crate::connection::ReconnectPolicy;

pub const DEFAULT_ENDPOINTS: [&str; 3] = [
    "ws://localhost:8000/api/chat/ws",
    "ws://127.0.0.1:8000/api/chat/ws",
    "wss://localhost:8000/api/chat/ws",
];
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Client configuration.
///
/// `endpoints` is an ordered list of websocket bases; the user id is appended
/// to each. The Nth reconnect dials the Nth base.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoints: Vec<String>,
    pub api_url: String,
    pub reconnect: ReconnectPolicy,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoints: DEFAULT_ENDPOINTS.iter().map(|s| s.to_string()).collect(),
            api_url: DEFAULT_API_URL.to_string(),
            reconnect: ReconnectPolicy::default(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `GURU_*` environment variables.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`ClientConfig::from_env`], reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("GURU_WS_URLS") {
            let endpoints: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if endpoints.is_empty() {
                return Err(ClientError::InvalidConfig {
                    key: "GURU_WS_URLS".to_string(),
                    value: raw,
                });
            }
            config.endpoints = endpoints;
        }

        if let Some(url) = lookup("GURU_API_URL") {
            config.api_url = url.trim_end_matches('/').to_string();
        }

        if let Some(max) = parse_var::<u32>(&lookup, "GURU_MAX_RECONNECT_ATTEMPTS")? {
            config.reconnect.max_attempts = max;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "GURU_RECONNECT_STEP_MS")? {
            config.reconnect.delay_step = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "GURU_RECONNECT_MAX_DELAY_MS")? {
            config.reconnect.max_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "GURU_CONNECT_TIMEOUT_MS")? {
            config.connect_timeout = Duration::from_millis(ms);
        }

        Ok(config)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoints = vec![endpoint.into()];
        self
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ClientError> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };

    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| ClientError::InvalidConfig {
            key: key.to_string(),
            value: raw,
        })
}

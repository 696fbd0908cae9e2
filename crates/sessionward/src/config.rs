//! Client configuration.

use std::time::Duration;

use sessionward_monitor::MonitorConfig;
use sessionward_protocol::Endpoints;
use sessionward_session::LogoutNotice;

/// Environment variable holding the API base URL.
pub const BASE_URL_VAR: &str = "API_BASE_URL";

/// Environment variable holding the request timeout in milliseconds.
pub const TIMEOUT_VAR: &str = "API_TIMEOUT_MS";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Everything a [`SessionClient`](crate::SessionClient) needs besides its
/// transport and store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL every request path is appended to.
    pub base_url: String,
    /// Per-request timeout of the HTTP transport. Default: 10 s.
    pub request_timeout: Duration,
    pub endpoints: Endpoints,
    pub notice: LogoutNotice,
    pub monitor: MonitorConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            // Host loopback as seen from the Android emulator.
            base_url: "http://10.0.2.2:3000".into(),
            request_timeout: Duration::from_secs(10),
            endpoints: Endpoints::default(),
            notice: LogoutNotice::default(),
            monitor: MonitorConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `API_BASE_URL` and `API_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(BASE_URL_VAR) {
            let url = url.trim();
            if url.is_empty() {
                return Err(ConfigError::Invalid {
                    key: BASE_URL_VAR,
                    value: url.into(),
                });
            }
            config.base_url = url.to_string();
        }

        if let Some(raw) = lookup(TIMEOUT_VAR) {
            let millis = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or(ConfigError::Invalid {
                    key: TIMEOUT_VAR,
                    value: raw.clone(),
                })?;
            config.request_timeout = Duration::from_millis(millis);
        }

        tracing::debug!(
            base_url = %config.base_url,
            timeout_ms = config.request_timeout.as_millis() as u64,
            "client config loaded"
        );
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_monitor(mut self, monitor: MonitorConfig) -> Self {
        self.monitor = monitor;
        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let vars: HashMap<_, _> = vars.iter().copied().collect();
        move |key| vars.get(key).map(|v| v.to_string())
    }

    #[test]
    fn test_from_lookup_nothing_set_uses_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_from_lookup_reads_url_and_timeout() {
        let config = ClientConfig::from_lookup(lookup(&[
            (BASE_URL_VAR, "https://api.example.com"),
            (TIMEOUT_VAR, "2500"),
        ]))
        .unwrap();

        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.request_timeout, Duration::from_millis(2500));
    }

    #[test]
    fn test_from_lookup_bad_timeout_is_invalid() {
        let err = ClientConfig::from_lookup(lookup(&[(TIMEOUT_VAR, "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: TIMEOUT_VAR, .. }));

        let zero = ClientConfig::from_lookup(lookup(&[(TIMEOUT_VAR, "0")]));
        assert!(zero.is_err());
    }

    #[test]
    fn test_from_lookup_blank_url_is_invalid() {
        let err = ClientConfig::from_lookup(lookup(&[(BASE_URL_VAR, "  ")])).unwrap_err();
        assert_eq!(err.to_string(), r#"invalid value for API_BASE_URL: """#);
    }
}

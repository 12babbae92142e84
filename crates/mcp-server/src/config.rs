use gdbridge_protocol::{BRIDGE_PORT_ENV, DEFAULT_BRIDGE_PORT, PROJECT_ROOT_ENV};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const BRIDGE_URL_ENV: &str = "GODOT_BRIDGE_URL";
pub const BRIDGE_TIMEOUT_ENV: &str = "GODOT_BRIDGE_TIMEOUT_MS";
pub const BRIDGE_SLOW_TIMEOUT_ENV: &str = "GODOT_BRIDGE_SLOW_TIMEOUT_MS";

pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;
/// `/errors` reloads every script, and completion checks wait on it.
pub const DEFAULT_SLOW_TIMEOUT_MS: u64 = 8_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub project_root: PathBuf,
    pub bridge_url: String,
    pub timeout: Duration,
    pub slow_timeout: Duration,
}

impl ProxyConfig {
    pub fn new(project_root: impl Into<PathBuf>, bridge_url: impl Into<String>) -> Self {
        Self {
            project_root: project_root.into(),
            bridge_url: normalize_url(&bridge_url.into()),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            slow_timeout: Duration::from_millis(DEFAULT_SLOW_TIMEOUT_MS),
        }
    }

    #[must_use]
    pub fn with_timeouts(mut self, timeout: Duration, slow_timeout: Duration) -> Self {
        self.timeout = timeout;
        self.slow_timeout = slow_timeout;
        self
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let project_root = get(PROJECT_ROOT_ENV)
            .map(PathBuf::from)
            .or_else(|| env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));

        let bridge_url = get(BRIDGE_URL_ENV).unwrap_or_else(|| {
            let port = get(BRIDGE_PORT_ENV)
                .and_then(|raw| match raw.parse::<u16>() {
                    Ok(port) => Some(port),
                    Err(_) => {
                        log::warn!("Ignoring invalid {BRIDGE_PORT_ENV}={raw}");
                        None
                    }
                })
                .unwrap_or(DEFAULT_BRIDGE_PORT);
            format!("http://127.0.0.1:{port}")
        });

        let millis = |key: &str, default: u64| {
            get(key)
                .and_then(|raw| raw.parse::<u64>().ok())
                .filter(|ms| *ms > 0)
                .unwrap_or(default)
        };

        Self::new(project_root, bridge_url).with_timeouts(
            Duration::from_millis(millis(BRIDGE_TIMEOUT_ENV, DEFAULT_TIMEOUT_MS)),
            Duration::from_millis(millis(BRIDGE_SLOW_TIMEOUT_ENV, DEFAULT_SLOW_TIMEOUT_MS)),
        )
    }
}

fn normalize_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_point_at_local_bridge() {
        let config = ProxyConfig::from_lookup(lookup(&[(PROJECT_ROOT_ENV, "/games/dodge")]));
        assert_eq!(config.project_root, PathBuf::from("/games/dodge"));
        assert_eq!(config.bridge_url, "http://127.0.0.1:6100");
        assert_eq!(config.timeout, Duration::from_millis(5_000));
        assert_eq!(config.slow_timeout, Duration::from_millis(8_000));
    }

    #[test]
    fn url_wins_over_port() {
        let config = ProxyConfig::from_lookup(lookup(&[
            (BRIDGE_URL_ENV, "http://localhost:7000/"),
            (BRIDGE_PORT_ENV, "6200"),
        ]));
        assert_eq!(config.bridge_url, "http://localhost:7000");

        let config = ProxyConfig::from_lookup(lookup(&[(BRIDGE_PORT_ENV, "6200")]));
        assert_eq!(config.bridge_url, "http://127.0.0.1:6200");
    }

    #[test]
    fn bad_numbers_fall_back() {
        let config = ProxyConfig::from_lookup(lookup(&[
            (BRIDGE_PORT_ENV, "sixty"),
            (BRIDGE_TIMEOUT_ENV, "0"),
            (BRIDGE_SLOW_TIMEOUT_ENV, "1500"),
        ]));
        assert_eq!(config.bridge_url, "http://127.0.0.1:6100");
        assert_eq!(config.timeout, Duration::from_millis(DEFAULT_TIMEOUT_MS));
        assert_eq!(config.slow_timeout, Duration::from_millis(1_500));
    }
}

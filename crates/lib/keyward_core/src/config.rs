//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::auth::interceptor::DEFAULT_REFRESH_THRESHOLD_SECS;

/// Default backend base URL.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:3000/api/v1";

/// Default HTTP timeout (10 seconds).
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Largest accepted refresh threshold (one week).
pub const MAX_REFRESH_THRESHOLD_SECS: i64 = 7 * 24 * 60 * 60;

const DEV_ENCRYPTION_KEY: &str = "keyward-default-dev-key-change-in-production";

/// Configuration for the auth client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Backend base URL; endpoint paths are appended to it.
    pub backend_url: String,
    /// Per-request timeout. A timed-out refresh counts as a failed refresh.
    pub timeout: Duration,
    /// Refresh proactively when fewer than this many seconds remain.
    pub refresh_threshold_secs: i64,
    /// Location of the encrypted credential file.
    pub store_path: PathBuf,
    /// Passphrase the credential file's cipher key is derived from.
    pub encryption_key: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.into(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            refresh_threshold_secs: DEFAULT_REFRESH_THRESHOLD_SECS,
            store_path: default_store_path(),
            encryption_key: DEV_ENCRYPTION_KEY.into(),
        }
    }
}

impl ClientConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                          | Default                                  |
    /// |-----------------------------------|------------------------------------------|
    /// | `KEYWARD_BACKEND_URL`             | `http://localhost:3000/api/v1`           |
    /// | `KEYWARD_TIMEOUT_MS`              | `10000`                                  |
    /// | `KEYWARD_REFRESH_THRESHOLD_SECS`  | `300`                                    |
    /// | `KEYWARD_STORE_PATH`              | `<data dir>/keyward/credentials.json`    |
    /// | `KEYWARD_ENCRYPTION_KEY`          | development key                          |
    ///
    /// Unparsable numbers fall back to their defaults, as does a refresh
    /// threshold outside `0..=MAX_REFRESH_THRESHOLD_SECS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            backend_url: env_string("KEYWARD_BACKEND_URL").unwrap_or(defaults.backend_url),
            timeout: env_string("KEYWARD_TIMEOUT_MS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.timeout),
            refresh_threshold_secs: env_string("KEYWARD_REFRESH_THRESHOLD_SECS")
                .and_then(|v| parse_threshold_secs(&v))
                .unwrap_or(defaults.refresh_threshold_secs),
            store_path: env_string("KEYWARD_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.store_path),
            encryption_key: env_string("KEYWARD_ENCRYPTION_KEY").unwrap_or(defaults.encryption_key),
        }
    }

    /// Proactive refresh threshold. Out-of-range values yield the default.
    pub fn refresh_threshold(&self) -> chrono::Duration {
        Some(self.refresh_threshold_secs)
            .filter(|secs| (0..=MAX_REFRESH_THRESHOLD_SECS).contains(secs))
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or_else(|| chrono::Duration::seconds(DEFAULT_REFRESH_THRESHOLD_SECS))
    }
}

fn parse_threshold_secs(raw: &str) -> Option<i64> {
    raw.parse::<i64>()
        .ok()
        .filter(|secs| (0..=MAX_REFRESH_THRESHOLD_SECS).contains(secs))
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// `<data dir>/keyward/credentials.json`.
pub fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("keyward")
        .join("credentials.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_backend_conventions() {
        let config = ClientConfig::default();
        assert_eq!(config.backend_url, DEFAULT_BACKEND_URL);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.refresh_threshold_secs, 300);
        assert!(config.store_path.ends_with("keyward/credentials.json"));
    }

    #[test]
    fn threshold_outside_range_is_rejected() {
        assert_eq!(parse_threshold_secs("600"), Some(600));
        assert_eq!(parse_threshold_secs("0"), Some(0));
        assert_eq!(parse_threshold_secs("-5"), None);
        assert_eq!(parse_threshold_secs("9223372036854775807"), None);
        assert_eq!(parse_threshold_secs("soon"), None);
    }

    #[test]
    fn refresh_threshold_never_panics() {
        let mut config = ClientConfig::default();
        assert_eq!(config.refresh_threshold(), chrono::Duration::minutes(5));

        config.refresh_threshold_secs = 60;
        assert_eq!(config.refresh_threshold(), chrono::Duration::minutes(1));

        for bad in [i64::MAX, i64::MIN, -1] {
            config.refresh_threshold_secs = bad;
            assert_eq!(config.refresh_threshold(), chrono::Duration::minutes(5));
        }
    }
}

use etcetera::{choose_app_strategy, AppStrategy, AppStrategyArgs};
use once_cell::sync::Lazy;
use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Error;

pub const API_KEY_ENV_VAR: &str = "BFL_API_KEY";
pub const HOST_ENV_VAR: &str = "ATELIER_HOST";
pub const TIMEOUT_ENV_VAR: &str = "ATELIER_TIMEOUT";

pub const DEFAULT_HOST: &str = "https://api.us1.bfl.ai";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

pub static APP_STRATEGY: Lazy<AppStrategyArgs> = Lazy::new(|| AppStrategyArgs {
    top_level_domain: "dev".to_string(),
    author: "atelier".to_string(),
    app_name: "atelier".to_string(),
});

/// Connection settings for the remote API, usually sourced from the
/// environment.
#[derive(Clone)]
pub struct ApiConfig {
    pub host: String,
    pub api_key: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl ApiConfig {
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    /// Reads `BFL_API_KEY` (required) plus the optional `ATELIER_HOST`
    /// and `ATELIER_TIMEOUT` (seconds) overrides.
    pub fn from_env() -> Result<Self, Error> {
        let api_key = std::env::var(API_KEY_ENV_VAR)
            .map_err(|_| Error::Auth(format!("{} is not set", API_KEY_ENV_VAR)))?;
        Self::from_env_with_key(api_key)
    }

    /// Like [`ApiConfig::from_env`], with the credential supplied by the
    /// caller instead of the environment.
    pub fn from_env_with_key(api_key: impl Into<String>) -> Result<Self, Error> {
        let host = std::env::var(HOST_ENV_VAR).unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let mut config = Self::new(host, api_key);
        if let Ok(raw) = std::env::var(TIMEOUT_ENV_VAR) {
            let secs: u64 = raw.parse().map_err(|_| {
                Error::InvalidArgument(format!(
                    "{} must be an integer number of seconds, got {:?}",
                    TIMEOUT_ENV_VAR, raw
                ))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("host", &self.host)
            .field("api_key", &"[hidden]")
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// Default location of the fine-tune registry file, e.g.
/// `~/.local/share/atelier/finetunes.json` on Linux.
pub fn default_registry_path() -> Result<PathBuf, Error> {
    let strategy = choose_app_strategy(APP_STRATEGY.clone())
        .map_err(|e| io::Error::new(io::ErrorKind::NotFound, e.to_string()))?;
    let data_dir = strategy.data_dir();
    fs::create_dir_all(&data_dir)?;
    Ok(data_dir.join("finetunes.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn from_env_requires_api_key() {
        std::env::remove_var(API_KEY_ENV_VAR);
        let err = ApiConfig::from_env().unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }

    #[test]
    #[serial]
    fn from_env_applies_overrides() {
        std::env::set_var(API_KEY_ENV_VAR, "test-key");
        std::env::set_var(HOST_ENV_VAR, "http://localhost:9100");
        std::env::set_var(TIMEOUT_ENV_VAR, "5");
        let config = ApiConfig::from_env().unwrap();
        assert_eq!(config.host, "http://localhost:9100");
        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.timeout, Duration::from_secs(5));
        std::env::remove_var(API_KEY_ENV_VAR);
        std::env::remove_var(HOST_ENV_VAR);
        std::env::remove_var(TIMEOUT_ENV_VAR);
    }

    #[test]
    #[serial]
    fn from_env_rejects_unparseable_timeout() {
        std::env::set_var(API_KEY_ENV_VAR, "test-key");
        std::env::set_var(TIMEOUT_ENV_VAR, "soon");
        let err = ApiConfig::from_env().unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        std::env::remove_var(API_KEY_ENV_VAR);
        std::env::remove_var(TIMEOUT_ENV_VAR);
    }

    #[test]
    fn debug_hides_the_key() {
        let config = ApiConfig::new(DEFAULT_HOST, "secret");
        let printed = format!("{:?}", config);
        assert!(!printed.contains("secret"));
        assert!(printed.contains("[hidden]"));
    }
}

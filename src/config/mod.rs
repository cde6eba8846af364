//! Client configuration.
//!
//! Layered, lowest precedence first: built-in defaults, the JSON config file
//! (`~/.hostchat/config.json` unless a path is given), `HOSTCHAT_*`
//! environment variables, then command-line flags applied by the caller
//! through the `with_*` setters.
//!
//! # Example
//!
//! ```ignore
//! use hostchat::config::ClientConfig;
//!
//! let config = ClientConfig::load(None)?
//!     .with_base_url("http://localhost:9090/host/v1");
//! ```

use color_eyre::{eyre::WrapErr, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::host::DEFAULT_BASE_URL;
use crate::render::Verbosity;

pub const ENV_BASE_URL: &str = "HOSTCHAT_BASE_URL";
pub const ENV_VERBOSITY: &str = "HOSTCHAT_VERBOSITY";
pub const ENV_TIMEOUT_SECS: &str = "HOSTCHAT_TIMEOUT_SECS";
pub const ENV_HOST: &str = "HOSTCHAT_HOST";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Agent host API root, e.g. `http://localhost:8080/host/v1`
    pub base_url: String,
    /// Deadline for a whole turn
    pub request_timeout: Duration,
    /// Inactivity after which a live turn is timed out
    pub stale_after: Duration,
    /// Elapsed time after which a live turn shows "still working"
    pub long_running_after: Duration,
    pub verbosity: Verbosity,
    /// Sessions kept for replay
    pub max_sessions: usize,
    /// How long finished sessions are kept
    pub session_retention: Duration,
    /// Named agent host to route to
    pub host: Option<String>,
    pub backstory: Option<String>,
    pub guidance: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(300),
            stale_after: Duration::from_secs(600),
            long_running_after: Duration::from_secs(30),
            verbosity: Verbosity::Normal,
            max_sessions: 20,
            session_retention: Duration::from_secs(300),
            host: None,
            backstory: None,
            guidance: None,
        }
    }
}

/// On-disk shape; every field optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    stale_after_secs: Option<u64>,
    long_running_after_secs: Option<u64>,
    verbosity: Option<Verbosity>,
    max_sessions: Option<usize>,
    retention_secs: Option<u64>,
    host: Option<String>,
    backstory: Option<String>,
    guidance: Option<String>,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    pub fn with_long_running_after(mut self, threshold: Duration) -> Self {
        self.long_running_after = threshold;
        self
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = max;
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_backstory(mut self, backstory: impl Into<String>) -> Self {
        self.backstory = Some(backstory.into());
        self
    }

    pub fn with_guidance(mut self, guidance: impl Into<String>) -> Self {
        self.guidance = Some(guidance.into());
        self
    }

    /// `~/.hostchat/config.json`, when a home directory exists.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".hostchat").join("config.json"))
    }

    /// Defaults, then the config file, then the environment.
    ///
    /// A missing file at the default location is fine; a missing file at an
    /// explicit `path` is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::default().merge_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::default().merge_file(&path)?,
                _ => Self::default(),
            },
        };
        config.merge_env()
    }

    /// Defaults plus environment only.
    pub fn from_env() -> Result<Self> {
        Self::default().merge_env()
    }

    fn merge_file(self, path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config from {:?}", path))?;
        let file: FileConfig = serde_json::from_str(&text)
            .wrap_err_with(|| format!("Invalid config file {:?}", path))?;
        tracing::debug!(path = ?path, "Loaded config file");
        Ok(self.merge(file))
    }

    fn merge(mut self, file: FileConfig) -> Self {
        if let Some(url) = file.base_url {
            self.base_url = url;
        }
        if let Some(secs) = file.timeout_secs {
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = file.stale_after_secs {
            self.stale_after = Duration::from_secs(secs);
        }
        if let Some(secs) = file.long_running_after_secs {
            self.long_running_after = Duration::from_secs(secs);
        }
        if let Some(verbosity) = file.verbosity {
            self.verbosity = verbosity;
        }
        if let Some(max) = file.max_sessions {
            self.max_sessions = max;
        }
        if let Some(secs) = file.retention_secs {
            self.session_retention = Duration::from_secs(secs);
        }
        self.host = file.host.or(self.host);
        self.backstory = file.backstory.or(self.backstory);
        self.guidance = file.guidance.or(self.guidance);
        self
    }

    fn merge_env(self) -> Result<Self> {
        self.merge_vars(|key| std::env::var(key).ok())
    }

    /// Apply `HOSTCHAT_*` overrides from `lookup`. Empty values are ignored.
    pub fn merge_vars<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(v) = get(ENV_VERBOSITY) {
            self.verbosity = v
                .parse()
                .wrap_err_with(|| format!("Invalid {}", ENV_VERBOSITY))?;
        }
        if let Some(v) = get(ENV_TIMEOUT_SECS) {
            let secs: u64 = v
                .trim()
                .parse()
                .wrap_err_with(|| format!("Invalid {}: {:?}", ENV_TIMEOUT_SECS, v))?;
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(host) = get(ENV_HOST) {
            self.host = Some(host);
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8080/host/v1");
        assert_eq!(config.request_timeout, Duration::from_secs(300));
        assert_eq!(config.stale_after, Duration::from_secs(600));
        assert_eq!(config.long_running_after, Duration::from_secs(30));
        assert_eq!(config.verbosity, Verbosity::Normal);
        assert_eq!(config.max_sessions, 20);
        assert!(config.host.is_none());
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::new()
            .with_base_url("http://h:1/host/v1")
            .with_verbosity(Verbosity::Detailed)
            .with_host("oracledbanswerer")
            .with_request_timeout(Duration::from_secs(5));
        assert_eq!(config.base_url, "http://h:1/host/v1");
        assert_eq!(config.verbosity, Verbosity::Detailed);
        assert_eq!(config.host.as_deref(), Some("oracledbanswerer"));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_env_overrides() {
        let config = ClientConfig::default()
            .merge_vars(vars(&[
                (ENV_BASE_URL, "http://remote:8080/host/v1"),
                (ENV_VERBOSITY, "minimal"),
                (ENV_TIMEOUT_SECS, "42"),
                (ENV_HOST, ""),
            ]))
            .unwrap();
        assert_eq!(config.base_url, "http://remote:8080/host/v1");
        assert_eq!(config.verbosity, Verbosity::Minimal);
        assert_eq!(config.request_timeout, Duration::from_secs(42));
        assert!(config.host.is_none());
    }

    #[test]
    fn test_bad_env_values() {
        assert!(ClientConfig::default()
            .merge_vars(vars(&[(ENV_TIMEOUT_SECS, "soon")]))
            .is_err());
        assert!(ClientConfig::default()
            .merge_vars(vars(&[(ENV_VERBOSITY, "shouty")]))
            .is_err());
    }

    #[test]
    fn test_file_layer() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"base_url":"http://file:8080/host/v1","verbosity":"detailed","stale_after_secs":60,"backstory":"analyst"}}"#
        )
        .unwrap();

        let config = ClientConfig::default().merge_file(file.path()).unwrap();
        assert_eq!(config.base_url, "http://file:8080/host/v1");
        assert_eq!(config.verbosity, Verbosity::Detailed);
        assert_eq!(config.stale_after, Duration::from_secs(60));
        assert_eq!(config.backstory.as_deref(), Some("analyst"));
        // Untouched fields keep their defaults
        assert_eq!(config.request_timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_file_rejects_unknown_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"base_uri":"typo"}}"#).unwrap();
        assert!(ClientConfig::default().merge_file(file.path()).is_err());
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ClientConfig::load(Some(&dir.path().join("nope.json"))).is_err());
    }
}

//! Configuration service implementation.
//!
//! Loads the client configuration from `~/.config/peakstate/config.toml`
//! and applies environment overrides on top.

use crate::paths::PeakPaths;
use crate::storage::AtomicTomlFile;
use peak_core::config::ClientConfig;
use peak_core::{PeakError, Result};
use std::path::PathBuf;

pub const ENV_API_BASE_URL: &str = "PEAK_API_BASE_URL";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "PEAK_REQUEST_TIMEOUT_SECS";
pub const ENV_DATA_DIR: &str = "PEAK_DATA_DIR";

/// Reads and writes `config.toml`.
///
/// A missing file yields the defaults. Environment variables win over the
/// file so deployments can point the client elsewhere without editing it.
#[derive(Clone)]
pub struct ConfigService {
    file: AtomicTomlFile<ClientConfig>,
}

impl ConfigService {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: AtomicTomlFile::new(path),
        }
    }

    /// Uses the platform config location.
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(PeakPaths::config_file()?))
    }

    /// Loads the configuration with process environment overrides applied.
    pub fn load(&self) -> Result<ClientConfig> {
        self.load_with_env(|name| std::env::var(name).ok())
    }

    /// Loads the configuration, resolving overrides through `lookup`.
    pub fn load_with_env<F>(&self, lookup: F) -> Result<ClientConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = self.file.load()?.unwrap_or_default();

        if let Some(url) = lookup(ENV_API_BASE_URL) {
            config.api_base_url = url;
        }
        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            config.request_timeout_secs = raw.trim().parse().map_err(|_| {
                PeakError::config(format!("{} must be a number of seconds, got '{}'", ENV_REQUEST_TIMEOUT_SECS, raw))
            })?;
        }
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            config.data_dir = Some(PathBuf::from(dir));
        }

        if config.request_timeout_secs == 0 {
            return Err(PeakError::config("request_timeout_secs must be greater than zero"));
        }

        tracing::debug!("[Config] API base URL: {}", config.api_base_url);
        Ok(config)
    }

    pub fn save(&self, config: &ClientConfig) -> Result<()> {
        self.file.save(config)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peak_core::config::DEFAULT_API_BASE_URL;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(temp_dir.path().join("config.toml"));

        let config = service.load_with_env(no_env).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_env_overrides_file() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(temp_dir.path().join("config.toml"));
        service
            .save(&ClientConfig {
                api_base_url: "https://file.example.com".to_string(),
                request_timeout_secs: 10,
                data_dir: None,
            })
            .unwrap();

        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_API_BASE_URL, "https://env.example.com"),
            (ENV_DATA_DIR, "/var/lib/peak"),
        ]);
        let config = service
            .load_with_env(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.api_base_url, "https://env.example.com");
        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.data_dir, Some(PathBuf::from("/var/lib/peak")));
    }

    #[test]
    fn test_bad_timeout_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(temp_dir.path().join("config.toml"));

        let result = service.load_with_env(|name| {
            (name == ENV_REQUEST_TIMEOUT_SECS).then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(PeakError::Config(_))));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(temp_dir.path().join("config.toml"));

        let result = service.load_with_env(|name| {
            (name == ENV_REQUEST_TIMEOUT_SECS).then(|| "0".to_string())
        });
        assert!(matches!(result, Err(PeakError::Config(_))));
    }
}

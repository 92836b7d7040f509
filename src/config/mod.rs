//! Centralized Linden configuration
//!
//! Configuration is assembled in layers. Precedence (highest to lowest):
//!
//! - `LINDEN_*` environment variables (always win)
//! - the file named by `LINDEN_CONFIG`
//! - `./linden.toml`
//! - hardcoded defaults
//!
//! The result is validated against the bounds in `linden-constants`.

pub mod coordination;
pub mod env;
pub mod error;
pub mod session;

use std::path::Path;

pub use coordination::ElectionSection;
pub use coordination::LockSection;
pub use env::EnvLookup;
pub use error::ConfigError;
use linden_coordination::CoordinatorConfig;
use serde::Deserialize;
use serde::Serialize;
pub use session::SessionSection;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_FILE_ENV: &str = "LINDEN_CONFIG";

/// Configuration file picked up from the working directory.
pub const LOCAL_CONFIG_FILE: &str = "./linden.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LindenConfig {
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub lock: LockSection,
    #[serde(default)]
    pub election: ElectionSection,
}

impl LindenConfig {
    /// Load configuration from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::invalid("config_file", path.as_ref().display(), format!("Failed to read file: {}", e))
        })?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::InvalidValue { reason, .. } => {
                ConfigError::invalid("config_file", path.as_ref().display(), reason)
            }
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents)
            .map_err(|e| ConfigError::invalid("config_file", "<inline>", format!("Failed to parse TOML: {}", e)))
    }

    /// Load configuration with the layered approach, reading the process
    /// environment.
    pub fn load_with_layers() -> Result<Self, ConfigError> {
        Self::load_with_env(&EnvLookup::process())
    }

    /// Layered load against an explicit environment.
    pub fn load_with_env(env: &EnvLookup<'_>) -> Result<Self, ConfigError> {
        let mut config = Self::load_toml_with_fallbacks(env)?;
        config.apply_env_overrides(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Tries in order: LINDEN_CONFIG -> ./linden.toml -> defaults
    fn load_toml_with_fallbacks(env: &EnvLookup<'_>) -> Result<Self, ConfigError> {
        if let Some(config_path) = env.string(CONFIG_FILE_ENV)? {
            let path = Path::new(&config_path);
            if path.exists() {
                tracing::info!(path = %config_path, "loading configuration from LINDEN_CONFIG");
                return Self::from_toml_file(path);
            }
            tracing::warn!(path = %config_path, "LINDEN_CONFIG specified but not found");
        }

        let local_config = Path::new(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            tracing::info!(path = LOCAL_CONFIG_FILE, "loading configuration");
            return Self::from_toml_file(local_config);
        }

        tracing::debug!("no configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Apply environment variable overrides to existing configuration
    pub fn apply_env_overrides(&mut self, env: &EnvLookup<'_>) -> Result<(), ConfigError> {
        self.session.apply_env_overrides(env)?;
        self.lock.apply_env_overrides(env)?;
        self.election.apply_env_overrides(env)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.session.validate()?;
        self.lock.validate()?;
        self.election.validate()?;
        Ok(())
    }

    /// Runtime configuration for a [`Coordinator`](linden_coordination::Coordinator).
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            session: self.session.to_session_config(),
            lock: self.lock.to_lock_config(),
            election: self.election.to_election_config(),
        }
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::invalid("config", "", format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path.as_ref(), contents).map_err(|e| {
            ConfigError::invalid("config_file", path.as_ref().display(), format!("Failed to write file: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = LindenConfig::default();
        config.validate().unwrap();
        let runtime = config.coordinator_config();
        assert_eq!(runtime.session.base_path, "/linden");
        assert_eq!(runtime.lock.default_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = LindenConfig::from_toml_str(
            r#"
            [session]
            base_path = "/apps/billing"

            [lock]
            default_timeout_ms = 5000
            "#,
        )
        .unwrap();
        assert_eq!(config.session.base_path, "/apps/billing");
        assert_eq!(config.session.connect_retries, linden_constants::DEFAULT_CONNECT_RETRIES);
        assert_eq!(config.lock.default_timeout_ms, 5000);
        assert_eq!(config.election, ElectionSection::default());
    }

    #[test]
    fn test_env_overrides_win() {
        let vars = env_from(&[("LINDEN_BASE_PATH", "/env"), ("LINDEN_CONNECT_RETRIES", "2")]);
        let env = EnvLookup::new(|key| vars.get(key).cloned());
        let config = LindenConfig::load_with_env(&env).unwrap();
        assert_eq!(config.session.base_path, "/env");
        assert_eq!(config.session.connect_retries, 2);
    }

    #[test]
    fn test_unparsable_env_is_rejected() {
        let vars = env_from(&[("LINDEN_SESSION_TIMEOUT_MS", "soon")]);
        let env = EnvLookup::new(|key| vars.get(key).cloned());
        let err = LindenConfig::load_with_env(&env).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "LINDEN_SESSION_TIMEOUT_MS"));
    }

    #[test]
    fn test_validation_bounds() {
        let mut config = LindenConfig::default();
        config.session.session_timeout_ms = 10;
        assert!(config.validate().is_err());

        let mut config = LindenConfig::default();
        config.session.base_path = String::new();
        assert!(matches!(config.validate(), Err(ConfigError::MissingRequired { .. })));

        let mut config = LindenConfig::default();
        config.session.base_path = "relative".to_string();
        assert!(config.validate().is_err());

        let mut config = LindenConfig::default();
        config.lock.default_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_explicit_file_falls_back() {
        let vars = env_from(&[(CONFIG_FILE_ENV, "/definitely/not/here.toml")]);
        let env = EnvLookup::new(|key| vars.get(key).cloned());
        assert!(LindenConfig::load_with_env(&env).is_ok());
    }
}

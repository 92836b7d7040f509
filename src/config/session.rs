//! Session configuration: where Linden lives in the store and how it connects.

use std::time::Duration;

use linden_constants::namespace::DEFAULT_BASE_PATH;
use linden_constants::session::DEFAULT_CONNECT_RETRIES;
use linden_constants::session::DEFAULT_RETRY_DELAY_MS;
use linden_constants::session::DEFAULT_SESSION_TIMEOUT_MS;
use linden_constants::session::MAX_CONNECT_RETRIES;
use linden_constants::session::MAX_RETRY_DELAY_MS;
use linden_constants::session::MAX_SESSION_TIMEOUT_MS;
use linden_constants::session::MIN_SESSION_TIMEOUT_MS;
use linden_node_types::path;
use linden_store::SessionConfig;
use serde::Deserialize;
use serde::Serialize;

use super::env::EnvLookup;
use super::error::ConfigError;

/// `[session]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    pub base_path: String,
    pub session_timeout_ms: u64,
    pub connect_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_BASE_PATH.to_string(),
            session_timeout_ms: DEFAULT_SESSION_TIMEOUT_MS,
            connect_retries: DEFAULT_CONNECT_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }
}

impl SessionSection {
    pub fn apply_env_overrides(&mut self, env: &EnvLookup<'_>) -> Result<(), ConfigError> {
        macro_rules! apply_override {
            ($field:ident, $env:literal, $parser:ident) => {
                if let Some(val) = env.$parser($env)? {
                    self.$field = val;
                }
            };
        }

        apply_override!(base_path, "LINDEN_BASE_PATH", string);
        apply_override!(session_timeout_ms, "LINDEN_SESSION_TIMEOUT_MS", u64);
        apply_override!(connect_retries, "LINDEN_CONNECT_RETRIES", u32);
        apply_override!(retry_delay_ms, "LINDEN_RETRY_DELAY_MS", u64);

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_path.is_empty() {
            return Err(ConfigError::MissingRequired {
                key: "session.base_path".to_string(),
                hint: format!("an absolute path such as '{DEFAULT_BASE_PATH}'"),
            });
        }
        path::validate_path(&self.base_path)
            .map_err(|e| ConfigError::invalid("session.base_path", &self.base_path, e.to_string()))?;

        if !(MIN_SESSION_TIMEOUT_MS..=MAX_SESSION_TIMEOUT_MS).contains(&self.session_timeout_ms) {
            return Err(ConfigError::invalid(
                "session.session_timeout_ms",
                self.session_timeout_ms,
                format!("must be between {MIN_SESSION_TIMEOUT_MS} and {MAX_SESSION_TIMEOUT_MS}"),
            ));
        }
        if self.connect_retries > MAX_CONNECT_RETRIES {
            return Err(ConfigError::invalid(
                "session.connect_retries",
                self.connect_retries,
                format!("must be at most {MAX_CONNECT_RETRIES}"),
            ));
        }
        if self.retry_delay_ms > MAX_RETRY_DELAY_MS {
            return Err(ConfigError::invalid(
                "session.retry_delay_ms",
                self.retry_delay_ms,
                format!("must be at most {MAX_RETRY_DELAY_MS}"),
            ));
        }
        Ok(())
    }

    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig {
            base_path: self.base_path.clone(),
            session_timeout: Duration::from_millis(self.session_timeout_ms),
            connect_retries: self.connect_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

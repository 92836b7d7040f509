//! Lock and election configuration.

use std::time::Duration;

use linden_constants::coordination::DEFAULT_LEADERSHIP_TIMEOUT_MS;
use linden_constants::coordination::DEFAULT_LOCK_TIMEOUT_MS;
use linden_constants::coordination::MAX_LEADERSHIP_TIMEOUT_MS;
use linden_constants::coordination::MAX_LOCK_TIMEOUT_MS;
use linden_coordination::ElectionConfig;
use linden_coordination::LockConfig;
use serde::Deserialize;
use serde::Serialize;

use super::env::EnvLookup;
use super::error::ConfigError;

/// `[lock]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockSection {
    pub default_timeout_ms: u64,
}

impl Default for LockSection {
    fn default() -> Self {
        Self {
            default_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }
}

impl LockSection {
    pub fn apply_env_overrides(&mut self, env: &EnvLookup<'_>) -> Result<(), ConfigError> {
        if let Some(val) = env.u64("LINDEN_LOCK_TIMEOUT_MS")? {
            self.default_timeout_ms = val;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_timeout("lock.default_timeout_ms", self.default_timeout_ms, MAX_LOCK_TIMEOUT_MS)
    }

    pub fn to_lock_config(&self) -> LockConfig {
        LockConfig {
            default_timeout: Duration::from_millis(self.default_timeout_ms),
        }
    }
}

/// `[election]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectionSection {
    pub leadership_timeout_ms: u64,
}

impl Default for ElectionSection {
    fn default() -> Self {
        Self {
            leadership_timeout_ms: DEFAULT_LEADERSHIP_TIMEOUT_MS,
        }
    }
}

impl ElectionSection {
    pub fn apply_env_overrides(&mut self, env: &EnvLookup<'_>) -> Result<(), ConfigError> {
        if let Some(val) = env.u64("LINDEN_LEADERSHIP_TIMEOUT_MS")? {
            self.leadership_timeout_ms = val;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_timeout("election.leadership_timeout_ms", self.leadership_timeout_ms, MAX_LEADERSHIP_TIMEOUT_MS)
    }

    pub fn to_election_config(&self) -> ElectionConfig {
        ElectionConfig {
            leadership_timeout: Duration::from_millis(self.leadership_timeout_ms),
        }
    }
}

fn check_timeout(key: &str, value: u64, max: u64) -> Result<(), ConfigError> {
    if value == 0 || value > max {
        return Err(ConfigError::invalid(key, value, format!("must be between 1 and {max}")));
    }
    Ok(())
}

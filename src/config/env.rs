//! Typed environment variable lookup.

use std::str::FromStr;

use super::error::ConfigError;

/// Reads `LINDEN_*` variables through a lookup function so tests can supply
/// their own environment.
pub struct EnvLookup<'a> {
    lookup: Box<dyn Fn(&str) -> Option<String> + 'a>,
}

impl<'a> EnvLookup<'a> {
    /// Read from the process environment.
    pub fn process() -> Self {
        Self::new(|key| std::env::var(key).ok())
    }

    pub fn new(lookup: impl Fn(&str) -> Option<String> + 'a) -> Self {
        Self {
            lookup: Box::new(lookup),
        }
    }

    pub fn string(&self, key: &str) -> Result<Option<String>, ConfigError> {
        Ok((self.lookup)(key))
    }

    pub fn u64(&self, key: &str) -> Result<Option<u64>, ConfigError> {
        self.parse(key)
    }

    pub fn u32(&self, key: &str) -> Result<Option<u32>, ConfigError> {
        self.parse(key)
    }

    fn parse<T: FromStr>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T::Err: std::fmt::Display,
    {
        match (self.lookup)(key) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|e: T::Err| ConfigError::invalid(key, &raw, e.to_string())),
        }
    }
}

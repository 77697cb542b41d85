//! Key/value configuration consulted by builders and client helpers.
//!
//! Keys follow the dotted naming used across Flow tooling (`accessNode.api`, `fcl.limit`).
//! Keys starting with `0x` are contract address aliases, e.g. `0xFungibleToken`, which
//! [`crate::template::resolve_imports`] substitutes into Cadence source.
use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use regex::Regex;
use thiserror::Error;

pub const ACCESS_NODE_API: &str = "accessNode.api";
pub const DEFAULT_LIMIT: &str = "fcl.limit";

const DEFAULT_ACCESS_NODE: &str = "http://localhost:8888";
const DEFAULT_COMPUTE_LIMIT: u64 = 100;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing config key: {0}")]
    Missing(String),

    #[error("Config key {key} holds an invalid value {value:?}: {reason}")]
    InvalidValue { key: String, value: String, reason: String },

    #[error("Invalid key pattern: {0}")]
    InvalidPattern(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    values: BTreeMap<String, String>,
}

impl Config {
    /// An empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration seeded with the local emulator access node and default compute limit.
    pub fn with_defaults() -> Self {
        Self::new()
            .put(ACCESS_NODE_API, DEFAULT_ACCESS_NODE)
            .put(DEFAULT_LIMIT, DEFAULT_COMPUTE_LIMIT.to_string())
    }

    pub fn put(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values
            .insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, key: &str, fallback: &'a str) -> &'a str {
        self.get(key).unwrap_or(fallback)
    }

    /// Fetches and parses a value, failing if the key is absent or does not parse.
    pub fn get_parsed<T>(&self, key: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        let value = self
            .get(key)
            .ok_or_else(|| ConfigError::Missing(key.to_string()))?;
        value
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
                reason: e.to_string(),
            })
    }

    /// Replaces the value under `key` with `f(current)`. A `None` result removes the key.
    pub fn update<F>(&mut self, key: &str, f: F)
    where
        F: FnOnce(Option<&str>) -> Option<String>,
    {
        match f(self.get(key)) {
            Some(value) => self.set(key, value),
            None => {
                self.values.remove(key);
            }
        }
    }

    pub fn delete(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    pub fn all(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    /// All entries whose key matches `pattern`.
    pub fn where_matching(&self, pattern: &str) -> Result<BTreeMap<String, String>, ConfigError> {
        let regex = Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern(e.to_string()))?;
        Ok(self
            .values
            .iter()
            .filter(|(k, _)| regex.is_match(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    /// Contract address aliases, keyed by their `0x` placeholder.
    pub fn address_aliases(&self) -> BTreeMap<String, String> {
        self.values
            .iter()
            .filter(|(k, _)| k.starts_with("0x"))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn access_node(&self) -> Result<&str, ConfigError> {
        self.get(ACCESS_NODE_API)
            .ok_or_else(|| ConfigError::Missing(ACCESS_NODE_API.to_string()))
    }

    /// Compute limit applied when an interaction does not set one explicitly.
    pub fn default_limit(&self) -> Result<u64, ConfigError> {
        match self.get(DEFAULT_LIMIT) {
            Some(_) => self.get_parsed(DEFAULT_LIMIT),
            None => Ok(DEFAULT_COMPUTE_LIMIT),
        }
    }
}

/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Browser configuration.
//!
//! Each key has a default and an environment variable that overrides
//! it. Hosts layer their own overrides (e.g. command-line flags) on
//! top of [`BrowserConfig::from_env`].

use serde::Deserialize;
use serde::Serialize;

/// Default number of children fetched per page.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Default connection identity passed to
/// [`crate::service::DirectoryService::clear_paging_state`].
pub const DEFAULT_CONNECTION_ID: &str = "default";

/// Environment variable for [`BrowserConfig::page_size`].
pub const ENV_PAGE_SIZE: &str = "DIT_BROWSER_PAGE_SIZE";
/// Environment variable for [`BrowserConfig::connection_id`].
pub const ENV_CONNECTION_ID: &str = "DIT_BROWSER_CONNECTION_ID";
/// Environment variable for
/// [`BrowserConfig::include_private_naming_contexts`].
pub const ENV_INCLUDE_PRIVATE: &str = "DIT_BROWSER_INCLUDE_PRIVATE";

/// Errors from building a [`BrowserConfig`].
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Children fetched per page. Never 0.
    pub page_size: u32,
    /// Identity whose server-held paging state is dropped on clear.
    pub connection_id: String,
    /// Whether the Root DSE also lists private naming contexts.
    pub include_private_naming_contexts: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            connection_id: DEFAULT_CONNECTION_ID.to_string(),
            include_private_naming_contexts: false,
        }
    }
}

impl BrowserConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by `lookup`, which maps an environment
    /// variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(value) = lookup(ENV_PAGE_SIZE) {
            config.page_size = parse_page_size(ENV_PAGE_SIZE, &value)?;
        }
        if let Some(value) = lookup(ENV_CONNECTION_ID) {
            if value.trim().is_empty() {
                return Err(invalid(ENV_CONNECTION_ID, &value, "must not be empty"));
            }
            config.connection_id = value;
        }
        if let Some(value) = lookup(ENV_INCLUDE_PRIVATE) {
            config.include_private_naming_contexts = parse_bool(ENV_INCLUDE_PRIVATE, &value)?;
        }
        Ok(config)
    }

    /// Check invariants a deserialized config may violate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(invalid("page_size", "0", "must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse_page_size(key: &'static str, value: &str) -> Result<u32, ConfigError> {
    match value.trim().parse::<u32>() {
        Ok(0) => Err(invalid(key, value, "must be at least 1")),
        Ok(n) => Ok(n),
        Err(e) => Err(invalid(key, value, e.to_string())),
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(invalid(key, value, "expected a boolean")),
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults, and the config structs the gateway
//! and orchestrators are built from. Configuration is loaded from the
//! environment at startup by the embedding host.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `CUSTODIAN_API_BASE_URL` | Base URL of the custodian REST API | Required |
//! | `CUSTODIAN_API_KEY` | API key sent as `Authorization: Bearer` | Required |
//! | `CUSTODIAN_ACCOUNT_TYPE` | Account type requested at initialization | `SCA` |
//! | `CUSTODIAN_BLOCKCHAINS` | Comma-separated chains for new accounts | `MATIC-MUMBAI` |
//! | `CUSTODIAN_HTTP_TIMEOUT_SECS` | Per-request HTTP timeout | `15` |
//! | `WALLET_POLL_INTERVAL_SECS` | Delay between wallet list retries | `1` |

use std::time::Duration;

/// Environment variable name for the custodian API base URL.
pub const API_BASE_URL_ENV: &str = "CUSTODIAN_API_BASE_URL";

/// Environment variable name for the custodian API key.
pub const API_KEY_ENV: &str = "CUSTODIAN_API_KEY";

/// Environment variable name for the account type requested at initialization.
pub const ACCOUNT_TYPE_ENV: &str = "CUSTODIAN_ACCOUNT_TYPE";

/// Environment variable name for the comma-separated blockchain list.
pub const BLOCKCHAINS_ENV: &str = "CUSTODIAN_BLOCKCHAINS";

/// Environment variable name for the HTTP timeout in seconds.
pub const HTTP_TIMEOUT_SECS_ENV: &str = "CUSTODIAN_HTTP_TIMEOUT_SECS";

/// Environment variable name for the wallet poll interval in seconds.
pub const POLL_INTERVAL_SECS_ENV: &str = "WALLET_POLL_INTERVAL_SECS";

const DEFAULT_ACCOUNT_TYPE: &str = "SCA";
const DEFAULT_BLOCKCHAINS: &str = "MATIC-MUMBAI";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration missing: {0}")]
    Missing(String),

    #[error("configuration invalid: {0}")]
    Invalid(String),
}

/// Connection settings for the custodian HTTP gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = env_required(API_BASE_URL_ENV)?;
        let api_key = env_required(API_KEY_ENV)?;
        let timeout = parse_secs(HTTP_TIMEOUT_SECS_ENV, DEFAULT_HTTP_TIMEOUT)?;
        Ok(Self {
            base_url,
            api_key,
            timeout,
        })
    }
}

/// Account provisioning and polling settings.
#[derive(Debug, Clone)]
pub struct WalletConfig {
    /// Account type sent on `initialize_account` (e.g. "SCA").
    pub account_type: String,
    /// Chains new accounts are provisioned on.
    pub blockchains: Vec<String>,
    /// Fixed delay between wallet list retries.
    pub poll_interval: Duration,
}

impl WalletConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let account_type = env_or_default(ACCOUNT_TYPE_ENV, DEFAULT_ACCOUNT_TYPE);
        let blockchains = parse_blockchains(&env_or_default(BLOCKCHAINS_ENV, DEFAULT_BLOCKCHAINS));
        if blockchains.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "{BLOCKCHAINS_ENV} must name at least one blockchain"
            )));
        }
        let poll_interval = parse_secs(POLL_INTERVAL_SECS_ENV, DEFAULT_POLL_INTERVAL)?;
        Ok(Self {
            account_type,
            blockchains,
            poll_interval,
        })
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            account_type: DEFAULT_ACCOUNT_TYPE.to_string(),
            blockchains: vec![DEFAULT_BLOCKCHAINS.to_string()],
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

fn parse_blockchains(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|chain| !chain.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_secs(name: &str, default: Duration) -> Result<Duration, ConfigError> {
    match env_optional(name) {
        Some(raw) => {
            let secs: u64 = raw.parse().map_err(|_| {
                ConfigError::Invalid(format!("{name} must be an integer number of seconds"))
            })?;
            Ok(Duration::from_secs(secs))
        }
        None => Ok(default),
    }
}

pub(crate) fn env_required(name: &str) -> Result<String, ConfigError> {
    env_optional(name).ok_or_else(|| ConfigError::Missing(name.to_string()))
}

pub(crate) fn env_optional(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) => {
            let trimmed = value.trim().to_string();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            }
        }
        Err(_) => None,
    }
}

pub(crate) fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Hosts configure Fident verification from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `FIDENT_PUBLIC_KEY_PATH` | PEM file holding the Fident RSA public key | Required |
//! | `FIDENT_HEADER_PREFIX` | Prefix shared by all Fident headers | `X-Fident` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::KeyResult;
use crate::headers::{HeaderContract, DEFAULT_HEADER_PREFIX};
use crate::key_store::KeyStore;
use crate::verifier::Verifier;

/// Environment variable name for the Fident public key path.
pub const PUBLIC_KEY_PATH_ENV: &str = "FIDENT_PUBLIC_KEY_PATH";

/// Environment variable name for the header prefix.
///
/// # Default
/// `X-Fident`
pub const HEADER_PREFIX_ENV: &str = "FIDENT_HEADER_PREFIX";

/// Environment variable name for the log output format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<LogFormat> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Some(LogFormat::Pretty),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Fident verification settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FidentConfig {
    pub public_key_path: PathBuf,
    pub header_prefix: String,
    pub log_format: LogFormat,
}

impl FidentConfig {
    /// Load from process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using `lookup` to resolve variable names.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let public_key_path = non_empty(PUBLIC_KEY_PATH_ENV)
            .map(PathBuf::from)
            .ok_or(ConfigError::Missing(PUBLIC_KEY_PATH_ENV))?;

        let header_prefix =
            non_empty(HEADER_PREFIX_ENV).unwrap_or_else(|| DEFAULT_HEADER_PREFIX.to_string());

        let log_format = match non_empty(LOG_FORMAT_ENV) {
            None => LogFormat::default(),
            Some(value) => LogFormat::parse(&value).ok_or(ConfigError::Invalid {
                name: LOG_FORMAT_ENV,
                value,
            })?,
        };

        Ok(Self {
            public_key_path,
            header_prefix: header_prefix.trim().to_string(),
            log_format,
        })
    }

    pub fn header_contract(&self) -> HeaderContract {
        HeaderContract::new(&self.header_prefix)
    }

    /// Load the configured key and build a verifier around it.
    ///
    /// # Errors
    /// Any [`KeyError`](crate::KeyError) from loading the key file.
    pub fn build_verifier(&self) -> KeyResult<Verifier> {
        let store = KeyStore::new();
        store.initialize(&self.public_key_path)?;
        Ok(Verifier::with_contract(
            Arc::new(store),
            self.header_contract(),
        ))
    }
}

// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration loading from environment variables.

use std::str::FromStr;

use dessist_dtsx::ContentPrecedence;
use serde::Serialize;

/// SQL Server compatibility mode for the generated program.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum SqlCompatibility {
    /// SQL Server 2008: table-valued parameter helpers are included.
    #[default]
    Sql2008,
    /// SQL Server 2005.
    Sql2005,
}

impl FromStr for SqlCompatibility {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sql2008" | "2008" => Ok(Self::Sql2008),
            "sql2005" | "2005" => Ok(Self::Sql2005),
            _ => Err(ConfigError::Invalid(
                "DESSIST_SQL_MODE",
                "must be sql2008 or sql2005",
            )),
        }
    }
}

/// Options consumed by the emission engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EmitOptions {
    /// Compatibility mode.
    pub sql_mode: SqlCompatibility,
    /// Emit SQL Server Management Objects calls instead of plain `SqlCommand`.
    pub use_smo: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            sql_mode: SqlCompatibility::Sql2008,
            use_smo: true,
        }
    }
}

/// Dessist configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Emission options
    pub emit: EmitOptions,
    /// Which text child wins when an element has several
    pub content_precedence: ContentPrecedence,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional (with defaults):
    /// - `DESSIST_SQL_MODE`: `sql2008` or `sql2005` (default: sql2008)
    /// - `DESSIST_USE_SMO`: whether to emit SMO calls (default: true)
    /// - `DESSIST_CONTENT_PRECEDENCE`: `last` or `first` (default: last)
    pub fn from_env() -> Result<Self, ConfigError> {
        let sql_mode = match std::env::var("DESSIST_SQL_MODE") {
            Ok(value) => value.parse()?,
            Err(_) => SqlCompatibility::default(),
        };

        let use_smo = match std::env::var("DESSIST_USE_SMO") {
            Ok(value) => parse_bool(&value)
                .ok_or(ConfigError::Invalid("DESSIST_USE_SMO", "must be true or false"))?,
            Err(_) => true,
        };

        let content_precedence = match std::env::var("DESSIST_CONTENT_PRECEDENCE") {
            Ok(value) => value.parse().map_err(|_| {
                ConfigError::Invalid("DESSIST_CONTENT_PRECEDENCE", "must be last or first")
            })?,
            Err(_) => ContentPrecedence::default(),
        };

        Ok(Self {
            emit: EmitOptions { sql_mode, use_smo },
            content_precedence,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}

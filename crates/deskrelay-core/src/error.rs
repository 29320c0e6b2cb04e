// SPDX-FileCopyrightText: 2026 Deskrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Deskrelay support bridge.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by the messaging gateway, classified the way the relay
/// engine reacts to them.
///
/// The classification is part of the gateway contract: `RateLimited` is
/// retried after the platform-dictated delay, `Unreachable` is permanent
/// and never retried, `Other` gets bounded retries with a fixed delay.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The platform asked us to slow down.
    #[error("rate limited by the platform, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    /// Delivery can never succeed (recipient blocked the bot, chat gone).
    #[error("recipient unreachable: {0}")]
    Unreachable(String),

    /// Anything else; possibly transient (network blip, malformed call).
    #[error("gateway error: {message}")]
    Other {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl GatewayError {
    /// Shorthand for an `Other` error without an underlying source.
    pub fn other(message: impl Into<String>) -> Self {
        GatewayError::Other {
            message: message.into(),
            source: None,
        }
    }
}

/// The primary error type used across all Deskrelay crates.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Configuration errors (invalid TOML, missing required fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Messaging gateway errors, preserving the delivery taxonomy.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

// SPDX-FileCopyrightText: 2026 Deskrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes. Collects all failures instead of failing fast.

use crate::diagnostic::ConfigError;
use crate::model::DeskrelayConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)`
/// with all collected validation errors.
pub fn validate_config(config: &DeskrelayConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if !LOG_LEVELS.contains(&config.relay.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "relay.log_level must be one of {LOG_LEVELS:?}, got `{}`",
                config.relay.log_level
            ),
        });
    }

    if config.relay.retry_attempts == 0 {
        errors.push(ConfigError::Validation {
            message: "relay.retry_attempts must be at least 1".to_string(),
        });
    }

    if config.relay.album_settle_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "relay.album_settle_ms must be positive".to_string(),
        });
    }

    // A token without a support chat (or vice versa) cannot relay anything.
    if config.telegram.bot_token.is_some() && config.telegram.support_chat_id == 0 {
        errors.push(ConfigError::Validation {
            message: "telegram.support_chat_id is required when telegram.bot_token is set"
                .to_string(),
        });
    }

    if let Some(token) = &config.telegram.bot_token
        && token.trim().is_empty()
    {
        errors.push(ConfigError::Validation {
            message: "telegram.bot_token must not be empty when set".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

// SPDX-FileCopyrightText: 2026 Deskrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Deskrelay support bridge.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Deskrelay configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values; `telegram.bot_token` and `telegram.support_chat_id` are the
/// only values that must be provided before `serve` will start.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeskrelayConfig {
    /// Telegram bot and support-chat settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Relay engine tuning.
    #[serde(default)]
    pub relay: RelayConfig,
}

/// Telegram bot integration configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. Required for `serve`.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Chat id of the operator group with forum topics enabled.
    #[serde(default)]
    pub support_chat_id: i64,

    /// User ids that bypass rate limiting and may close tickets from the
    /// support chat.
    #[serde(default)]
    pub admin_ids: Vec<i64>,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("deskrelay").join("deskrelay.db"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "deskrelay.db".to_string())
}

fn default_wal_mode() -> bool {
    true
}

/// Relay engine tuning knobs.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Per-user cool-down between accepted single messages, in seconds.
    #[serde(default = "default_flood_cooldown_secs")]
    pub flood_cooldown_secs: u64,

    /// How long a rate-limit warning stays visible before self-deleting.
    #[serde(default = "default_warning_ttl_secs")]
    pub warning_ttl_secs: u64,

    /// Quiescence window before an album buffer is flushed, in
    /// milliseconds.
    #[serde(default = "default_album_settle_ms")]
    pub album_settle_ms: u64,

    /// Pause between consecutive album chunks, in milliseconds.
    #[serde(default = "default_album_chunk_pause_ms")]
    pub album_chunk_pause_ms: u64,

    /// Attempt budget for one outbound gateway call.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Fixed delay before retrying a transient gateway failure, in
    /// milliseconds.
    #[serde(default = "default_retry_transient_delay_ms")]
    pub retry_transient_delay_ms: u64,

    /// Safety margin added on top of platform-dictated rate-limit delays,
    /// in milliseconds.
    #[serde(default = "default_retry_rate_limit_margin_ms")]
    pub retry_rate_limit_margin_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            flood_cooldown_secs: default_flood_cooldown_secs(),
            warning_ttl_secs: default_warning_ttl_secs(),
            album_settle_ms: default_album_settle_ms(),
            album_chunk_pause_ms: default_album_chunk_pause_ms(),
            retry_attempts: default_retry_attempts(),
            retry_transient_delay_ms: default_retry_transient_delay_ms(),
            retry_rate_limit_margin_ms: default_retry_rate_limit_margin_ms(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_flood_cooldown_secs() -> u64 {
    4
}

fn default_warning_ttl_secs() -> u64 {
    3
}

fn default_album_settle_ms() -> u64 {
    1000
}

fn default_album_chunk_pause_ms() -> u64 {
    300
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_transient_delay_ms() -> u64 {
    500
}

fn default_retry_rate_limit_margin_ms() -> u64 {
    500
}

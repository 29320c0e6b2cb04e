// SPDX-FileCopyrightText: 2026 Deskrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./deskrelay.toml` > `~/.config/deskrelay/deskrelay.toml`
//! > `/etc/deskrelay/deskrelay.toml` with environment variable overrides
//! via the `DESKRELAY_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::DeskrelayConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/deskrelay/deskrelay.toml` (system-wide)
/// 3. `~/.config/deskrelay/deskrelay.toml` (user XDG config)
/// 4. `./deskrelay.toml` (local directory)
/// 5. `DESKRELAY_*` environment variables
pub fn load_config() -> Result<DeskrelayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DeskrelayConfig::default()))
        .merge(Toml::file("/etc/deskrelay/deskrelay.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("deskrelay/deskrelay.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("deskrelay.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<DeskrelayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DeskrelayConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<DeskrelayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DeskrelayConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `DESKRELAY_TELEGRAM_BOT_TOKEN` must
/// map to `telegram.bot_token`, not `telegram.bot.token`.
fn env_provider() -> Env {
    Env::prefixed("DESKRELAY_").map(|key| {
        // `key` is the lowercased env var name with the prefix stripped.
        // Example: DESKRELAY_TELEGRAM_BOT_TOKEN -> "telegram_bot_token"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("telegram_", "telegram.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("relay_", "relay.", 1);
        mapped.into()
    })
}

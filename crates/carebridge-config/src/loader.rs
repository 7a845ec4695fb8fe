// SPDX-FileCopyrightText: 2026 CareBridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./carebridge.toml` > `~/.config/carebridge/carebridge.toml`
//! > `/etc/carebridge/carebridge.toml` with environment variable overrides via
//! the `CAREBRIDGE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::CareBridgeConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/carebridge/carebridge.toml` (system-wide)
/// 3. `~/.config/carebridge/carebridge.toml` (user XDG config)
/// 4. `./carebridge.toml` (local directory)
/// 5. `CAREBRIDGE_*` environment variables
pub fn load_config() -> Result<CareBridgeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CareBridgeConfig::default()))
        .merge(Toml::file("/etc/carebridge/carebridge.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("carebridge/carebridge.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("carebridge.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<CareBridgeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CareBridgeConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CareBridgeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CareBridgeConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names. For example, `CAREBRIDGE_ENGINE_BASE_URL`
/// must map to `engine.base_url`, not `engine.base.url`.
fn env_provider() -> Env {
    Env::prefixed("CAREBRIDGE_").map(|key| {
        // `map` receives the key as it appears in the environment, prefix
        // stripped but still uppercase: CAREBRIDGE_ENGINE_BASE_URL ->
        // "ENGINE_BASE_URL". Lowercase it before section matching.
        let key_str = key.as_str().to_ascii_lowercase();
        let mapped = key_str
            .replacen("agent_", "agent.", 1)
            .replacen("engine_", "engine.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("limits_", "limits.", 1)
            .replacen("safety_", "safety.", 1)
            .replacen("gateway_", "gateway.", 1);
        mapped.into()
    })
}

// SPDX-FileCopyrightText: 2026 CareBridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-empty paths and coherent limit values.

use crate::diagnostic::ConfigError;
use crate::model::CareBridgeConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &CareBridgeConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.engine.base_url.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "engine.base_url must not be empty".to_string(),
        });
    }

    if config.engine.max_tokens == 0 {
        errors.push(ConfigError::Validation {
            message: "engine.max_tokens must be greater than zero".to_string(),
        });
    }

    if !(0.0..=2.0).contains(&config.engine.temperature) {
        errors.push(ConfigError::Validation {
            message: format!(
                "engine.temperature must be between 0.0 and 2.0, got {}",
                config.engine.temperature
            ),
        });
    }

    if config.limits.context_window_messages == 0 {
        errors.push(ConfigError::Validation {
            message: "limits.context_window_messages must be greater than zero".to_string(),
        });
    }

    if config.limits.max_message_len <= config.limits.min_message_len {
        errors.push(ConfigError::Validation {
            message: format!(
                "limits.max_message_len ({}) must exceed limits.min_message_len ({})",
                config.limits.max_message_len, config.limits.min_message_len
            ),
        });
    }

    if config.gateway.host.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "gateway.host must not be empty".to_string(),
        });
    }

    if config.gateway.heartbeat_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "gateway.heartbeat_interval_secs must be greater than zero".to_string(),
        });
    }

    // Empty canned texts would silently produce blank assistant turns.
    for (key, value) in [
        ("safety.greeting_message", &config.safety.greeting_message),
        ("safety.emergency_message", &config.safety.emergency_message),
        ("safety.urgent_advisory", &config.safety.urgent_advisory),
        ("safety.refusal_message", &config.safety.refusal_message),
        ("safety.deflection_message", &config.safety.deflection_message),
    ] {
        if value.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("{key} must not be empty"),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

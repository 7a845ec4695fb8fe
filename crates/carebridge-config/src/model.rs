// SPDX-FileCopyrightText: 2026 CareBridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the CareBridge conversation broker.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level CareBridge configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CareBridgeConfig {
    /// Service identity and behavior settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Inference engine endpoint settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Per-session and per-message limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Canned safety-pipeline texts.
    #[serde(default)]
    pub safety: SafetyConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Service identity and behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the service.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// When true, turns skip the safety gauntlet entirely and go straight
    /// to generation (no pre-filter, no post-filter, no system instruction).
    #[serde(default)]
    pub fast_mode: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            fast_mode: false,
        }
    }
}

fn default_agent_name() -> String {
    "carebridge".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Inference engine endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Base URL of the text-completion engine.
    #[serde(default = "default_engine_base_url")]
    pub base_url: String,

    /// Maximum tokens to generate per completion.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Bounded retry count for `EngineUnavailable` failures only.
    /// `EngineError` (malformed output) is never retried.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// System instruction prepended in safety mode. Ignored in fast mode.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: default_engine_base_url(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            system_prompt: default_system_prompt(),
        }
    }
}

fn default_engine_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_max_tokens() -> u32 {
    512
}

fn default_temperature() -> f32 {
    0.7
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_max_retries() -> u32 {
    1
}

fn default_system_prompt() -> String {
    "You are a careful healthcare support assistant. You provide general \
     information only. You never diagnose conditions, never prescribe or \
     adjust medication, and you encourage users to contact their care team \
     for medical decisions."
        .to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL journal mode.
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
    "carebridge.db".to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Per-session and per-message limit configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    /// A session is rate-limited once its message count reaches this cap.
    #[serde(default = "default_max_messages_per_session")]
    pub max_messages_per_session: u32,

    /// A session is rate-limited once its age reaches this many minutes.
    #[serde(default = "default_max_session_age_minutes")]
    pub max_session_age_minutes: u32,

    /// Size of the context window handed to the engine (most recent
    /// non-greeting messages).
    #[serde(default = "default_context_window_messages")]
    pub context_window_messages: u32,

    /// Minimum accepted user message length in characters.
    #[serde(default = "default_min_message_len")]
    pub min_message_len: usize,

    /// Maximum accepted user message length in characters.
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_messages_per_session: default_max_messages_per_session(),
            max_session_age_minutes: default_max_session_age_minutes(),
            context_window_messages: default_context_window_messages(),
            min_message_len: default_min_message_len(),
            max_message_len: default_max_message_len(),
        }
    }
}

fn default_max_messages_per_session() -> u32 {
    100
}

fn default_max_session_age_minutes() -> u32 {
    240
}

fn default_context_window_messages() -> u32 {
    10
}

fn default_min_message_len() -> usize {
    1
}

fn default_max_message_len() -> usize {
    4000
}

/// Canned texts substituted by the safety pipeline.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SafetyConfig {
    /// Greeting appended automatically when a session is created.
    #[serde(default = "default_greeting_message")]
    pub greeting_message: String,

    /// Canned assistant turn for emergency short-circuits.
    #[serde(default = "default_emergency_message")]
    pub emergency_message: String,

    /// Advisory prepended to responses for urgent (non-emergency) messages.
    #[serde(default = "default_urgent_advisory")]
    pub urgent_advisory: String,

    /// Canned refusal for prohibited-topic short-circuits.
    #[serde(default = "default_refusal_message")]
    pub refusal_message: String,

    /// Canned deflection substituted when generated output fails validation.
    #[serde(default = "default_deflection_message")]
    pub deflection_message: String,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            greeting_message: default_greeting_message(),
            emergency_message: default_emergency_message(),
            urgent_advisory: default_urgent_advisory(),
            refusal_message: default_refusal_message(),
            deflection_message: default_deflection_message(),
        }
    }
}

fn default_greeting_message() -> String {
    "Hello! I'm the CareBridge assistant. I can help with general health \
     questions and connect you with our care team. How can I help you today?"
        .to_string()
}

fn default_emergency_message() -> String {
    "Your message suggests you may need urgent medical attention. Please call \
     your local emergency number (911 in the US) or go to the nearest \
     emergency department right away. I've alerted our care team and a staff \
     member will follow up with you as soon as possible."
        .to_string()
}

fn default_urgent_advisory() -> String {
    "Your symptoms may need prompt attention. If they worsen, please contact \
     your care team or an urgent care service today."
        .to_string()
}

fn default_refusal_message() -> String {
    "I'm sorry, but I can't help with that topic. For questions about \
     prescriptions, dosages, or official documents, please contact your care \
     team directly."
        .to_string()
}

fn default_deflection_message() -> String {
    "I can share general information, but I'm not able to give a diagnosis or \
     medication advice. Your care team is the right place for that -- would \
     you like me to arrange for a staff member to follow up?"
        .to_string()
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Enable the HTTP gateway.
    #[serde(default = "default_gateway_enabled")]
    pub enabled: bool,

    /// Host address to bind.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Shared-secret bearer token. The gateway refuses to start without one.
    #[serde(default)]
    pub bearer_token: Option<String>,

    /// Interval between keep-alive heartbeat events on streaming turns.
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: default_gateway_enabled(),
            host: default_gateway_host(),
            port: default_gateway_port(),
            bearer_token: None,
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
        }
    }
}

fn default_gateway_enabled() -> bool {
    true
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3030
}

fn default_heartbeat_interval_secs() -> u64 {
    15
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = CareBridgeConfig::default();
        assert_eq!(config.agent.name, "carebridge");
        assert!(!config.agent.fast_mode);
        assert_eq!(config.limits.context_window_messages, 10);
        assert_eq!(config.limits.max_messages_per_session, 100);
        assert_eq!(config.gateway.port, 3030);
        assert!(config.gateway.bearer_token.is_none());
    }

    #[test]
    fn canned_messages_are_non_empty() {
        let safety = SafetyConfig::default();
        assert!(!safety.greeting_message.is_empty());
        assert!(!safety.emergency_message.is_empty());
        assert!(!safety.urgent_advisory.is_empty());
        assert!(!safety.refusal_message.is_empty());
        assert!(!safety.deflection_message.is_empty());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let toml = r#"
            [agent]
            nmae = "typo"
        "#;
        let result: Result<CareBridgeConfig, _> = toml::from_str(toml);
        assert!(result.is_err(), "unknown key should be rejected");
    }

    #[test]
    fn engine_retry_default_is_bounded() {
        let engine = EngineConfig::default();
        assert_eq!(engine.max_retries, 1);
        assert!(engine.request_timeout_secs > 0);
    }
}

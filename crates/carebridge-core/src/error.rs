// SPDX-FileCopyrightText: 2026 CareBridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the CareBridge conversation broker.

use thiserror::Error;

/// The primary error type used across all CareBridge crates.
///
/// Every variant maps to a stable error code via [`CareError::error_code`],
/// which the gateway surfaces to callers. None of these crash the process --
/// they are all recovered at the orchestration boundary.
#[derive(Debug, Error)]
pub enum CareError {
    /// Malformed or missing input (message too short/long, bad session token format).
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown session token. Distinct from transport-level storage errors.
    #[error("unknown session: {0}")]
    NotFound(String),

    /// Status or ownership mismatch (closed conversation, staff-owned turn,
    /// non-owning staff member attempting release).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Per-turn or conversation-lifetime limits exceeded.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Inference backend unreachable (connect failure, timeout, 5xx).
    #[error("engine unavailable: {message}")]
    EngineUnavailable {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Inference backend returned a malformed or empty result. Never retried.
    #[error("engine error: {message}")]
    EngineError {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Turn aborted by user cancel or client disconnect. Not a failure:
    /// produces no error event and no persisted assistant message.
    #[error("generation cancelled")]
    Cancelled,

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors (invalid TOML, missing required fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CareError {
    /// Stable machine-readable code surfaced to the gateway caller.
    pub fn error_code(&self) -> &'static str {
        match self {
            CareError::Validation(_) => "validation_error",
            CareError::NotFound(_) => "not_found",
            CareError::Forbidden(_) => "forbidden",
            CareError::RateLimited(_) => "rate_limited",
            CareError::EngineUnavailable { .. } => "engine_unavailable",
            CareError::EngineError { .. } => "engine_error",
            CareError::Cancelled => "cancelled",
            CareError::Storage { .. } => "storage_error",
            CareError::Config(_) => "config_error",
            CareError::Internal(_) => "internal_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(CareError::Validation("x".into()).error_code(), "validation_error");
        assert_eq!(CareError::NotFound("s".into()).error_code(), "not_found");
        assert_eq!(CareError::Forbidden("x".into()).error_code(), "forbidden");
        assert_eq!(CareError::RateLimited("x".into()).error_code(), "rate_limited");
        assert_eq!(CareError::Cancelled.error_code(), "cancelled");
    }

    #[test]
    fn engine_variants_are_distinct() {
        let unavailable = CareError::EngineUnavailable {
            message: "connect refused".into(),
            source: None,
        };
        let malformed = CareError::EngineError {
            message: "empty completion".into(),
            source: None,
        };
        assert_ne!(unavailable.error_code(), malformed.error_code());
    }

    #[test]
    fn display_includes_detail() {
        let err = CareError::NotFound("abc-123".into());
        assert_eq!(err.to_string(), "unknown session: abc-123");
    }
}

// SPDX-FileCopyrightText: 2026 CareBridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-turn pipeline.
//!
//! Every patient turn runs received → pre-filter → (short-circuit |
//! generation) → post-filter → persist → deliver. Safety short-circuits
//! (emergency, prohibited topic) resolve the turn entirely by policy and
//! never reach the inference engine. Fast mode skips the filters and the
//! advisory but keeps limits and transcript persistence.

use std::sync::Arc;
use std::time::Duration;

use carebridge_config::{CareBridgeConfig, SafetyConfig};
use carebridge_core::{
    CareError, Conversation, ConversationStatus, HandoffPriority, InferenceEngine, LimitCheck,
    Message, Role, Urgency,
};
use carebridge_safety::{classify_incoming, classify_prohibited, validate_generated};
use carebridge_storage::ConversationStore;
use tracing::{info, warn};
use uuid::Uuid;

use crate::registry::GenerationRegistry;

/// Orchestrates patient turns, streaming delivery, and staff operations over
/// the store, the engine, and the safety filter.
pub struct Orchestrator {
    pub(crate) store: ConversationStore,
    pub(crate) engine: Arc<dyn InferenceEngine>,
    pub(crate) registry: Arc<GenerationRegistry>,
    pub(crate) safety: SafetyConfig,
    pub(crate) fast_mode: bool,
    pub(crate) heartbeat_interval: Duration,
}

/// How the pre-filter resolved an incoming message.
pub(crate) enum PreFilter {
    /// Canned emergency response, emergency handoff, engine never invoked.
    Emergency { matched: Vec<&'static str> },
    /// Canned refusal, engine never invoked.
    Prohibited,
    /// Proceed to generation; `urgent` prepends the advisory.
    Pass { urgent: bool },
}

impl Orchestrator {
    pub fn new(
        store: ConversationStore,
        engine: Arc<dyn InferenceEngine>,
        registry: Arc<GenerationRegistry>,
        config: &CareBridgeConfig,
    ) -> Self {
        Self {
            store,
            engine,
            registry,
            safety: config.safety.clone(),
            fast_mode: config.agent.fast_mode,
            heartbeat_interval: Duration::from_secs(config.gateway.heartbeat_interval_secs),
        }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn registry(&self) -> &Arc<GenerationRegistry> {
        &self.registry
    }

    /// Open a new session. The store seeds the greeting.
    pub async fn create_session(
        &self,
        patient_id: Option<String>,
    ) -> Result<Conversation, CareError> {
        self.store.create_session(patient_id).await
    }

    /// Transcript for a session, greeting included. `limit` keeps the most
    /// recent messages; `None` returns everything.
    pub async fn get_history(
        &self,
        session_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<Message>, CareError> {
        self.require_session(session_id).await?;
        self.store.get_history(session_id, limit).await
    }

    /// Cancel the in-flight generation for a session, if any. Idempotent.
    pub async fn cancel_generation(&self, session_id: &str) -> Result<(), CareError> {
        self.require_session(session_id).await?;
        self.registry.cancel(session_id);
        Ok(())
    }

    /// Close a session. Any in-flight generation is cancelled first. Closing
    /// an already-closed session succeeds and keeps the original `closed_at`.
    pub async fn close_session(&self, session_id: &str) -> Result<(), CareError> {
        self.require_session(session_id).await?;
        self.registry.cancel(session_id);
        self.store.close_conversation(session_id).await
    }

    /// Non-streaming patient turn. Returns the persisted assistant message.
    pub async fn send_message(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<Message, CareError> {
        let conversation = self.gate_patient_turn(session_id, text).await?;
        let pre_filter = self.persist_user_turn(&conversation.id, text).await?;

        match pre_filter {
            PreFilter::Emergency { matched } => {
                self.short_circuit_emergency(&conversation.id, &matched).await
            }
            PreFilter::Prohibited => self.short_circuit_refusal(&conversation.id).await,
            PreFilter::Pass { urgent } => {
                let context = self.store.get_context_window(&conversation.id).await?;
                let completion = self.engine.complete(&context).await?;
                let (text, metadata) =
                    self.post_filter(&completion.text, urgent, completion.token_count, completion.latency_ms);
                self.store
                    .add_message(&conversation.id, Role::Assistant, &text, Some(metadata))
                    .await
            }
        }
    }

    /// Step-1 gate shared by both turn variants: session token format,
    /// message length, existence, status, limits.
    pub(crate) async fn gate_patient_turn(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<Conversation, CareError> {
        self.validate_message_text(text)?;
        let conversation = self.require_session(session_id).await?;

        match conversation.status {
            ConversationStatus::Closed => {
                return Err(CareError::Forbidden(format!(
                    "session {session_id} is closed"
                )));
            }
            ConversationStatus::StaffTaken => {
                return Err(CareError::Forbidden(format!(
                    "session {session_id} is owned by staff"
                )));
            }
            ConversationStatus::AiActive => {}
        }

        if let LimitCheck::Exceeded { reason } = self.store.check_limits(&conversation).await? {
            return Err(CareError::RateLimited(reason));
        }

        Ok(conversation)
    }

    /// Classify the incoming text, persist the user message unconditionally
    /// (the transcript must reflect what was actually said), and report how
    /// the turn proceeds.
    pub(crate) async fn persist_user_turn(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<PreFilter, CareError> {
        if self.fast_mode {
            self.store
                .add_message(session_id, Role::User, text, None)
                .await?;
            return Ok(PreFilter::Pass { urgent: false });
        }

        let incoming = classify_incoming(text);
        let prohibited = classify_prohibited(text);

        let metadata = (incoming.urgency != Urgency::Normal)
            .then(|| serde_json::json!({ "urgency": incoming.urgency.to_string() }));
        self.store
            .add_message(session_id, Role::User, text, metadata)
            .await?;

        Ok(match incoming.urgency {
            Urgency::Emergency => PreFilter::Emergency {
                matched: incoming.matched,
            },
            _ if prohibited.prohibited => {
                warn!(
                    session_id = %session_id,
                    matched = ?prohibited.matched,
                    "prohibited topic refused"
                );
                PreFilter::Prohibited
            }
            Urgency::Urgent => PreFilter::Pass { urgent: true },
            Urgency::Normal => PreFilter::Pass { urgent: false },
        })
    }

    /// Emergency short-circuit: canned response plus an emergency handoff.
    pub(crate) async fn short_circuit_emergency(
        &self,
        session_id: &str,
        matched: &[&'static str],
    ) -> Result<Message, CareError> {
        let reason = format!("emergency keywords: {}", matched.join(", "));
        let handoff = self
            .store
            .create_handoff(session_id, &reason, HandoffPriority::Emergency)
            .await?;
        info!(
            session_id = %session_id,
            handoff_id = %handoff.id,
            "emergency short-circuit"
        );
        self.store
            .add_message(
                session_id,
                Role::Assistant,
                &self.safety.emergency_message,
                Some(serde_json::json!({
                    "event": "emergency",
                    "handoff_id": handoff.id,
                })),
            )
            .await
    }

    /// Prohibited-topic short-circuit: canned refusal.
    pub(crate) async fn short_circuit_refusal(
        &self,
        session_id: &str,
    ) -> Result<Message, CareError> {
        self.store
            .add_message(
                session_id,
                Role::Assistant,
                &self.safety.refusal_message,
                Some(serde_json::json!({ "event": "refusal" })),
            )
            .await
    }

    /// Post-generation validation and advisory prefixing. Returns the final
    /// response text and the telemetry metadata for the assistant message.
    pub(crate) fn post_filter(
        &self,
        generated: &str,
        urgent: bool,
        token_count: u32,
        latency_ms: u64,
    ) -> (String, serde_json::Value) {
        let mut metadata = serde_json::json!({
            "token_count": token_count,
            "latency_ms": latency_ms,
        });

        let body = if self.fast_mode {
            generated.to_string()
        } else {
            match validate_generated(generated) {
                carebridge_safety::GeneratedVerdict::Valid => generated.to_string(),
                carebridge_safety::GeneratedVerdict::Invalid { reason } => {
                    warn!(reason = %reason, "generated response overridden");
                    metadata["safety_override"] = serde_json::Value::String(reason);
                    self.safety.deflection_message.clone()
                }
            }
        };

        let text = if urgent {
            metadata["urgent_advisory"] = serde_json::Value::Bool(true);
            format!("{}\n\n{}", self.safety.urgent_advisory, body)
        } else {
            body
        };

        (text, metadata)
    }

    /// The advisory prefix a streaming urgent turn emits before generation.
    pub(crate) fn advisory_prefix(&self) -> String {
        format!("{}\n\n", self.safety.urgent_advisory)
    }

    pub(crate) async fn require_session(
        &self,
        session_id: &str,
    ) -> Result<Conversation, CareError> {
        if Uuid::parse_str(session_id).is_err() {
            return Err(CareError::Validation(format!(
                "malformed session token: {session_id}"
            )));
        }
        self.store.require_conversation(session_id).await
    }

    fn validate_message_text(&self, text: &str) -> Result<(), CareError> {
        let limits = self.store.limits();
        let len = text.trim().chars().count();
        if len < limits.min_message_len {
            return Err(CareError::Validation("message is empty".into()));
        }
        if len > limits.max_message_len {
            return Err(CareError::Validation(format!(
                "message exceeds the maximum length of {} characters",
                limits.max_message_len
            )));
        }
        Ok(())
    }
}

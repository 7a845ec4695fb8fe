// SPDX-FileCopyrightText: 2026 CareBridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the CareBridge workspace.
//!
//! Timestamps are RFC 3339 UTC strings throughout (the storage layer persists
//! them as TEXT and relies on their lexicographic order).

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Who owns a conversation and whether it accepts further turns.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    /// The AI answers patient turns.
    AiActive,
    /// A human staff member owns the conversation; the engine is never invoked.
    StaffTaken,
    /// Terminated. Accepts no further turns.
    Closed,
}

/// Author of a message within a conversation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
    Staff,
}

impl Role {
    /// Prompt label used when rendering a context window into engine input.
    pub fn prompt_label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
            Role::System => "System",
            Role::Staff => "Staff",
        }
    }
}

/// Priority of a handoff request. Queue order is emergency > high > normal > low.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum HandoffPriority {
    Emergency,
    High,
    Normal,
    Low,
}

impl HandoffPriority {
    /// Numeric rank used for queue ordering (lower sorts first).
    pub fn rank(&self) -> u8 {
        match self {
            HandoffPriority::Emergency => 0,
            HandoffPriority::High => 1,
            HandoffPriority::Normal => 2,
            HandoffPriority::Low => 3,
        }
    }
}

/// Lifecycle of a handoff request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum HandoffStatus {
    Pending,
    Assigned,
    Resolved,
}

/// Urgency tier assigned by the incoming safety classifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Emergency,
    Urgent,
    Normal,
}

/// A conversation between a patient and the AI (or, after takeover, staff).
///
/// Invariant: `staff_id` is non-null iff `status == StaffTaken`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Session token: a random v4 UUID rendered as its canonical string.
    pub id: String,
    pub patient_id: Option<String>,
    pub status: ConversationStatus,
    pub staff_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub closed_at: Option<String>,
}

/// A single message within a conversation.
///
/// Messages are totally ordered by `created_at` (insertion order breaking
/// ties); no separate sequence counter exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub role: Role,
    pub content: String,
    /// Open key/value bag serialized as a JSON object. Known keys:
    /// `greeting`, `safety_override`, `urgent_advisory`, `urgency`,
    /// `token_count`, `latency_ms`, `handoff_id`, `event`.
    pub metadata: Option<String>,
    pub created_at: String,
}

/// A queued request to transfer a conversation to a human staff member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffRequest {
    pub id: String,
    pub conversation_id: String,
    pub reason: String,
    pub priority: HandoffPriority,
    pub status: HandoffStatus,
    pub staff_id: Option<String>,
    pub created_at: String,
    pub assigned_at: Option<String>,
    pub resolved_at: Option<String>,
}

/// One entry of the bounded context window handed to the inference engine.
///
/// Deliberately excludes ids, timestamps, and metadata -- the engine sees
/// role and content only, never the synthetic greeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub role: Role,
    pub content: String,
}

/// An active conversation annotated for the staff dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveConversation {
    pub conversation: Conversation,
    pub message_count: i64,
    pub last_message_at: Option<String>,
}

/// Result of a per-session limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitCheck {
    WithinLimits,
    Exceeded { reason: String },
}

/// A finished completion from the inference engine.
#[derive(Debug, Clone)]
pub struct Completion {
    /// Generated text with residual role-delimiter control tokens stripped.
    pub text: String,
    /// Tokens the engine reports having generated.
    pub token_count: u32,
    /// Wall-clock request latency in milliseconds.
    pub latency_ms: u64,
}

/// One incremental fragment from a streamed completion.
#[derive(Debug, Clone)]
pub struct EngineChunk {
    /// Incremental text fragment. Empty on the terminal chunk.
    pub delta: String,
    /// True exactly once, on the terminal chunk.
    pub stop: bool,
    /// Final token count; present only on the terminal chunk.
    pub token_count: Option<u32>,
}

/// Ordered event sequence emitted by a streaming turn.
///
/// A successful turn is `Start`, zero or more `Token`s, then exactly one
/// `Done`. A cancelled turn emits no terminal event at all. `Heartbeat`s are
/// interleaved on a fixed interval while generation is in flight.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    Start {
        conversation_id: String,
    },
    Token {
        /// The incremental fragment.
        delta: String,
        /// Cumulative text so far, including the fragment.
        text: String,
    },
    Done {
        /// The persisted assistant message -- identical payload to what the
        /// non-streaming path returns.
        message: Message,
    },
    Error {
        code: String,
        message: String,
    },
    Heartbeat,
}

impl TurnEvent {
    /// SSE event name for this event.
    pub fn event_name(&self) -> &'static str {
        match self {
            TurnEvent::Start { .. } => "start",
            TurnEvent::Token { .. } => "token",
            TurnEvent::Done { .. } => "done",
            TurnEvent::Error { .. } => "error",
            TurnEvent::Heartbeat => "heartbeat",
        }
    }
}

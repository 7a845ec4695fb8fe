// SPDX-FileCopyrightText: 2026 CareBridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the CareBridge conversation broker.
//!
//! This crate provides the error taxonomy, shared domain types, and the
//! inference engine trait used throughout the CareBridge workspace.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::CareError;
pub use traits::{EngineStream, InferenceEngine};
pub use types::{
    ActiveConversation, Completion, ContextEntry, Conversation, ConversationStatus,
    EngineChunk, HandoffPriority, HandoffRequest, HandoffStatus, LimitCheck, Message,
    Role, TurnEvent, Urgency,
};

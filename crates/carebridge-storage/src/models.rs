// SPDX-FileCopyrightText: 2026 CareBridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types are defined in `carebridge-core::types` for use across
//! crate boundaries. This module re-exports them for convenience within the
//! storage crate.

pub use carebridge_core::types::{
    ActiveConversation, Conversation, ConversationStatus, HandoffPriority, HandoffRequest,
    HandoffStatus, LimitCheck, Message, Role,
};

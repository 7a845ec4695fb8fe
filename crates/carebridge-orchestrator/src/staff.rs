// SPDX-FileCopyrightText: 2026 CareBridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Staff-side operations: dashboard listings, takeover/release, and direct
//! staff messaging on owned conversations.

use carebridge_core::{
    ActiveConversation, CareError, ConversationStatus, HandoffRequest, Message, Role,
};
use tracing::info;

use crate::turn::Orchestrator;

impl Orchestrator {
    /// Conversations in `ai_active` or `staff_taken` status, most recent
    /// activity first, with message aggregates for the dashboard.
    pub async fn list_active(&self) -> Result<Vec<ActiveConversation>, CareError> {
        self.store.list_active().await
    }

    /// The pending handoff queue, highest priority and oldest first.
    pub async fn list_pending_handoffs(&self) -> Result<Vec<HandoffRequest>, CareError> {
        self.store.list_pending_handoffs().await
    }

    /// Take ownership of a conversation. Requires no current staff owner.
    ///
    /// Cancels any in-flight generation, moves every pending handoff for the
    /// conversation to `assigned` under the taker, and posts a system notice
    /// into the transcript.
    pub async fn takeover(&self, session_id: &str, staff_id: &str) -> Result<(), CareError> {
        let conversation = self.require_session(session_id).await?;
        match conversation.status {
            ConversationStatus::AiActive => {}
            ConversationStatus::StaffTaken => {
                return Err(CareError::Forbidden(format!(
                    "session {session_id} is already owned by staff"
                )));
            }
            ConversationStatus::Closed => {
                return Err(CareError::Forbidden(format!(
                    "session {session_id} is closed"
                )));
            }
        }

        self.registry.cancel(session_id);
        self.store
            .update_status(
                session_id,
                ConversationStatus::StaffTaken,
                Some(staff_id.to_string()),
            )
            .await?;
        let assigned = self
            .store
            .assign_pending_for_conversation(session_id, staff_id)
            .await?;
        self.store
            .add_message(
                session_id,
                Role::System,
                "A staff member has joined the conversation.",
                Some(serde_json::json!({ "event": "takeover" })),
            )
            .await?;

        info!(
            session_id = %session_id,
            staff_id = %staff_id,
            handoffs_assigned = assigned,
            "staff takeover"
        );
        Ok(())
    }

    /// Hand a conversation back to the AI. Owner only.
    pub async fn release(&self, session_id: &str, staff_id: &str) -> Result<(), CareError> {
        let conversation = self.require_session(session_id).await?;
        self.require_owner(&conversation, session_id, staff_id)?;

        self.store
            .update_status(session_id, ConversationStatus::AiActive, None)
            .await?;
        self.store
            .add_message(
                session_id,
                Role::System,
                "The conversation has been returned to the assistant.",
                Some(serde_json::json!({ "event": "release" })),
            )
            .await?;

        info!(session_id = %session_id, staff_id = %staff_id, "staff release");
        Ok(())
    }

    /// Send a message as staff on an owned conversation.
    pub async fn staff_send_message(
        &self,
        session_id: &str,
        staff_id: &str,
        text: &str,
    ) -> Result<Message, CareError> {
        if text.trim().is_empty() {
            return Err(CareError::Validation("message is empty".into()));
        }
        let conversation = self.require_session(session_id).await?;
        self.require_owner(&conversation, session_id, staff_id)?;

        self.store
            .add_message(session_id, Role::Staff, text, None)
            .await
    }

    /// Full transcript for staff review. Unlike `get_history` this is the
    /// staff-facing name; the payload is identical.
    pub async fn get_transcript(&self, session_id: &str) -> Result<Vec<Message>, CareError> {
        self.get_history(session_id, None).await
    }

    fn require_owner(
        &self,
        conversation: &carebridge_core::Conversation,
        session_id: &str,
        staff_id: &str,
    ) -> Result<(), CareError> {
        if conversation.status != ConversationStatus::StaffTaken {
            return Err(CareError::Forbidden(format!(
                "session {session_id} is not staff-owned"
            )));
        }
        if conversation.staff_id.as_deref() != Some(staff_id) {
            return Err(CareError::Forbidden(format!(
                "session {session_id} is owned by another staff member"
            )));
        }
        Ok(())
    }
}

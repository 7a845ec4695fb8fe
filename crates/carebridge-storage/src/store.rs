// SPDX-FileCopyrightText: 2026 CareBridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! High-level conversation store. Wraps the query modules with id
//! generation, limit enforcement, and status-transition checks so callers
//! never touch SQL directly.

use carebridge_config::LimitsConfig;
use carebridge_core::{
    ActiveConversation, CareError, ContextEntry, Conversation, ConversationStatus,
    HandoffPriority, HandoffRequest, HandoffStatus, LimitCheck, Message, Role,
};
use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::database::{now_ts, Database};
use crate::queries;

/// Storage facade shared by the orchestrator and the gateway.
#[derive(Clone)]
pub struct ConversationStore {
    db: Database,
    limits: LimitsConfig,
    greeting_message: String,
}

impl ConversationStore {
    pub fn new(db: Database, limits: LimitsConfig, greeting_message: String) -> Self {
        Self {
            db,
            limits,
            greeting_message,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn limits(&self) -> &LimitsConfig {
        &self.limits
    }

    /// Create a conversation and seed it with the configured greeting,
    /// recorded as an assistant message tagged `{"greeting": true}` so the
    /// context window can skip it.
    pub async fn create_session(
        &self,
        patient_id: Option<String>,
    ) -> Result<Conversation, CareError> {
        let now = now_ts();
        let conversation = Conversation {
            id: Uuid::new_v4().to_string(),
            patient_id,
            status: ConversationStatus::AiActive,
            staff_id: None,
            created_at: now.clone(),
            updated_at: now.clone(),
            closed_at: None,
        };
        queries::conversations::insert(&self.db, &conversation).await?;

        let greeting = Message {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation.id.clone(),
            role: Role::Assistant,
            content: self.greeting_message.clone(),
            metadata: Some(serde_json::json!({ "greeting": true }).to_string()),
            created_at: now,
        };
        queries::messages::insert(&self.db, &greeting).await?;

        info!(session_id = %conversation.id, "session created");
        Ok(conversation)
    }

    pub async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, CareError> {
        queries::conversations::get(&self.db, id).await
    }

    /// Like [`get_conversation`](Self::get_conversation) but unknown tokens
    /// become a `NotFound` error.
    pub async fn require_conversation(&self, id: &str) -> Result<Conversation, CareError> {
        self.get_conversation(id).await?.ok_or_else(|| CareError::NotFound(format!("unknown session {id}")))
    }

    /// Persist a message. The conversation's `updated_at` moves to the
    /// message timestamp.
    pub async fn add_message(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<Message, CareError> {
        let message = Message {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            role,
            content: content.to_string(),
            metadata: metadata.map(|m| m.to_string()),
            created_at: now_ts(),
        };
        queries::messages::insert(&self.db, &message).await?;
        debug!(
            session_id = %conversation_id,
            role = %message.role,
            message_id = %message.id,
            "message persisted"
        );
        Ok(message)
    }

    /// The bounded, greeting-free context window for inference, oldest first.
    pub async fn get_context_window(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<ContextEntry>, CareError> {
        let messages = queries::messages::context_window(
            &self.db,
            conversation_id,
            self.limits.context_window_messages,
        )
        .await?;
        Ok(messages
            .into_iter()
            .map(|m| ContextEntry {
                role: m.role,
                content: m.content,
            })
            .collect())
    }

    /// Transcript, greeting included, oldest first. `limit` bounds the
    /// result to the most recent messages.
    pub async fn get_history(
        &self,
        conversation_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<Message>, CareError> {
        queries::messages::list(&self.db, conversation_id, limit).await
    }

    /// Enforce the per-session message cap and age ceiling.
    pub async fn check_limits(&self, conversation: &Conversation) -> Result<LimitCheck, CareError> {
        let count = queries::messages::count(&self.db, &conversation.id).await?;
        if count >= i64::from(self.limits.max_messages_per_session) {
            return Ok(LimitCheck::Exceeded {
                reason: format!(
                    "session reached the limit of {} messages",
                    self.limits.max_messages_per_session
                ),
            });
        }

        let created = DateTime::parse_from_rfc3339(&conversation.created_at).map_err(|e| {
            CareError::Internal(format!("bad created_at on session {}: {e}", conversation.id))
        })?;
        let age_minutes = (Utc::now() - created.with_timezone(&Utc)).num_minutes();
        if age_minutes >= i64::from(self.limits.max_session_age_minutes) {
            return Ok(LimitCheck::Exceeded {
                reason: format!(
                    "session exceeded the maximum age of {} minutes",
                    self.limits.max_session_age_minutes
                ),
            });
        }

        Ok(LimitCheck::WithinLimits)
    }

    /// Transition a conversation's status. `staff_id` must be present
    /// exactly when moving to `staff_taken`.
    pub async fn update_status(
        &self,
        conversation_id: &str,
        status: ConversationStatus,
        staff_id: Option<String>,
    ) -> Result<(), CareError> {
        match (status, staff_id.is_some()) {
            (ConversationStatus::StaffTaken, false) => {
                return Err(CareError::Validation(
                    "staff takeover requires a staff id".to_string(),
                ));
            }
            (ConversationStatus::AiActive | ConversationStatus::Closed, true) => {
                return Err(CareError::Validation(format!(
                    "status {status} does not carry a staff id"
                )));
            }
            _ => {}
        }
        queries::conversations::update_status(&self.db, conversation_id, status, staff_id).await
    }

    /// Close a conversation. Closing twice keeps the first `closed_at`.
    pub async fn close_conversation(&self, conversation_id: &str) -> Result<(), CareError> {
        queries::conversations::close(&self.db, conversation_id).await?;
        info!(session_id = %conversation_id, "session closed");
        Ok(())
    }

    pub async fn list_active(&self) -> Result<Vec<ActiveConversation>, CareError> {
        queries::conversations::list_active(&self.db).await
    }

    /// Queue a handoff request.
    pub async fn create_handoff(
        &self,
        conversation_id: &str,
        reason: &str,
        priority: HandoffPriority,
    ) -> Result<HandoffRequest, CareError> {
        let handoff = HandoffRequest {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            reason: reason.to_string(),
            priority,
            status: HandoffStatus::Pending,
            staff_id: None,
            created_at: now_ts(),
            assigned_at: None,
            resolved_at: None,
        };
        queries::handoffs::insert(&self.db, &handoff).await?;
        info!(
            session_id = %conversation_id,
            handoff_id = %handoff.id,
            priority = %handoff.priority,
            "handoff queued"
        );
        Ok(handoff)
    }

    /// The pending handoff queue, highest priority and oldest first, one
    /// entry per conversation.
    pub async fn list_pending_handoffs(&self) -> Result<Vec<HandoffRequest>, CareError> {
        queries::handoffs::pending_queue(&self.db).await
    }

    /// Assign a pending handoff to a staff member.
    pub async fn assign_handoff(&self, handoff_id: &str, staff_id: &str) -> Result<(), CareError> {
        if queries::handoffs::assign(&self.db, handoff_id, staff_id).await? {
            return Ok(());
        }
        match queries::handoffs::get(&self.db, handoff_id).await? {
            Some(_) => Err(CareError::Validation(format!(
                "handoff {handoff_id} is not pending"
            ))),
            None => Err(CareError::NotFound(format!("unknown handoff {handoff_id}"))),
        }
    }

    /// Resolve a handoff that has been dealt with.
    pub async fn resolve_handoff(&self, handoff_id: &str) -> Result<(), CareError> {
        if queries::handoffs::resolve(&self.db, handoff_id).await? {
            return Ok(());
        }
        match queries::handoffs::get(&self.db, handoff_id).await? {
            Some(_) => Err(CareError::Validation(format!(
                "handoff {handoff_id} is already resolved"
            ))),
            None => Err(CareError::NotFound(format!("unknown handoff {handoff_id}"))),
        }
    }

    /// Sweep every pending handoff for a conversation into `assigned` when a
    /// staff member takes the conversation over.
    pub async fn assign_pending_for_conversation(
        &self,
        conversation_id: &str,
        staff_id: &str,
    ) -> Result<usize, CareError> {
        queries::handoffs::assign_pending_for_conversation(&self.db, conversation_id, staff_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_store() -> (ConversationStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let mut limits = LimitsConfig::default();
        limits.max_messages_per_session = 5;
        limits.context_window_messages = 3;
        let store = ConversationStore::new(db, limits, "Hello, how can I help?".to_string());
        (store, dir)
    }

    #[tokio::test]
    async fn create_session_seeds_greeting() {
        let (store, _dir) = setup_store().await;
        let conversation = store.create_session(Some("p-1".to_string())).await.unwrap();
        assert_eq!(conversation.status, ConversationStatus::AiActive);

        let history = store.get_history(&conversation.id, None).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, Role::Assistant);
        assert_eq!(history[0].content, "Hello, how can I help?");

        // The greeting never enters the inference context.
        assert!(store.get_context_window(&conversation.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn require_conversation_maps_missing_to_not_found() {
        let (store, _dir) = setup_store().await;
        let err = store.require_conversation("nope").await.unwrap_err();
        assert_eq!(err.error_code(), "not_found");
    }

    #[tokio::test]
    async fn context_window_is_bounded_and_ordered() {
        let (store, _dir) = setup_store().await;
        let conversation = store.create_session(None).await.unwrap();
        for i in 0..4 {
            store
                .add_message(&conversation.id, Role::User, &format!("msg {i}"), None)
                .await
                .unwrap();
        }

        let window = store.get_context_window(&conversation.id).await.unwrap();
        let contents: Vec<&str> = window.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["msg 1", "msg 2", "msg 3"]);
    }

    #[tokio::test]
    async fn history_limit_keeps_most_recent() {
        let (store, _dir) = setup_store().await;
        let conversation = store.create_session(None).await.unwrap();
        for i in 0..3 {
            store
                .add_message(&conversation.id, Role::User, &format!("msg {i}"), None)
                .await
                .unwrap();
        }

        let tail = store.get_history(&conversation.id, Some(2)).await.unwrap();
        let contents: Vec<&str> = tail.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["msg 1", "msg 2"]);
    }

    #[tokio::test]
    async fn message_cap_trips_limit_check() {
        let (store, _dir) = setup_store().await;
        let conversation = store.create_session(None).await.unwrap();
        // The greeting counts toward the cap of 5.
        for i in 0..4 {
            store
                .add_message(&conversation.id, Role::User, &format!("msg {i}"), None)
                .await
                .unwrap();
        }

        let check = store.check_limits(&conversation).await.unwrap();
        assert!(matches!(check, LimitCheck::Exceeded { .. }));
    }

    #[tokio::test]
    async fn update_status_enforces_staff_id_pairing() {
        let (store, _dir) = setup_store().await;
        let conversation = store.create_session(None).await.unwrap();

        let err = store
            .update_status(&conversation.id, ConversationStatus::StaffTaken, None)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "validation_error");

        let err = store
            .update_status(
                &conversation.id,
                ConversationStatus::AiActive,
                Some("staff-1".to_string()),
            )
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "validation_error");

        store
            .update_status(
                &conversation.id,
                ConversationStatus::StaffTaken,
                Some("staff-1".to_string()),
            )
            .await
            .unwrap();
        let conversation = store.require_conversation(&conversation.id).await.unwrap();
        assert_eq!(conversation.status, ConversationStatus::StaffTaken);
    }

    #[tokio::test]
    async fn handoff_assign_errors_distinguish_missing_from_taken() {
        let (store, _dir) = setup_store().await;
        let conversation = store.create_session(None).await.unwrap();
        let handoff = store
            .create_handoff(&conversation.id, "needs a human", HandoffPriority::High)
            .await
            .unwrap();

        let err = store.assign_handoff("missing", "staff-1").await.unwrap_err();
        assert_eq!(err.error_code(), "not_found");

        store.assign_handoff(&handoff.id, "staff-1").await.unwrap();
        let err = store.assign_handoff(&handoff.id, "staff-2").await.unwrap_err();
        assert_eq!(err.error_code(), "validation_error");

        store.resolve_handoff(&handoff.id).await.unwrap();
        let err = store.resolve_handoff(&handoff.id).await.unwrap_err();
        assert_eq!(err.error_code(), "validation_error");
    }
}

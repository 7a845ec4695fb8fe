// SPDX-FileCopyrightText: 2026 CareBridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation CRUD operations.

use carebridge_core::CareError;
use rusqlite::{params, Row};

use crate::database::{map_tr_err, now_ts, Database};
use crate::models::{ActiveConversation, Conversation, ConversationStatus};
use crate::queries::parse_text_enum;

fn row_to_conversation(row: &Row<'_>) -> Result<Conversation, rusqlite::Error> {
    Ok(Conversation {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        status: parse_text_enum::<ConversationStatus>(2, row.get::<_, String>(2)?)?,
        staff_id: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
        closed_at: row.get(6)?,
    })
}

/// Insert a new conversation row.
pub async fn insert(db: &Database, conversation: &Conversation) -> Result<(), CareError> {
    let c = conversation.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO conversations
                     (id, patient_id, status, staff_id, created_at, updated_at, closed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    c.id,
                    c.patient_id,
                    c.status.to_string(),
                    c.staff_id,
                    c.created_at,
                    c.updated_at,
                    c.closed_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a conversation by session token.
pub async fn get(db: &Database, id: &str) -> Result<Option<Conversation>, CareError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, patient_id, status, staff_id, created_at, updated_at, closed_at
                 FROM conversations WHERE id = ?1",
            )?;
            let result = stmt.query_row(params![id], row_to_conversation);
            match result {
                Ok(conversation) => Ok(Some(conversation)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Update a conversation's status and staff assignment.
///
/// `staff_id` is stored as given; callers enforce the invariant that it is
/// present exactly when the status is `staff_taken`.
pub async fn update_status(
    db: &Database,
    id: &str,
    status: ConversationStatus,
    staff_id: Option<String>,
) -> Result<(), CareError> {
    let id = id.to_string();
    let now = now_ts();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations SET status = ?1, staff_id = ?2, updated_at = ?3
                 WHERE id = ?4",
                params![status.to_string(), staff_id, now, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Close a conversation. Idempotent: the first `closed_at` is authoritative,
/// a second close leaves the row untouched.
pub async fn close(db: &Database, id: &str) -> Result<(), CareError> {
    let id = id.to_string();
    let now = now_ts();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations
                 SET status = 'closed', closed_at = ?1, updated_at = ?1
                 WHERE id = ?2 AND closed_at IS NULL",
                params![now, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// List conversations in `ai_active` or `staff_taken` status with message
/// aggregates, most recent activity first. Feeds the staff dashboard.
pub async fn list_active(db: &Database) -> Result<Vec<ActiveConversation>, CareError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, patient_id, status, staff_id, created_at, updated_at, closed_at,
                        message_count, last_message_at
                 FROM active_conversations
                 ORDER BY COALESCE(last_message_at, updated_at) DESC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(ActiveConversation {
                    conversation: row_to_conversation(row)?,
                    message_count: row.get(7)?,
                    last_message_at: row.get(8)?,
                })
            })?;
            let mut conversations = Vec::new();
            for row in rows {
                conversations.push(row?);
            }
            Ok(conversations)
        })
        .await
        .map_err(map_tr_err)
}

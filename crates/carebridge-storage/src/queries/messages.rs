// SPDX-FileCopyrightText: 2026 CareBridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message persistence and context-window retrieval.

use carebridge_core::CareError;
use rusqlite::{params, Row};

use crate::database::{map_tr_err, Database};
use crate::models::{Message, Role};
use crate::queries::parse_text_enum;

fn row_to_message(row: &Row<'_>) -> Result<Message, rusqlite::Error> {
    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        role: parse_text_enum::<Role>(2, row.get::<_, String>(2)?)?,
        content: row.get(3)?,
        metadata: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Insert a message and bump the parent conversation's `updated_at` to the
/// message timestamp, in a single transaction.
pub async fn insert(db: &Database, message: &Message) -> Result<(), CareError> {
    let m = message.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO messages (id, conversation_id, role, content, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    m.id,
                    m.conversation_id,
                    m.role.to_string(),
                    m.content,
                    m.metadata,
                    m.created_at,
                ],
            )?;
            tx.execute(
                "UPDATE conversations SET updated_at = ?1 WHERE id = ?2",
                params![m.created_at, m.conversation_id],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Transcript for a conversation, oldest first. `limit` keeps only the most
/// recent messages; `None` returns everything (SQLite treats a negative
/// LIMIT as unbounded).
pub async fn list(
    db: &Database,
    conversation_id: &str,
    limit: Option<u32>,
) -> Result<Vec<Message>, CareError> {
    let conversation_id = conversation_id.to_string();
    let limit = limit.map(i64::from).unwrap_or(-1);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, role, content, metadata, created_at
                 FROM messages WHERE conversation_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![conversation_id, limit], row_to_message)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            messages.reverse();
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

/// Number of messages stored for a conversation.
pub async fn count(db: &Database, conversation_id: &str) -> Result<i64, CareError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE conversation_id = ?1",
                params![conversation_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
        .map_err(map_tr_err)
}

/// The most recent `limit` messages for inference context, oldest first.
/// The synthetic greeting message is excluded so it never pollutes prompts.
pub async fn context_window(
    db: &Database,
    conversation_id: &str,
    limit: u32,
) -> Result<Vec<Message>, CareError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, role, content, metadata, created_at
                 FROM messages
                 WHERE conversation_id = ?1
                   AND COALESCE(json_extract(metadata, '$.greeting'), 0) != 1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![conversation_id, limit], row_to_message)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            messages.reverse();
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

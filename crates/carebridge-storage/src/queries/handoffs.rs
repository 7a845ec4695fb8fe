// SPDX-FileCopyrightText: 2026 CareBridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Handoff request persistence and the staff-facing priority queue.

use carebridge_core::CareError;
use rusqlite::{params, Row};

use crate::database::{map_tr_err, now_ts, Database};
use crate::models::{HandoffPriority, HandoffRequest, HandoffStatus};
use crate::queries::parse_text_enum;

fn row_to_handoff(row: &Row<'_>) -> Result<HandoffRequest, rusqlite::Error> {
    Ok(HandoffRequest {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        reason: row.get(2)?,
        priority: parse_text_enum::<HandoffPriority>(3, row.get::<_, String>(3)?)?,
        status: parse_text_enum::<HandoffStatus>(4, row.get::<_, String>(4)?)?,
        staff_id: row.get(5)?,
        created_at: row.get(6)?,
        assigned_at: row.get(7)?,
        resolved_at: row.get(8)?,
    })
}

const HANDOFF_COLUMNS: &str =
    "id, conversation_id, reason, priority, status, staff_id, created_at, assigned_at, resolved_at";

/// Insert a new handoff request.
pub async fn insert(db: &Database, handoff: &HandoffRequest) -> Result<(), CareError> {
    let h = handoff.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO handoff_requests
                     (id, conversation_id, reason, priority, status, staff_id,
                      created_at, assigned_at, resolved_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    h.id,
                    h.conversation_id,
                    h.reason,
                    h.priority.to_string(),
                    h.status.to_string(),
                    h.staff_id,
                    h.created_at,
                    h.assigned_at,
                    h.resolved_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a handoff request by id.
pub async fn get(db: &Database, id: &str) -> Result<Option<HandoffRequest>, CareError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {HANDOFF_COLUMNS} FROM handoff_requests WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], row_to_handoff) {
                Ok(handoff) => Ok(Some(handoff)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// The pending queue: at most one entry per conversation (the most recent
/// pending request), ordered by priority rank then age.
pub async fn pending_queue(db: &Database) -> Result<Vec<HandoffRequest>, CareError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {HANDOFF_COLUMNS} FROM pending_handoff_queue
                 ORDER BY CASE priority
                              WHEN 'emergency' THEN 0
                              WHEN 'high' THEN 1
                              WHEN 'normal' THEN 2
                              ELSE 3
                          END,
                          created_at ASC, rid ASC"
            ))?;
            let rows = stmt.query_map([], row_to_handoff)?;
            let mut queue = Vec::new();
            for row in rows {
                queue.push(row?);
            }
            Ok(queue)
        })
        .await
        .map_err(map_tr_err)
}

/// Assign a pending handoff to a staff member. Returns false when the
/// request was not pending (already assigned or resolved) or does not exist.
pub async fn assign(db: &Database, id: &str, staff_id: &str) -> Result<bool, CareError> {
    let id = id.to_string();
    let staff_id = staff_id.to_string();
    let now = now_ts();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE handoff_requests
                 SET status = 'assigned', staff_id = ?1, assigned_at = ?2
                 WHERE id = ?3 AND status = 'pending'",
                params![staff_id, now, id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Resolve an assigned or pending handoff. Returns false when the request
/// was already resolved or does not exist.
pub async fn resolve(db: &Database, id: &str) -> Result<bool, CareError> {
    let id = id.to_string();
    let now = now_ts();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE handoff_requests
                 SET status = 'resolved', resolved_at = ?1
                 WHERE id = ?2 AND status != 'resolved'",
                params![now, id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Mark every pending handoff for a conversation as assigned to the staff
/// member who took the conversation over. Returns the number updated.
pub async fn assign_pending_for_conversation(
    db: &Database,
    conversation_id: &str,
    staff_id: &str,
) -> Result<usize, CareError> {
    let conversation_id = conversation_id.to_string();
    let staff_id = staff_id.to_string();
    let now = now_ts();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE handoff_requests
                 SET status = 'assigned', staff_id = ?1, assigned_at = ?2
                 WHERE conversation_id = ?3 AND status = 'pending'",
                params![staff_id, now, conversation_id],
            )?;
            Ok(changed)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::now_ts;
    use crate::models::{Conversation, ConversationStatus};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        for id in ["conv-1", "conv-2", "conv-3"] {
            let now = now_ts();
            crate::queries::conversations::insert(
                &db,
                &Conversation {
                    id: id.to_string(),
                    patient_id: None,
                    status: ConversationStatus::AiActive,
                    staff_id: None,
                    created_at: now.clone(),
                    updated_at: now,
                    closed_at: None,
                },
            )
            .await
            .unwrap();
        }
        (db, dir)
    }

    fn make_handoff(id: &str, conversation_id: &str, priority: HandoffPriority) -> HandoffRequest {
        HandoffRequest {
            id: id.to_string(),
            conversation_id: conversation_id.to_string(),
            reason: "patient request".to_string(),
            priority,
            status: HandoffStatus::Pending,
            staff_id: None,
            created_at: now_ts(),
            assigned_at: None,
            resolved_at: None,
        }
    }

    #[tokio::test]
    async fn queue_orders_by_priority_then_age() {
        let (db, _dir) = setup_db().await;
        insert(&db, &make_handoff("h-normal", "conv-1", HandoffPriority::Normal))
            .await
            .unwrap();
        insert(&db, &make_handoff("h-emerg", "conv-2", HandoffPriority::Emergency))
            .await
            .unwrap();
        insert(&db, &make_handoff("h-high", "conv-3", HandoffPriority::High))
            .await
            .unwrap();

        let queue = pending_queue(&db).await.unwrap();
        let ids: Vec<&str> = queue.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["h-emerg", "h-high", "h-normal"]);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn queue_keeps_one_entry_per_conversation() {
        let (db, _dir) = setup_db().await;
        insert(&db, &make_handoff("h1", "conv-1", HandoffPriority::Normal))
            .await
            .unwrap();
        insert(&db, &make_handoff("h2", "conv-1", HandoffPriority::High))
            .await
            .unwrap();

        let queue = pending_queue(&db).await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].id, "h2");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn assign_then_resolve_lifecycle() {
        let (db, _dir) = setup_db().await;
        insert(&db, &make_handoff("h1", "conv-1", HandoffPriority::Normal))
            .await
            .unwrap();

        assert!(assign(&db, "h1", "staff-1").await.unwrap());
        let handoff = get(&db, "h1").await.unwrap().unwrap();
        assert_eq!(handoff.status, HandoffStatus::Assigned);
        assert_eq!(handoff.staff_id.as_deref(), Some("staff-1"));
        assert!(handoff.assigned_at.is_some());

        // A second assign is a no-op: the request is no longer pending.
        assert!(!assign(&db, "h1", "staff-2").await.unwrap());

        assert!(resolve(&db, "h1").await.unwrap());
        let handoff = get(&db, "h1").await.unwrap().unwrap();
        assert_eq!(handoff.status, HandoffStatus::Resolved);
        assert!(handoff.resolved_at.is_some());
        assert!(!resolve(&db, "h1").await.unwrap());

        assert!(pending_queue(&db).await.unwrap().is_empty());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn takeover_assigns_all_pending_for_conversation() {
        let (db, _dir) = setup_db().await;
        insert(&db, &make_handoff("h1", "conv-1", HandoffPriority::Normal))
            .await
            .unwrap();
        insert(&db, &make_handoff("h2", "conv-1", HandoffPriority::Emergency))
            .await
            .unwrap();
        insert(&db, &make_handoff("h3", "conv-2", HandoffPriority::Normal))
            .await
            .unwrap();

        let updated = assign_pending_for_conversation(&db, "conv-1", "staff-9")
            .await
            .unwrap();
        assert_eq!(updated, 2);

        let queue = pending_queue(&db).await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].conversation_id, "conv-2");

        db.close().await.unwrap();
    }
}

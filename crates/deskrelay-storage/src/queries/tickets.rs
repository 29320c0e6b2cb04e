// SPDX-FileCopyrightText: 2026 Deskrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket CRUD operations.

use deskrelay_core::{RelayError, Ticket, TicketId, TicketStatus, TopicId, UserId};
use rusqlite::params;

use crate::database::Database;

fn row_to_ticket(row: &rusqlite::Row<'_>) -> Result<Ticket, rusqlite::Error> {
    let status: String = row.get(4)?;
    let status = status.parse::<TicketStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Ticket {
        id: TicketId(row.get(0)?),
        user_id: UserId(row.get(1)?),
        username: row.get(2)?,
        topic_id: TopicId(row.get(3)?),
        status,
        created_at: row.get(5)?,
        closed_at: row.get(6)?,
    })
}

const TICKET_COLUMNS: &str = "id, user_id, username, topic_id, status, created_at, closed_at";

/// Insert a new open ticket and return its assigned id.
pub async fn create_ticket(
    db: &Database,
    user_id: UserId,
    username: Option<&str>,
    topic_id: TopicId,
) -> Result<TicketId, RelayError> {
    let username = username.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO tickets (user_id, username, topic_id, status, created_at)
                 VALUES (?1, ?2, ?3, 'open', strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
                params![user_id.0, username, topic_id.0],
            )?;
            Ok(TicketId(conn.last_insert_rowid()))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark the ticket bound to `topic_id` as closed. No-op if already
/// closed or unknown; returns whether a row changed.
pub async fn close_ticket_by_topic(db: &Database, topic_id: TopicId) -> Result<bool, RelayError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE tickets
                 SET status = 'closed', closed_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE topic_id = ?1 AND status = 'open'",
                params![topic_id.0],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get the ticket bound to a topic (open or closed; a topic is never
/// reused, so at most one row matches).
pub async fn ticket_by_topic(db: &Database, topic_id: TopicId) -> Result<Option<Ticket>, RelayError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TICKET_COLUMNS} FROM tickets WHERE topic_id = ?1"
            ))?;
            let result = stmt.query_row(params![topic_id.0], row_to_ticket);
            match result {
                Ok(ticket) => Ok(Some(ticket)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get the user's currently open ticket, if any.
pub async fn open_ticket_by_user(db: &Database, user_id: UserId) -> Result<Option<Ticket>, RelayError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TICKET_COLUMNS} FROM tickets
                 WHERE user_id = ?1 AND status = 'open'
                 ORDER BY id DESC LIMIT 1"
            ))?;
            let result = stmt.query_row(params![user_id.0], row_to_ticket);
            match result {
                Ok(ticket) => Ok(Some(ticket)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get the user's most recent ticket regardless of status.
pub async fn last_ticket_by_user(db: &Database, user_id: UserId) -> Result<Option<Ticket>, RelayError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TICKET_COLUMNS} FROM tickets
                 WHERE user_id = ?1 ORDER BY id DESC LIMIT 1"
            ))?;
            let result = stmt.query_row(params![user_id.0], row_to_ticket);
            match result {
                Ok(ticket) => Ok(Some(ticket)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List all open tickets, oldest first. Used by startup recovery.
pub async fn open_tickets(db: &Database) -> Result<Vec<Ticket>, RelayError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TICKET_COLUMNS} FROM tickets
                 WHERE status = 'open' ORDER BY id ASC"
            ))?;
            let rows = stmt.query_map([], row_to_ticket)?;
            let mut tickets = Vec::new();
            for row in rows {
                tickets.push(row?);
            }
            Ok(tickets)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn create_and_fetch_by_topic() {
        let (db, _dir) = setup_db().await;

        let id = create_ticket(&db, UserId(42), Some("alice"), TopicId(7))
            .await
            .unwrap();

        let ticket = ticket_by_topic(&db, TopicId(7)).await.unwrap().unwrap();
        assert_eq!(ticket.id, id);
        assert_eq!(ticket.user_id, UserId(42));
        assert_eq!(ticket.username.as_deref(), Some("alice"));
        assert_eq!(ticket.status, TicketStatus::Open);
        assert!(ticket.closed_at.is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn ticket_ids_are_monotonic() {
        let (db, _dir) = setup_db().await;

        let a = create_ticket(&db, UserId(1), None, TopicId(10)).await.unwrap();
        let b = create_ticket(&db, UserId(2), None, TopicId(11)).await.unwrap();
        assert!(b.0 > a.0);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (db, _dir) = setup_db().await;

        create_ticket(&db, UserId(1), None, TopicId(5)).await.unwrap();
        assert!(close_ticket_by_topic(&db, TopicId(5)).await.unwrap());
        // Second close changes nothing.
        assert!(!close_ticket_by_topic(&db, TopicId(5)).await.unwrap());

        let ticket = ticket_by_topic(&db, TopicId(5)).await.unwrap().unwrap();
        assert_eq!(ticket.status, TicketStatus::Closed);
        assert!(ticket.closed_at.is_some());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_ticket_by_user_ignores_closed_ones() {
        let (db, _dir) = setup_db().await;

        create_ticket(&db, UserId(9), None, TopicId(1)).await.unwrap();
        close_ticket_by_topic(&db, TopicId(1)).await.unwrap();
        let open = create_ticket(&db, UserId(9), None, TopicId(2)).await.unwrap();

        let found = open_ticket_by_user(&db, UserId(9)).await.unwrap().unwrap();
        assert_eq!(found.id, open);

        // After closing everything, none is open but last_ticket still resolves.
        close_ticket_by_topic(&db, TopicId(2)).await.unwrap();
        assert!(open_ticket_by_user(&db, UserId(9)).await.unwrap().is_none());
        let last = last_ticket_by_user(&db, UserId(9)).await.unwrap().unwrap();
        assert_eq!(last.id, open);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_tickets_lists_oldest_first() {
        let (db, _dir) = setup_db().await;

        create_ticket(&db, UserId(1), None, TopicId(1)).await.unwrap();
        create_ticket(&db, UserId(2), None, TopicId(2)).await.unwrap();
        create_ticket(&db, UserId(3), None, TopicId(3)).await.unwrap();
        close_ticket_by_topic(&db, TopicId(2)).await.unwrap();

        let open = open_tickets(&db).await.unwrap();
        assert_eq!(open.len(), 2);
        assert_eq!(open[0].user_id, UserId(1));
        assert_eq!(open[1].user_id, UserId(3));

        db.close().await.unwrap();
    }
}

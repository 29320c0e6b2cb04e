// SPDX-FileCopyrightText: 2026 Deskrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message-identity link operations.
//!
//! Each mirrored message gets one row associating the topic-side copy
//! with the user-side original (or vice versa). Replays are ignored so
//! re-delivery after a crash cannot corrupt an existing association.

use deskrelay_core::{MessageId, MessageLink, RelayError, UserId};
use rusqlite::params;

use crate::database::Database;

/// Record a link. Insert-or-ignore: an existing row for either key
/// wins over a replay.
pub async fn insert_link(db: &Database, link: MessageLink) -> Result<(), RelayError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO message_links (topic_msg_id, user_id, user_msg_id)
                 VALUES (?1, ?2, ?3)",
                params![link.topic_msg_id.0, link.user_id.0, link.user_msg_id.0],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Resolve a topic-side message id to its link.
pub async fn link_by_topic_msg(
    db: &Database,
    topic_msg_id: MessageId,
) -> Result<Option<MessageLink>, RelayError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT topic_msg_id, user_id, user_msg_id
                 FROM message_links WHERE topic_msg_id = ?1",
            )?;
            let result = stmt.query_row(params![topic_msg_id.0], row_to_link);
            match result {
                Ok(link) => Ok(Some(link)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Resolve a user-side message id to its link. Message ids are only
/// unique per private chat, so the user id is part of the key.
pub async fn link_by_user_msg(
    db: &Database,
    user_id: UserId,
    user_msg_id: MessageId,
) -> Result<Option<MessageLink>, RelayError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT topic_msg_id, user_id, user_msg_id
                 FROM message_links WHERE user_id = ?1 AND user_msg_id = ?2",
            )?;
            let result = stmt.query_row(params![user_id.0, user_msg_id.0], row_to_link);
            match result {
                Ok(link) => Ok(Some(link)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn row_to_link(row: &rusqlite::Row<'_>) -> Result<MessageLink, rusqlite::Error> {
    Ok(MessageLink {
        topic_msg_id: MessageId(row.get(0)?),
        user_id: UserId(row.get(1)?),
        user_msg_id: MessageId(row.get(2)?),
    })
}

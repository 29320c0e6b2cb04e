// SPDX-FileCopyrightText: 2026 Deskrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ban list operations.

use deskrelay_core::{BanRecord, RelayError, UserId};
use rusqlite::params;

use crate::database::Database;

/// Record a ban. Re-banning an already banned user overwrites the
/// reason and admin.
pub async fn insert_ban(
    db: &Database,
    user_id: UserId,
    reason: &str,
    admin_id: UserId,
) -> Result<(), RelayError> {
    let reason = reason.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO banned_users (user_id, reason, admin_id, banned_at)
                 VALUES (?1, ?2, ?3, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                 ON CONFLICT(user_id) DO UPDATE SET
                   reason = excluded.reason,
                   admin_id = excluded.admin_id,
                   banned_at = excluded.banned_at",
                params![user_id.0, reason, admin_id.0],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Lift a ban. Returns whether a row was removed.
pub async fn remove_ban(db: &Database, user_id: UserId) -> Result<bool, RelayError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "DELETE FROM banned_users WHERE user_id = ?1",
                params![user_id.0],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Look up a user's ban record, if any.
pub async fn ban_for(db: &Database, user_id: UserId) -> Result<Option<BanRecord>, RelayError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, reason, admin_id, banned_at
                 FROM banned_users WHERE user_id = ?1",
            )?;
            let result = stmt.query_row(params![user_id.0], |row| {
                Ok(BanRecord {
                    user_id: UserId(row.get(0)?),
                    reason: row.get(1)?,
                    admin_id: UserId(row.get(2)?),
                    banned_at: row.get(3)?,
                })
            });
            match result {
                Ok(ban) => Ok(Some(ban)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

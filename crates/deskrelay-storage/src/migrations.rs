// SPDX-FileCopyrightText: 2026 Deskrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded schema migrations.
//!
//! Migrations live in `migrations/` as numbered SQL files and are
//! compiled into the binary with refinery's `embed_migrations!`.

use refinery::embed_migrations;

embed_migrations!("migrations");

/// Runs all pending migrations against the given connection.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), refinery::Error> {
    let report = migrations::runner().run(conn)?;
    for applied in report.applied_migrations() {
        tracing::info!(migration = %applied, "applied migration");
    }
    Ok(())
}

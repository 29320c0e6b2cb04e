// SPDX-FileCopyrightText: 2026 Deskrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the Deskrelay support bridge.
//!
//! Holds tickets, bans, message-identity links, and operator-managed
//! settings. All writes go through a single serialized connection
//! (tokio-rusqlite); the [`SqliteStore`] type implements the
//! [`deskrelay_core::SupportStore`] trait on top of the query modules.

pub mod database;
pub mod migrations;
pub mod queries;
pub mod store;

pub use database::Database;
pub use store::SqliteStore;

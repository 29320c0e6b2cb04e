// SPDX-FileCopyrightText: 2026 Deskrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Deskrelay support bridge.
//!
//! This crate provides the error taxonomy, domain types, and the two
//! collaborator traits ([`SupportGateway`], [`SupportStore`]) used
//! throughout the workspace. It performs no I/O itself.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{GatewayError, RelayError};
pub use traits::{SupportGateway, SupportStore};
pub use types::{
    BanRecord, Button, ButtonAction, CallbackEvent, Destination, MediaItem, MediaKind, MessageId,
    MessageLink, Ticket, TicketId, TicketStatus, TopicId, TopicMessage, UserId, UserMessage,
    UserProfile,
};

// SPDX-FileCopyrightText: 2026 Deskrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket relay and concurrency-control engine.
//!
//! Bridges user-side events and operator-side events over the
//! [`deskrelay_core::SupportGateway`] and [`deskrelay_core::SupportStore`]
//! traits. All shared state lives in per-key concurrent tables; there is
//! no global lock.
//!
//! The pieces:
//!
//! - [`session::SessionTable`] - per-user conversation phase plus the
//!   topic-to-user index, self-healing against the store
//! - [`ticket`] - ticket lifecycle flows (open, close, ban, recovery)
//! - [`identity::IdentityMap`] - durable bidirectional message links
//! - [`album::AlbumAssembler`] - grouped-media reassembly with one flush
//!   timer per group
//! - [`flood::RateLimiter`] - per-user cool-down with album and phase
//!   bypasses
//! - [`bans::BanCache`] - ban set reconciled on every access
//! - [`retry`] - bounded retry around individual gateway calls
//! - [`dispatch::Relay`] - the event dispatcher composing all of the above

pub mod album;
pub mod bans;
pub mod dispatch;
pub mod flood;
pub mod identity;
pub mod retry;
pub mod session;
pub mod text;
pub mod ticket;

pub use dispatch::{Relay, Tuning};
pub use retry::RetryPolicy;
pub use session::Phase;
pub use ticket::{CloseOutcome, ClosedBy};

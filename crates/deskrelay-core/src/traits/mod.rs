// SPDX-FileCopyrightText: 2026 Deskrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits at the system boundary.
//!
//! The relay engine only ever talks to the messaging platform through
//! [`SupportGateway`] and to durable storage through [`SupportStore`],
//! so both can be swapped for mocks in tests.

pub mod gateway;
pub mod store;

pub use gateway::SupportGateway;
pub use store::SupportStore;

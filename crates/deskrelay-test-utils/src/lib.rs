// SPDX-FileCopyrightText: 2026 Deskrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Deskrelay integration tests.
//!
//! Provides mock adapters for fast, deterministic, CI-runnable tests
//! without a live messaging platform or a database file.
//!
//! # Components
//!
//! - [`MockGateway`] - gateway double that captures every outbound call
//!   and hands out deterministic message and topic ids
//! - [`MemoryStore`] - in-memory [`deskrelay_core::SupportStore`]

pub mod memory_store;
pub mod mock_gateway;

pub use memory_store::MemoryStore;
pub use mock_gateway::{GatewayCall, MockGateway};

// SPDX-FileCopyrightText: 2026 Deskrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded retry around a single gateway call.
//!
//! Rate-limit pushback sleeps for the platform-provided interval plus a
//! safety margin; transient failures wait a fixed short delay. An
//! unreachable peer is permanent and propagates immediately. Exhausting
//! the attempt budget yields `Ok(None)` so the call site picks its own
//! fallback, typically a notice to the other side.

use std::future::Future;
use std::time::Duration;

use deskrelay_core::GatewayError;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub transient_delay: Duration,
    pub rate_limit_margin: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            transient_delay: Duration::from_millis(500),
            rate_limit_margin: Duration::from_millis(500),
        }
    }
}

/// Runs `call` until it succeeds, fails permanently, or the attempt
/// budget runs out.
pub async fn send_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    mut call: F,
) -> Result<Option<T>, GatewayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
{
    for attempt in 1..=policy.max_attempts {
        match call().await {
            Ok(value) => return Ok(Some(value)),
            Err(GatewayError::RateLimited { retry_after }) => {
                debug!(attempt, ?retry_after, "rate limited, backing off");
                if attempt < policy.max_attempts {
                    tokio::time::sleep(retry_after + policy.rate_limit_margin).await;
                }
            }
            Err(err @ GatewayError::Unreachable(_)) => return Err(err),
            Err(GatewayError::Other { message, .. }) => {
                debug!(attempt, %message, "transient gateway failure");
                if attempt < policy.max_attempts {
                    tokio::time::sleep(policy.transient_delay).await;
                }
            }
        }
    }
    warn!(attempts = policy.max_attempts, "gateway call gave up");
    Ok(None)
}

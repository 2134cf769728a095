use std::sync::Arc;

use store::{DonationStore, RateLimitDecision};

use crate::clock::Clock;
use crate::config::RateLimitConfig;
use crate::error::EngineError;
use crate::metrics::record_rate_limit;

/// Per-actor, per-operation fixed-window throttle.
///
/// Each check is one atomic increment-or-reset in the store. A store
/// failure denies the call.
pub struct RateLimiter {
    store: Arc<dyn DonationStore>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn DonationStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Count one invocation and report whether it fits in the window.
    pub fn check_and_consume(
        &self,
        actor_id: &str,
        operation: &str,
        max_requests: u32,
        window: chrono::Duration,
    ) -> Result<RateLimitDecision, EngineError> {
        let now = self.clock.now();
        match self
            .store
            .hit_rate_limit(actor_id, operation, max_requests, window, now)
        {
            Ok(decision) => {
                record_rate_limit(operation, decision.allowed);
                Ok(decision)
            }
            Err(err) => {
                tracing::warn!(actor_id, operation, error = %err, "rate limit check failed, denying");
                record_rate_limit(operation, false);
                Err(err.into())
            }
        }
    }

    /// Like [`check_and_consume`](Self::check_and_consume) with a
    /// configured policy, turning a denial into `RateLimited`.
    pub fn enforce(&self, actor_id: &str, policy: &RateLimitConfig) -> Result<(), EngineError> {
        let decision = self.check_and_consume(
            actor_id,
            &policy.operation,
            policy.max_requests,
            policy.window(),
        )?;
        if decision.allowed {
            return Ok(());
        }
        tracing::warn!(
            actor_id,
            operation = %policy.operation,
            count = decision.count,
            max = policy.max_requests,
            "rate limit exceeded"
        );
        Err(EngineError::RateLimited {
            operation: policy.operation.clone(),
            retry_at: decision.resets_at,
        })
    }
}

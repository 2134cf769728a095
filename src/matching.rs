use std::sync::Arc;

use matcher::Ranker;
use serde::Serialize;
use store::{DonationStore, Mapping};

use crate::clock::Clock;
use crate::config::RateLimitConfig;
use crate::error::EngineError;
use crate::identity::{Identity, Role};
use crate::metrics::MetricsSpan;
use crate::rate_limit::RateLimiter;

/// Highest-scoring recipient of a matching run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopMatch {
    pub recipient_id: String,
    pub score: f64,
}

/// Result of one matching run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSummary {
    pub donation_id: String,
    pub match_count: usize,
    pub top_match: Option<TopMatch>,
    /// The persisted batch, highest score first.
    pub mappings: Vec<Mapping>,
}

impl MatchSummary {
    fn empty(donation_id: &str) -> Self {
        Self {
            donation_id: donation_id.to_string(),
            match_count: 0,
            top_match: None,
            mappings: Vec::new(),
        }
    }
}

/// Scores every recipient against a donation and persists the top matches.
pub struct MatchingOrchestrator {
    store: Arc<dyn DonationStore>,
    ranker: Ranker,
    limiter: RateLimiter,
    policy: RateLimitConfig,
    clock: Arc<dyn Clock>,
}

impl MatchingOrchestrator {
    pub fn new(
        store: Arc<dyn DonationStore>,
        ranker: Ranker,
        policy: RateLimitConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let limiter = RateLimiter::new(Arc::clone(&store), Arc::clone(&clock));
        Self {
            store,
            ranker,
            limiter,
            policy,
            clock,
        }
    }

    /// Run matching for one donation on behalf of an administrator.
    ///
    /// Re-running replaces the donation's previous batch, so at most
    /// `top_k` mappings are ever visible per donation.
    pub fn run_matching(
        &self,
        donation_id: &str,
        identity: &Identity,
    ) -> Result<MatchSummary, EngineError> {
        let span = MetricsSpan::start();
        let result = self.run_inner(donation_id, identity);
        if let Some(span) = span {
            span.record_matching(result.as_ref().map(|s| s.match_count));
        }
        result
    }

    fn run_inner(
        &self,
        donation_id: &str,
        identity: &Identity,
    ) -> Result<MatchSummary, EngineError> {
        let caller = identity.require_role(Role::Admin)?;
        self.limiter.enforce(&caller.user_id, &self.policy)?;

        let donation = self
            .store
            .get_donation(donation_id)?
            .ok_or_else(|| EngineError::not_found("donation", donation_id))?;

        let recipients = self.store.list_recipients()?;
        if recipients.is_empty() {
            tracing::info!(donation_id, "no recipients registered, nothing to match");
            return Ok(MatchSummary::empty(donation_id));
        }

        let source = donation.matching_text();
        let targets: Vec<String> = recipients.iter().map(|r| r.matching_text()).collect();
        let ranked = self.ranker.rank(
            &source,
            recipients
                .iter()
                .zip(&targets)
                .map(|(r, text)| (r.id.as_str(), text.as_str())),
        );

        let now = self.clock.now();
        let mappings: Vec<Mapping> = ranked
            .iter()
            .map(|m| Mapping {
                id: uuid::Uuid::new_v4().to_string(),
                donation_id: donation.id.clone(),
                recipient_id: m.recipient_id.clone(),
                score: m.score,
                created_at: now,
            })
            .collect();

        if let Err(err) = self.store.replace_mappings(&donation.id, &mappings) {
            tracing::error!(
                donation_id,
                computed = mappings.len(),
                error = %err,
                "failed to persist mappings"
            );
            return Err(EngineError::MappingsNotPersisted {
                computed: mappings.len(),
                reason: err.to_string(),
            });
        }

        let top_match = ranked.first().map(|m| TopMatch {
            recipient_id: m.recipient_id.clone(),
            score: m.score,
        });
        tracing::info!(
            donation_id,
            candidates = recipients.len(),
            matches = mappings.len(),
            top_score = top_match.as_ref().map(|t| t.score),
            "matching completed"
        );

        Ok(MatchSummary {
            donation_id: donation.id,
            match_count: mappings.len(),
            top_match,
            mappings,
        })
    }

    /// The current mapping batch of a donation. Administrators only.
    pub fn mappings(
        &self,
        donation_id: &str,
        identity: &Identity,
    ) -> Result<Vec<Mapping>, EngineError> {
        identity.require_role(Role::Admin)?;
        if self.store.get_donation(donation_id)?.is_none() {
            return Err(EngineError::not_found("donation", donation_id));
        }
        Ok(self.store.mappings_for_donation(donation_id)?)
    }
}

use std::sync::Arc;

use serde::Serialize;
use store::{Conditional, Donation, DonationStatus, DonationStore};

use crate::clock::Clock;
use crate::error::EngineError;
use crate::identity::{Identity, Role};
use crate::matching::{MatchSummary, MatchingOrchestrator};

/// What happened to the matching run that follows an approval.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchingOutcome {
    Matched(MatchSummary),
    Failed(EngineError),
}

impl MatchingOutcome {
    pub fn is_matched(&self) -> bool {
        matches!(self, MatchingOutcome::Matched(_))
    }
}

/// Approval and matching are independent signals: the donation is
/// approved whatever `matching` says.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalReport {
    pub donation: Donation,
    pub matching: MatchingOutcome,
}

/// Serialized view of [`MatchingOutcome`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum MatchingOutcomeView {
    Matched {
        #[serde(flatten)]
        summary: MatchSummary,
    },
    Failed {
        code: &'static str,
        message: String,
    },
}

impl From<&MatchingOutcome> for MatchingOutcomeView {
    fn from(outcome: &MatchingOutcome) -> Self {
        match outcome {
            MatchingOutcome::Matched(summary) => MatchingOutcomeView::Matched {
                summary: summary.clone(),
            },
            MatchingOutcome::Failed(err) => MatchingOutcomeView::Failed {
                code: err.code(),
                message: err.to_string(),
            },
        }
    }
}

/// Administrator-driven status transitions of a donation.
///
/// `approved -> claimed` is not here; only the claim coordinator moves a
/// donation there.
pub struct Lifecycle {
    store: Arc<dyn DonationStore>,
    matching: Arc<MatchingOrchestrator>,
    clock: Arc<dyn Clock>,
}

impl Lifecycle {
    pub fn new(
        store: Arc<dyn DonationStore>,
        matching: Arc<MatchingOrchestrator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            matching,
            clock,
        }
    }

    /// Approve a pending donation, then run matching for it.
    pub fn approve(&self, donation_id: &str, identity: &Identity) -> Result<ApprovalReport, EngineError> {
        let caller = identity.require_role(Role::Admin)?;
        let donation = self.transition(donation_id, DonationStatus::Approved)?;
        tracing::info!(donation_id, admin = %caller.user_id, "donation approved");

        let matching = match self.matching.run_matching(donation_id, identity) {
            Ok(summary) => MatchingOutcome::Matched(summary),
            Err(err) => {
                tracing::warn!(donation_id, error = %err, "approved, but matching failed");
                MatchingOutcome::Failed(err)
            }
        };
        Ok(ApprovalReport { donation, matching })
    }

    pub fn reject(&self, donation_id: &str, identity: &Identity) -> Result<Donation, EngineError> {
        let caller = identity.require_role(Role::Admin)?;
        let donation = self.transition(donation_id, DonationStatus::Rejected)?;
        tracing::info!(donation_id, admin = %caller.user_id, "donation rejected");
        Ok(donation)
    }

    fn transition(&self, donation_id: &str, next: DonationStatus) -> Result<Donation, EngineError> {
        // Every administrator transition starts from `pending`.
        let expected = DonationStatus::Pending;
        debug_assert!(expected.can_transition_to(next));
        match self
            .store
            .transition_status(donation_id, expected, next, self.clock.now())?
        {
            Conditional::Applied(donation) => Ok(donation),
            Conditional::StatusMismatch(from) => Err(EngineError::InvalidTransition { from, to: next }),
            Conditional::Missing => Err(EngineError::not_found("donation", donation_id)),
        }
    }
}

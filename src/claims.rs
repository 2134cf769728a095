use std::sync::Arc;

use store::{Claim, Conditional, DonationStatus, DonationStore};

use crate::clock::Clock;
use crate::error::EngineError;
use crate::identity::{Identity, Role};
use crate::metrics::MetricsSpan;
use crate::recipients::RecipientDirectory;

/// Executes claim attempts.
///
/// The status flip and the claim insert are a single conditional store
/// write keyed on `approved`, so among concurrent attempts on one donation
/// exactly one wins and the rest leave no trace. Mappings are never
/// consulted: any recipient may claim any approved donation.
pub struct ClaimCoordinator {
    store: Arc<dyn DonationStore>,
    directory: Arc<RecipientDirectory>,
    clock: Arc<dyn Clock>,
}

impl ClaimCoordinator {
    pub fn new(
        store: Arc<dyn DonationStore>,
        directory: Arc<RecipientDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            directory,
            clock,
        }
    }

    /// Claim `donation_id` for `recipient_id`.
    ///
    /// Recipients may only claim for their own profile; administrators may
    /// claim on behalf of any profile.
    pub fn claim(
        &self,
        donation_id: &str,
        recipient_id: &str,
        identity: &Identity,
    ) -> Result<Claim, EngineError> {
        let span = MetricsSpan::start();
        let result = self.claim_inner(donation_id, recipient_id, identity);
        if let Some(span) = span {
            span.record_claim(result.as_ref().map(|_| ()));
        }
        result
    }

    /// Provision the caller's profile if needed, then claim for it.
    pub fn claim_as_caller(
        &self,
        donation_id: &str,
        identity: &Identity,
    ) -> Result<Claim, EngineError> {
        let profile = self.directory.ensure_profile(identity)?;
        self.claim(donation_id, &profile.id, identity)
    }

    fn claim_inner(
        &self,
        donation_id: &str,
        recipient_id: &str,
        identity: &Identity,
    ) -> Result<Claim, EngineError> {
        let caller = identity.require_any_role(&[Role::Recipient, Role::Admin])?;
        let recipient = self.directory.get(recipient_id)?;
        if !caller.is_admin() && recipient.user_id.as_deref() != Some(caller.user_id.as_str()) {
            return Err(EngineError::Forbidden(format!(
                "owner of recipient '{recipient_id}'"
            )));
        }

        let claim = Claim {
            id: uuid::Uuid::new_v4().to_string(),
            donation_id: donation_id.to_string(),
            recipient_id: recipient.id,
            claimed_by: caller.user_id.clone(),
            claimed_at: self.clock.now(),
        };

        match self.store.claim_donation(&claim)? {
            Conditional::Applied(claim) => {
                tracing::info!(
                    donation_id,
                    recipient_id = %claim.recipient_id,
                    claim_id = %claim.id,
                    "donation claimed"
                );
                Ok(claim)
            }
            Conditional::StatusMismatch(DonationStatus::Claimed) => {
                tracing::debug!(donation_id, recipient_id, "claim lost, already claimed");
                Err(EngineError::AlreadyClaimed(donation_id.to_string()))
            }
            Conditional::StatusMismatch(status) => Err(EngineError::NotApproved {
                donation_id: donation_id.to_string(),
                status,
            }),
            Conditional::Missing => Err(EngineError::not_found("donation", donation_id)),
        }
    }

    pub fn claim_for_donation(
        &self,
        donation_id: &str,
        identity: &Identity,
    ) -> Result<Option<Claim>, EngineError> {
        identity.require_authenticated()?;
        Ok(self.store.claim_for_donation(donation_id)?)
    }
}

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use store::{
    Claim, Donation, DonationStatus, DonationStore, RecipientProfile, RequirementEntry,
    Requirements,
};

use crate::clock::Clock;
use crate::error::EngineError;
use crate::identity::{Caller, Identity, Role};

/// Name given to an auto-provisioned profile when the caller has neither
/// an organization nor a display name.
pub const DEFAULT_ORGANIZATION_NAME: &str = "NGO Organization";

/// Editable profile fields. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default)]
    pub organization_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
}

/// An approved donation suggested to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailableDonation {
    pub donation: Donation,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClaimedDonation {
    pub claim: Claim,
    pub donation: Donation,
}

/// Recipient organization profiles and their requirement lists.
pub struct RecipientDirectory {
    store: Arc<dyn DonationStore>,
    clock: Arc<dyn Clock>,
}

impl RecipientDirectory {
    pub fn new(store: Arc<dyn DonationStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// The caller's profile, created on first use. Retry-safe.
    pub fn ensure_profile(&self, identity: &Identity) -> Result<RecipientProfile, EngineError> {
        let caller = identity.require_any_role(&[Role::Recipient, Role::Admin])?;
        if let Some(existing) = self.store.recipient_for_user(&caller.user_id)? {
            return Ok(existing);
        }
        let profile = self.store.provision_recipient(&self.minimal_profile(caller))?;
        tracing::info!(
            user_id = %caller.user_id,
            recipient_id = %profile.id,
            "recipient profile provisioned"
        );
        Ok(profile)
    }

    fn minimal_profile(&self, caller: &Caller) -> RecipientProfile {
        let organization_name = [caller.organization_name.as_deref(), caller.name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
            .unwrap_or(DEFAULT_ORGANIZATION_NAME)
            .to_string();
        RecipientProfile {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: Some(caller.user_id.clone()),
            organization_name,
            contact_email: caller.email.clone(),
            description: None,
            requirements: Requirements::default(),
            created_at: self.clock.now(),
        }
    }

    pub fn get(&self, recipient_id: &str) -> Result<RecipientProfile, EngineError> {
        self.store
            .get_recipient(recipient_id)?
            .ok_or_else(|| EngineError::not_found("recipient", recipient_id))
    }

    /// All profiles in candidate order. Administrators only.
    pub fn list(&self, identity: &Identity) -> Result<Vec<RecipientProfile>, EngineError> {
        identity.require_role(Role::Admin)?;
        Ok(self.store.list_recipients()?)
    }

    pub fn update_profile(
        &self,
        identity: &Identity,
        update: ProfileUpdate,
    ) -> Result<RecipientProfile, EngineError> {
        let name = match update.organization_name.as_deref().map(str::trim) {
            Some("") => {
                return Err(EngineError::validation("organization name must not be blank"));
            }
            other => other.map(str::to_string),
        };
        let (profile, ()) = self.modify_own(identity, |profile| {
            if let Some(name) = &name {
                profile.organization_name = name.clone();
            }
            if let Some(description) = &update.description {
                profile.description = Some(description.clone()).filter(|d| !d.trim().is_empty());
            }
            if let Some(email) = &update.contact_email {
                profile.contact_email = Some(email.clone()).filter(|e| !e.trim().is_empty());
            }
            Ok(())
        })?;
        Ok(profile)
    }

    pub fn add_requirement(
        &self,
        identity: &Identity,
        text: &str,
    ) -> Result<RequirementEntry, EngineError> {
        let text = non_blank(text)?;
        let (profile, entry) =
            self.modify_own(identity, |profile| Ok(profile.requirements.add(text)))?;
        tracing::debug!(recipient_id = %profile.id, entry_id = %entry.id, "requirement added");
        Ok(entry)
    }

    pub fn edit_requirement(
        &self,
        identity: &Identity,
        entry_id: &str,
        text: &str,
    ) -> Result<RequirementEntry, EngineError> {
        let text = non_blank(text)?;
        let (_, entry) = self.modify_own(identity, |profile| {
            profile
                .requirements
                .edit(entry_id, text)
                .ok_or_else(|| EngineError::not_found("requirement", entry_id))
        })?;
        Ok(entry)
    }

    pub fn delete_requirement(&self, identity: &Identity, entry_id: &str) -> Result<(), EngineError> {
        self.modify_own(identity, |profile| {
            if profile.requirements.remove(entry_id) {
                Ok(())
            } else {
                Err(EngineError::not_found("requirement", entry_id))
            }
        })?;
        Ok(())
    }

    /// Apply `edit` to the caller's profile in one atomic store update.
    /// An `Err` from `edit` leaves the stored profile unchanged.
    fn modify_own<T>(
        &self,
        identity: &Identity,
        mut edit: impl FnMut(&mut RecipientProfile) -> Result<T, EngineError>,
    ) -> Result<(RecipientProfile, T), EngineError> {
        let profile = self.ensure_profile(identity)?;
        let mut outcome = None;
        let stored = self.store.modify_recipient(&profile.id, &mut |draft| {
            let result = edit(draft);
            let keep = result.is_ok();
            outcome = Some(result);
            keep
        })?;
        match (stored, outcome) {
            (Some(stored), Some(result)) => Ok((stored, result?)),
            _ => Err(EngineError::not_found("recipient", &profile.id)),
        }
    }

    /// Approved donations matched to the caller, best score first.
    pub fn available_donations(
        &self,
        identity: &Identity,
    ) -> Result<Vec<AvailableDonation>, EngineError> {
        let profile = self.ensure_profile(identity)?;
        let mut out = Vec::new();
        for mapping in self.store.mappings_for_recipient(&profile.id)? {
            let Some(donation) = self.store.get_donation(&mapping.donation_id)? else {
                continue;
            };
            if donation.status == DonationStatus::Approved {
                out.push(AvailableDonation {
                    donation,
                    score: mapping.score,
                });
            }
        }
        Ok(out)
    }

    /// The caller's claims, newest first.
    pub fn claimed_donations(
        &self,
        identity: &Identity,
    ) -> Result<Vec<ClaimedDonation>, EngineError> {
        let profile = self.ensure_profile(identity)?;
        let mut out = Vec::new();
        for claim in self.store.claims_for_recipient(&profile.id)? {
            match self.store.get_donation(&claim.donation_id)? {
                Some(donation) => out.push(ClaimedDonation { claim, donation }),
                None => {
                    tracing::warn!(claim_id = %claim.id, donation_id = %claim.donation_id, "claim refers to a missing donation");
                }
            }
        }
        Ok(out)
    }
}

fn non_blank(text: &str) -> Result<&str, EngineError> {
    let text = text.trim();
    if text.is_empty() {
        Err(EngineError::validation("requirement text must not be blank"))
    } else {
        Ok(text)
    }
}

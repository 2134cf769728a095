use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;
use store::{Donation, DonationFilter, DonationStatus, DonationStore};

use crate::clock::Clock;
use crate::error::EngineError;
use crate::identity::{Identity, Role};

/// A donor's submission.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDonation {
    #[serde(alias = "medicineName")]
    pub item_name: String,
    /// Signed so a non-positive value is a validation error, not a decode error.
    pub quantity: i64,
    pub expiry_date: NaiveDate,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Donor submissions and the administrator queues built on them.
pub struct DonationIntake {
    store: Arc<dyn DonationStore>,
    clock: Arc<dyn Clock>,
}

impl DonationIntake {
    pub fn new(store: Arc<dyn DonationStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Record a new donation in `pending`.
    pub fn submit(&self, identity: &Identity, new: NewDonation) -> Result<Donation, EngineError> {
        let caller = identity.require_role(Role::Donor)?;

        let item_name = new.item_name.trim();
        if item_name.is_empty() {
            return Err(EngineError::validation("item name must not be blank"));
        }
        if new.quantity <= 0 {
            return Err(EngineError::validation("quantity must be positive"));
        }
        let quantity = u32::try_from(new.quantity)
            .map_err(|_| EngineError::validation("quantity is too large"))?;
        let today = self.clock.today();
        if new.expiry_date < today {
            return Err(EngineError::validation(format!(
                "expiry date {} is in the past",
                new.expiry_date
            )));
        }

        let now = self.clock.now();
        let donation = Donation {
            id: uuid::Uuid::new_v4().to_string(),
            donor_id: caller.user_id.clone(),
            item_name: item_name.to_string(),
            quantity,
            expiry_date: new.expiry_date,
            description: new.description.filter(|d| !d.trim().is_empty()),
            image_url: new.image_url.filter(|u| !u.trim().is_empty()),
            status: DonationStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_donation(&donation)?;
        tracing::info!(donation_id = %donation.id, donor_id = %donation.donor_id, "donation submitted");
        Ok(donation)
    }

    /// Fetch one donation.
    ///
    /// Administrators see everything, donors their own submissions,
    /// recipients anything that has been approved.
    pub fn get(&self, donation_id: &str, identity: &Identity) -> Result<Donation, EngineError> {
        let caller = identity.require_authenticated()?;
        let donation = self
            .store
            .get_donation(donation_id)?
            .ok_or_else(|| EngineError::not_found("donation", donation_id))?;

        let visible = caller.is_admin()
            || donation.donor_id == caller.user_id
            || (caller.has_role(Role::Recipient)
                && matches!(
                    donation.status,
                    DonationStatus::Approved | DonationStatus::Claimed
                ));
        if visible {
            Ok(donation)
        } else {
            Err(EngineError::Forbidden(format!("access to donation '{donation_id}'")))
        }
    }

    /// Donations awaiting review, newest first.
    pub fn pending(&self, identity: &Identity) -> Result<Vec<Donation>, EngineError> {
        identity.require_role(Role::Admin)?;
        let filter = DonationFilter::default().with_status(DonationStatus::Pending);
        Ok(self.store.list_donations(&filter)?)
    }

    /// Approved and claimed donations, newest first.
    pub fn inventory(&self, identity: &Identity) -> Result<Vec<Donation>, EngineError> {
        identity.require_role(Role::Admin)?;
        let filter = DonationFilter::default()
            .with_status(DonationStatus::Approved)
            .with_status(DonationStatus::Claimed);
        Ok(self.store.list_donations(&filter)?)
    }

    /// The caller's own submissions, newest first.
    pub fn for_donor(&self, identity: &Identity) -> Result<Vec<Donation>, EngineError> {
        let caller = identity.require_role(Role::Donor)?;
        let filter = DonationFilter::default().with_donor(caller.user_id.clone());
        Ok(self.store.list_donations(&filter)?)
    }
}

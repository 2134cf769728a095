use crate::model::{
    sort_newest_first, sort_recipients, Claim, Conditional, Donation, DonationFilter,
    DonationStatus, Mapping, RateLimitDecision, RateLimitWindow, RecipientProfile,
};
use crate::StoreError;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Storage operations the engine performs against the record store.
///
/// Plain reads and writes are simple keyed operations. The contended
/// pieces of state (a donation's status and the per-actor rate-limit
/// counter) are only ever mutated through the conditional operations
/// below, and every implementation must make each of those indivisible
/// with respect to concurrent callers.
pub trait DonationStore: Send + Sync {
    /// Insert a new donation.
    fn insert_donation(&self, donation: &Donation) -> Result<(), StoreError>;
    /// Retrieve a donation by id.
    fn get_donation(&self, id: &str) -> Result<Option<Donation>, StoreError>;
    /// Donations matching `filter`, newest first.
    fn list_donations(&self, filter: &DonationFilter) -> Result<Vec<Donation>, StoreError>;
    /// Set status to `next` only if it is currently `expected`.
    fn transition_status(
        &self,
        id: &str,
        expected: DonationStatus,
        next: DonationStatus,
        at: DateTime<Utc>,
    ) -> Result<Conditional<Donation>, StoreError>;
    /// Flip the donation from `approved` to `claimed` and insert `claim`,
    /// both or neither.
    fn claim_donation(&self, claim: &Claim) -> Result<Conditional<Claim>, StoreError>;
    /// The claim on a donation, if any.
    fn claim_for_donation(&self, donation_id: &str) -> Result<Option<Claim>, StoreError>;
    /// All claims made by one recipient, newest first.
    fn claims_for_recipient(&self, recipient_id: &str) -> Result<Vec<Claim>, StoreError>;

    /// Insert or replace a recipient profile.
    fn upsert_recipient(&self, profile: &RecipientProfile) -> Result<(), StoreError>;
    /// Retrieve a recipient profile by id.
    fn get_recipient(&self, id: &str) -> Result<Option<RecipientProfile>, StoreError>;
    /// The profile owned by a user account, if any.
    fn recipient_for_user(&self, user_id: &str) -> Result<Option<RecipientProfile>, StoreError>;
    /// All profiles, oldest first.
    fn list_recipients(&self) -> Result<Vec<RecipientProfile>, StoreError>;
    /// Read, edit and write back one profile as a single indivisible step.
    ///
    /// `edit` works on a copy and returns whether to keep its changes;
    /// `false` leaves the stored profile untouched. Returns the stored
    /// profile afterwards, or `None` when there is no such profile.
    fn modify_recipient(
        &self,
        id: &str,
        edit: &mut dyn FnMut(&mut RecipientProfile) -> bool,
    ) -> Result<Option<RecipientProfile>, StoreError>;
    /// Insert `profile` unless its owning user already has one; either way
    /// return the stored profile. Safe to retry.
    fn provision_recipient(
        &self,
        profile: &RecipientProfile,
    ) -> Result<RecipientProfile, StoreError>;

    /// Replace the donation's mapping batch with `mappings`.
    fn replace_mappings(&self, donation_id: &str, mappings: &[Mapping])
        -> Result<(), StoreError>;
    /// Mappings of one donation, highest score first.
    fn mappings_for_donation(&self, donation_id: &str) -> Result<Vec<Mapping>, StoreError>;
    /// Mappings pointing at one recipient, highest score first.
    fn mappings_for_recipient(&self, recipient_id: &str) -> Result<Vec<Mapping>, StoreError>;

    /// Atomically count one invocation of `operation` by `actor_id`,
    /// resetting the window when it has expired.
    fn hit_rate_limit(
        &self,
        actor_id: &str,
        operation: &str,
        max_requests: u32,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<RateLimitDecision, StoreError>;
}

/// Configuration for selecting and building a backend.
///
/// # Example
/// ```
/// use store::BackendConfig;
///
/// // In-memory (for testing)
/// let config = BackendConfig::in_memory();
///
/// // Redb (pure Rust, persistent)
/// let config = BackendConfig::redb("/data/medbridge.redb");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum BackendConfig {
    /// Use Redb for storage. The `path` is the file path for the database.
    ///
    /// Requires the `backend-redb` feature (enabled by default).
    Redb { path: String },
    /// Keep everything in process memory. Useful for tests and demos.
    #[default]
    InMemory,
}

impl BackendConfig {
    pub fn in_memory() -> Self {
        BackendConfig::InMemory
    }

    pub fn redb<P: Into<String>>(path: P) -> Self {
        BackendConfig::Redb { path: path.into() }
    }

    /// Build the backend described by this configuration.
    pub fn build(&self) -> Result<Arc<dyn DonationStore>, StoreError> {
        match self {
            BackendConfig::InMemory => Ok(Arc::new(InMemoryBackend::new())),
            BackendConfig::Redb { path } => {
                #[cfg(feature = "backend-redb")]
                {
                    Ok(Arc::new(RedbBackend::open(path)?))
                }
                #[cfg(not(feature = "backend-redb"))]
                {
                    let _ = path;
                    Err(StoreError::backend("redb backend disabled at compile time"))
                }
            }
        }
    }
}

#[derive(Default)]
struct Tables {
    donations: HashMap<String, Donation>,
    /// Keyed by donation id; at most one claim per donation.
    claims: HashMap<String, Claim>,
    recipients: HashMap<String, RecipientProfile>,
    /// Keyed by donation id; always the latest batch.
    mappings: HashMap<String, Vec<Mapping>>,
}

/// An in-memory backend.
///
/// The relational tables sit behind one `RwLock`, so a conditional write
/// checks and mutates under the same write guard. Rate-limit windows live
/// in a `DashMap` whose entry guard serializes updates per key.
pub struct InMemoryBackend {
    tables: RwLock<Tables>,
    windows: DashMap<(String, String), RateLimitWindow>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            windows: DashMap::new(),
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::backend("poisoned lock"))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::backend("poisoned lock"))
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DonationStore for InMemoryBackend {
    fn insert_donation(&self, donation: &Donation) -> Result<(), StoreError> {
        self.write()?
            .donations
            .insert(donation.id.clone(), donation.clone());
        Ok(())
    }

    fn get_donation(&self, id: &str) -> Result<Option<Donation>, StoreError> {
        Ok(self.read()?.donations.get(id).cloned())
    }

    fn list_donations(&self, filter: &DonationFilter) -> Result<Vec<Donation>, StoreError> {
        let mut out: Vec<Donation> = self
            .read()?
            .donations
            .values()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect();
        sort_newest_first(&mut out);
        Ok(out)
    }

    fn transition_status(
        &self,
        id: &str,
        expected: DonationStatus,
        next: DonationStatus,
        at: DateTime<Utc>,
    ) -> Result<Conditional<Donation>, StoreError> {
        let mut guard = self.write()?;
        let Some(donation) = guard.donations.get_mut(id) else {
            return Ok(Conditional::Missing);
        };
        if donation.status != expected {
            return Ok(Conditional::StatusMismatch(donation.status));
        }
        donation.status = next;
        donation.updated_at = at;
        Ok(Conditional::Applied(donation.clone()))
    }

    fn claim_donation(&self, claim: &Claim) -> Result<Conditional<Claim>, StoreError> {
        // One write guard covers the check, the status flip and the insert.
        let mut guard = self.write()?;
        let tables = &mut *guard;
        let Some(donation) = tables.donations.get_mut(&claim.donation_id) else {
            return Ok(Conditional::Missing);
        };
        if donation.status != DonationStatus::Approved {
            return Ok(Conditional::StatusMismatch(donation.status));
        }
        if tables.claims.contains_key(&claim.donation_id) {
            return Ok(Conditional::StatusMismatch(DonationStatus::Claimed));
        }
        donation.status = DonationStatus::Claimed;
        donation.updated_at = claim.claimed_at;
        tables
            .claims
            .insert(claim.donation_id.clone(), claim.clone());
        Ok(Conditional::Applied(claim.clone()))
    }

    fn claim_for_donation(&self, donation_id: &str) -> Result<Option<Claim>, StoreError> {
        Ok(self.read()?.claims.get(donation_id).cloned())
    }

    fn claims_for_recipient(&self, recipient_id: &str) -> Result<Vec<Claim>, StoreError> {
        let mut out: Vec<Claim> = self
            .read()?
            .claims
            .values()
            .filter(|c| c.recipient_id == recipient_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.claimed_at.cmp(&a.claimed_at).then_with(|| a.id.cmp(&b.id)));
        Ok(out)
    }

    fn upsert_recipient(&self, profile: &RecipientProfile) -> Result<(), StoreError> {
        self.write()?
            .recipients
            .insert(profile.id.clone(), profile.clone());
        Ok(())
    }

    fn get_recipient(&self, id: &str) -> Result<Option<RecipientProfile>, StoreError> {
        Ok(self.read()?.recipients.get(id).cloned())
    }

    fn recipient_for_user(&self, user_id: &str) -> Result<Option<RecipientProfile>, StoreError> {
        Ok(self
            .read()?
            .recipients
            .values()
            .find(|r| r.user_id.as_deref() == Some(user_id))
            .cloned())
    }

    fn list_recipients(&self) -> Result<Vec<RecipientProfile>, StoreError> {
        let mut out: Vec<RecipientProfile> = self.read()?.recipients.values().cloned().collect();
        sort_recipients(&mut out);
        Ok(out)
    }

    fn modify_recipient(
        &self,
        id: &str,
        edit: &mut dyn FnMut(&mut RecipientProfile) -> bool,
    ) -> Result<Option<RecipientProfile>, StoreError> {
        let mut guard = self.write()?;
        let Some(profile) = guard.recipients.get_mut(id) else {
            return Ok(None);
        };
        let mut draft = profile.clone();
        if edit(&mut draft) {
            *profile = draft;
        }
        Ok(Some(profile.clone()))
    }

    fn provision_recipient(
        &self,
        profile: &RecipientProfile,
    ) -> Result<RecipientProfile, StoreError> {
        let mut guard = self.write()?;
        if let Some(user_id) = profile.user_id.as_deref() {
            if let Some(existing) = guard
                .recipients
                .values()
                .find(|r| r.user_id.as_deref() == Some(user_id))
            {
                return Ok(existing.clone());
            }
        }
        guard
            .recipients
            .insert(profile.id.clone(), profile.clone());
        Ok(profile.clone())
    }

    fn replace_mappings(
        &self,
        donation_id: &str,
        mappings: &[Mapping],
    ) -> Result<(), StoreError> {
        let mut guard = self.write()?;
        if mappings.is_empty() {
            guard.mappings.remove(donation_id);
        } else {
            guard
                .mappings
                .insert(donation_id.to_string(), mappings.to_vec());
        }
        Ok(())
    }

    fn mappings_for_donation(&self, donation_id: &str) -> Result<Vec<Mapping>, StoreError> {
        let mut out = self
            .read()?
            .mappings
            .get(donation_id)
            .cloned()
            .unwrap_or_default();
        sort_by_score(&mut out);
        Ok(out)
    }

    fn mappings_for_recipient(&self, recipient_id: &str) -> Result<Vec<Mapping>, StoreError> {
        let mut out: Vec<Mapping> = self
            .read()?
            .mappings
            .values()
            .flatten()
            .filter(|m| m.recipient_id == recipient_id)
            .cloned()
            .collect();
        sort_by_score(&mut out);
        Ok(out)
    }

    fn hit_rate_limit(
        &self,
        actor_id: &str,
        operation: &str,
        max_requests: u32,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<RateLimitDecision, StoreError> {
        // The entry guard is held across read, reset and increment.
        let mut entry = self
            .windows
            .entry((actor_id.to_string(), operation.to_string()))
            .or_insert_with(|| RateLimitWindow::open(actor_id, operation, now));
        let state = entry.value_mut();
        state.register_hit(now, window);
        Ok(state.decision(max_requests, window))
    }
}

pub(crate) fn sort_by_score(mappings: &mut [Mapping]) {
    mappings.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.donation_id.cmp(&b.donation_id))
    });
}

/// The Redb backend implementation.
#[cfg(feature = "backend-redb")]
pub mod redb;

#[cfg(feature = "backend-redb")]
pub use self::redb::RedbBackend;

#[cfg(test)]
pub(crate) mod conformance;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_conformance() {
        conformance::run_all(&InMemoryBackend::new());
    }

    #[test]
    fn in_memory_claims_are_exclusive_under_contention() {
        conformance::concurrent_claims(Arc::new(InMemoryBackend::new()));
    }

    #[test]
    fn in_memory_rate_limit_loses_no_updates() {
        conformance::concurrent_rate_limit(Arc::new(InMemoryBackend::new()));
    }

    #[test]
    fn in_memory_recipient_edits_lose_no_updates() {
        conformance::concurrent_recipient_edits(Arc::new(InMemoryBackend::new()));
    }

    #[test]
    fn default_config_builds_in_memory() {
        let store = BackendConfig::default().build().expect("in-memory builds");
        assert!(store.list_recipients().expect("list").is_empty());
    }
}

//! Redb (Rust embedded database) backend for MedBridge records.
//!
//! Redb admits one write transaction at a time, so every conditional
//! operation (status compare-and-set, claim, rate-limit increment) reads
//! and writes inside a single write transaction and is indivisible with
//! respect to other writers. Records are stored as JSON.
//!
//! # Configuration Example
//! ```yaml
//! store:
//!   backend: "redb"
//!   path: "/data/medbridge.redb"
//! ```

use crate::backend::sort_by_score;
use crate::model::{
    sort_newest_first, sort_recipients, Claim, Conditional, Donation, DonationFilter,
    DonationStatus, Mapping, RateLimitDecision, RateLimitWindow, RecipientProfile,
};
use crate::{DonationStore, StoreError};
use chrono::{DateTime, Duration, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

type RecordTable = TableDefinition<'static, &'static str, &'static [u8]>;

const DONATIONS: RecordTable = TableDefinition::new("donations");
/// Keyed by donation id.
const CLAIMS: RecordTable = TableDefinition::new("claims");
const RECIPIENTS: RecordTable = TableDefinition::new("recipients");
/// Owning user id -> recipient id.
const RECIPIENT_USERS: TableDefinition<&str, &str> = TableDefinition::new("recipient_users");
/// Keyed by donation id; value is the current mapping batch.
const MAPPINGS: RecordTable = TableDefinition::new("mappings");
/// Keyed by `actor \x1f operation`.
const RATE_LIMITS: RecordTable = TableDefinition::new("rate_limits");

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(value).map_err(|e| StoreError::Encode(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Decode(e.to_string()))
}

fn rate_key(actor_id: &str, operation: &str) -> String {
    format!("{actor_id}\u{1f}{operation}")
}

/// Redb backend for persistent storage.
///
/// The `Arc<Database>` wrapper allows safe sharing across threads.
pub struct RedbBackend {
    db: Arc<Database>,
}

impl RedbBackend {
    /// Open or create a Redb database at the given path.
    ///
    /// # Example
    /// ```no_run
    /// use store::RedbBackend;
    ///
    /// let backend = RedbBackend::open("/tmp/medbridge.redb").unwrap();
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = Database::create(path.as_ref()).map_err(StoreError::backend)?;

        // Opening a table inside a write transaction creates it.
        let txn = db.begin_write().map_err(StoreError::backend)?;
        {
            for table in [DONATIONS, CLAIMS, RECIPIENTS, MAPPINGS, RATE_LIMITS] {
                txn.open_table(table).map_err(StoreError::backend)?;
            }
            txn.open_table(RECIPIENT_USERS)
                .map_err(StoreError::backend)?;
        }
        txn.commit().map_err(StoreError::backend)?;

        tracing::debug!(path = %path.as_ref().display(), "opened redb store");
        Ok(Self { db: Arc::new(db) })
    }

    fn read_one<T: DeserializeOwned>(
        &self,
        table: RecordTable,
        key: &str,
    ) -> Result<Option<T>, StoreError> {
        let txn = self.db.begin_read().map_err(StoreError::backend)?;
        let table = txn.open_table(table).map_err(StoreError::backend)?;
        let bytes = table
            .get(key)
            .map_err(StoreError::backend)?
            .map(|guard| guard.value().to_vec());
        bytes.map(|b| decode(&b)).transpose()
    }

    fn read_all<T: DeserializeOwned>(&self, table: RecordTable) -> Result<Vec<T>, StoreError> {
        let txn = self.db.begin_read().map_err(StoreError::backend)?;
        let table = txn.open_table(table).map_err(StoreError::backend)?;
        let mut out = Vec::new();
        for item in table.iter().map_err(StoreError::backend)? {
            let (_, value) = item.map_err(StoreError::backend)?;
            out.push(decode(value.value())?);
        }
        Ok(out)
    }

    /// Run `f` inside one write transaction. `f` returns the result and
    /// whether to commit; anything else aborts.
    fn write<R>(
        &self,
        f: impl FnOnce(&WriteTransaction) -> Result<(R, bool), StoreError>,
    ) -> Result<R, StoreError> {
        let txn = self.db.begin_write().map_err(StoreError::backend)?;
        match f(&txn) {
            Ok((result, true)) => {
                txn.commit().map_err(StoreError::backend)?;
                Ok(result)
            }
            Ok((result, false)) => {
                txn.abort().map_err(StoreError::backend)?;
                Ok(result)
            }
            Err(err) => {
                if let Err(abort_err) = txn.abort() {
                    tracing::warn!(error = %abort_err, "failed to abort redb transaction");
                }
                Err(err)
            }
        }
    }
}

fn get_in<T: DeserializeOwned>(
    txn: &WriteTransaction,
    table: RecordTable,
    key: &str,
) -> Result<Option<T>, StoreError> {
    let table = txn.open_table(table).map_err(StoreError::backend)?;
    let bytes = table
        .get(key)
        .map_err(StoreError::backend)?
        .map(|guard| guard.value().to_vec());
    bytes.map(|b| decode(&b)).transpose()
}

fn put_in<T: Serialize>(
    txn: &WriteTransaction,
    table: RecordTable,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let bytes = encode(value)?;
    let mut table = txn.open_table(table).map_err(StoreError::backend)?;
    table
        .insert(key, bytes.as_slice())
        .map_err(StoreError::backend)?;
    Ok(())
}

impl DonationStore for RedbBackend {
    fn insert_donation(&self, donation: &Donation) -> Result<(), StoreError> {
        self.write(|txn| {
            put_in(txn, DONATIONS, &donation.id, donation)?;
            Ok(((), true))
        })
    }

    fn get_donation(&self, id: &str) -> Result<Option<Donation>, StoreError> {
        self.read_one(DONATIONS, id)
    }

    fn list_donations(&self, filter: &DonationFilter) -> Result<Vec<Donation>, StoreError> {
        let mut out: Vec<Donation> = self
            .read_all::<Donation>(DONATIONS)?
            .into_iter()
            .filter(|d| filter.matches(d))
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
        self.write(|txn| {
            let Some(mut donation) = get_in::<Donation>(txn, DONATIONS, id)? else {
                return Ok((Conditional::Missing, false));
            };
            if donation.status != expected {
                return Ok((Conditional::StatusMismatch(donation.status), false));
            }
            donation.status = next;
            donation.updated_at = at;
            put_in(txn, DONATIONS, id, &donation)?;
            Ok((Conditional::Applied(donation), true))
        })
    }

    fn claim_donation(&self, claim: &Claim) -> Result<Conditional<Claim>, StoreError> {
        self.write(|txn| {
            let Some(mut donation) = get_in::<Donation>(txn, DONATIONS, &claim.donation_id)?
            else {
                return Ok((Conditional::Missing, false));
            };
            if donation.status != DonationStatus::Approved {
                return Ok((Conditional::StatusMismatch(donation.status), false));
            }
            if get_in::<Claim>(txn, CLAIMS, &claim.donation_id)?.is_some() {
                return Ok((Conditional::StatusMismatch(DonationStatus::Claimed), false));
            }
            donation.status = DonationStatus::Claimed;
            donation.updated_at = claim.claimed_at;
            put_in(txn, DONATIONS, &donation.id, &donation)?;
            put_in(txn, CLAIMS, &claim.donation_id, claim)?;
            Ok((Conditional::Applied(claim.clone()), true))
        })
    }

    fn claim_for_donation(&self, donation_id: &str) -> Result<Option<Claim>, StoreError> {
        self.read_one(CLAIMS, donation_id)
    }

    fn claims_for_recipient(&self, recipient_id: &str) -> Result<Vec<Claim>, StoreError> {
        let mut out: Vec<Claim> = self
            .read_all::<Claim>(CLAIMS)?
            .into_iter()
            .filter(|c| c.recipient_id == recipient_id)
            .collect();
        out.sort_by(|a, b| b.claimed_at.cmp(&a.claimed_at).then_with(|| a.id.cmp(&b.id)));
        Ok(out)
    }

    fn upsert_recipient(&self, profile: &RecipientProfile) -> Result<(), StoreError> {
        self.write(|txn| {
            put_in(txn, RECIPIENTS, &profile.id, profile)?;
            if let Some(user_id) = profile.user_id.as_deref() {
                let mut users = txn
                    .open_table(RECIPIENT_USERS)
                    .map_err(StoreError::backend)?;
                users
                    .insert(user_id, profile.id.as_str())
                    .map_err(StoreError::backend)?;
            }
            Ok(((), true))
        })
    }

    fn get_recipient(&self, id: &str) -> Result<Option<RecipientProfile>, StoreError> {
        self.read_one(RECIPIENTS, id)
    }

    fn recipient_for_user(&self, user_id: &str) -> Result<Option<RecipientProfile>, StoreError> {
        let recipient_id = {
            let txn = self.db.begin_read().map_err(StoreError::backend)?;
            let users = txn
                .open_table(RECIPIENT_USERS)
                .map_err(StoreError::backend)?;
            let id = users
                .get(user_id)
                .map_err(StoreError::backend)?
                .map(|guard| guard.value().to_string());
            id
        };
        match recipient_id {
            Some(id) => self.get_recipient(&id),
            None => Ok(None),
        }
    }

    fn list_recipients(&self) -> Result<Vec<RecipientProfile>, StoreError> {
        let mut out = self.read_all::<RecipientProfile>(RECIPIENTS)?;
        sort_recipients(&mut out);
        Ok(out)
    }

    fn modify_recipient(
        &self,
        id: &str,
        edit: &mut dyn FnMut(&mut RecipientProfile) -> bool,
    ) -> Result<Option<RecipientProfile>, StoreError> {
        self.write(|txn| {
            let Some(stored) = get_in::<RecipientProfile>(txn, RECIPIENTS, id)? else {
                return Ok((None, false));
            };
            let mut draft = stored.clone();
            if !edit(&mut draft) {
                return Ok((Some(stored), false));
            }
            put_in(txn, RECIPIENTS, id, &draft)?;
            Ok((Some(draft), true))
        })
    }

    fn provision_recipient(
        &self,
        profile: &RecipientProfile,
    ) -> Result<RecipientProfile, StoreError> {
        self.write(|txn| {
            if let Some(user_id) = profile.user_id.as_deref() {
                let existing_id = {
                    let users = txn
                        .open_table(RECIPIENT_USERS)
                        .map_err(StoreError::backend)?;
                    let id = users
                        .get(user_id)
                        .map_err(StoreError::backend)?
                        .map(|guard| guard.value().to_string());
                    id
                };
                if let Some(existing_id) = existing_id {
                    if let Some(existing) =
                        get_in::<RecipientProfile>(txn, RECIPIENTS, &existing_id)?
                    {
                        return Ok((existing, false));
                    }
                }
                let mut users = txn
                    .open_table(RECIPIENT_USERS)
                    .map_err(StoreError::backend)?;
                users
                    .insert(user_id, profile.id.as_str())
                    .map_err(StoreError::backend)?;
            }
            put_in(txn, RECIPIENTS, &profile.id, profile)?;
            Ok((profile.clone(), true))
        })
    }

    fn replace_mappings(
        &self,
        donation_id: &str,
        mappings: &[Mapping],
    ) -> Result<(), StoreError> {
        self.write(|txn| {
            if mappings.is_empty() {
                let mut table = txn.open_table(MAPPINGS).map_err(StoreError::backend)?;
                table.remove(donation_id).map_err(StoreError::backend)?;
            } else {
                put_in(txn, MAPPINGS, donation_id, &mappings.to_vec())?;
            }
            Ok(((), true))
        })
    }

    fn mappings_for_donation(&self, donation_id: &str) -> Result<Vec<Mapping>, StoreError> {
        let mut out: Vec<Mapping> = self.read_one(MAPPINGS, donation_id)?.unwrap_or_default();
        sort_by_score(&mut out);
        Ok(out)
    }

    fn mappings_for_recipient(&self, recipient_id: &str) -> Result<Vec<Mapping>, StoreError> {
        let mut out: Vec<Mapping> = self
            .read_all::<Vec<Mapping>>(MAPPINGS)?
            .into_iter()
            .flatten()
            .filter(|m| m.recipient_id == recipient_id)
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
        let key = rate_key(actor_id, operation);
        self.write(|txn| {
            let mut state = get_in::<RateLimitWindow>(txn, RATE_LIMITS, &key)?
                .unwrap_or_else(|| RateLimitWindow::open(actor_id, operation, now));
            state.register_hit(now, window);
            put_in(txn, RATE_LIMITS, &key, &state)?;
            Ok((state.decision(max_requests, window), true))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::conformance;
    use tempfile::NamedTempFile;

    fn open_temp() -> (NamedTempFile, RedbBackend) {
        let file = NamedTempFile::new().unwrap();
        let backend = RedbBackend::open(file.path()).unwrap();
        (file, backend)
    }

    #[test]
    fn redb_conformance() {
        let (_file, backend) = open_temp();
        conformance::run_all(&backend);
    }

    #[test]
    fn redb_claims_are_exclusive_under_contention() {
        let (_file, backend) = open_temp();
        conformance::concurrent_claims(Arc::new(backend));
    }

    #[test]
    fn redb_rate_limit_loses_no_updates() {
        let (_file, backend) = open_temp();
        conformance::concurrent_rate_limit(Arc::new(backend));
    }

    #[test]
    fn redb_recipient_edits_lose_no_updates() {
        let (_file, backend) = open_temp();
        conformance::concurrent_recipient_edits(Arc::new(backend));
    }

    #[test]
    fn redb_survives_reopen() {
        let file = NamedTempFile::new().unwrap();
        {
            let backend = RedbBackend::open(file.path()).unwrap();
            backend
                .insert_donation(&conformance::donation(
                    "persisted",
                    "donor-a",
                    DonationStatus::Approved,
                    0,
                ))
                .unwrap();
        }
        let reopened = RedbBackend::open(file.path()).unwrap();
        let donation = reopened.get_donation("persisted").unwrap().unwrap();
        assert_eq!(donation.status, DonationStatus::Approved);
    }
}

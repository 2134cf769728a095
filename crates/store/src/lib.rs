//! # MedBridge Store (`store`)
//!
//! Record types and a backend-agnostic store for donations, claims,
//! recipient profiles, match mappings and rate-limit windows.
//!
//! ## Core Features
//!
//! - **Pluggable Backends**: every backend implements [`DonationStore`].
//!   Out of the box the crate provides:
//!   - [`InMemoryBackend`], a `RwLock<HashMap>` backend for tests and demos.
//!   - [`RedbBackend`], a persistent single-file backend (the
//!     `backend-redb` feature, on by default).
//! - **Atomic Conditional Writes**: status transitions, claims and
//!   rate-limit increments are compare-and-set operations. A claim flips
//!   the donation to `claimed` and records the claim in one step, so two
//!   racing recipients can never both win.
//! - **Legacy-Tolerant Records**: recipient requirements decode from either
//!   a structured entry list or a legacy free-text blob.
//!
//! ## Example Usage
//!
//! ```
//! use chrono::{NaiveDate, Utc};
//! use store::{BackendConfig, Claim, Conditional, Donation, DonationStatus};
//!
//! let store = BackendConfig::in_memory().build().unwrap();
//! let now = Utc::now();
//! store
//!     .insert_donation(&Donation {
//!         id: "don-1".into(),
//!         donor_id: "donor-1".into(),
//!         item_name: "Paracetamol".into(),
//!         quantity: 20,
//!         expiry_date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
//!         description: None,
//!         image_url: None,
//!         status: DonationStatus::Approved,
//!         created_at: now,
//!         updated_at: now,
//!     })
//!     .unwrap();
//!
//! let claim = Claim {
//!     id: "claim-1".into(),
//!     donation_id: "don-1".into(),
//!     recipient_id: "ngo-1".into(),
//!     claimed_by: "user-9".into(),
//!     claimed_at: now,
//! };
//! assert!(matches!(store.claim_donation(&claim).unwrap(), Conditional::Applied(_)));
//! assert_eq!(
//!     store.claim_donation(&claim).unwrap(),
//!     Conditional::StatusMismatch(DonationStatus::Claimed)
//! );
//! ```

mod backend;
mod error;
pub mod model;

pub use crate::backend::{BackendConfig, DonationStore, InMemoryBackend};
pub use crate::error::StoreError;
pub use crate::model::{
    Claim, Conditional, Donation, DonationFilter, DonationStatus, Mapping, RateLimitDecision,
    RateLimitWindow, RecipientProfile, RequirementEntry, Requirements,
};

#[cfg(feature = "backend-redb")]
pub use crate::backend::RedbBackend;

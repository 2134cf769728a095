//! Umbrella crate for the MedBridge donation engine.
//!
//! Donors submit items, administrators approve or reject them, approval
//! triggers a lexical match of the donation against every recipient
//! organization, and recipients claim approved donations. This crate wires
//! the pure [`matcher`] and the [`store`] backends into those workflows and
//! owns the invariants that span them:
//!
//! - a donation moves `pending -> approved | rejected` once, and
//!   `approved -> claimed` once;
//! - at most one claim ever exists per donation, even under concurrent
//!   attempts;
//! - at most `top_k` advisory mappings are visible per donation;
//! - the matching trigger is throttled per administrator and fails closed.
//!
//! ## Example
//!
//! ```
//! use chrono::NaiveDate;
//! use medbridge::{Caller, Engine, EngineConfig, Identity, NewDonation, Role};
//!
//! let engine = Engine::from_config(&EngineConfig::default()).unwrap();
//! let donor: Identity = Caller::new("donor-1").with_role(Role::Donor).into();
//! let admin: Identity = Caller::new("admin-1").with_role(Role::Admin).into();
//!
//! let donation = engine
//!     .donations()
//!     .submit(
//!         &donor,
//!         NewDonation {
//!             item_name: "Paracetamol".into(),
//!             quantity: 20,
//!             expiry_date: NaiveDate::from_ymd_opt(2999, 1, 1).unwrap(),
//!             description: Some("pain relief tablets".into()),
//!             image_url: None,
//!         },
//!     )
//!     .unwrap();
//!
//! let report = engine.lifecycle().approve(&donation.id, &admin).unwrap();
//! assert!(report.matching.is_matched());
//! ```

pub mod claims;
pub mod clock;
pub mod config;
pub mod donations;
pub mod engine;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod matching;
pub mod metrics;
pub mod rate_limit;
pub mod recipients;

pub use crate::claims::ClaimCoordinator;
pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::config::{ConfigLoadError, EngineConfig, RateLimitConfig, StoreConfig};
pub use crate::donations::{DonationIntake, NewDonation};
pub use crate::engine::Engine;
pub use crate::error::EngineError;
pub use crate::identity::{Caller, Identity, Role};
pub use crate::lifecycle::{ApprovalReport, Lifecycle, MatchingOutcome, MatchingOutcomeView};
pub use crate::matching::{MatchSummary, MatchingOrchestrator, TopMatch};
pub use crate::metrics::{EngineMetrics, set_engine_metrics};
pub use crate::rate_limit::RateLimiter;
pub use crate::recipients::{
    AvailableDonation, ClaimedDonation, DEFAULT_ORGANIZATION_NAME, ProfileUpdate,
    RecipientDirectory,
};

pub use matcher::{MatchConfig, RankedMatch};
pub use store::{
    BackendConfig, Claim, Donation, DonationStatus, DonationStore, Mapping, RecipientProfile,
    RequirementEntry, Requirements, StoreError,
};

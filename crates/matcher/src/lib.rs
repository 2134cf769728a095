//! # MedBridge Matcher (`matcher`)
//!
//! ## Purpose
//!
//! `matcher` turns a newly approved donation into a short, ordered list of
//! candidate recipient organizations. Matching is purely lexical: both
//! sides are case-folded, split on whitespace, stripped of short noise
//! words, and compared by substring containment.
//!
//! The crate is pure. No I/O, no clock, no global state: the same inputs
//! and config always produce the same ranking.
//!
//! ## Core Types
//!
//! - [`Scorer`]: directional similarity in `[0, 100]`, normalized by the
//!   donation (source) side.
//! - [`Ranker`]: scores a candidate set, discards zero scores, sorts
//!   descending with a stable tie-break, and keeps the top `k`.
//! - [`MatchConfig`]: `top_k` and the noise-token threshold.
//! - [`RankedMatch`]: recipient id, score, and 1-based rank.
//!
//! ## Example Usage
//!
//! ```
//! use matcher::{MatchConfig, Ranker};
//!
//! let ranker = Ranker::new(MatchConfig::default()).expect("valid config");
//! let hits = ranker.rank(
//!     "Paracetamol pain relief tablets",
//!     vec![
//!         ("ngo-1", "need pain relief medication"),
//!         ("ngo-2", "need surgical gloves"),
//!     ],
//! );
//!
//! assert_eq!(hits.len(), 1);
//! assert_eq!(hits[0].recipient_id, "ngo-1");
//! assert_eq!(hits[0].score, 50.0);
//! ```

pub mod engine;
pub mod score;
pub mod token;
pub mod types;

pub use crate::engine::{rank, Ranker};
pub use crate::score::{score, Scorer};
pub use crate::token::{tokenize, DEFAULT_NOISE_TOKEN_LEN};
pub use crate::types::{MatchConfig, MatchError, RankedMatch, MAX_SCORE};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::token::DEFAULT_NOISE_TOKEN_LEN;

/// Upper bound of every similarity score.
pub const MAX_SCORE: f64 = 100.0;

/// Configuration for scoring and ranking.
///
/// `MatchConfig` is cheap to clone and serde-friendly so it can be embedded
/// in higher-level engine configs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchConfig {
    /// Maximum number of ranked matches retained per donation.
    #[serde(default = "MatchConfig::default_top_k")]
    pub top_k: usize,
    /// Tokens whose char count is at or below this length carry no signal
    /// and are dropped before scoring.
    #[serde(default = "MatchConfig::default_noise_token_len")]
    pub noise_token_len: usize,
}

impl MatchConfig {
    pub(crate) fn default_top_k() -> usize {
        3
    }

    pub(crate) fn default_noise_token_len() -> usize {
        DEFAULT_NOISE_TOKEN_LEN
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_noise_token_len(mut self, len: usize) -> Self {
        self.noise_token_len = len;
        self
    }

    /// Reject configurations that could never produce a match list.
    pub fn validate(&self) -> Result<(), MatchError> {
        if self.top_k == 0 {
            return Err(MatchError::InvalidConfig(
                "top_k must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            top_k: Self::default_top_k(),
            noise_token_len: Self::default_noise_token_len(),
        }
    }
}

/// One ranked candidate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedMatch {
    /// Identifier of the recipient profile.
    pub recipient_id: String,
    /// Similarity in `(0, 100]`.
    pub score: f64,
    /// 1-based position in the ranked list.
    pub rank: usize,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("invalid match config: {0}")]
    InvalidConfig(String),
}

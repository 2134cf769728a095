use crate::score::Scorer;
use crate::token::tokenize;
use crate::types::{MatchConfig, MatchError, RankedMatch};


/// Ranks recipient candidates against one donation text.
pub struct Ranker {
    scorer: Scorer,
}

impl Ranker {
    /// Construct a ranker from an explicit, validated config.
    pub fn new(cfg: MatchConfig) -> Result<Self, MatchError> {
        cfg.validate()?;
        Ok(Self {
            scorer: Scorer::new(cfg),
        })
    }

    pub fn config(&self) -> &MatchConfig {
        self.scorer.config()
    }

    /// Score every candidate, drop non-positive scores, sort descending and
    /// keep the first `top_k`.
    ///
    /// `candidates` yields `(recipient_id, requirements_text)` pairs. The
    /// sort is stable, so equal scores keep their input order and identical
    /// inputs always rank identically. An empty result means "no matches".
    pub fn rank<'a, I>(&self, donation_text: &str, candidates: I) -> Vec<RankedMatch>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let source = tokenize(donation_text, self.config().noise_token_len);
        if source.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(&'a str, f64)> = candidates
            .into_iter()
            .map(|(id, text)| (id, self.scorer.score_tokens(&source, text)))
            .filter(|(_, score)| *score > 0.0)
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(self.config().top_k);

        scored
            .into_iter()
            .enumerate()
            .map(|(idx, (id, score))| RankedMatch {
                recipient_id: id.to_string(),
                score,
                rank: idx + 1,
            })
            .collect()
    }
}

impl Default for Ranker {
    fn default() -> Self {
        Self {
            scorer: Scorer::default(),
        }
    }
}

/// Rank with the default noise threshold and an explicit `top_k`.
///
/// A `top_k` of zero yields an empty list.
pub fn rank<'a, I>(donation_text: &str, candidates: I, top_k: usize) -> Vec<RankedMatch>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    if top_k == 0 {
        return Vec::new();
    }
    let cfg = MatchConfig::default().with_top_k(top_k);
    Ranker {
        scorer: Scorer::new(cfg),
    }
    .rank(donation_text, candidates)
}

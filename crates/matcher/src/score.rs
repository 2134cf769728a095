use crate::token::{tokenize, tokens_overlap};
use crate::types::{MatchConfig, MAX_SCORE};

/// Directional token-overlap similarity between a source and a target text.
///
/// Every source token counts as matched when some target token contains it
/// or is contained by it. The score is the matched share of the source
/// tokens scaled to `[0, 100]` and rounded to two decimals. Because the
/// denominator is the source token count, `score(a, b)` and `score(b, a)`
/// generally differ; the donation text is always the source.
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    cfg: MatchConfig,
}

impl Scorer {
    pub fn new(cfg: MatchConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.cfg
    }

    /// Score `target` against the pre-tokenized `source` set.
    ///
    /// The ranker tokenizes the donation once and reuses it across every
    /// recipient through this entry point.
    pub fn score_tokens(&self, source: &[String], target: &str) -> f64 {
        if source.is_empty() {
            return 0.0;
        }
        let target = tokenize(target, self.cfg.noise_token_len);
        if target.is_empty() {
            return 0.0;
        }

        let matched = source
            .iter()
            .filter(|s| target.iter().any(|t| tokens_overlap(s, t)))
            .count();

        let raw = (matched as f64 / source.len() as f64) * MAX_SCORE;
        round2(raw.min(MAX_SCORE))
    }

    pub fn score(&self, source: &str, target: &str) -> f64 {
        let source = tokenize(source, self.cfg.noise_token_len);
        self.score_tokens(&source, target)
    }
}

/// Score with the default noise threshold.
pub fn score(source: &str, target: &str) -> f64 {
    Scorer::default().score(source, target)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

use std::collections::HashSet;

/// Default noise threshold: tokens whose char count is at or below this are dropped.
pub const DEFAULT_NOISE_TOKEN_LEN: usize = 3;

/// Tokenizes free text into the lower-cased word set used for matching.
///
/// Text is case-folded and split on Unicode whitespace. Tokens whose char
/// count is `<= noise_len` are discarded. Duplicates are removed while the
/// order of first appearance is kept, so the output is deterministic.
pub fn tokenize(text: &str, noise_len: usize) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut seen = HashSet::new();
    let mut tokens = Vec::new();

    for word in lowered.split_whitespace() {
        if word.chars().count() <= noise_len {
            continue;
        }
        if seen.insert(word) {
            tokens.push(word.to_string());
        }
    }

    tokens
}

/// True when either token contains the other.
///
/// Containment rather than equality lets "tablet" meet "tablets" and
/// "antibiotic" meet "antibiotics".
#[inline]
pub fn tokens_overlap(a: &str, b: &str) -> bool {
    a.contains(b) || b.contains(a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_drops_short_words() {
        let tokens = tokenize("The a it CAT Bandages", DEFAULT_NOISE_TOKEN_LEN);
        assert_eq!(tokens, vec!["bandages"]);
    }

    #[test]
    fn keeps_first_occurrence_order() {
        let tokens = tokenize("gloves masks Gloves syringes masks", 3);
        assert_eq!(tokens, vec!["gloves", "masks", "syringes"]);
    }

    #[test]
    fn counts_chars_not_bytes() {
        // "été" is three chars but five bytes.
        assert!(tokenize("été", 3).is_empty());
        assert_eq!(tokenize("médicament", 3), vec!["médicament"]);
    }

    #[test]
    fn splits_on_any_whitespace() {
        let tokens = tokenize("pain\trelief\nmedication", 3);
        assert_eq!(tokens, vec!["pain", "relief", "medication"]);
    }

    #[test]
    fn overlap_is_bidirectional() {
        assert!(tokens_overlap("tablet", "tablets"));
        assert!(tokens_overlap("tablets", "tablet"));
        assert!(!tokens_overlap("gloves", "tablets"));
    }
}

//! Utterance intent classification.
//!
//! Substring matching over normalized text against fixed phrase sets. The
//! matching is intentionally permissive ("yes" matches anywhere in the
//! sentence); the tie-break is deterministic: an utterance matching both an
//! affirmative and a negative phrase classifies as `Ambiguous`.

/// Closed set of caller intents for yes/no turns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    Affirmative,
    Negative,
    Ambiguous,
    Empty,
}

const AFFIRMATIVE_PHRASES: &[&str] =
    &["yes", "yeah", "yep", "sure", "correct", "confirm", "okay", "of course", "haan"];

const NEGATIVE_PHRASES: &[&str] = &["no", "nope", "nah", "cancel", "wrong", "nahi"];

/// Phrases that end the ordering loop ("anything else?" → "that's all").
const DECLINE_PHRASES: &[&str] = &[
    "no",
    "nothing",
    "that's all",
    "that is all",
    "thats all",
    "i'm done",
    "im done",
    "done",
    "stop",
];

pub fn classify(utterance: &str) -> Intent {
    let normalized = normalize(utterance);
    if normalized.is_empty() {
        return Intent::Empty;
    }

    let affirmative = contains_any(&normalized, AFFIRMATIVE_PHRASES);
    let negative = contains_any(&normalized, NEGATIVE_PHRASES);

    match (affirmative, negative) {
        (true, true) => Intent::Ambiguous,
        (true, false) => Intent::Affirmative,
        (false, true) => Intent::Negative,
        (false, false) => Intent::Ambiguous,
    }
}

/// Whether the utterance declines to order (or order more). Empty input is
/// handled separately by [`classify`].
pub fn is_decline(utterance: &str) -> bool {
    let normalized = normalize(utterance);
    !normalized.is_empty() && contains_any(&normalized, DECLINE_PHRASES)
}

fn normalize(text: &str) -> String {
    text.trim().to_ascii_lowercase()
}

fn contains_any(normalized: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| normalized.contains(phrase))
}

#[cfg(test)]
mod tests {
    use super::{classify, is_decline, Intent};

    #[test]
    fn plain_yes_and_no_classify_cleanly() {
        assert_eq!(classify("Yes"), Intent::Affirmative);
        assert_eq!(classify("yes please"), Intent::Affirmative);
        assert_eq!(classify("No"), Intent::Negative);
        assert_eq!(classify("nope, not today"), Intent::Negative);
    }

    #[test]
    fn empty_and_whitespace_input_is_empty() {
        assert_eq!(classify(""), Intent::Empty);
        assert_eq!(classify("   "), Intent::Empty);
    }

    #[test]
    fn mixed_polarity_is_ambiguous_by_the_documented_tie_break() {
        assert_eq!(classify("yes... no wait"), Intent::Ambiguous);
        assert_eq!(classify("no, actually yes"), Intent::Ambiguous);
    }

    #[test]
    fn unrelated_text_is_ambiguous() {
        assert_eq!(classify("what was the question?"), Intent::Ambiguous);
    }

    #[test]
    fn affirmative_matches_anywhere_in_the_sentence() {
        assert_eq!(classify("hmm I guess that is correct"), Intent::Affirmative);
    }

    #[test]
    fn decline_phrases_end_the_ordering_loop() {
        assert!(is_decline("nothing else, thanks"));
        assert!(is_decline("that's all"));
        assert!(is_decline("No"));
        assert!(!is_decline("two packets of biscuits"));
        assert!(!is_decline(""));
    }
}

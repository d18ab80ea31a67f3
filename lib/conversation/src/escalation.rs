//! Low-confidence reply detection.

/// Phrases that mark a reply as unsure. Matched case-insensitively as plain
/// substrings, without word boundaries.
pub const LOW_CONFIDENCE_PHRASES: [&str; 4] = ["not sure", "cannot", "sorry", "don't know"];

/// Replies shorter than this many characters are treated as unsure.
pub const MIN_CONFIDENT_REPLY_CHARS: usize = 20;

/// Returns true if a generated reply should escalate its session.
#[must_use]
pub fn is_low_confidence(reply: &str) -> bool {
    let lowered = reply.to_lowercase();
    let hedges = LOW_CONFIDENCE_PHRASES
        .iter()
        .any(|phrase| lowered.contains(phrase));
    hedges || reply.chars().count() < MIN_CONFIDENT_REPLY_CHARS
}

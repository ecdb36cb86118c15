//! Yes/no classification of replies to a draft.

const AFFIRMATIVE: &[&str] = &[
    "yes", "y", "yeah", "yep", "confirm", "ok", "okay", "sure", "haan", "ha", "han", "ji", "sí",
    "si",
];

const NEGATIVE: &[&str] = &["no", "n", "nope", "cancel", "stop", "nahi", "nahin", "na"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reply {
    Affirmative,
    Negative,
    Unrecognized,
}

/// Trim, lowercase and strip trailing punctuation.
pub fn normalize_reply(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .trim_end_matches(|c: char| c.is_ascii_punctuation() || c == '¡' || c == '¿')
        .trim_end()
        .to_string()
}

pub fn classify_reply(text: &str) -> Reply {
    let normalized = normalize_reply(text);
    if AFFIRMATIVE.contains(&normalized.as_str()) {
        Reply::Affirmative
    } else if NEGATIVE.contains(&normalized.as_str()) {
        Reply::Negative
    } else {
        Reply::Unrecognized
    }
}

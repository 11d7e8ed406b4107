//! Word-bank intent checks for wizard control inputs.
//!
//! Multi-word bank entries match as substrings of the normalized message;
//! single words match whole tokens only, so "notebook" never reads as "no".

/// Words that signal a multi-step operation should stop.
const STOP_WORDS: &[&str] = &[
    "stop",
    "block",
    "break",
    "cease",
    "close",
    "cutoff",
    "discontinue",
    "terminate",
    "end",
    "kill",
    "desist",
    "quit",
    "cancel",
    "abort",
    "rescind",
    "do away with",
];

/// Words that signal an affirmative.
const YES_WORDS: &[&str] = &[
    "absolutely",
    "affirmative",
    "all right",
    "amen",
    "aye",
    "by all means",
    "certainly",
    "definitely",
    "exactly",
    "fine",
    "gladly",
    "good",
    "granted",
    "i accept",
    "i concur",
    "indubitably",
    "naturally",
    "of course",
    "ok",
    "okay",
    "positively",
    "precisely",
    "sure",
    "surely",
    "true",
    "undoubtedly",
    "very well",
    "willingly",
    "y",
    "ya",
    "yea",
    "yeah",
    "yep",
    "yes",
    "yessir",
    "yup",
];

/// Words that signal a negative.
const NO_WORDS: &[&str] = &[
    "no",
    "nay",
    "nix",
    "never",
    "not",
    "negative",
    "n",
    "not at all",
    "by no means",
];

/// True when the message reads as an intent to stop.
pub fn is_stop(message: &str) -> bool {
    matches_bank(message, STOP_WORDS)
}

/// True when the message reads as a confirmation.
pub fn is_confirmation(message: &str) -> bool {
    matches_bank(message, YES_WORDS)
}

/// True when the message reads as a denial.
pub fn is_denial(message: &str) -> bool {
    matches_bank(message, NO_WORDS)
}

fn matches_bank(message: &str, bank: &[&str]) -> bool {
    let normalized = message.to_lowercase();
    let tokens: Vec<&str> = normalized
        .split_whitespace()
        .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric()))
        .collect();

    bank.iter().any(|entry| {
        if entry.contains(' ') {
            normalized.contains(entry)
        } else {
            tokens.iter().any(|token| token == entry)
        }
    })
}

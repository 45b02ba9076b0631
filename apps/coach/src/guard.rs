//! Content Guard: a stateless prompt-injection denylist over untrusted text.
//!
//! Applied to both uploaded documents before a session starts and to every chat
//! message before it is sent. A match rejects the input; nothing is sent upstream.

use std::sync::LazyLock;

use regex::{RegexSet, RegexSetBuilder};
use thiserror::Error;

/// Case-insensitive patterns. Order matters only for reporting the first match.
pub const BLOCKLIST_PATTERNS: &[&str] = &[
    r"ignore (?:previous )?instructions",
    r"bypass (?:security|filters)",
    r"jailbreak",
    r"exfiltrat",
    r"send (?:your|my) api key",
    r"do anything",
];

static BLOCKLIST: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSetBuilder::new(BLOCKLIST_PATTERNS)
        .case_insensitive(true)
        .build()
        .expect("blocklist patterns are valid regexes")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GuardError {
    #[error("Blocked content detected (potential prompt-injection).")]
    BlockedContent { pattern: &'static str },
}

/// Returns the first denylisted pattern found in `text`, if any.
pub fn first_match(text: &str) -> Option<&'static str> {
    if text.is_empty() {
        return None;
    }
    BLOCKLIST
        .matches(text)
        .iter()
        .next()
        .map(|idx| BLOCKLIST_PATTERNS[idx])
}

/// Rejects `text` if it contains any denylisted phrase.
pub fn check(text: &str) -> Result<(), GuardError> {
    match first_match(text) {
        Some(pattern) => Err(GuardError::BlockedContent { pattern }),
        None => Ok(()),
    }
}

//! Failure message classification.
//!
//! Read-boundary rewrite of raw failure text into operator guidance. The
//! stored message is never modified; views call this when rendering a FAILED
//! node so the stored diagnostics stay verbatim for support.

/// Substring patterns paired with the guidance shown for them. Checked in
/// order; the first hit wins, so more specific patterns come first.
const CLASSIFIERS: &[(&str, &str)] = &[
    (
        "already in use",
        "The requested name collides with an existing resource. Choose a different name and resubmit.",
    ),
    (
        "quota",
        "The cloud account has hit a provider quota. Free capacity or request a quota increase, then resubmit.",
    ),
    (
        "authentication rejected",
        "The provider rejected the account credentials. Update the cloud account's credentials and resubmit.",
    ),
    (
        "credentials",
        "The provider rejected the account credentials. Update the cloud account's credentials and resubmit.",
    ),
    (
        "could not reach provider",
        "The provider could not be reached. This is usually transient; resubmit the operation.",
    ),
    (
        "timed out",
        "The provider did not respond in time. This is usually transient; resubmit the operation.",
    ),
];

/// Friendly guidance for a raw failure message, when a known pattern matches.
pub fn classify_failure(raw: &str) -> Option<&'static str> {
    let lowered = raw.to_lowercase();
    CLASSIFIERS
        .iter()
        .find(|(pattern, _)| lowered.contains(pattern))
        .map(|(_, guidance)| *guidance)
}

/// Message for display: the guidance when one matches, the raw text otherwise.
pub fn display_message(raw: &str) -> String {
    classify_failure(raw)
        .map(str::to_string)
        .unwrap_or_else(|| raw.to_string())
}

//! Static tag catalog for `--list-tags` and tag suggestions.

use helix_openapi_tools::filter::normalize_tag;
use std::fmt::Write as _;

/// Tag → description. Twitch's own endpoint groups plus the tags of the built-in tools.
pub const TAGS: &[(&str, &str)] = &[
    ("channels", "Channel management and information"),
    ("users", "User information and profiles"),
    ("streams", "Live stream data"),
    ("games", "Game and category information"),
    ("clips", "Video clips management"),
    ("search", "Search functionality"),
    ("analytics", "Analytics and statistics"),
    ("moderation", "Moderation tools"),
    ("content", "Content management"),
    ("followers", "Follower relationships"),
    ("following", "Following relationships"),
    ("extensions", "Twitch extensions"),
    ("auth", "Access token information"),
    ("stats", "Aggregated statistics"),
    ("utility", "Convenience tools built into this server"),
];

const SUGGESTION_THRESHOLD: f64 = 0.75;

#[must_use]
pub fn is_known(tag: &str) -> bool {
    let tag = normalize_tag(tag);
    TAGS.iter().any(|(t, _)| *t == tag)
}

/// Closest known tag by Jaro-Winkler similarity, if one is close enough.
#[must_use]
pub fn suggest(tag: &str) -> Option<&'static str> {
    let tag = normalize_tag(tag);
    TAGS.iter()
        .map(|(t, _)| (*t, strsim::jaro_winkler(&tag, t)))
        .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(t, _)| t)
}

/// Warn about tags that are neither in the catalog nor on any discovered tool.
pub fn warn_unknown<'a, I>(requested: I, discovered: &[String])
where
    I: IntoIterator<Item = &'a String>,
{
    for tag in requested {
        if is_known(tag) || discovered.iter().any(|d| normalize_tag(d) == *tag) {
            continue;
        }
        match suggest(tag) {
            Some(s) => tracing::warn!(tag = %tag, suggestion = s, "unknown tag, did you mean '{s}'?"),
            None => tracing::warn!(tag = %tag, "unknown tag"),
        }
    }
}

#[must_use]
pub fn render() -> String {
    let width = TAGS.iter().map(|(t, _)| t.len()).max().unwrap_or(0);
    let mut out = String::from("Available tags:\n");
    for (tag, desc) in TAGS {
        let _ = writeln!(out, "  {tag:<width$}  {desc}");
    }
    out
}

//! Free-text market title parsing.
//!
//! Titles are advisory. They are used to cross-check the ticker and never to
//! override it.

use regex::Regex;
use std::sync::LazyLock;

static RE_MATCHUP_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:will\s+(?:the\s+)?)?(.+?)\s+(?:at|@|vs\.?|v\.?|beat(?:\s+the)?)\s+(.+?)(?:\s+(?:winner|win|game))?(?:\s*\([^)]*\))?\s*\??\s*$",
    )
    .expect("matchup title pattern is valid")
});

/// Extracts the two raw team names from a matchup title.
///
/// Anything up to the last `:` is treated as a prefix (`"NFL: Chiefs at Broncos"`).
/// Returns names in title order.
#[must_use]
pub fn parse_title(title: &str) -> Option<(String, String)> {
    let body = title.rsplit(':').next().unwrap_or(title);
    let caps = RE_MATCHUP_TITLE.captures(body)?;
    let a = caps.get(1)?.as_str().trim();
    let b = caps.get(2)?.as_str().trim();
    if a.is_empty() || b.is_empty() {
        return None;
    }
    Some((a.to_string(), b.to_string()))
}

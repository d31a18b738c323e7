//! The suggestions grammar: comma separated `<phonetic> (<translation>)` segments.

use crate::error::SuggestionParseError;
use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Suggestion {
    pub phonetic: String,
    pub translation: String,
}

static SEGMENT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s*\((.+?)\)\s*$").unwrap());

impl FromStr for Suggestion {
    type Err = SuggestionParseError;

    fn from_str(segment: &str) -> Result<Self, Self::Err> {
        let segment = segment.trim();
        let captures = SEGMENT_PATTERN
            .captures(segment)
            .ok_or_else(|| SuggestionParseError(segment.to_string()))?;

        Ok(Self {
            phonetic: captures[1].trim().to_string(),
            translation: captures[2].trim().to_string(),
        })
    }
}

/// Parses every well-formed segment and silently omits the rest.
pub fn parse_suggestions(text: &str) -> Vec<Suggestion> {
    text.split(',')
        .filter(|segment| !segment.trim().is_empty())
        .filter_map(|segment| match segment.parse::<Suggestion>() {
            Ok(suggestion) => Some(suggestion),
            Err(e) => {
                tracing::trace!("skipping suggestion: {}", e);
                None
            }
        })
        .collect()
}

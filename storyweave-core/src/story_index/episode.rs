//! Indexed episodes and related-episode matches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A finished episode as stored in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    /// Caller-assigned episode number.
    pub number: u32,
    /// Raw episode text.
    pub content: String,
    /// Short summary supplied by the caller.
    pub summary: String,
    /// Distinct normalized terms of the content.
    pub terms: BTreeSet<String>,
    /// Whitespace-separated word count of the content.
    pub word_count: usize,
    /// First sentence of each of the opening paragraphs.
    pub key_events: Vec<String>,
    /// When the episode was (last) indexed.
    pub indexed_at: DateTime<Utc>,
}

/// An episode returned by a related-episode lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeMatch {
    /// Episode number.
    pub episode: u32,
    /// Count of distinct query terms found in the episode.
    pub score: usize,
    /// Episode summary.
    pub summary: String,
    /// Episode key events.
    pub key_events: Vec<String>,
}

/// First sentence of each of the first `paragraphs` paragraphs.
///
/// Paragraphs are separated by blank lines.
pub(crate) fn extract_key_events(content: &str, paragraphs: usize) -> Vec<String> {
    content
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .take(paragraphs)
        .filter_map(|p| {
            let sentence = p.split('.').next().unwrap_or(p).trim();
            if sentence.is_empty() {
                None
            } else {
                Some(format!("{sentence}."))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_events_first_sentence_per_paragraph() {
        let content = "Mira woke early. The sun was up.\n\nShe rode north. It rained.\n\n\n\nThe gate was shut";
        let events = extract_key_events(content, 5);
        assert_eq!(
            events,
            vec!["Mira woke early.", "She rode north.", "The gate was shut."]
        );
    }

    #[test]
    fn test_key_events_limited() {
        let content = "One.\n\nTwo.\n\nThree.";
        assert_eq!(extract_key_events(content, 2), vec!["One.", "Two."]);
        assert!(extract_key_events("", 5).is_empty());
    }
}

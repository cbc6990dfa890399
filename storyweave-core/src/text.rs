//! Text helpers shared by the story index and the character tracker.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};

/// Runs of up to three capitalized words.
static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Z][a-z]+(?:[ \t]+[A-Z][a-z]+){0,2}\b").expect("static name pattern")
});

/// Normalize a character or item name for lookup.
///
/// Trims, collapses internal whitespace and lowercases, so "Old  Tom" and
/// "old tom" address the same record.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Tokenize text into its distinct normalized terms.
///
/// Lowercases, splits on anything that is not alphanumeric, and drops
/// single-character fragments and stopwords.
pub fn tokenize(text: &str, stopwords: &HashSet<String>) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 1)
        .filter(|t| !stopwords.contains(*t))
        .map(str::to_string)
        .collect()
}

/// Split text into sentences on terminal punctuation and line breaks.
pub fn split_sentences(text: &str) -> Vec<&str> {
    text.split(['.', '!', '?', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Count whitespace-separated words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Compile a case-insensitive, word-bounded matcher for a word or phrase.
///
/// Internal whitespace in the phrase matches any run of whitespace.
pub fn phrase_matcher(phrase: &str) -> Result<Regex, regex::Error> {
    let body = phrase
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");
    Regex::new(&format!(r"(?i)\b{body}\b"))
}

/// Matcher for a character or item name.
///
/// Blank names match nothing and yield `None`.
pub fn name_matcher(name: &str) -> Option<Regex> {
    if name.trim().is_empty() {
        return None;
    }
    match phrase_matcher(name) {
        Ok(matcher) => Some(matcher),
        Err(err) => {
            tracing::warn!(target: "storyweave::text", phrase = name, error = %err, "name does not compile to a matcher");
            None
        }
    }
}

/// A capitalized name found in a sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameSpan {
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
    /// The name as written.
    pub name: String,
}

/// Find capitalized names in a sentence.
///
/// Leading and trailing words listed in `ignored` are trimmed off each
/// match, so "The Villain" yields "Villain" and a lone "The" yields nothing.
pub fn capitalized_names(sentence: &str, ignored: &HashSet<String>) -> Vec<NameSpan> {
    let mut spans = Vec::new();
    for m in NAME_PATTERN.find_iter(sentence) {
        let mut words: Vec<(usize, &str)> = Vec::new();
        let mut offset = m.start();
        for word in m.as_str().split_whitespace() {
            let at = sentence[offset..].find(word).map(|p| p + offset).unwrap_or(offset);
            words.push((at, word));
            offset = at + word.len();
        }

        while words.first().is_some_and(|(_, w)| ignored.contains(*w)) {
            words.remove(0);
        }
        while words.last().is_some_and(|(_, w)| ignored.contains(*w)) {
            words.pop();
        }

        if let (Some(&(start, _)), Some(&(last_start, last))) = (words.first(), words.last()) {
            let end = last_start + last.len();
            spans.push(NameSpan {
                start,
                end,
                name: words.iter().map(|(_, w)| *w).collect::<Vec<_>>().join(" "),
            });
        }
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stopwords() -> HashSet<String> {
        ["the", "and", "was"].iter().map(|s| s.to_string()).collect()
    }

    fn ignored() -> HashSet<String> {
        ["The", "She", "Later"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Old   Tom "), "old tom");
        assert_eq!(normalize_name("MIRA"), "mira");
    }

    #[test]
    fn test_tokenize_strips_punctuation_and_stopwords() {
        let terms = tokenize("The dragon, the DRAGON! And a sword-fight.", &stopwords());
        let expected: BTreeSet<String> = ["dragon", "sword", "fight"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(terms, expected);
    }

    #[test]
    fn test_split_sentences() {
        let sentences = split_sentences("Mira ran. Did she escape?\nYes!  ");
        assert_eq!(sentences, vec!["Mira ran", "Did she escape", "Yes"]);
    }

    #[test]
    fn test_phrase_matcher_word_bounded() {
        let m = phrase_matcher("ran away").unwrap();
        assert!(m.is_match("He RAN   away from the fight"));
        assert!(!m.is_match("he ran awayward"));

        let m = phrase_matcher("hid").unwrap();
        assert!(m.is_match("she hid."));
        assert!(!m.is_match("she hides"));
    }

    #[test]
    fn test_capitalized_names_trim_ignored_words() {
        let spans = capitalized_names("The Villain met Old Tom", &ignored());
        let names: Vec<_> = spans.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Villain", "Old Tom"]);
        assert_eq!(&"The Villain met Old Tom"[spans[0].start..spans[0].end], "Villain");
    }

    #[test]
    fn test_capitalized_names_skip_lone_ignored_word() {
        let spans = capitalized_names("She laughed", &ignored());
        assert!(spans.is_empty());
    }

    #[test]
    fn test_name_matcher() {
        let tom = name_matcher("Old  Tom").unwrap();
        assert!(tom.is_match("I visit old tom, at last"));
        assert!(!tom.is_match("Old Tomas"));

        let mira = name_matcher("mira").unwrap();
        assert!(mira.is_match("Mira's sword"));
        assert!(!mira.is_match("Admiral"));

        assert!(name_matcher("   ").is_none());
    }
}

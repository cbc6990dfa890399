//! Glob-style key patterns.

use crate::error::BlackboardError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A glob pattern over blackboard keys, compiled once.
///
/// `*` matches any run of characters (including `/`), `?` matches exactly
/// one character, everything else matches literally. The whole key must
/// match.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyPattern {
    glob: String,
    regex: Regex,
}

impl KeyPattern {
    /// Compile a glob pattern.
    pub fn new(glob: impl Into<String>) -> Result<Self, BlackboardError> {
        let glob = glob.into();
        let mut source = String::with_capacity(glob.len() + 8);
        source.push('^');
        for c in glob.chars() {
            match c {
                '*' => source.push_str(".*"),
                '?' => source.push('.'),
                other => source.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
            }
        }
        source.push('$');

        let regex = Regex::new(&source).map_err(|e| BlackboardError::InvalidPattern {
            pattern: glob.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self { glob, regex })
    }

    /// Check whether a key matches.
    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }

    /// The glob source.
    pub fn as_str(&self) -> &str {
        &self.glob
    }
}

impl fmt::Debug for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyPattern({:?})", self.glob)
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.glob)
    }
}

impl PartialEq for KeyPattern {
    fn eq(&self, other: &Self) -> bool {
        self.glob == other.glob
    }
}

impl Eq for KeyPattern {}

impl TryFrom<String> for KeyPattern {
    type Error = BlackboardError;

    fn try_from(glob: String) -> Result<Self, Self::Error> {
        Self::new(glob)
    }
}

impl From<KeyPattern> for String {
    fn from(pattern: KeyPattern) -> Self {
        pattern.glob
    }
}

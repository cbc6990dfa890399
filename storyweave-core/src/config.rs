//! Configuration and rule tables.
//!
//! Every heuristic the stores apply (stopwords, state predicates, trait
//! contradiction keywords, arc thresholds) lives here as plain data so it can
//! be inspected, edited as JSON, and unit-tested deterministically.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tokio::fs;

/// Top-level configuration for a coordination session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaveConfig {
    /// Blackboard settings.
    pub blackboard: BlackboardConfig,
    /// Story index settings and extraction tables.
    pub story_index: IndexConfig,
    /// Character tracker settings and rule tables.
    pub characters: TrackerConfig,
    /// Consistency-check step settings.
    pub coordinator: CoordinatorConfig,
}

impl WeaveConfig {
    /// Create a config with the built-in tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from JSON. Missing sections fall back to defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a JSON file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).await?;
        Self::from_json(&content)
    }

    /// Serialize the config (including defaults) as pretty JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check cross-references between tables.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.blackboard.system_agent.trim().is_empty() {
            return Err(invalid("blackboard.system_agent must not be empty"));
        }
        if self.coordinator.agent_name.trim().is_empty() {
            return Err(invalid("coordinator.agent_name must not be empty"));
        }

        let predicates: HashSet<&str> = self
            .story_index
            .predicates
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        for rule in &self.story_index.conflicts {
            for name in std::iter::once(&rule.established).chain(rule.excludes.iter()) {
                if !predicates.contains(name.as_str()) {
                    return Err(invalid(format!(
                        "conflict rule references unknown predicate '{name}'"
                    )));
                }
            }
        }
        for predicate in &self.story_index.predicates {
            if predicate.keywords.is_empty() {
                return Err(invalid(format!(
                    "predicate '{}' has no keywords",
                    predicate.name
                )));
            }
        }

        let tolerance = self.characters.voice_tolerance;
        if !(tolerance.is_finite() && tolerance >= 0.0) {
            return Err(invalid("characters.voice_tolerance must be a non-negative number"));
        }
        Ok(())
    }

    /// Set the blackboard system agent.
    pub fn with_system_agent(mut self, agent: impl Into<String>) -> Self {
        self.blackboard.system_agent = agent.into();
        self
    }

    /// Set the related-episode candidate scope.
    pub fn with_related_scope(mut self, scope: RelatedScope) -> Self {
        self.story_index.related_scope = scope;
        self
    }

    /// Replace the trait contradiction table.
    pub fn with_trait_rules(mut self, rules: Vec<TraitRule>) -> Self {
        self.characters.trait_rules = rules;
        self
    }

    /// Set the appearance count below which a character is being introduced.
    pub fn with_introduction_threshold(mut self, threshold: usize) -> Self {
        self.characters.introduction_threshold = threshold;
        self
    }

    /// Reject episodes whose consistency report contains errors.
    pub fn with_reject_on_errors(mut self, reject: bool) -> Self {
        self.coordinator.reject_on_errors = reject;
        self
    }
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.into(),
    }
}

// =============================================================================
// Blackboard
// =============================================================================

/// Blackboard settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlackboardConfig {
    /// The only agent allowed to clear the board.
    pub system_agent: String,
}

impl Default for BlackboardConfig {
    fn default() -> Self {
        Self {
            system_agent: "system".to_string(),
        }
    }
}

// =============================================================================
// Story index
// =============================================================================

/// Which indexed episodes `find_related_episodes` may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelatedScope {
    /// Every indexed episode except the current one, including later ones.
    #[default]
    AllExceptCurrent,
    /// Only episodes numbered before the current one.
    PriorOnly,
}

/// Where the subject of a predicate keyword sits in its sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectSide {
    /// Nearest name before the keyword ("the Villain died").
    Before,
    /// Nearest name after the keyword ("she used the Amulet").
    After,
}

/// A state predicate recognized in episode text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateRule {
    /// Predicate name, e.g. "dead".
    pub name: String,
    /// Words or phrases asserting the predicate.
    pub keywords: Vec<String>,
    /// Where to look for the subject.
    pub subject_side: SubjectSide,
}

impl PredicateRule {
    /// Create a predicate rule.
    pub fn new(name: &str, keywords: &[&str], subject_side: SubjectSide) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            subject_side,
        }
    }
}

/// Once `established` is asserted, a later claim of any `excludes`
/// predicate about the same subject is a timeline contradiction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictRule {
    /// The earlier predicate.
    pub established: String,
    /// Predicates that may not follow it.
    pub excludes: Vec<String>,
}

impl ConflictRule {
    /// Create a conflict rule.
    pub fn new(established: &str, excludes: &[&str]) -> Self {
        Self {
            established: established.to_string(),
            excludes: excludes.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// Summary keyword that sets a character descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorRule {
    /// Attribute set when the keyword is seen, e.g. "hair".
    pub attribute: String,
    /// Keyword that also serves as the value, e.g. "red".
    pub keyword: String,
}

impl DescriptorRule {
    fn new(attribute: &str, keyword: &str) -> Self {
        Self {
            attribute: attribute.to_string(),
            keyword: keyword.to_string(),
        }
    }
}

/// Story index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Terms dropped during tokenization.
    pub stopwords: Vec<String>,
    /// Candidate scope for related-episode lookup.
    pub related_scope: RelatedScope,
    /// State predicates extracted from episode text.
    pub predicates: Vec<PredicateRule>,
    /// Which predicates exclude which later ones.
    pub conflicts: Vec<ConflictRule>,
    /// Descriptor keywords applied to character summaries.
    pub descriptors: Vec<DescriptorRule>,
    /// Capitalized words never treated as names.
    pub ignored_names: Vec<String>,
    /// Paragraphs sampled for key events.
    pub key_event_paragraphs: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            stopwords: DEFAULT_STOPWORDS.iter().map(|s| s.to_string()).collect(),
            related_scope: RelatedScope::default(),
            predicates: vec![
                PredicateRule::new(
                    "dead",
                    &["died", "dead", "perished", "slain", "was killed"],
                    SubjectSide::Before,
                ),
                PredicateRule::new(
                    "alive",
                    &["alive", "survived", "still living"],
                    SubjectSide::Before,
                ),
                PredicateRule::new(
                    "destroyed",
                    &["destroyed", "shattered", "was broken"],
                    SubjectSide::Before,
                ),
                PredicateRule::new("used", &["used", "wielded", "raised"], SubjectSide::After),
                PredicateRule::new(
                    "possessed",
                    &["found", "carried", "took", "holds"],
                    SubjectSide::After,
                ),
                PredicateRule::new("lost", &["lost", "was stolen", "went missing"], SubjectSide::Before),
            ],
            conflicts: vec![
                ConflictRule::new("dead", &["alive"]),
                ConflictRule::new("destroyed", &["used", "possessed"]),
            ],
            descriptors: ["tall", "short"]
                .iter()
                .map(|k| DescriptorRule::new("height", k))
                .chain(
                    ["blonde", "brown", "black", "red", "gray", "white"]
                        .iter()
                        .map(|k| DescriptorRule::new("hair", k)),
                )
                .chain(
                    ["young", "old"]
                        .iter()
                        .map(|k| DescriptorRule::new("age_category", k)),
                )
                .collect(),
            ignored_names: DEFAULT_IGNORED_NAMES.iter().map(|s| s.to_string()).collect(),
            key_event_paragraphs: 5,
        }
    }
}

const DEFAULT_STOPWORDS: &[&str] = &[
    "a", "about", "after", "again", "all", "an", "and", "any", "are", "as", "at", "be", "been",
    "before", "but", "by", "can", "could", "did", "do", "does", "for", "from", "had", "has",
    "have", "he", "her", "hers", "him", "his", "i", "if", "in", "into", "is", "it", "its", "me",
    "my", "no", "not", "of", "on", "or", "our", "out", "over", "she", "so", "than", "that", "the",
    "their", "them", "then", "there", "these", "they", "this", "those", "to", "up", "was", "we",
    "were", "what", "when", "where", "which", "while", "who", "will", "with", "would", "you",
    "your",
];

const DEFAULT_IGNORED_NAMES: &[&str] = &[
    "The", "A", "An", "It", "He", "She", "They", "I", "We", "You", "His", "Her", "Their", "This",
    "That", "Then", "There", "When", "But", "And", "Later", "Now", "Still", "In", "On", "At",
];

// =============================================================================
// Characters
// =============================================================================

/// A personality trait and the behavior keywords that contradict it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitRule {
    /// Trait name, matched case-insensitively against the profile.
    pub trait_name: String,
    /// Action or dialogue keywords inconsistent with the trait.
    pub contradicted_by: Vec<String>,
}

impl TraitRule {
    /// Create a trait rule.
    pub fn new(trait_name: &str, contradicted_by: &[&str]) -> Self {
        Self {
            trait_name: trait_name.to_string(),
            contradicted_by: contradicted_by.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Action keywords from which a trait is inferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceRule {
    /// Trait added to the profile.
    pub trait_name: String,
    /// Action keywords that reveal it.
    pub keywords: Vec<String>,
}

impl InferenceRule {
    fn new(trait_name: &str, keywords: &[&str]) -> Self {
        Self {
            trait_name: trait_name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Character tracker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Trait contradiction table.
    pub trait_rules: Vec<TraitRule>,
    /// Trait inference table applied to tracked actions.
    pub inference_rules: Vec<InferenceRule>,
    /// Appearance count below which the arc stage is `Introduction`.
    pub introduction_threshold: usize,
    /// Allowed relative change in average dialogue length.
    pub voice_tolerance: f32,
    /// Dialogue lines kept per appearance for voice comparison.
    pub dialogue_samples_per_appearance: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            trait_rules: vec![
                TraitRule::new("brave", &["fled", "cowered", "hid", "ran away"]),
                TraitRule::new("compassionate", &["murdered", "tortured", "killed innocent"]),
                TraitRule::new("deceptive", &["confessed immediately", "told the truth"]),
                TraitRule::new("honest", &["lied", "deceived"]),
                TraitRule::new("loyal", &["betrayed", "abandoned"]),
            ],
            inference_rules: vec![
                InferenceRule::new("brave", &["fought", "attacked", "confronted"]),
                InferenceRule::new("compassionate", &["helped", "saved", "protected"]),
                InferenceRule::new("deceptive", &["lied", "deceived", "betrayed"]),
                InferenceRule::new("analytical", &["analyzed", "investigated", "reasoned"]),
            ],
            introduction_threshold: 2,
            voice_tolerance: 0.5,
            dialogue_samples_per_appearance: 5,
        }
    }
}

// =============================================================================
// Coordinator
// =============================================================================

/// Consistency-check step settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Agent id the coordinator uses on the blackboard.
    pub agent_name: String,
    /// Leave an episode uncommitted when its report has errors.
    pub reject_on_errors: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            agent_name: "coordinator".to_string(),
            reject_on_errors: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = WeaveConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.blackboard.system_agent, "system");
        assert_eq!(config.story_index.related_scope, RelatedScope::AllExceptCurrent);
        assert!(config
            .characters
            .trait_rules
            .iter()
            .any(|r| r.trait_name == "brave" && r.contradicted_by.contains(&"fled".to_string())));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "story_index": { "related_scope": "prior_only" },
            "characters": { "introduction_threshold": 3 }
        }"#;
        let config = WeaveConfig::from_json(json).unwrap();
        assert_eq!(config.story_index.related_scope, RelatedScope::PriorOnly);
        assert_eq!(config.characters.introduction_threshold, 3);
        // Untouched tables keep their defaults
        assert!(!config.story_index.predicates.is_empty());
        assert!(!config.characters.trait_rules.is_empty());
        assert_eq!(config.coordinator.agent_name, "coordinator");
    }

    #[test]
    fn test_json_round_trip_keeps_tables() {
        let config = WeaveConfig::default().with_introduction_threshold(4);
        let json = config.to_json().unwrap();
        let parsed = WeaveConfig::from_json(&json).unwrap();
        assert_eq!(parsed.characters.introduction_threshold, 4);
        assert_eq!(parsed.story_index.conflicts, config.story_index.conflicts);
    }

    #[test]
    fn test_unknown_predicate_in_conflict_rejected() {
        let mut config = WeaveConfig::default();
        config
            .story_index
            .conflicts
            .push(ConflictRule::new("dead", &["resurrected"]));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("resurrected"));
    }

    #[test]
    fn test_negative_voice_tolerance_rejected() {
        let json = r#"{ "characters": { "voice_tolerance": -1.0 } }"#;
        assert!(WeaveConfig::from_json(json).is_err());
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = WeaveConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("weave.json");
        std::fs::write(&path, r#"{ "coordinator": { "reject_on_errors": true } }"#).unwrap();

        let config = WeaveConfig::load(&path).await.unwrap();
        assert!(config.coordinator.reject_on_errors);
    }
}

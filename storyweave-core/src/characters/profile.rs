//! Character profiles and their typed attribute schema.

use super::relationship::RelationshipRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current version of [`CharacterAttributes`].
pub const ATTRIBUTE_SCHEMA_VERSION: u32 = 1;

fn current_schema() -> u32 {
    ATTRIBUTE_SCHEMA_VERSION
}

/// Established facts about a character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterAttributes {
    /// Schema version these attributes were written with.
    #[serde(default = "current_schema")]
    pub schema_version: u32,
    /// Personality traits, e.g. "brave".
    #[serde(default)]
    pub personality: Vec<String>,
    /// Physical descriptors by attribute, e.g. "hair" -> "red".
    #[serde(default)]
    pub physical: BTreeMap<String, String>,
    /// Background text.
    #[serde(default)]
    pub backstory: String,
    /// What the character wants.
    #[serde(default)]
    pub goals: Vec<String>,
    /// What the character avoids.
    #[serde(default)]
    pub fears: Vec<String>,
}

impl Default for CharacterAttributes {
    fn default() -> Self {
        Self {
            schema_version: ATTRIBUTE_SCHEMA_VERSION,
            personality: Vec::new(),
            physical: BTreeMap::new(),
            backstory: String::new(),
            goals: Vec::new(),
            fears: Vec::new(),
        }
    }
}

impl CharacterAttributes {
    /// Create empty attributes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a personality trait.
    pub fn with_trait(mut self, name: impl Into<String>) -> Self {
        self.personality.push(name.into());
        self
    }

    /// Set a physical descriptor.
    pub fn with_physical(mut self, attribute: impl Into<String>, value: impl Into<String>) -> Self {
        self.physical.insert(attribute.into(), value.into());
        self
    }

    /// Set the backstory.
    pub fn with_backstory(mut self, backstory: impl Into<String>) -> Self {
        self.backstory = backstory.into();
        self
    }

    /// Add a goal.
    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.goals.push(goal.into());
        self
    }

    /// Add a fear.
    pub fn with_fear(mut self, fear: impl Into<String>) -> Self {
        self.fears.push(fear.into());
        self
    }

    /// Check for a trait, ignoring case.
    pub fn has_trait(&self, name: &str) -> bool {
        self.personality.iter().any(|t| t.eq_ignore_ascii_case(name))
    }
}

/// One appearance of a character in an episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppearanceRecord {
    /// Episode number.
    pub episode: u32,
    /// What the character did.
    pub actions: Vec<String>,
    /// Sample lines the character spoke.
    pub dialogue: Vec<String>,
    /// When the appearance was tracked.
    pub timestamp: DateTime<Utc>,
}

/// Why the attributes changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SnapshotCause {
    /// First registration.
    Registered,
    /// Re-registration replaced the attributes.
    Updated,
    /// Traits inferred from tracked actions.
    Inferred {
        /// Traits that were added.
        traits: Vec<String>,
    },
}

/// The full attribute set after a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSnapshot {
    /// Episode from which these attributes apply.
    pub effective_from: u32,
    /// What changed them.
    pub cause: SnapshotCause,
    /// Attributes after the change.
    pub attributes: CharacterAttributes,
}

/// Everything tracked about one character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterProfile {
    /// Name as registered.
    pub name: String,
    /// Current attributes.
    pub attributes: CharacterAttributes,
    /// Appearances ordered by episode.
    pub appearances: Vec<AppearanceRecord>,
    /// Relationships by normalized name of the other character.
    pub relationships: BTreeMap<String, RelationshipRecord>,
    /// Attribute history, in the order changes were made.
    pub snapshots: Vec<AttributeSnapshot>,
}

impl CharacterProfile {
    pub(crate) fn new(name: impl Into<String>, attributes: CharacterAttributes, episode: u32) -> Self {
        Self {
            name: name.into(),
            snapshots: vec![AttributeSnapshot {
                effective_from: episode,
                cause: SnapshotCause::Registered,
                attributes: attributes.clone(),
            }],
            attributes,
            appearances: Vec::new(),
            relationships: BTreeMap::new(),
        }
    }

    /// Episode of the first tracked appearance.
    pub fn first_appearance(&self) -> Option<u32> {
        self.appearances.first().map(|a| a.episode)
    }

    /// Episode of the latest tracked appearance.
    pub fn last_appearance(&self) -> Option<u32> {
        self.appearances.last().map(|a| a.episode)
    }

    /// Appearances at or before an episode.
    pub fn appearances_until(&self, episode: u32) -> &[AppearanceRecord] {
        let end = self.appearances.partition_point(|a| a.episode <= episode);
        &self.appearances[..end]
    }

    /// Insert an appearance, keeping episode order.
    pub(crate) fn push_appearance(&mut self, record: AppearanceRecord) {
        let at = self.appearances.partition_point(|a| a.episode <= record.episode);
        self.appearances.insert(at, record);
    }

    /// Record an attribute change.
    pub(crate) fn push_snapshot(&mut self, effective_from: u32, cause: SnapshotCause) {
        self.snapshots.push(AttributeSnapshot {
            effective_from,
            cause,
            attributes: self.attributes.clone(),
        });
    }

    /// Record traits inferred from an appearance in `episode`.
    ///
    /// Only traits missing from the attributes in effect at that episode are
    /// added. Later inferred snapshots gain them too, up to the next
    /// registration or update, so an earlier episode never sees traits from a
    /// later one. Returns the traits that were added.
    pub(crate) fn record_inferred(&mut self, episode: u32, traits: Vec<String>) -> Vec<String> {
        let base = self.attributes_at(episode);
        let mut added: Vec<String> = Vec::new();
        for t in traits {
            if !base.has_trait(&t) && !added.iter().any(|a| a.eq_ignore_ascii_case(&t)) {
                added.push(t);
            }
        }
        if added.is_empty() {
            return added;
        }

        let mut attributes = base.clone();
        attributes.personality.extend(added.iter().cloned());

        let mut later: Vec<&mut AttributeSnapshot> = self
            .snapshots
            .iter_mut()
            .filter(|s| s.effective_from > episode)
            .collect();
        // Stable sort keeps insertion order within an episode
        later.sort_by_key(|s| s.effective_from);
        let mut replaced = false;
        for snapshot in later {
            if !matches!(snapshot.cause, SnapshotCause::Inferred { .. }) {
                replaced = true;
                break;
            }
            add_missing(&mut snapshot.attributes, &added);
        }
        if !replaced {
            add_missing(&mut self.attributes, &added);
        }

        self.snapshots.push(AttributeSnapshot {
            effective_from: episode,
            cause: SnapshotCause::Inferred {
                traits: added.clone(),
            },
            attributes,
        });
        added
    }

    /// Attributes in effect at an episode.
    ///
    /// Uses the latest change effective at or before `episode`, or the
    /// earliest known attributes if every change came later.
    pub fn attributes_at(&self, episode: u32) -> &CharacterAttributes {
        self.snapshots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.effective_from <= episode)
            .max_by_key(|(i, s)| (s.effective_from, *i))
            .map(|(_, s)| &s.attributes)
            .or_else(|| self.snapshots.first().map(|s| &s.attributes))
            .unwrap_or(&self.attributes)
    }

    /// Dialogue lines from appearances before an episode, at most
    /// `per_appearance` from each.
    pub fn dialogue_samples_before(&self, episode: u32, per_appearance: usize) -> Vec<&str> {
        self.appearances
            .iter()
            .filter(|a| a.episode < episode)
            .flat_map(|a| a.dialogue.iter().take(per_appearance))
            .map(String::as_str)
            .collect()
    }
}

fn add_missing(attributes: &mut CharacterAttributes, traits: &[String]) {
    for t in traits {
        if !attributes.has_trait(t) {
            attributes.personality.push(t.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn appearance(episode: u32) -> AppearanceRecord {
        AppearanceRecord {
            episode,
            actions: vec![format!("acted in {episode}")],
            dialogue: vec!["one two three".to_string()],
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_appearances_stay_ordered() {
        let mut profile = CharacterProfile::new("Mira", CharacterAttributes::new(), 1);
        profile.push_appearance(appearance(4));
        profile.push_appearance(appearance(1));
        profile.push_appearance(appearance(3));

        let episodes: Vec<_> = profile.appearances.iter().map(|a| a.episode).collect();
        assert_eq!(episodes, vec![1, 3, 4]);
        assert_eq!(profile.first_appearance(), Some(1));
        assert_eq!(profile.appearances_until(3).len(), 2);
        assert_eq!(profile.dialogue_samples_before(4, 5).len(), 2);
    }

    #[test]
    fn test_attributes_at_episode() {
        let mut profile = CharacterProfile::new(
            "Mira",
            CharacterAttributes::new().with_trait("curious"),
            2,
        );
        profile.attributes.personality.push("brave".to_string());
        profile.push_snapshot(5, SnapshotCause::Inferred {
            traits: vec!["brave".to_string()],
        });

        assert!(!profile.attributes_at(4).has_trait("brave"));
        assert!(profile.attributes_at(5).has_trait("BRAVE"));
        // Before registration, fall back to the registered attributes
        assert!(profile.attributes_at(1).has_trait("curious"));
    }

    #[test]
    fn test_inference_in_earlier_episode_does_not_see_later_traits() {
        let mut profile = CharacterProfile::new("Mira", CharacterAttributes::new(), 1);
        let later = profile.record_inferred(5, vec!["brave".to_string()]);
        assert_eq!(later, vec!["brave"]);
        let earlier = profile.record_inferred(3, vec!["compassionate".to_string()]);
        assert_eq!(earlier, vec!["compassionate"]);

        let at_4 = profile.attributes_at(4);
        assert!(at_4.has_trait("compassionate"));
        assert!(!at_4.has_trait("brave"));

        let at_5 = profile.attributes_at(5);
        assert!(at_5.has_trait("brave"));
        assert!(at_5.has_trait("compassionate"));
        assert_eq!(profile.attributes.personality, vec!["brave", "compassionate"]);

        // Already in effect at 6, so nothing is recorded
        assert!(profile.record_inferred(6, vec!["Brave".to_string()]).is_empty());
        assert_eq!(profile.snapshots.len(), 3);
    }

    #[test]
    fn test_earlier_inference_stops_at_later_update() {
        let mut profile = CharacterProfile::new("Mira", CharacterAttributes::new(), 1);
        profile.attributes = CharacterAttributes::new().with_trait("cautious");
        profile.push_snapshot(6, SnapshotCause::Updated);

        profile.record_inferred(2, vec!["brave".to_string()]);
        assert!(profile.attributes_at(3).has_trait("brave"));
        assert!(!profile.attributes_at(6).has_trait("brave"));
        assert!(!profile.attributes.has_trait("brave"));
    }

    #[test]
    fn test_attributes_deserialize_with_defaults() {
        let attrs: CharacterAttributes =
            serde_json::from_str(r#"{ "personality": ["brave"] }"#).unwrap();
        assert_eq!(attrs.schema_version, ATTRIBUTE_SCHEMA_VERSION);
        assert!(attrs.physical.is_empty());
    }
}

//! The character tracker store.

use super::arc::{ArcStage, CharacterArc, CharacterState};
use super::profile::{
    AppearanceRecord, CharacterAttributes, CharacterProfile, SnapshotCause, ATTRIBUTE_SCHEMA_VERSION,
};
use super::relationship::{RelationType, RelationshipRecord};
use super::rules::RuleBook;
use crate::config::TrackerConfig;
use crate::error::{TrackerError, TrackerResult};
use crate::finding::{ConsistencyFinding, FindingKind};
use crate::text::{normalize_name, word_count};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current character snapshot format version.
pub const TRACKER_SNAPSHOT_VERSION: u32 = 1;

/// Outcome of registering a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// A new profile was created.
    Created,
    /// An existing profile's attributes were replaced.
    Updated,
}

/// Behavior observed in a new episode, to be checked against the profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservedBehavior {
    /// Actions the character takes.
    pub actions: Vec<String>,
    /// Lines the character speaks.
    pub dialogue: Vec<String>,
    /// Physical descriptors as written in the episode.
    pub physical: BTreeMap<String, String>,
}

impl ObservedBehavior {
    /// Create an empty observation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an action.
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.actions.push(action.into());
        self
    }

    /// Add a dialogue line.
    pub fn with_dialogue(mut self, line: impl Into<String>) -> Self {
        self.dialogue.push(line.into());
        self
    }

    /// Add a physical descriptor.
    pub fn with_physical(mut self, attribute: impl Into<String>, value: impl Into<String>) -> Self {
        self.physical.insert(attribute.into(), value.into());
        self
    }
}

/// Serializable tracker contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerSnapshot {
    /// Snapshot format version.
    pub format_version: u32,
    /// All profiles.
    pub characters: Vec<CharacterProfile>,
}

/// Character registry with appearance log and consistency rules.
#[derive(Debug, Clone)]
pub struct CharacterTracker {
    config: TrackerConfig,
    rules: RuleBook,
    /// Profiles by normalized name.
    characters: BTreeMap<String, CharacterProfile>,
}

impl Default for CharacterTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl CharacterTracker {
    /// Create an empty tracker with the built-in rule tables.
    pub fn new() -> Self {
        Self::with_config(TrackerConfig::default())
    }

    /// Create an empty tracker.
    pub fn with_config(config: TrackerConfig) -> Self {
        Self {
            rules: RuleBook::new(&config),
            config,
            characters: BTreeMap::new(),
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a character, or replace the attributes of a known one.
    ///
    /// A new character is registered as of episode 1; an update takes
    /// effect from the character's latest appearance.
    pub fn register_character(&mut self, name: &str, attributes: CharacterAttributes) -> Registration {
        let episode = self
            .characters
            .get(&normalize_name(name))
            .and_then(CharacterProfile::last_appearance)
            .unwrap_or(1);
        self.register_character_at(name, attributes, episode)
    }

    /// Register a character as of an episode, or replace the attributes of a
    /// known one from that episode on.
    ///
    /// Re-registration keeps appearances and relationships.
    pub fn register_character_at(
        &mut self,
        name: &str,
        attributes: CharacterAttributes,
        episode: u32,
    ) -> Registration {
        let key = normalize_name(name);
        match self.characters.get_mut(&key) {
            Some(profile) => {
                tracing::warn!(
                    target: "storyweave::characters",
                    character = %profile.name,
                    episode,
                    "character already registered, replacing attributes"
                );
                profile.attributes = attributes;
                profile.push_snapshot(episode, SnapshotCause::Updated);
                Registration::Updated
            }
            None => {
                let display_name = name.split_whitespace().collect::<Vec<_>>().join(" ");
                tracing::info!(
                    target: "storyweave::characters",
                    character = %display_name,
                    episode,
                    "registered character"
                );
                self.characters
                    .insert(key, CharacterProfile::new(display_name, attributes, episode));
                Registration::Created
            }
        }
    }

    /// Get a profile.
    pub fn character(&self, name: &str) -> Option<&CharacterProfile> {
        self.characters.get(&normalize_name(name))
    }

    /// All profiles, by normalized name.
    pub fn characters(&self) -> impl Iterator<Item = &CharacterProfile> {
        self.characters.values()
    }

    /// Number of registered characters.
    pub fn len(&self) -> usize {
        self.characters.len()
    }

    /// Check if no character is registered.
    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    fn profile(&self, name: &str) -> TrackerResult<&CharacterProfile> {
        self.character(name).ok_or_else(|| TrackerError::NotFound {
            name: name.to_string(),
        })
    }

    // =========================================================================
    // Appearances and relationships
    // =========================================================================

    /// Record an appearance of a registered character.
    ///
    /// Traits revealed by the actions (see the inference table) are added to
    /// the profile and recorded as an attribute change.
    pub fn track_appearance(
        &mut self,
        episode: u32,
        name: &str,
        actions: Vec<String>,
        dialogue: Vec<String>,
    ) -> TrackerResult<()> {
        let inferred: Vec<String> = self
            .rules
            .infer(&actions)
            .into_iter()
            .map(str::to_string)
            .collect();
        let profile = self
            .characters
            .get_mut(&normalize_name(name))
            .ok_or_else(|| TrackerError::NotFound {
                name: name.to_string(),
            })?;

        let action_count = actions.len();
        profile.push_appearance(AppearanceRecord {
            episode,
            actions,
            dialogue,
            timestamp: Utc::now(),
        });

        let new_traits = profile.record_inferred(episode, inferred);
        if !new_traits.is_empty() {
            tracing::info!(
                target: "storyweave::characters",
                character = %profile.name,
                episode,
                traits = ?new_traits,
                "inferred traits from actions"
            );
        }

        tracing::info!(
            target: "storyweave::characters",
            character = %profile.name,
            episode,
            actions = action_count,
            "tracked appearance"
        );
        Ok(())
    }

    /// Record a relationship between two registered characters.
    ///
    /// Stored on both profiles, the second side using the inverse relation.
    /// A later call for the same pair replaces the earlier relationship.
    pub fn track_relationship(
        &mut self,
        a: &str,
        b: &str,
        relation: RelationType,
        episode: u32,
    ) -> TrackerResult<()> {
        let (key_a, key_b) = (normalize_name(a), normalize_name(b));
        let name_a = self.profile(a)?.name.clone();
        let name_b = self.profile(b)?.name.clone();

        if let Some(profile) = self.characters.get_mut(&key_a) {
            profile.relationships.insert(
                key_b.clone(),
                RelationshipRecord {
                    with: name_b.clone(),
                    relation,
                    since_episode: episode,
                },
            );
        }
        if let Some(profile) = self.characters.get_mut(&key_b) {
            profile.relationships.insert(
                key_a,
                RelationshipRecord {
                    with: name_a.clone(),
                    relation: relation.inverse(),
                    since_episode: episode,
                },
            );
        }

        tracing::info!(
            target: "storyweave::characters",
            a = %name_a,
            b = %name_b,
            relation = relation.name(),
            episode,
            "tracked relationship"
        );
        Ok(())
    }

    // =========================================================================
    // Consistency
    // =========================================================================

    /// Check new behavior against what is established about a character.
    ///
    /// Reports trait contradictions for actions and dialogue, physical
    /// descriptors that differ from the established ones, and voice drift
    /// when the average dialogue line length moves further from earlier
    /// episodes than the configured tolerance.
    pub fn validate_consistency(
        &self,
        episode: u32,
        name: &str,
        behavior: &ObservedBehavior,
    ) -> TrackerResult<Vec<ConsistencyFinding>> {
        let profile = self.profile(name)?;
        let attributes = &profile.attributes;
        let mut findings = Vec::new();

        let lines = behavior
            .actions
            .iter()
            .map(|l| ("action", l))
            .chain(behavior.dialogue.iter().map(|l| ("dialogue", l)));
        for (kind, line) in lines {
            for broken in self.rules.contradictions(|t| attributes.has_trait(t), line) {
                findings.push(ConsistencyFinding::new(
                    FindingKind::TraitContradiction,
                    profile.name.clone(),
                    [episode],
                    format!(
                        "{}'s {kind} '{line}' contradicts established trait '{}' (\"{}\")",
                        profile.name, broken.trait_name, broken.keyword
                    ),
                ));
            }
        }

        for (attribute, value) in &behavior.physical {
            if let Some(established) = attributes.physical.get(attribute) {
                if !established.eq_ignore_ascii_case(value) {
                    findings.push(ConsistencyFinding::new(
                        FindingKind::PhysicalContradiction,
                        profile.name.clone(),
                        [episode],
                        format!(
                            "{}'s {attribute} changed from '{established}' to '{value}'",
                            profile.name
                        ),
                    ));
                }
            }
        }

        if let Some(finding) = self.check_voice(profile, episode, &behavior.dialogue) {
            findings.push(finding);
        }

        tracing::debug!(
            target: "storyweave::characters",
            character = %profile.name,
            episode,
            findings = findings.len(),
            "validated consistency"
        );
        Ok(findings)
    }

    fn check_voice(
        &self,
        profile: &CharacterProfile,
        episode: u32,
        dialogue: &[String],
    ) -> Option<ConsistencyFinding> {
        if dialogue.is_empty() {
            return None;
        }
        let samples =
            profile.dialogue_samples_before(episode, self.config.dialogue_samples_per_appearance);
        if samples.is_empty() {
            return None;
        }

        let previous = average_words(samples.iter().copied());
        let current = average_words(dialogue.iter().map(String::as_str));
        let allowed = previous * f64::from(self.config.voice_tolerance);
        if (current - previous).abs() <= allowed {
            return None;
        }

        Some(ConsistencyFinding::new(
            FindingKind::VoiceDrift,
            profile.name.clone(),
            [episode],
            format!(
                "{}'s dialogue averages {current:.1} words per line, earlier episodes {previous:.1}",
                profile.name
            ),
        ))
    }

    // =========================================================================
    // Arcs and state
    // =========================================================================

    /// A character's development across every tracked appearance.
    pub fn get_character_arc(&self, name: &str) -> TrackerResult<CharacterArc> {
        let profile = self.profile(name)?;
        Ok(CharacterArc {
            name: profile.name.clone(),
            first_appearance: profile.first_appearance(),
            total_appearances: profile.appearances.len(),
            episodes: profile.appearances.iter().map(|a| a.episode).collect(),
            key_moments: profile
                .appearances
                .iter()
                .filter_map(|a| {
                    a.actions
                        .first()
                        .map(|action| format!("Episode {}: {action}", a.episode))
                })
                .collect(),
            relationships: profile.relationships.clone(),
            personality_evolution: profile.snapshots.clone(),
        })
    }

    /// Reconstruct a character as of an episode (inclusive).
    pub fn get_character_state(&self, name: &str, at_episode: u32) -> TrackerResult<CharacterState> {
        let profile = self.profile(name)?;
        let seen = profile.appearances_until(at_episode);
        let Some(latest) = seen.last() else {
            return Err(TrackerError::NotYetAppeared {
                name: profile.name.clone(),
                episode: at_episode,
            });
        };

        Ok(CharacterState {
            name: profile.name.clone(),
            at_episode,
            attributes: profile.attributes_at(at_episode).clone(),
            last_known_actions: latest.actions.clone(),
            last_seen: latest.episode,
            appearances: seen.len(),
            relationships: profile
                .relationships
                .iter()
                .filter(|(_, r)| r.since_episode <= at_episode)
                .map(|(k, r)| (k.clone(), r.clone()))
                .collect(),
            arc_stage: ArcStage::classify(
                seen.len(),
                profile.appearances.len(),
                self.config.introduction_threshold,
            ),
        })
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// Export every profile.
    pub fn export_state(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            format_version: TRACKER_SNAPSHOT_VERSION,
            characters: self.characters.values().cloned().collect(),
        }
    }

    /// Replace every profile with a snapshot's. A malformed snapshot leaves
    /// the tracker untouched.
    pub fn import_state(&mut self, snapshot: TrackerSnapshot) -> TrackerResult<()> {
        if snapshot.format_version != TRACKER_SNAPSHOT_VERSION {
            return Err(malformed(format!(
                "unsupported format version {} (expected {TRACKER_SNAPSHOT_VERSION})",
                snapshot.format_version
            )));
        }

        let mut characters = BTreeMap::new();
        for profile in snapshot.characters {
            if profile.attributes.schema_version != ATTRIBUTE_SCHEMA_VERSION {
                return Err(malformed(format!(
                    "{} uses attribute schema {}",
                    profile.name, profile.attributes.schema_version
                )));
            }
            if profile.snapshots.is_empty() {
                return Err(malformed(format!("{} has no attribute history", profile.name)));
            }
            if !profile.appearances.windows(2).all(|w| w[0].episode <= w[1].episode) {
                return Err(malformed(format!("{}'s appearances are out of order", profile.name)));
            }
            let key = normalize_name(&profile.name);
            if characters.insert(key, profile).is_some() {
                return Err(malformed("duplicate character name"));
            }
        }

        for profile in characters.values() {
            if let Some(other) = profile.relationships.keys().find(|k| !characters.contains_key(*k)) {
                return Err(malformed(format!(
                    "{} has a relationship with unknown character '{other}'",
                    profile.name
                )));
            }
        }

        self.characters = characters;
        tracing::info!(
            target: "storyweave::characters",
            characters = self.characters.len(),
            "state imported from snapshot"
        );
        Ok(())
    }
}

fn average_words<'a>(lines: impl Iterator<Item = &'a str>) -> f64 {
    let (words, count) = lines.fold((0usize, 0usize), |(w, c), line| (w + word_count(line), c + 1));
    if count == 0 {
        0.0
    } else {
        words as f64 / count as f64
    }
}

fn malformed(reason: impl Into<String>) -> TrackerError {
    TrackerError::MalformedSnapshot {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{TraitRule, WeaveConfig};

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn brave_a() -> CharacterTracker {
        let mut tracker = CharacterTracker::new();
        tracker.register_character("A", CharacterAttributes::new().with_trait("brave"));
        tracker
    }

    #[test]
    fn test_brave_character_fleeing_is_flagged() {
        let mut tracker = brave_a();
        tracker
            .track_appearance(1, "A", lines(&["fled"]), vec![])
            .unwrap();

        let findings = tracker
            .validate_consistency(2, "A", &ObservedBehavior::new().with_action("fled"))
            .unwrap();
        assert!(!findings.is_empty());
        assert_eq!(findings[0].kind, FindingKind::TraitContradiction);
        assert!(findings[0].description.contains("brave"), "{}", findings[0].description);
        assert_eq!(findings[0].episodes, vec![2]);

        let arc = tracker.get_character_arc("A").unwrap();
        assert_eq!(arc.first_appearance, Some(1));
    }

    #[test]
    fn test_consistent_behavior_has_no_findings() {
        let tracker = brave_a();
        let findings = tracker
            .validate_consistency(2, "a", &ObservedBehavior::new().with_action("fought the troll"))
            .unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn test_dialogue_can_contradict_traits() {
        let mut tracker = CharacterTracker::new();
        tracker.register_character("Vex", CharacterAttributes::new().with_trait("Honest"));
        let findings = tracker
            .validate_consistency(3, "Vex", &ObservedBehavior::new().with_dialogue("I lied to you all"))
            .unwrap();
        assert_eq!(findings.len(), 1);
        assert!(findings[0].description.contains("dialogue"));
    }

    #[test]
    fn test_unregistered_character() {
        let mut tracker = CharacterTracker::new();
        assert!(matches!(
            tracker.track_appearance(1, "Ghost", vec![], vec![]),
            Err(TrackerError::NotFound { .. })
        ));
        assert!(tracker.validate_consistency(1, "Ghost", &ObservedBehavior::new()).is_err());
        assert!(tracker.get_character_arc("Ghost").is_err());
        assert!(tracker.is_empty(), "no implicit registration");
    }

    #[test]
    fn test_reregistration_preserves_appearances() {
        let mut tracker = brave_a();
        tracker
            .track_appearance(1, "A", lines(&["walked"]), vec![])
            .unwrap();

        let outcome = tracker.register_character(" a ", CharacterAttributes::new().with_trait("cautious"));
        assert_eq!(outcome, Registration::Updated);

        let profile = tracker.character("A").unwrap();
        assert_eq!(profile.appearances.len(), 1);
        assert!(profile.attributes.has_trait("cautious"));
        assert!(!profile.attributes.has_trait("brave"));
        assert_eq!(profile.snapshots.len(), 2);
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_traits_inferred_from_actions() {
        let mut tracker = CharacterTracker::new();
        tracker.register_character("Mira", CharacterAttributes::new());
        tracker
            .track_appearance(2, "Mira", lines(&["fought the wolves", "helped the miller"]), vec![])
            .unwrap();
        tracker
            .track_appearance(3, "Mira", lines(&["fought again"]), vec![])
            .unwrap();

        let profile = tracker.character("Mira").unwrap();
        assert_eq!(profile.attributes.personality, vec!["brave", "compassionate"]);
        // Registration plus one inference; the repeat adds nothing
        assert_eq!(profile.snapshots.len(), 2);
        assert_eq!(
            profile.snapshots[1].cause,
            SnapshotCause::Inferred {
                traits: vec!["brave".to_string(), "compassionate".to_string()]
            }
        );

        // Now a retreat contradicts the inferred trait
        let findings = tracker
            .validate_consistency(4, "Mira", &ObservedBehavior::new().with_action("cowered"))
            .unwrap();
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn test_out_of_order_appearances_keep_traits_in_their_episode() {
        let mut tracker = CharacterTracker::new();
        tracker.register_character("Mira", CharacterAttributes::new());
        tracker
            .track_appearance(5, "Mira", lines(&["fought the ogre"]), vec![])
            .unwrap();
        tracker
            .track_appearance(3, "Mira", lines(&["helped the miller"]), vec![])
            .unwrap();

        let before = tracker.get_character_state("Mira", 4).unwrap();
        assert_eq!(before.attributes.personality, vec!["compassionate"]);

        let after = tracker.get_character_state("Mira", 5).unwrap();
        assert!(after.attributes.has_trait("brave"));
        assert!(after.attributes.has_trait("compassionate"));
    }

    #[test]
    fn test_custom_trait_rules_replace_defaults() {
        let config = WeaveConfig::new().with_trait_rules(vec![TraitRule::new("stoic", &["wept"])]);
        let mut tracker = CharacterTracker::with_config(config.characters);
        tracker.register_character(
            "Mira",
            CharacterAttributes::new().with_trait("stoic").with_trait("brave"),
        );

        let wept = ObservedBehavior::new().with_action("wept at the grave");
        assert_eq!(tracker.validate_consistency(2, "Mira", &wept).unwrap().len(), 1);

        let fled = ObservedBehavior::new().with_action("fled the field");
        assert!(
            tracker.validate_consistency(2, "Mira", &fled).unwrap().is_empty(),
            "the default brave rule is gone"
        );
    }

    #[test]
    fn test_physical_contradiction() {
        let mut tracker = CharacterTracker::new();
        tracker.register_character("Mira", CharacterAttributes::new().with_physical("hair", "red"));

        let same = ObservedBehavior::new().with_physical("hair", "Red");
        assert!(tracker.validate_consistency(2, "Mira", &same).unwrap().is_empty());

        let changed = ObservedBehavior::new()
            .with_physical("hair", "black")
            .with_physical("eyes", "green");
        let findings = tracker.validate_consistency(2, "Mira", &changed).unwrap();
        assert_eq!(findings.len(), 1, "unknown descriptors are not contradictions");
        assert_eq!(findings[0].kind, FindingKind::PhysicalContradiction);
        assert!(findings[0].description.contains("'red' to 'black'"));
    }

    #[test]
    fn test_voice_drift_is_a_warning() {
        let mut tracker = CharacterTracker::new();
        tracker.register_character("Old Tom", CharacterAttributes::new());
        tracker
            .track_appearance(1, "Old Tom", vec![], lines(&["Aye.", "No, lad.", "Go home."]))
            .unwrap();

        let terse = ObservedBehavior::new().with_dialogue("Stay back.");
        assert!(tracker.validate_consistency(2, "old tom", &terse).unwrap().is_empty());

        let rambling = ObservedBehavior::new().with_dialogue(
            "Well now, I have been thinking a great deal about the state of the harbour lately.",
        );
        let findings = tracker.validate_consistency(2, "old tom", &rambling).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::VoiceDrift);
        assert!(!findings[0].is_error());
    }

    #[test]
    fn test_relationships_are_bidirectional() {
        let mut tracker = CharacterTracker::new();
        tracker.register_character("Mira", CharacterAttributes::new());
        tracker.register_character("Old Tom", CharacterAttributes::new());

        tracker
            .track_relationship("Old Tom", "Mira", RelationType::Mentor, 2)
            .unwrap();
        assert!(tracker
            .track_relationship("Mira", "Ghost", RelationType::Ally, 2)
            .is_err());

        let mira = tracker.character("mira").unwrap();
        assert_eq!(mira.relationships["old tom"].relation, RelationType::Student);
        assert_eq!(mira.relationships["old tom"].with, "Old Tom");
        let tom = tracker.character("old tom").unwrap();
        assert_eq!(tom.relationships["mira"].relation, RelationType::Mentor);
        assert_eq!(tom.relationships["mira"].since_episode, 2);
    }

    #[test]
    fn test_character_state_as_of_episode() {
        let mut tracker = CharacterTracker::new();
        tracker.register_character("Mira", CharacterAttributes::new());
        tracker.register_character("Tom", CharacterAttributes::new());
        for episode in 1..=6 {
            tracker
                .track_appearance(episode, "Mira", vec![format!("act {episode}")], vec![])
                .unwrap();
        }
        tracker
            .track_relationship("Mira", "Tom", RelationType::Ally, 4)
            .unwrap();

        let early = tracker.get_character_state("Mira", 1).unwrap();
        assert_eq!(early.arc_stage, ArcStage::Introduction);
        assert_eq!(early.last_known_actions, vec!["act 1"]);
        assert!(early.relationships.is_empty());

        let middle = tracker.get_character_state("Mira", 2).unwrap();
        assert_eq!(middle.arc_stage, ArcStage::Development);

        let late = tracker.get_character_state("Mira", 4).unwrap();
        assert_eq!(late.arc_stage, ArcStage::Resolution);
        assert_eq!(late.relationships.len(), 1);
        assert_eq!(late.appearances, 4);

        let stages: Vec<_> = (1..=6)
            .map(|e| tracker.get_character_state("Mira", e).unwrap().arc_stage)
            .collect();
        assert!(stages.windows(2).all(|w| w[0] <= w[1]));

        assert!(matches!(
            tracker.get_character_state("Tom", 3),
            Err(TrackerError::NotYetAppeared { episode: 3, .. })
        ));
    }

    #[test]
    fn test_character_arc() {
        let mut tracker = CharacterTracker::new();
        tracker.register_character("Mira", CharacterAttributes::new());
        tracker
            .track_appearance(3, "Mira", lines(&["investigated the mill"]), vec![])
            .unwrap();
        tracker.track_appearance(1, "Mira", vec![], vec![]).unwrap();

        let arc = tracker.get_character_arc("Mira").unwrap();
        assert_eq!(arc.first_appearance, Some(1));
        assert_eq!(arc.total_appearances, 2);
        assert_eq!(arc.episodes, vec![1, 3]);
        assert_eq!(arc.key_moments, vec!["Episode 3: investigated the mill"]);
        assert_eq!(arc.personality_evolution.len(), 2);
    }

    #[test]
    fn test_export_import_round_trip() {
        let mut tracker = brave_a();
        tracker.register_character("B", CharacterAttributes::new());
        tracker
            .track_appearance(1, "A", lines(&["fought"]), lines(&["Onward!"]))
            .unwrap();
        tracker
            .track_relationship("A", "B", RelationType::Rival, 1)
            .unwrap();

        let json = serde_json::to_string(&tracker.export_state()).unwrap();
        let snapshot: TrackerSnapshot = serde_json::from_str(&json).unwrap();

        let mut restored = CharacterTracker::new();
        restored.import_state(snapshot).unwrap();

        assert_eq!(
            restored.get_character_arc("A").unwrap(),
            tracker.get_character_arc("A").unwrap()
        );
        assert_eq!(
            restored.get_character_state("A", 1).unwrap(),
            tracker.get_character_state("A", 1).unwrap()
        );
    }

    #[test]
    fn test_import_rejects_dangling_relationship() {
        let mut tracker = brave_a();
        tracker.register_character("B", CharacterAttributes::new());
        tracker
            .track_relationship("A", "B", RelationType::Ally, 1)
            .unwrap();

        let mut snapshot = tracker.export_state();
        snapshot.characters.retain(|c| c.name == "A");
        assert!(matches!(
            tracker.import_state(snapshot),
            Err(TrackerError::MalformedSnapshot { .. })
        ));
        assert_eq!(tracker.len(), 2);
    }
}

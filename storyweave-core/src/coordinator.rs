//! The consistency-check step.
//!
//! The coordinator owns the three stores. When a finished episode comes in
//! it applies the episode to trial copies of the story index and character
//! tracker, runs every check against them, and then either commits the
//! copies or drops them. The report and, for committed episodes, the
//! summary are published on the blackboard for downstream agents.

use crate::blackboard::Blackboard;
use crate::characters::{
    CharacterAttributes, CharacterTracker, ObservedBehavior, RelationType,
};
use crate::config::{CoordinatorConfig, WeaveConfig};
use crate::error::{PersistError, Result};
use crate::finding::ConsistencyReport;
use crate::persist::{SessionCheckpoint, CHECKPOINT_VERSION};
use crate::story_index::{EpisodeMatch, StoryIndex};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One character's part in an episode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppearanceDraft {
    /// Character name; must be registered or introduced by the episode.
    pub character: String,
    /// What the character does.
    pub actions: Vec<String>,
    /// Lines the character speaks.
    pub dialogue: Vec<String>,
    /// Physical descriptors as written.
    pub physical: BTreeMap<String, String>,
}

impl AppearanceDraft {
    /// Create an appearance with no actions or dialogue.
    pub fn new(character: impl Into<String>) -> Self {
        Self {
            character: character.into(),
            ..Self::default()
        }
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

    fn behavior(&self) -> ObservedBehavior {
        ObservedBehavior {
            actions: self.actions.clone(),
            dialogue: self.dialogue.clone(),
            physical: self.physical.clone(),
        }
    }
}

/// A finished episode and the structured facts extracted from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeDraft {
    /// Episode number.
    pub number: u32,
    /// Episode text.
    pub content: String,
    /// Episode summary.
    pub summary: String,
    /// Characters introduced in this episode.
    #[serde(default)]
    pub new_characters: Vec<(String, CharacterAttributes)>,
    /// Items introduced in this episode.
    #[serde(default)]
    pub new_items: Vec<String>,
    /// Item status changes as (item, status).
    #[serde(default)]
    pub item_statuses: Vec<(String, String)>,
    /// Character appearances.
    #[serde(default)]
    pub appearances: Vec<AppearanceDraft>,
    /// Relationships established as (a, b, relation of a to b).
    #[serde(default)]
    pub relationships: Vec<(String, String, RelationType)>,
}

impl EpisodeDraft {
    /// Create a draft with text only.
    pub fn new(number: u32, content: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            number,
            content: content.into(),
            summary: summary.into(),
            new_characters: Vec::new(),
            new_items: Vec::new(),
            item_statuses: Vec::new(),
            appearances: Vec::new(),
            relationships: Vec::new(),
        }
    }

    /// Introduce a character.
    pub fn with_character(mut self, name: impl Into<String>, attributes: CharacterAttributes) -> Self {
        self.new_characters.push((name.into(), attributes));
        self
    }

    /// Introduce an item.
    pub fn with_item(mut self, name: impl Into<String>) -> Self {
        self.new_items.push(name.into());
        self
    }

    /// Record an item status change.
    pub fn with_item_status(mut self, item: impl Into<String>, status: impl Into<String>) -> Self {
        self.item_statuses.push((item.into(), status.into()));
        self
    }

    /// Add a character appearance.
    pub fn with_appearance(mut self, appearance: AppearanceDraft) -> Self {
        self.appearances.push(appearance);
        self
    }

    /// Establish a relationship.
    pub fn with_relationship(
        mut self,
        a: impl Into<String>,
        b: impl Into<String>,
        relation: RelationType,
    ) -> Self {
        self.relationships.push((a.into(), b.into(), relation));
        self
    }
}

/// Owns the shared stores and runs the consistency check for each episode.
#[derive(Debug)]
pub struct Coordinator {
    config: CoordinatorConfig,
    blackboard: Arc<Blackboard>,
    index: StoryIndex,
    tracker: CharacterTracker,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new(WeaveConfig::default())
    }
}

impl Coordinator {
    /// Create a coordinator with empty stores.
    pub fn new(config: WeaveConfig) -> Self {
        Self {
            blackboard: Arc::new(Blackboard::with_config(config.blackboard)),
            index: StoryIndex::with_config(config.story_index),
            tracker: CharacterTracker::with_config(config.characters),
            config: config.coordinator,
        }
    }

    /// The shared blackboard, for handing to agents.
    pub fn blackboard(&self) -> Arc<Blackboard> {
        Arc::clone(&self.blackboard)
    }

    /// The committed story index.
    pub fn index(&self) -> &StoryIndex {
        &self.index
    }

    /// The committed character tracker.
    pub fn tracker(&self) -> &CharacterTracker {
        &self.tracker
    }

    /// Register a character outside of any episode, e.g. from the plan.
    pub fn register_character(&mut self, name: &str, attributes: CharacterAttributes) {
        self.tracker.register_character(name, attributes);
    }

    /// Earlier episodes relevant to a query, for the writer's context.
    pub fn related_context(&self, current_episode: u32, query: &str, top_k: usize) -> Vec<EpisodeMatch> {
        self.index.find_related_episodes(current_episode, query, top_k)
    }

    /// Check an episode against everything established so far.
    ///
    /// The report is always written to `consistency/episode_{n}`. The
    /// episode is committed unless `reject_on_errors` is set and the report
    /// has errors; a committed episode's summary goes to
    /// `story/episode_{n}/summary`. Structural failures (duplicate episode,
    /// unknown character or item) are returned as errors and change nothing.
    pub fn accept_episode(&mut self, draft: &EpisodeDraft) -> Result<ConsistencyReport> {
        let n = draft.number;
        let mut index = self.index.clone();
        let mut tracker = self.tracker.clone();

        index.add_episode(n, &draft.content, &draft.summary)?;
        for item in &draft.new_items {
            index.register_item(item, n);
        }
        for (item, status) in &draft.item_statuses {
            index.record_item_status(item, n, status)?;
        }

        for (name, attributes) in &draft.new_characters {
            tracker.register_character_at(name, attributes.clone(), n);
        }

        let mut findings = Vec::new();
        for appearance in &draft.appearances {
            findings.extend(tracker.validate_consistency(n, &appearance.character, &appearance.behavior())?);
            tracker.track_appearance(
                n,
                &appearance.character,
                appearance.actions.clone(),
                appearance.dialogue.clone(),
            )?;
        }
        for (a, b, relation) in &draft.relationships {
            tracker.track_relationship(a, b, *relation, n)?;
        }

        findings.extend(
            index
                .validate_timeline(n)
                .into_iter()
                .filter(|f| f.involves_episode(n)),
        );

        let mut report = ConsistencyReport::new(n, findings);
        let commit = report.approved || !self.config.reject_on_errors;
        let agent = self.config.agent_name.as_str();

        if commit {
            self.index = index;
            self.tracker = tracker;
            report.committed = true;
            self.blackboard.write(
                agent,
                &format!("story/episode_{n}/summary"),
                json!({
                    "episode": n,
                    "summary": draft.summary,
                    "characters": draft.appearances.iter().map(|a| a.character.as_str()).collect::<Vec<_>>(),
                }),
            );
        }
        self.blackboard
            .write(agent, &format!("consistency/episode_{n}"), serde_json::to_value(&report)?);

        if report.approved {
            tracing::info!(target: "storyweave::coordinator", episode = n, committed = report.committed, "episode approved");
        } else {
            tracing::warn!(
                target: "storyweave::coordinator",
                episode = n,
                errors = report.errors().count(),
                committed = report.committed,
                "episode has continuity errors"
            );
        }
        Ok(report)
    }

    /// Snapshot all three stores.
    pub fn checkpoint(&self) -> SessionCheckpoint {
        SessionCheckpoint::new(
            self.blackboard.export_state(),
            self.index.export_state(),
            self.tracker.export_state(),
        )
    }

    /// Restore all three stores from a checkpoint.
    ///
    /// Every part is validated before any store is replaced, so a bad
    /// checkpoint leaves the session as it was.
    pub fn restore(&mut self, checkpoint: SessionCheckpoint) -> Result<()> {
        if checkpoint.version != CHECKPOINT_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: CHECKPOINT_VERSION,
                found: checkpoint.version,
            }
            .into());
        }

        let mut index = StoryIndex::with_config(self.index.config().clone());
        index.import_state(checkpoint.story_index)?;
        let mut tracker = CharacterTracker::with_config(self.tracker.config().clone());
        tracker.import_state(checkpoint.characters)?;
        checkpoint.blackboard.validate()?;

        self.blackboard.import_state(checkpoint.blackboard)?;
        self.index = index;
        self.tracker = tracker;
        tracing::info!(
            target: "storyweave::coordinator",
            checkpoint = %checkpoint.checkpoint_id,
            "session restored"
        );
        Ok(())
    }
}

//! Character arcs and point-in-time state.

use super::profile::{AttributeSnapshot, CharacterAttributes};
use super::relationship::RelationshipRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Coarse lifecycle phase of a character's development.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArcStage {
    /// Still being introduced.
    Introduction,
    /// Being developed.
    Development,
    /// Past the midpoint of their appearances.
    Resolution,
}

impl ArcStage {
    /// Classify `count` appearances out of a `total`.
    ///
    /// `Introduction` while `count < introduction_threshold`, `Development`
    /// while `count` is below half of `total`, `Resolution` after that. For a
    /// fixed total the stage never goes backwards as `count` grows.
    pub fn classify(count: usize, total: usize, introduction_threshold: usize) -> Self {
        if count < introduction_threshold {
            ArcStage::Introduction
        } else if count.saturating_mul(2) < total {
            ArcStage::Development
        } else {
            ArcStage::Resolution
        }
    }

    /// Get the display name.
    pub fn name(&self) -> &'static str {
        match self {
            ArcStage::Introduction => "introduction",
            ArcStage::Development => "development",
            ArcStage::Resolution => "resolution",
        }
    }
}

impl fmt::Display for ArcStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A character's development across all tracked episodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterArc {
    /// Character name.
    pub name: String,
    /// Episode of the first appearance.
    pub first_appearance: Option<u32>,
    /// Number of tracked appearances.
    pub total_appearances: usize,
    /// Episodes appeared in, ascending.
    pub episodes: Vec<u32>,
    /// "Episode N: <first action>" for each appearance with actions.
    pub key_moments: Vec<String>,
    /// Relationships by normalized name of the other character.
    pub relationships: BTreeMap<String, RelationshipRecord>,
    /// Attribute changes in the order they happened.
    pub personality_evolution: Vec<AttributeSnapshot>,
}

/// A character as of one episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterState {
    /// Character name.
    pub name: String,
    /// Episode the state was reconstructed for.
    pub at_episode: u32,
    /// Attributes in effect at that episode.
    pub attributes: CharacterAttributes,
    /// Actions of the latest appearance at or before that episode.
    pub last_known_actions: Vec<String>,
    /// Episode of that appearance.
    pub last_seen: u32,
    /// Appearances so far.
    pub appearances: usize,
    /// Relationships established by that episode.
    pub relationships: BTreeMap<String, RelationshipRecord>,
    /// Lifecycle phase.
    pub arc_stage: ArcStage,
}

//! Shared-knowledge core for multi-agent story generation.
//!
//! This crate provides:
//! - A `Blackboard` where planner, writer and critic agents exchange
//!   structured artifacts, with subscriptions, audit history and snapshots
//! - A `StoryIndex` over finished episodes: keyword retrieval, item
//!   lifecycles and timeline contradiction detection
//! - A `CharacterTracker` that checks new behavior against established
//!   traits, looks and voice, and reconstructs arcs as of any episode
//! - A `Coordinator` that runs the consistency check for each episode and
//!   publishes the results
//!
//! # Quick Start
//!
//! ```
//! use storyweave_core::prelude::*;
//!
//! let mut coordinator = Coordinator::new(WeaveConfig::default());
//! coordinator.register_character("Villain", CharacterAttributes::new());
//!
//! coordinator.accept_episode(&EpisodeDraft::new(2, "The Villain died.", "death"))?;
//! let report = coordinator.accept_episode(&EpisodeDraft::new(4, "The Villain is alive.", "return"))?;
//!
//! assert!(!report.approved);
//! assert_eq!(report.findings[0].episodes, vec![2, 4]);
//! # Ok::<(), storyweave_core::Error>(())
//! ```

pub mod blackboard;
pub mod characters;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod finding;
pub mod id;
pub mod persist;
pub mod story_index;
pub mod testing;
mod text;

pub use blackboard::{AgentHandle, Blackboard, BlackboardEntry, BlackboardSnapshot};
pub use characters::{CharacterAttributes, CharacterTracker, ObservedBehavior, RelationType};
pub use config::WeaveConfig;
pub use coordinator::{AppearanceDraft, Coordinator, EpisodeDraft};
pub use error::{Error, Result};
pub use finding::{ConsistencyFinding, ConsistencyReport, FindingKind, Severity};
pub use persist::SessionCheckpoint;
pub use story_index::StoryIndex;
pub use testing::{ScriptedEpisode, TestHarness};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::blackboard::{AgentHandle, Blackboard, BlackboardEntry, Notification};
    pub use crate::characters::{
        ArcStage, CharacterAttributes, CharacterTracker, ObservedBehavior, Registration,
        RelationType,
    };
    pub use crate::config::{RelatedScope, WeaveConfig};
    pub use crate::coordinator::{AppearanceDraft, Coordinator, EpisodeDraft};
    pub use crate::error::*;
    pub use crate::finding::*;
    pub use crate::persist::SessionCheckpoint;
    pub use crate::story_index::{EpisodeMatch, StoryIndex};
}

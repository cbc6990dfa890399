//! Keyword-indexed narrative knowledge store.
//!
//! Tracks finished episodes behind an inverted term index, the lifecycle of
//! named items, and the state claims ("the Villain died") that episodes
//! assert, so a consistency check can ask:
//! - which earlier episodes are relevant to a query,
//! - what is known about a character or item as of an episode,
//! - whether two episodes assert mutually exclusive states.
//!
//! Retrieval is plain term overlap; there is no semantic matching.

mod claims;
mod episode;
mod item;
mod store;

pub use claims::{ClaimSource, StateClaim};
pub use episode::{Episode, EpisodeMatch};
pub use item::{ItemRecord, ItemStatusEntry, ItemStatusReport};
pub use store::{CharacterHistory, EpisodeAppearance, IndexSnapshot, StoryIndex, INDEX_SNAPSHOT_VERSION};

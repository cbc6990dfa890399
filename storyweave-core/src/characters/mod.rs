//! Character behavior tracking.
//!
//! A registry of character profiles with an appearance log, rule-based
//! consistency checks, relationship tracking, and arc/state reconstruction
//! as of any episode. Names are matched case-insensitively with whitespace
//! collapsed; the first registered spelling is kept for display.
//!
//! # Example
//!
//! ```
//! use storyweave_core::characters::{CharacterAttributes, CharacterTracker, ObservedBehavior};
//!
//! let mut tracker = CharacterTracker::new();
//! tracker.register_character("Mira", CharacterAttributes::new().with_trait("brave"));
//! tracker.track_appearance(1, "Mira", vec!["fought the wolves".into()], vec![]).unwrap();
//!
//! let findings = tracker
//!     .validate_consistency(2, "Mira", &ObservedBehavior::new().with_action("fled"))
//!     .unwrap();
//! assert_eq!(findings.len(), 1);
//! ```

mod arc;
mod profile;
mod relationship;
mod rules;
mod tracker;

pub use arc::{ArcStage, CharacterArc, CharacterState};
pub use profile::{
    AppearanceRecord, AttributeSnapshot, CharacterAttributes, CharacterProfile, SnapshotCause,
    ATTRIBUTE_SCHEMA_VERSION,
};
pub use relationship::{RelationType, RelationshipRecord};
pub use tracker::{CharacterTracker, ObservedBehavior, Registration, TrackerSnapshot, TRACKER_SNAPSHOT_VERSION};

//! Shared workspace for inter-agent communication.
//!
//! Agents write structured values under string keys, read the latest value,
//! query by glob pattern, and subscribe to key patterns. Every operation is
//! recorded in an append-only history, and the whole store can be exported
//! to a [`BlackboardSnapshot`] and restored from one.
//!
//! # Example
//!
//! ```
//! use storyweave_core::blackboard::Blackboard;
//! use serde_json::json;
//!
//! let board = Blackboard::new();
//! board.subscribe("writer", "plan/*").unwrap();
//! board.write("planner", "plan/outline", json!({ "acts": 3 }));
//!
//! assert_eq!(board.read("writer", "plan/outline").unwrap(), json!({ "acts": 3 }));
//! assert_eq!(board.take_notifications("writer").len(), 1);
//! ```

mod entry;
mod pattern;
mod snapshot;
mod store;

pub use entry::{AgentActivity, BlackboardEntry, HistoryRecord, Notification, Operation, Subscription};
pub use pattern::KeyPattern;
pub use snapshot::{BlackboardSnapshot, SNAPSHOT_VERSION};
pub use store::{AgentHandle, Blackboard};

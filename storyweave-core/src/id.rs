//! Type-safe ID types for snapshots and checkpoints.
//!
//! Uses newtype pattern to prevent mixing up different ID types at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Macro to define a newtype ID wrapper around UUID
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random ID
            #[inline]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Get the underlying UUID
            #[inline]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// First eight hex digits, for file names and log lines
            pub fn short(&self) -> String {
                self.0.simple().to_string()[..8].to_string()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.short())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Unique identifier for an exported blackboard snapshot
    SnapshotId
);

define_id!(
    /// Unique identifier for a full session checkpoint
    CheckpointId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_creation() {
        let id1 = SnapshotId::new();
        let id2 = SnapshotId::new();
        assert_ne!(id1, id2);
        assert_eq!(id1.as_uuid().get_version_num(), 4);
        assert_eq!(id1.short().len(), 8);
        assert!(id1.to_string().starts_with(&id1.short()));
    }

    #[test]
    fn test_id_debug_format() {
        let id = CheckpointId::new();
        let debug = format!("{:?}", id);
        assert!(debug.starts_with("CheckpointId("));
    }

    #[test]
    fn test_id_serde() {
        let id = SnapshotId::new();
        let json = serde_json::to_string(&id).unwrap();
        let parsed: SnapshotId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }
}

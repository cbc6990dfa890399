//! Versioned blackboard snapshots for crash recovery.

use super::entry::{BlackboardEntry, HistoryRecord, Notification, Operation, Subscription};
use crate::error::BlackboardError;
use crate::id::SnapshotId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything needed to resume a blackboard with identical read and query
/// behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlackboardSnapshot {
    /// Snapshot format version for compatibility checking.
    pub format_version: u32,
    /// Identifier of this export.
    pub snapshot_id: SnapshotId,
    /// When the snapshot was taken.
    pub exported_at: DateTime<Utc>,
    /// Version the next write will receive.
    pub next_version: u64,
    /// Current public entries by key.
    pub entries: BTreeMap<String, BlackboardEntry>,
    /// Private spaces by owning agent.
    pub private_entries: BTreeMap<String, BTreeMap<String, BlackboardEntry>>,
    /// Every version written to each public key, oldest first.
    pub key_versions: BTreeMap<String, Vec<BlackboardEntry>>,
    /// Full audit history, oldest first.
    pub history: Vec<HistoryRecord>,
    /// Registered subscriptions.
    pub subscriptions: Vec<Subscription>,
    /// Undrained notifications by agent.
    pub pending: BTreeMap<String, Vec<Notification>>,
}

impl BlackboardSnapshot {
    /// Parse a snapshot from JSON, reporting any failure as malformed.
    pub fn from_json(json: &str) -> Result<Self, BlackboardError> {
        let snapshot: Self = serde_json::from_str(json).map_err(|e| malformed(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Serialize the snapshot as JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Check internal consistency without touching any store.
    pub fn validate(&self) -> Result<(), BlackboardError> {
        if self.format_version != SNAPSHOT_VERSION {
            return Err(malformed(format!(
                "unsupported format version {} (expected {SNAPSHOT_VERSION})",
                self.format_version
            )));
        }

        for (key, entry) in &self.entries {
            self.check_entry(key, entry)?;
            let log = self
                .key_versions
                .get(key)
                .ok_or_else(|| malformed(format!("no version log for key '{key}'")))?;
            if log.last() != Some(entry) {
                return Err(malformed(format!(
                    "current entry for '{key}' is not its latest version"
                )));
            }
        }

        for (key, log) in &self.key_versions {
            if !self.entries.contains_key(key) && !log.is_empty() && !self.was_cleared() {
                return Err(malformed(format!("version log for unknown key '{key}'")));
            }
            let mut previous = 0;
            for entry in log {
                self.check_entry(key, entry)?;
                if entry.version <= previous {
                    return Err(malformed(format!("versions of '{key}' are not increasing")));
                }
                previous = entry.version;
            }
        }

        for (owner, space) in &self.private_entries {
            for (key, entry) in space {
                self.check_entry(key, entry)?;
                if &entry.writer != owner {
                    return Err(malformed(format!(
                        "private entry '{key}' of '{owner}' was written by '{}'",
                        entry.writer
                    )));
                }
            }
        }

        let mut previous_seq = 0;
        for record in &self.history {
            if record.seq <= previous_seq {
                return Err(malformed(format!(
                    "history sequence not increasing at {}",
                    record.seq
                )));
            }
            previous_seq = record.seq;
            if let Some(version) = record.version {
                if version >= self.next_version {
                    return Err(malformed(format!(
                        "history record {} has version {version} beyond next version {}",
                        record.seq, self.next_version
                    )));
                }
            }
        }

        Ok(())
    }

    fn check_entry(&self, key: &str, entry: &BlackboardEntry) -> Result<(), BlackboardError> {
        if entry.key != key {
            return Err(malformed(format!(
                "entry stored under '{key}' names key '{}'",
                entry.key
            )));
        }
        if entry.version == 0 || entry.version >= self.next_version {
            return Err(malformed(format!(
                "entry '{key}' has version {} outside 1..{}",
                entry.version, self.next_version
            )));
        }
        Ok(())
    }

    fn was_cleared(&self) -> bool {
        self.history.iter().any(|r| r.operation == Operation::Clear)
    }
}

fn malformed(reason: impl Into<String>) -> BlackboardError {
    BlackboardError::MalformedSnapshot {
        reason: reason.into(),
    }
}

//! Records stored on the blackboard.

use super::pattern::KeyPattern;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A value written to the blackboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlackboardEntry {
    /// Key the value lives under.
    pub key: String,
    /// Opaque structured payload.
    pub value: Value,
    /// Agent that wrote it.
    pub writer: String,
    /// When it was written.
    pub timestamp: DateTime<Utc>,
    /// Store-wide write counter at the time of the write.
    pub version: u64,
}

/// Kinds of operation recorded in the audit history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// A value was written.
    Write,
    /// A key was read.
    Read,
    /// A pattern was queried.
    Query,
    /// The board was cleared.
    Clear,
}

/// One line of the append-only audit history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Position in the history, starting at 1.
    pub seq: u64,
    /// Agent that performed the operation.
    pub agent: String,
    /// What was done.
    pub operation: Operation,
    /// Key, or pattern for queries.
    pub key: String,
    /// Whether the operation targeted a private space.
    #[serde(default)]
    pub private: bool,
    /// Version assigned by a write.
    #[serde(default)]
    pub version: Option<u64>,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
}

/// Interest of an agent in keys matching a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Subscribing agent.
    pub agent: String,
    /// Keys of interest.
    pub pattern: KeyPattern,
}

/// A write an agent has not looked at yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Key that changed.
    pub key: String,
    /// Version written.
    pub version: u64,
    /// Agent that wrote it.
    pub writer: String,
    /// Pattern that matched.
    pub pattern: String,
}

/// Per-agent operation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentActivity {
    /// Reads performed (hits and misses).
    pub reads: u64,
    /// Writes performed (public and private).
    pub writes: u64,
    /// Pattern queries performed.
    pub queries: u64,
}

impl AgentActivity {
    /// Count one operation.
    pub fn record(&mut self, operation: Operation) {
        match operation {
            Operation::Write => self.writes += 1,
            Operation::Read => self.reads += 1,
            Operation::Query => self.queries += 1,
            Operation::Clear => {}
        }
    }
}

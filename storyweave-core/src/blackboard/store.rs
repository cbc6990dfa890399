//! The blackboard store.

use super::entry::{
    AgentActivity, BlackboardEntry, HistoryRecord, Notification, Operation, Subscription,
};
use super::pattern::KeyPattern;
use super::snapshot::{BlackboardSnapshot, SNAPSHOT_VERSION};
use crate::config::BlackboardConfig;
use crate::error::{BlackboardError, BlackboardResult};
use crate::id::SnapshotId;
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Everything guarded by the blackboard lock.
#[derive(Debug)]
struct BoardState {
    public: BTreeMap<String, BlackboardEntry>,
    private: BTreeMap<String, BTreeMap<String, BlackboardEntry>>,
    key_versions: BTreeMap<String, Vec<BlackboardEntry>>,
    history: Vec<HistoryRecord>,
    subscriptions: Vec<Subscription>,
    pending: BTreeMap<String, Vec<Notification>>,
    activity: BTreeMap<String, AgentActivity>,
    next_version: u64,
}

impl Default for BoardState {
    fn default() -> Self {
        Self {
            public: BTreeMap::new(),
            private: BTreeMap::new(),
            key_versions: BTreeMap::new(),
            history: Vec::new(),
            subscriptions: Vec::new(),
            pending: BTreeMap::new(),
            activity: BTreeMap::new(),
            next_version: 1,
        }
    }
}

impl BoardState {
    fn record(&mut self, agent: &str, operation: Operation, key: &str, private: bool, version: Option<u64>) {
        let seq = self.history.last().map_or(1, |r| r.seq + 1);
        self.history.push(HistoryRecord {
            seq,
            agent: agent.to_string(),
            operation,
            key: key.to_string(),
            private,
            version,
            timestamp: Utc::now(),
        });
        self.activity
            .entry(agent.to_string())
            .or_default()
            .record(operation);
    }

    fn next_entry(&mut self, agent: &str, key: &str, value: Value) -> BlackboardEntry {
        let version = self.next_version;
        self.next_version += 1;
        BlackboardEntry {
            key: key.to_string(),
            value,
            writer: agent.to_string(),
            timestamp: Utc::now(),
            version,
        }
    }

    fn from_snapshot(snapshot: BlackboardSnapshot) -> Self {
        let mut activity: BTreeMap<String, AgentActivity> = BTreeMap::new();
        for record in &snapshot.history {
            activity
                .entry(record.agent.clone())
                .or_default()
                .record(record.operation);
        }
        Self {
            public: snapshot.entries,
            private: snapshot.private_entries,
            key_versions: snapshot.key_versions,
            history: snapshot.history,
            subscriptions: snapshot.subscriptions,
            pending: snapshot.pending,
            activity,
            next_version: snapshot.next_version,
        }
    }
}

/// Shared workspace for inter-agent communication.
///
/// Every method runs inside one critical section over the whole store, so
/// operations are atomic with respect to each other. Share it between agents
/// through an `Arc<Blackboard>` or per-agent [`AgentHandle`]s.
#[derive(Debug)]
pub struct Blackboard {
    state: Mutex<BoardState>,
    config: BlackboardConfig,
}

impl Default for Blackboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Blackboard {
    /// Create an empty blackboard with default settings.
    pub fn new() -> Self {
        Self::with_config(BlackboardConfig::default())
    }

    /// Create an empty blackboard.
    pub fn with_config(config: BlackboardConfig) -> Self {
        Self {
            state: Mutex::new(BoardState::default()),
            config,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get a handle that performs every operation as `agent`.
    pub fn handle(&self, agent: impl Into<String>) -> AgentHandle<'_> {
        AgentHandle {
            board: self,
            agent: agent.into(),
        }
    }

    // =========================================================================
    // Public space
    // =========================================================================

    /// Write a value to the public space and return its version.
    ///
    /// Overwrites any previous value; the old version stays in
    /// [`Blackboard::key_history`]. Every subscription matching `key` gets a
    /// pending notification.
    pub fn write(&self, agent: &str, key: &str, value: Value) -> u64 {
        let mut state = self.lock();
        let entry = state.next_entry(agent, key, value);
        let version = entry.version;

        state
            .key_versions
            .entry(key.to_string())
            .or_default()
            .push(entry.clone());
        state.public.insert(key.to_string(), entry);
        state.record(agent, Operation::Write, key, false, Some(version));

        let matched: Vec<(String, String)> = state
            .subscriptions
            .iter()
            .filter(|s| s.pattern.matches(key))
            .map(|s| (s.agent.clone(), s.pattern.as_str().to_string()))
            .collect();
        for (subscriber, pattern) in matched {
            state.pending.entry(subscriber).or_default().push(Notification {
                key: key.to_string(),
                version,
                writer: agent.to_string(),
                pattern,
            });
        }

        tracing::info!(target: "storyweave::blackboard", agent, key, version, "wrote public entry");
        version
    }

    /// Read the latest public value under `key`.
    pub fn read(&self, agent: &str, key: &str) -> BlackboardResult<Value> {
        let mut state = self.lock();
        state.record(agent, Operation::Read, key, false, None);

        match state.public.get(key) {
            Some(entry) => {
                tracing::debug!(target: "storyweave::blackboard", agent, key, "read public entry");
                Ok(entry.value.clone())
            }
            None => {
                tracing::warn!(target: "storyweave::blackboard", agent, key, "read of missing key");
                Err(BlackboardError::NotFound {
                    key: key.to_string(),
                })
            }
        }
    }

    /// Read the full latest public entry under `key` without recording a read.
    pub fn entry(&self, key: &str) -> Option<BlackboardEntry> {
        self.lock().public.get(key).cloned()
    }

    /// All current public entries whose key matches the glob `pattern`.
    pub fn query(
        &self,
        agent: &str,
        pattern: &str,
    ) -> BlackboardResult<BTreeMap<String, BlackboardEntry>> {
        let pattern = KeyPattern::new(pattern)?;
        let mut state = self.lock();
        state.record(agent, Operation::Query, pattern.as_str(), false, None);

        let matches: BTreeMap<String, BlackboardEntry> = state
            .public
            .iter()
            .filter(|(key, _)| pattern.matches(key))
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect();

        tracing::debug!(
            target: "storyweave::blackboard",
            agent,
            pattern = pattern.as_str(),
            matches = matches.len(),
            "queried"
        );
        Ok(matches)
    }

    /// Every version ever written to a public key, oldest first.
    pub fn key_history(&self, key: &str) -> Vec<BlackboardEntry> {
        self.lock().key_versions.get(key).cloned().unwrap_or_default()
    }

    /// Number of current public entries.
    pub fn len(&self) -> usize {
        self.lock().public.len()
    }

    /// Check if the public space is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().public.is_empty()
    }

    // =========================================================================
    // Private spaces
    // =========================================================================

    /// Write a value to the agent's own private space.
    pub fn write_private(&self, agent: &str, key: &str, value: Value) -> u64 {
        let mut state = self.lock();
        let entry = state.next_entry(agent, key, value);
        let version = entry.version;

        state
            .private
            .entry(agent.to_string())
            .or_default()
            .insert(key.to_string(), entry);
        state.record(agent, Operation::Write, key, true, Some(version));

        tracing::debug!(target: "storyweave::blackboard", agent, key, version, "wrote private entry");
        version
    }

    /// Read from `owner`'s private space.
    pub fn read_private(&self, agent: &str, owner: &str, key: &str) -> BlackboardResult<Value> {
        let mut state = self.lock();
        state.record(agent, Operation::Read, key, true, None);

        let value = state
            .private
            .get(owner)
            .and_then(|space| space.get(key))
            .map(|entry| entry.value.clone());
        value.ok_or_else(|| {
            tracing::warn!(target: "storyweave::blackboard", agent, owner, key, "read of missing private key");
            BlackboardError::NotFound {
                key: format!("{owner}:{key}"),
            }
        })
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Register interest in keys matching `pattern`.
    ///
    /// Only later writes produce notifications; existing entries do not.
    pub fn subscribe(&self, agent: &str, pattern: &str) -> BlackboardResult<()> {
        let pattern = KeyPattern::new(pattern)?;
        let mut state = self.lock();
        let exists = state
            .subscriptions
            .iter()
            .any(|s| s.agent == agent && s.pattern == pattern);
        if !exists {
            tracing::info!(target: "storyweave::blackboard", agent, pattern = pattern.as_str(), "subscribed");
            state.subscriptions.push(Subscription {
                agent: agent.to_string(),
                pattern,
            });
        }
        Ok(())
    }

    /// Remove a subscription. Returns whether one was removed.
    pub fn unsubscribe(&self, agent: &str, pattern: &str) -> bool {
        let mut state = self.lock();
        let before = state.subscriptions.len();
        state
            .subscriptions
            .retain(|s| !(s.agent == agent && s.pattern.as_str() == pattern));
        before != state.subscriptions.len()
    }

    /// Patterns an agent is subscribed to.
    pub fn subscriptions_of(&self, agent: &str) -> Vec<String> {
        self.lock()
            .subscriptions
            .iter()
            .filter(|s| s.agent == agent)
            .map(|s| s.pattern.as_str().to_string())
            .collect()
    }

    /// Notifications waiting for an agent, oldest first, left in place.
    pub fn pending_notifications(&self, agent: &str) -> Vec<Notification> {
        self.lock().pending.get(agent).cloned().unwrap_or_default()
    }

    /// Drain the notifications waiting for an agent.
    pub fn take_notifications(&self, agent: &str) -> Vec<Notification> {
        self.lock().pending.remove(agent).unwrap_or_default()
    }

    // =========================================================================
    // History and status
    // =========================================================================

    /// The most recent `limit` history records, newest first.
    pub fn get_history(&self, limit: usize) -> Vec<HistoryRecord> {
        self.lock().history.iter().rev().take(limit).cloned().collect()
    }

    /// The most recent `limit` history records of one agent, newest first.
    pub fn get_agent_history(&self, agent: &str, limit: usize) -> Vec<HistoryRecord> {
        self.lock()
            .history
            .iter()
            .rev()
            .filter(|r| r.agent == agent)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Total number of history records.
    pub fn history_len(&self) -> usize {
        self.lock().history.len()
    }

    /// Per-agent operation counters since session start.
    pub fn get_agent_status(&self) -> BTreeMap<String, AgentActivity> {
        self.lock().activity.clone()
    }

    /// Clear the public and private spaces.
    ///
    /// Only the configured system agent may clear. History, version logs and
    /// subscriptions survive.
    pub fn clear(&self, agent: &str) -> BlackboardResult<()> {
        if agent != self.config.system_agent {
            tracing::warn!(target: "storyweave::blackboard", agent, "unauthorized clear attempt");
            return Err(BlackboardError::Unauthorized {
                agent: agent.to_string(),
                operation: "clear the blackboard".to_string(),
            });
        }

        let mut state = self.lock();
        state.public.clear();
        state.private.clear();
        state.record(agent, Operation::Clear, "*", false, None);
        tracing::info!(target: "storyweave::blackboard", agent, "cleared");
        Ok(())
    }

    // =========================================================================
    // Checkpointing
    // =========================================================================

    /// Export the complete state for checkpointing.
    pub fn export_state(&self) -> BlackboardSnapshot {
        let state = self.lock();
        BlackboardSnapshot {
            format_version: SNAPSHOT_VERSION,
            snapshot_id: SnapshotId::new(),
            exported_at: Utc::now(),
            next_version: state.next_version,
            entries: state.public.clone(),
            private_entries: state.private.clone(),
            key_versions: state.key_versions.clone(),
            history: state.history.clone(),
            subscriptions: state.subscriptions.clone(),
            pending: state.pending.clone(),
        }
    }

    /// Replace the whole state with a snapshot.
    ///
    /// The snapshot is validated before the store is touched; a malformed
    /// snapshot leaves the current state exactly as it was.
    pub fn import_state(&self, snapshot: BlackboardSnapshot) -> BlackboardResult<()> {
        if let Err(err) = snapshot.validate() {
            tracing::warn!(target: "storyweave::blackboard", error = %err, "rejected snapshot");
            return Err(err);
        }

        let snapshot_id = snapshot.snapshot_id;
        let restored = BoardState::from_snapshot(snapshot);
        *self.lock() = restored;
        tracing::info!(target: "storyweave::blackboard", %snapshot_id, "state imported from snapshot");
        Ok(())
    }

    /// Parse and import a JSON snapshot.
    pub fn import_json(&self, json: &str) -> BlackboardResult<()> {
        let snapshot = BlackboardSnapshot::from_json(json)?;
        self.import_state(snapshot)
    }
}

/// A blackboard bound to one agent id.
#[derive(Debug, Clone)]
pub struct AgentHandle<'a> {
    board: &'a Blackboard,
    agent: String,
}

impl AgentHandle<'_> {
    /// The agent this handle acts as.
    pub fn agent(&self) -> &str {
        &self.agent
    }

    /// Write to the public space.
    pub fn write(&self, key: &str, value: Value) -> u64 {
        self.board.write(&self.agent, key, value)
    }

    /// Write to this agent's private space.
    pub fn write_private(&self, key: &str, value: Value) -> u64 {
        self.board.write_private(&self.agent, key, value)
    }

    /// Read from the public space.
    pub fn read(&self, key: &str) -> BlackboardResult<Value> {
        self.board.read(&self.agent, key)
    }

    /// Read from another agent's private space.
    pub fn read_private(&self, owner: &str, key: &str) -> BlackboardResult<Value> {
        self.board.read_private(&self.agent, owner, key)
    }

    /// Query the public space.
    pub fn query(&self, pattern: &str) -> BlackboardResult<BTreeMap<String, BlackboardEntry>> {
        self.board.query(&self.agent, pattern)
    }

    /// Subscribe to a key pattern.
    pub fn subscribe(&self, pattern: &str) -> BlackboardResult<()> {
        self.board.subscribe(&self.agent, pattern)
    }

    /// Drain this agent's notifications.
    pub fn take_notifications(&self) -> Vec<Notification> {
        self.board.take_notifications(&self.agent)
    }
}

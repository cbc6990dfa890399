//! Session checkpoints for save/resume.
//!
//! A checkpoint bundles the snapshots of all three stores into one
//! versioned JSON document.

use crate::blackboard::BlackboardSnapshot;
use crate::characters::TrackerSnapshot;
use crate::error::PersistError;
use crate::id::CheckpointId;
use crate::story_index::IndexSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Current checkpoint file version.
pub const CHECKPOINT_VERSION: u32 = 1;

/// Everything needed to resume a coordination session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCheckpoint {
    /// Checkpoint format version for compatibility checking.
    pub version: u32,
    /// Identifier of this checkpoint.
    pub checkpoint_id: CheckpointId,
    /// Summary readable without the full state.
    pub metadata: CheckpointMetadata,
    /// Blackboard state.
    pub blackboard: BlackboardSnapshot,
    /// Story index state.
    pub story_index: IndexSnapshot,
    /// Character tracker state.
    pub characters: TrackerSnapshot,
}

/// Summary of a checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    /// When the checkpoint was taken.
    pub created_at: DateTime<Utc>,
    /// Indexed episode numbers.
    pub episodes: Vec<u32>,
    /// Registered character names.
    pub characters: Vec<String>,
    /// Current public blackboard entries.
    pub blackboard_entries: usize,
}

impl SessionCheckpoint {
    /// Bundle store snapshots into a checkpoint.
    pub fn new(
        blackboard: BlackboardSnapshot,
        story_index: IndexSnapshot,
        characters: TrackerSnapshot,
    ) -> Self {
        let metadata = CheckpointMetadata {
            created_at: Utc::now(),
            episodes: story_index.episodes.iter().map(|e| e.number).collect(),
            characters: characters.characters.iter().map(|c| c.name.clone()).collect(),
            blackboard_entries: blackboard.entries.len(),
        };
        Self {
            version: CHECKPOINT_VERSION,
            checkpoint_id: CheckpointId::new(),
            metadata,
            blackboard,
            story_index,
            characters,
        }
    }

    /// File name for this checkpoint, ordered by the latest indexed episode.
    pub fn file_name(&self) -> String {
        let latest = self.metadata.episodes.last().copied().unwrap_or(0);
        format!("checkpoint-ep{latest:04}-{}.json", self.checkpoint_id.short())
    }

    /// Save into a directory under [`Self::file_name`], returning the path.
    pub async fn save_in_dir(&self, dir: impl AsRef<Path>) -> Result<PathBuf, PersistError> {
        fs::create_dir_all(dir.as_ref()).await?;
        let path = dir.as_ref().join(self.file_name());
        self.save_json(&path).await?;
        Ok(path)
    }

    /// Save to a JSON file.
    pub async fn save_json(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), content).await?;
        tracing::info!(
            target: "storyweave::persist",
            checkpoint = %self.checkpoint_id,
            path = %path.as_ref().display(),
            "saved checkpoint"
        );
        Ok(())
    }

    /// Load from a JSON file.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let content = fs::read_to_string(path).await?;
        let checkpoint: Self = serde_json::from_str(&content)?;

        if checkpoint.version != CHECKPOINT_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: CHECKPOINT_VERSION,
                found: checkpoint.version,
            });
        }

        Ok(checkpoint)
    }

    /// Read a checkpoint's metadata without deserializing the stores.
    pub async fn peek_metadata(path: impl AsRef<Path>) -> Result<CheckpointMetadata, PersistError> {
        let content = fs::read_to_string(path).await?;

        #[derive(Deserialize)]
        struct Partial {
            version: u32,
            metadata: CheckpointMetadata,
        }

        let partial: Partial = serde_json::from_str(&content)?;

        if partial.version != CHECKPOINT_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: CHECKPOINT_VERSION,
                found: partial.version,
            });
        }

        Ok(partial.metadata)
    }
}

/// A checkpoint file found on disk.
#[derive(Debug, Clone)]
pub struct CheckpointInfo {
    /// Path to the checkpoint file.
    pub path: PathBuf,
    /// Checkpoint metadata.
    pub metadata: CheckpointMetadata,
}

/// List readable checkpoints in a directory, newest first.
///
/// Files that are not checkpoints of the current version are skipped.
pub async fn list_checkpoints(dir: impl AsRef<Path>) -> Result<Vec<CheckpointInfo>, PersistError> {
    let mut found = Vec::new();
    let mut entries = fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|e| e == "json") {
            match SessionCheckpoint::peek_metadata(&path).await {
                Ok(metadata) => found.push(CheckpointInfo { path, metadata }),
                Err(err) => tracing::debug!(
                    target: "storyweave::persist",
                    path = %path.display(),
                    error = %err,
                    "skipping unreadable checkpoint"
                ),
            }
        }
    }

    found.sort_by(|a, b| b.metadata.created_at.cmp(&a.metadata.created_at));
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blackboard::Blackboard;
    use crate::characters::{CharacterAttributes, CharacterTracker};
    use crate::story_index::StoryIndex;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample() -> SessionCheckpoint {
        let board = Blackboard::new();
        board.write("planner", "plan/outline", json!("three acts"));
        let mut index = StoryIndex::new();
        index.add_episode(1, "Mira left the village.", "departure").unwrap();
        let mut tracker = CharacterTracker::new();
        tracker.register_character("Mira", CharacterAttributes::new());

        SessionCheckpoint::new(board.export_state(), index.export_state(), tracker.export_state())
    }

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");

        let checkpoint = sample();
        checkpoint.save_json(&path).await.unwrap();
        let loaded = SessionCheckpoint::load_json(&path).await.unwrap();

        assert_eq!(loaded, checkpoint);
    }

    #[tokio::test]
    async fn test_peek_metadata() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        sample().save_json(&path).await.unwrap();

        let metadata = SessionCheckpoint::peek_metadata(&path).await.unwrap();
        assert_eq!(metadata.episodes, vec![1]);
        assert_eq!(metadata.characters, vec!["Mira"]);
        assert_eq!(metadata.blackboard_entries, 1);
    }

    #[tokio::test]
    async fn test_version_mismatch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");

        let mut checkpoint = sample();
        checkpoint.version = 99;
        checkpoint.save_json(&path).await.unwrap();

        let err = SessionCheckpoint::load_json(&path).await.unwrap_err();
        assert!(matches!(
            err,
            PersistError::VersionMismatch {
                expected: CHECKPOINT_VERSION,
                found: 99
            }
        ));
    }

    #[tokio::test]
    async fn test_list_checkpoints_newest_first() {
        let dir = TempDir::new().unwrap();
        let older = sample();
        let older_path = older.save_in_dir(dir.path()).await.unwrap();
        let mut newer = sample();
        newer.metadata.created_at = older.metadata.created_at + chrono::Duration::seconds(5);
        let newer_path = newer.save_in_dir(dir.path()).await.unwrap();
        fs::write(dir.path().join("notes.json"), "{}").await.unwrap();
        fs::write(dir.path().join("readme.txt"), "hi").await.unwrap();

        let listed = list_checkpoints(dir.path()).await.unwrap();
        let paths: Vec<_> = listed.iter().map(|c| c.path.clone()).collect();
        assert_eq!(paths, vec![newer_path, older_path]);
        assert!(listed[0]
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("checkpoint-ep0001-")));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = SessionCheckpoint::load_json(dir.path().join("absent.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, PersistError::Io(_)));
    }
}

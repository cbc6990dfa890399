//! Checkpoint save/resume tests.
//!
//! Sessions are played, checkpointed to disk, and resumed in a fresh
//! coordinator that must behave exactly like the original.
//!
//! Run with: `cargo test -p storyweave-core --test checkpoint_recovery`

use serde_json::json;
use storyweave_core::persist::CHECKPOINT_VERSION;
use storyweave_core::prelude::*;
use storyweave_core::testing::{fixtures, TestHarness};
use tempfile::TempDir;

fn played_saga() -> TestHarness {
    let mut harness = TestHarness::new();
    for (name, attributes) in fixtures::villain_saga_cast() {
        harness.character(name, attributes);
    }
    harness.play(&fixtures::villain_saga());
    harness
}

// =============================================================================
// TEST: Store snapshots
// =============================================================================

#[test]
fn test_blackboard_snapshot_resumes_identically() {
    let board = Blackboard::new();
    board.write("planner", "plan/outline", json!({ "acts": 3 }));
    board.write("planner", "plan/outline", json!({ "acts": 4 }));
    board.write("writer", "draft/episode_1", json!("It began at dawn."));
    board.write_private("writer", "notes", json!("cut the prologue"));
    board.subscribe("critic", "draft/*").unwrap();
    board.write("writer", "draft/episode_2", json!("It rained."));
    board.read("critic", "draft/episode_2").unwrap();

    let restored = Blackboard::new();
    restored.import_state(board.export_state()).unwrap();

    assert_eq!(restored.read("x", "plan/outline").unwrap(), json!({ "acts": 4 }));
    assert_eq!(
        restored.query("x", "*").unwrap(),
        board.query("x", "*").unwrap(),
        "query results should match after import"
    );
    assert_eq!(restored.key_history("plan/outline").len(), 2);
    assert_eq!(
        restored.read_private("writer", "writer", "notes").unwrap(),
        json!("cut the prologue")
    );
    assert_eq!(restored.pending_notifications("critic").len(), 1);

    let next = restored.write("writer", "draft/episode_3", json!("Dawn again."));
    let original_next = board.write("writer", "draft/episode_3", json!("Dawn again."));
    assert_eq!(next, original_next, "version counter should carry over");
}

#[test]
fn test_rejected_snapshot_leaves_board_untouched() {
    let board = Blackboard::new();
    board.write("planner", "plan/outline", json!("keep me"));

    let mut snapshot = board.export_state();
    snapshot.format_version = 99;
    let target = Blackboard::new();
    target.write("writer", "draft/episode_1", json!("original"));

    let result = target.import_state(snapshot);
    assert!(matches!(result, Err(BlackboardError::MalformedSnapshot { .. })));
    assert_eq!(target.read("writer", "draft/episode_1").unwrap(), json!("original"));
    assert!(target.read("writer", "plan/outline").is_err());
}

#[test]
fn test_index_and_tracker_snapshots_resume_identically() {
    let harness = played_saga();
    let coordinator = &harness.coordinator;

    let mut index = StoryIndex::new();
    index.import_state(coordinator.index().export_state()).unwrap();
    assert_eq!(index.export_state(), coordinator.index().export_state());
    assert_eq!(
        index.find_related_episodes(6, "amulet ruins", 3),
        coordinator.index().find_related_episodes(6, "amulet ruins", 3)
    );
    assert_eq!(index.validate_timeline(5), coordinator.index().validate_timeline(5));

    let mut tracker = CharacterTracker::new();
    tracker.import_state(coordinator.tracker().export_state()).unwrap();
    assert_eq!(tracker.export_state(), coordinator.tracker().export_state());
    assert_eq!(
        tracker.get_character_arc("Mira").unwrap().episodes,
        vec![1, 2, 3, 5]
    );
}

// =============================================================================
// TEST: Checkpoint files
// =============================================================================

#[tokio::test]
async fn test_checkpoint_file_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("session.json");

    let harness = played_saga();
    let checkpoint = harness.coordinator.checkpoint();
    checkpoint.save_json(&path).await.unwrap();

    let metadata = SessionCheckpoint::peek_metadata(&path).await.unwrap();
    assert_eq!(metadata.episodes, vec![1, 2, 3, 4, 5]);
    assert_eq!(metadata.characters.len(), 2);
    assert_eq!(metadata.blackboard_entries, 10);

    let loaded = SessionCheckpoint::load_json(&path).await.unwrap();
    assert_eq!(loaded, checkpoint);
}

#[tokio::test]
async fn test_resumed_session_continues_checking() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("session.json");

    let harness = played_saga();
    harness.coordinator.checkpoint().save_json(&path).await.unwrap();

    let mut resumed = Coordinator::default();
    resumed
        .restore(SessionCheckpoint::load_json(&path).await.unwrap())
        .unwrap();

    let board = resumed.blackboard();
    assert_eq!(
        board.read("critic", "story/episode_3/summary").unwrap()["summary"],
        "Mira rests"
    );

    // The amulet is destroyed now; using it later must be flagged.
    let report = resumed
        .accept_episode(
            &EpisodeDraft::new(6, "The Amulet shattered on the stones.", "amulet lost")
                .with_item_status("Amulet", "destroyed"),
        )
        .unwrap();
    assert!(report.approved);

    let report = resumed
        .accept_episode(&EpisodeDraft::new(
            7,
            "Mira raised the Amulet against the dark.",
            "last stand",
        ))
        .unwrap();
    let timeline = report.of_kind(FindingKind::TimelineContradiction);
    assert_eq!(timeline.len(), 1);
    assert_eq!(timeline[0].episodes, vec![6, 7]);
}

#[tokio::test]
async fn test_version_mismatch_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("future.json");

    let mut checkpoint = Coordinator::default().checkpoint();
    checkpoint.version = CHECKPOINT_VERSION + 1;
    checkpoint.save_json(&path).await.unwrap();

    let result = SessionCheckpoint::load_json(&path).await;
    assert!(matches!(
        result,
        Err(PersistError::VersionMismatch { found, .. }) if found == CHECKPOINT_VERSION + 1
    ));

    let mut coordinator = Coordinator::default();
    assert!(coordinator.restore(checkpoint).is_err());
}

#[tokio::test]
async fn test_missing_checkpoint_is_io_error() {
    let temp_dir = TempDir::new().unwrap();
    let result = SessionCheckpoint::load_json(temp_dir.path().join("absent.json")).await;
    assert!(matches!(result, Err(PersistError::Io(_))));
}

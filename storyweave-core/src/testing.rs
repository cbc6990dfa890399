//! Testing utilities for coordination sessions.
//!
//! This module provides tools for integration testing:
//! - `ScriptedEpisode` for episodes with known expected findings
//! - `TestHarness` for running scripted sessions through a `Coordinator`
//! - Assertion helpers for verifying reports and store state

use crate::characters::CharacterAttributes;
use crate::config::WeaveConfig;
use crate::coordinator::{AppearanceDraft, Coordinator, EpisodeDraft};
use crate::error::Result;
use crate::finding::{ConsistencyReport, FindingKind};

/// An episode together with the finding kinds it should produce.
#[derive(Debug, Clone)]
pub struct ScriptedEpisode {
    /// The episode to submit.
    pub draft: EpisodeDraft,
    /// Finding kinds the report should contain, in any order.
    pub expected: Vec<FindingKind>,
}

impl ScriptedEpisode {
    /// An episode expected to pass every check.
    pub fn clean(draft: EpisodeDraft) -> Self {
        Self {
            draft,
            expected: Vec::new(),
        }
    }

    /// An episode expected to produce the given findings.
    pub fn flagged(draft: EpisodeDraft, expected: Vec<FindingKind>) -> Self {
        Self { draft, expected }
    }
}

/// Test harness for running scripted sessions.
pub struct TestHarness {
    /// The coordinator under test.
    pub coordinator: Coordinator,
    /// Reports in submission order.
    pub reports: Vec<ConsistencyReport>,
}

impl TestHarness {
    /// Create a harness with the default configuration.
    pub fn new() -> Self {
        Self::with_config(WeaveConfig::default())
    }

    /// Create a harness with a custom configuration.
    pub fn with_config(config: WeaveConfig) -> Self {
        Self {
            coordinator: Coordinator::new(config),
            reports: Vec::new(),
        }
    }

    /// Register a character before any episode.
    pub fn character(&mut self, name: &str, attributes: CharacterAttributes) -> &mut Self {
        self.coordinator.register_character(name, attributes);
        self
    }

    /// Submit one episode and keep its report.
    pub fn submit(&mut self, draft: &EpisodeDraft) -> Result<&ConsistencyReport> {
        let report = self.coordinator.accept_episode(draft)?;
        self.reports.push(report);
        Ok(&self.reports[self.reports.len() - 1])
    }

    /// Submit scripted episodes in order, checking each report against its
    /// expectations.
    #[track_caller]
    pub fn play(&mut self, script: &[ScriptedEpisode]) {
        for scripted in script {
            let report = match self.submit(&scripted.draft) {
                Ok(report) => report.clone(),
                Err(err) => panic!("Episode {} failed: {err}", scripted.draft.number),
            };
            assert_finding_kinds(&report, &scripted.expected);
        }
    }

    /// The most recent report.
    pub fn last_report(&self) -> Option<&ConsistencyReport> {
        self.reports.last()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert that a report contains exactly the given finding kinds.
#[track_caller]
pub fn assert_finding_kinds(report: &ConsistencyReport, expected: &[FindingKind]) {
    let mut actual: Vec<&str> = report.findings.iter().map(|f| f.kind.name()).collect();
    let mut wanted: Vec<&str> = expected.iter().map(FindingKind::name).collect();
    actual.sort_unstable();
    wanted.sort_unstable();
    assert_eq!(
        actual, wanted,
        "Episode {} findings differ: {:?}",
        report.episode, report.findings
    );
}

/// Assert that a report has no findings at all.
#[track_caller]
pub fn assert_clean(report: &ConsistencyReport) {
    assert!(
        report.findings.is_empty(),
        "Expected episode {} to be clean, got {:?}",
        report.episode,
        report.findings
    );
}

/// Ready-made scripted sessions.
pub mod fixtures {
    use super::*;

    /// Characters registered before [`villain_saga`] starts.
    pub fn villain_saga_cast() -> Vec<(&'static str, CharacterAttributes)> {
        vec![
            (
                "Mira",
                CharacterAttributes::new()
                    .with_trait("brave")
                    .with_physical("hair", "red")
                    .with_goal("avenge her village"),
            ),
            (
                "Villain",
                CharacterAttributes::new()
                    .with_trait("deceptive")
                    .with_fear("being forgotten"),
            ),
        ]
    }

    /// Five episodes in which the Villain dies in episode 2 and is
    /// inexplicably alive in episode 4.
    pub fn villain_saga() -> Vec<ScriptedEpisode> {
        vec![
            ScriptedEpisode::clean(
                EpisodeDraft::new(
                    1,
                    "Mira found the Amulet in the ruins of her village.\n\nThe Villain watched from the hills.",
                    "Mira, young and tall, finds the amulet",
                )
                .with_item("Amulet")
                .with_item_status("Amulet", "introduced")
                .with_appearance(
                    AppearanceDraft::new("Mira")
                        .with_action("searched the ruins")
                        .with_dialogue("Who did this?")
                        .with_dialogue("I will find them."),
                )
                .with_appearance(AppearanceDraft::new("Villain").with_action("watched from the hills")),
            ),
            ScriptedEpisode::clean(
                EpisodeDraft::new(
                    2,
                    "Mira confronted the Villain at the bridge. The Villain died in the river.",
                    "Mira defeats the villain",
                )
                .with_appearance(
                    AppearanceDraft::new("Mira")
                        .with_action("fought the Villain")
                        .with_dialogue("This ends now."),
                )
                .with_appearance(AppearanceDraft::new("Villain").with_action("lied about the village")),
            ),
            ScriptedEpisode::clean(
                EpisodeDraft::new(
                    3,
                    "Mira rested in the town and mourned her village.",
                    "Mira rests",
                )
                .with_appearance(
                    AppearanceDraft::new("Mira")
                        .with_action("rested")
                        .with_physical("hair", "red")
                        .with_dialogue("It is over now."),
                ),
            ),
            ScriptedEpisode::flagged(
                EpisodeDraft::new(
                    4,
                    "The Villain is alive. He laughed from the tower.",
                    "The villain returns",
                )
                .with_appearance(AppearanceDraft::new("Villain").with_action("laughed from the tower")),
                vec![FindingKind::TimelineContradiction],
            ),
            ScriptedEpisode::flagged(
                EpisodeDraft::new(
                    5,
                    "Mira fled the tower with the Amulet.",
                    "Mira escapes",
                )
                .with_appearance(
                    AppearanceDraft::new("Mira")
                        .with_action("fled the tower")
                        .with_dialogue("We have to go now."),
                ),
                vec![FindingKind::TraitContradiction],
            ),
        ]
    }
}

//! Consistency findings and the per-episode report built from them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of contradiction a finding describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    /// Behavior contradicts an established personality trait.
    TraitContradiction,
    /// Two episodes assert mutually exclusive states of one subject.
    TimelineContradiction,
    /// A physical descriptor changed without explanation.
    PhysicalContradiction,
    /// Dialogue no longer sounds like the character.
    VoiceDrift,
}

impl FindingKind {
    /// Get the display name for this kind.
    pub fn name(&self) -> &'static str {
        match self {
            FindingKind::TraitContradiction => "trait contradiction",
            FindingKind::TimelineContradiction => "timeline contradiction",
            FindingKind::PhysicalContradiction => "physical contradiction",
            FindingKind::VoiceDrift => "voice drift",
        }
    }

    /// Default severity for findings of this kind.
    pub fn default_severity(&self) -> Severity {
        match self {
            FindingKind::VoiceDrift => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// How seriously a finding should be taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Worth a second look; does not block acceptance.
    Warning,
    /// A continuity error.
    Error,
}

/// A structured report of a detected contradiction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyFinding {
    /// What was contradicted.
    pub kind: FindingKind,
    /// Error or warning.
    pub severity: Severity,
    /// Episodes involved, ascending.
    pub episodes: Vec<u32>,
    /// Character, item or other subject name.
    pub subject: String,
    /// Human-readable explanation.
    pub description: String,
}

impl ConsistencyFinding {
    /// Create a finding with the kind's default severity.
    pub fn new(
        kind: FindingKind,
        subject: impl Into<String>,
        episodes: impl IntoIterator<Item = u32>,
        description: impl Into<String>,
    ) -> Self {
        let mut episodes: Vec<u32> = episodes.into_iter().collect();
        episodes.sort_unstable();
        episodes.dedup();
        Self {
            kind,
            severity: kind.default_severity(),
            episodes,
            subject: subject.into(),
            description: description.into(),
        }
    }

    /// Override the severity.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Check whether this finding involves an episode.
    pub fn involves_episode(&self, episode: u32) -> bool {
        self.episodes.contains(&episode)
    }

    /// Check whether this finding blocks acceptance.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ConsistencyFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.name(), self.description)
    }
}

/// The outcome of checking one episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    /// Episode that was checked.
    pub episode: u32,
    /// All findings, errors first.
    pub findings: Vec<ConsistencyFinding>,
    /// True when no finding is an error.
    pub approved: bool,
    /// Whether the episode was committed to the stores.
    pub committed: bool,
}

impl ConsistencyReport {
    /// Build a report, ordering errors before warnings.
    pub fn new(episode: u32, mut findings: Vec<ConsistencyFinding>) -> Self {
        findings.sort_by(|a, b| b.severity.cmp(&a.severity));
        let approved = !findings.iter().any(ConsistencyFinding::is_error);
        Self {
            episode,
            findings,
            approved,
            committed: false,
        }
    }

    /// Findings that block acceptance.
    pub fn errors(&self) -> impl Iterator<Item = &ConsistencyFinding> {
        self.findings.iter().filter(|f| f.is_error())
    }

    /// Findings that do not block acceptance.
    pub fn warnings(&self) -> impl Iterator<Item = &ConsistencyFinding> {
        self.findings.iter().filter(|f| !f.is_error())
    }

    /// Findings of one kind.
    pub fn of_kind(&self, kind: FindingKind) -> Vec<&ConsistencyFinding> {
        self.findings.iter().filter(|f| f.kind == kind).collect()
    }
}

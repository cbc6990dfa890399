//! Item lifecycle records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One status change of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStatusEntry {
    /// Episode the status was recorded for.
    pub episode: u32,
    /// Free-form status, e.g. "introduced", "used", "destroyed".
    pub status: String,
}

/// A tracked item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Name as first registered.
    pub name: String,
    /// Episode the item was introduced in.
    pub first_appearance: u32,
    /// Episodes whose text mentions the item by name.
    #[serde(default)]
    pub mentions: BTreeSet<u32>,
    /// Status changes ordered by episode.
    #[serde(default)]
    pub history: Vec<ItemStatusEntry>,
}

impl ItemRecord {
    /// Create a record for a newly registered item.
    pub fn new(name: impl Into<String>, first_appearance: u32) -> Self {
        Self {
            name: name.into(),
            first_appearance,
            mentions: BTreeSet::new(),
            history: Vec::new(),
        }
    }

    /// Insert a status, keeping the history ordered by episode.
    ///
    /// A status for an episode that already has one is placed after it.
    pub fn push_status(&mut self, episode: u32, status: impl Into<String>) {
        let at = self.history.partition_point(|e| e.episode <= episode);
        self.history.insert(
            at,
            ItemStatusEntry {
                episode,
                status: status.into(),
            },
        );
    }

    /// Latest episode the item was seen in, at or before `episode`.
    pub fn last_seen_at(&self, episode: u32) -> Option<u32> {
        let mentioned = self.mentions.range(..=episode).next_back().copied();
        let statused = self
            .history
            .iter()
            .map(|e| e.episode)
            .filter(|e| *e <= episode)
            .max();
        let introduced = Some(self.first_appearance).filter(|e| *e <= episode);
        [mentioned, statused, introduced].into_iter().flatten().max()
    }

    /// Latest episode the item was seen in.
    pub fn last_seen(&self) -> u32 {
        self.last_seen_at(u32::MAX).unwrap_or(self.first_appearance)
    }
}

/// Item status as of an episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStatusReport {
    /// Item name.
    pub name: String,
    /// Introduction episode, if it is at or before the requested episode.
    pub first_appearance: Option<u32>,
    /// Latest sighting at or before the requested episode.
    pub last_seen: Option<u32>,
    /// Status history at or before the requested episode.
    pub history: Vec<ItemStatusEntry>,
}

impl ItemStatusReport {
    /// Build the report for `record` as of `episode`.
    pub fn as_of(record: &ItemRecord, episode: u32) -> Self {
        Self {
            name: record.name.clone(),
            first_appearance: Some(record.first_appearance).filter(|e| *e <= episode),
            last_seen: record.last_seen_at(episode),
            history: record
                .history
                .iter()
                .filter(|e| e.episode <= episode)
                .cloned()
                .collect(),
        }
    }

    /// The most recent status, if any.
    pub fn current_status(&self) -> Option<&str> {
        self.history.last().map(|e| e.status.as_str())
    }

    /// Check if the item had been introduced by the requested episode.
    pub fn is_known(&self) -> bool {
        self.first_appearance.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_history_stays_ordered() {
        let mut item = ItemRecord::new("Amulet", 1);
        item.push_status(5, "destroyed");
        item.push_status(1, "introduced");
        item.push_status(3, "used");
        item.push_status(3, "lost");

        let statuses: Vec<_> = item.history.iter().map(|e| e.status.as_str()).collect();
        assert_eq!(statuses, vec!["introduced", "used", "lost", "destroyed"]);
        assert_eq!(item.last_seen(), 5);
    }

    #[test]
    fn test_report_as_of_episode() {
        let mut item = ItemRecord::new("Amulet", 2);
        item.push_status(2, "introduced");
        item.push_status(6, "destroyed");
        item.mentions.insert(4);

        let report = ItemStatusReport::as_of(&item, 5);
        assert_eq!(report.first_appearance, Some(2));
        assert_eq!(report.last_seen, Some(4));
        assert_eq!(report.current_status(), Some("introduced"));

        let before = ItemStatusReport::as_of(&item, 1);
        assert!(!before.is_known());
        assert_eq!(before.last_seen, None);
        assert!(before.history.is_empty());
    }
}

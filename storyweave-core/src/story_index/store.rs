//! The story index store.

use super::claims::{ClaimExtractor, ClaimSource, StateClaim};
use super::episode::{extract_key_events, Episode, EpisodeMatch};
use super::item::{ItemRecord, ItemStatusReport};
use crate::config::{DescriptorRule, IndexConfig, RelatedScope};
use crate::error::{IndexError, IndexResult};
use crate::finding::ConsistencyFinding;
use crate::text::{name_matcher, normalize_name, phrase_matcher, tokenize, word_count};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Current story index snapshot format version.
pub const INDEX_SNAPSHOT_VERSION: u32 = 1;

/// One episode in which a character was mentioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeAppearance {
    /// Episode number.
    pub episode: u32,
    /// Episode summary.
    pub summary: String,
}

/// What the index knows about a character before some episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterHistory {
    /// Name as queried.
    pub name: String,
    /// Earlier episodes mentioning the name, ascending.
    pub appearances: Vec<EpisodeAppearance>,
    /// Descriptors accumulated from those episodes' summaries.
    pub known_attributes: BTreeMap<String, String>,
}

impl CharacterHistory {
    /// Episode of the first mention, if any.
    pub fn first_appearance(&self) -> Option<u32> {
        self.appearances.first().map(|a| a.episode)
    }

    /// Number of earlier episodes mentioning the name.
    pub fn total_appearances(&self) -> usize {
        self.appearances.len()
    }
}

/// Serializable story index contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    /// Snapshot format version.
    pub format_version: u32,
    /// Indexed episodes, ascending.
    pub episodes: Vec<Episode>,
    /// Registered items.
    pub items: Vec<ItemRecord>,
    /// Extracted and derived state claims.
    pub claims: Vec<StateClaim>,
}

/// Keyword index over episodes, items and state claims.
///
/// Every mutating operation validates its input before touching any table,
/// so a failed call leaves the index exactly as it was.
#[derive(Debug, Clone)]
pub struct StoryIndex {
    config: IndexConfig,
    stopwords: HashSet<String>,
    extractor: ClaimExtractor,
    /// Descriptor keyword matchers, in table order.
    descriptors: Vec<(Regex, DescriptorRule)>,
    episodes: BTreeMap<u32, Episode>,
    /// Inverted index from term to the episodes containing it.
    postings: HashMap<String, BTreeSet<u32>>,
    /// Items by normalized name.
    items: BTreeMap<String, ItemRecord>,
    claims: Vec<StateClaim>,
}

impl Default for StoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl StoryIndex {
    /// Create an empty index with the built-in tables.
    pub fn new() -> Self {
        Self::with_config(IndexConfig::default())
    }

    /// Create an empty index.
    pub fn with_config(config: IndexConfig) -> Self {
        Self {
            stopwords: config.stopwords.iter().map(|s| s.to_lowercase()).collect(),
            extractor: ClaimExtractor::new(&config),
            descriptors: compile_descriptors(&config),
            config,
            episodes: BTreeMap::new(),
            postings: HashMap::new(),
            items: BTreeMap::new(),
            claims: Vec::new(),
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    // =========================================================================
    // Episodes
    // =========================================================================

    /// Index a finished episode.
    pub fn add_episode(
        &mut self,
        number: u32,
        content: &str,
        summary: &str,
    ) -> IndexResult<&Episode> {
        if self.episodes.contains_key(&number) {
            return Err(IndexError::DuplicateEpisode { episode: number });
        }
        let (episode, claims) = self.prepare_episode(number, content, summary)?;

        tracing::info!(
            target: "storyweave::story_index",
            episode = number,
            terms = episode.terms.len(),
            claims = claims.len(),
            words = episode.word_count,
            "indexed episode"
        );
        Ok(self.commit_episode(episode, claims))
    }

    /// Replace the text of an already indexed episode.
    ///
    /// Postings, mentions and text claims of the old version are dropped;
    /// claims derived from item statuses are kept.
    pub fn revise_episode(
        &mut self,
        number: u32,
        content: &str,
        summary: &str,
    ) -> IndexResult<&Episode> {
        let Some(old_terms) = self.episodes.get(&number).map(|e| e.terms.clone()) else {
            return Err(IndexError::EpisodeNotFound { episode: number });
        };
        let (episode, claims) = self.prepare_episode(number, content, summary)?;

        for term in &old_terms {
            if let Some(set) = self.postings.get_mut(term) {
                set.remove(&number);
                if set.is_empty() {
                    self.postings.remove(term);
                }
            }
        }
        self.claims
            .retain(|c| !(c.episode == number && c.source == ClaimSource::Text));
        for item in self.items.values_mut() {
            item.mentions.remove(&number);
        }

        tracing::info!(target: "storyweave::story_index", episode = number, "revised episode");
        Ok(self.commit_episode(episode, claims))
    }

    fn prepare_episode(
        &self,
        number: u32,
        content: &str,
        summary: &str,
    ) -> IndexResult<(Episode, Vec<StateClaim>)> {
        let terms = tokenize(content, &self.stopwords);
        if terms.is_empty() {
            return Err(IndexError::EmptyContent { episode: number });
        }

        let episode = Episode {
            number,
            content: content.to_string(),
            summary: summary.to_string(),
            terms,
            word_count: word_count(content),
            key_events: extract_key_events(content, self.config.key_event_paragraphs),
            indexed_at: Utc::now(),
        };
        let claims = self.extractor.extract(number, content);
        Ok((episode, claims))
    }

    fn commit_episode(&mut self, episode: Episode, claims: Vec<StateClaim>) -> &Episode {
        let number = episode.number;
        for term in &episode.terms {
            self.postings.entry(term.clone()).or_default().insert(number);
        }
        for item in self.items.values_mut() {
            if name_matcher(&item.name).is_some_and(|m| m.is_match(&episode.content)) {
                item.mentions.insert(number);
            }
        }
        self.claims.extend(claims);
        match self.episodes.entry(number) {
            Entry::Occupied(mut slot) => {
                slot.insert(episode);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(episode),
        }
    }

    /// Get an indexed episode.
    pub fn episode(&self, number: u32) -> Option<&Episode> {
        self.episodes.get(&number)
    }

    /// All indexed episodes, ascending.
    pub fn episodes(&self) -> impl Iterator<Item = &Episode> {
        self.episodes.values()
    }

    /// Number of indexed episodes.
    pub fn episode_count(&self) -> usize {
        self.episodes.len()
    }

    /// Episodes containing a term.
    pub fn episodes_with_term(&self, term: &str) -> Vec<u32> {
        self.postings
            .get(&term.to_lowercase())
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    // =========================================================================
    // Retrieval
    // =========================================================================

    /// Find the episodes sharing the most terms with `query`.
    ///
    /// The score is the number of distinct query terms an episode contains.
    /// Episodes scoring zero are never returned. Ties go to the more recent
    /// episode. Which episodes are candidates is set by
    /// [`IndexConfig::related_scope`]; the current episode never is.
    pub fn find_related_episodes(
        &self,
        current_episode: u32,
        query: &str,
        top_k: usize,
    ) -> Vec<EpisodeMatch> {
        let query_terms = tokenize(query, &self.stopwords);

        let mut scores: BTreeMap<u32, usize> = BTreeMap::new();
        for term in &query_terms {
            if let Some(episodes) = self.postings.get(term) {
                for &episode in episodes {
                    *scores.entry(episode).or_insert(0) += 1;
                }
            }
        }

        let scope = self.config.related_scope;
        let mut ranked: Vec<(u32, usize)> = scores
            .into_iter()
            .filter(|(episode, _)| match scope {
                RelatedScope::AllExceptCurrent => *episode != current_episode,
                RelatedScope::PriorOnly => *episode < current_episode,
            })
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(&a.0)));
        ranked.truncate(top_k);

        let results: Vec<EpisodeMatch> = ranked
            .into_iter()
            .filter_map(|(number, score)| {
                self.episodes.get(&number).map(|e| EpisodeMatch {
                    episode: number,
                    score,
                    summary: e.summary.clone(),
                    key_events: e.key_events.clone(),
                })
            })
            .collect();

        tracing::debug!(
            target: "storyweave::story_index",
            current_episode,
            query,
            results = results.len(),
            "found related episodes"
        );
        results
    }

    /// Episodes before `current_episode` that mention `name`, with the
    /// descriptors their summaries establish.
    ///
    /// Later summaries override earlier ones, and within one summary later
    /// descriptor rules override earlier ones.
    pub fn check_character_consistency(&self, name: &str, current_episode: u32) -> CharacterHistory {
        let mut appearances = Vec::new();
        let mut known_attributes = BTreeMap::new();
        let Some(matcher) = name_matcher(name) else {
            return CharacterHistory {
                name: name.to_string(),
                appearances,
                known_attributes,
            };
        };

        for episode in self.episodes.range(..current_episode).map(|(_, e)| e) {
            if !matcher.is_match(&episode.content) {
                continue;
            }
            appearances.push(EpisodeAppearance {
                episode: episode.number,
                summary: episode.summary.clone(),
            });
            for (keyword, rule) in &self.descriptors {
                if keyword.is_match(&episode.summary) {
                    known_attributes.insert(rule.attribute.clone(), rule.keyword.clone());
                }
            }
        }

        CharacterHistory {
            name: name.to_string(),
            appearances,
            known_attributes,
        }
    }

    // =========================================================================
    // Items
    // =========================================================================

    /// Start tracking an item. Returns `false` if it was already registered,
    /// in which case the earlier introduction episode is kept.
    pub fn register_item(&mut self, name: &str, first_appearance: u32) -> bool {
        let key = normalize_name(name);
        if let Some(existing) = self.items.get_mut(&key) {
            existing.first_appearance = existing.first_appearance.min(first_appearance);
            tracing::warn!(target: "storyweave::story_index", item = name, "item already registered");
            return false;
        }

        let mut record = ItemRecord::new(name.trim(), first_appearance);
        if let Some(matcher) = name_matcher(name) {
            record.mentions = self
                .episodes
                .values()
                .filter(|e| matcher.is_match(&e.content))
                .map(|e| e.number)
                .collect();
        }
        self.items.insert(key, record);
        tracing::info!(target: "storyweave::story_index", item = name, first_appearance, "registered item");
        true
    }

    /// Record a status change of a registered item.
    ///
    /// A status naming a state predicate ("destroyed", "lost") also becomes a
    /// state claim, so it takes part in timeline validation.
    pub fn record_item_status(&mut self, item: &str, episode: u32, status: &str) -> IndexResult<()> {
        let key = normalize_name(item);
        let predicates: Vec<String> = self
            .extractor
            .predicates_in(status)
            .into_iter()
            .map(str::to_string)
            .collect();
        let record = self
            .items
            .get_mut(&key)
            .ok_or_else(|| IndexError::ItemNotFound {
                name: item.to_string(),
            })?;

        record.push_status(episode, status);
        let subject = record.name.clone();
        for predicate in predicates {
            self.claims.push(StateClaim {
                subject: subject.clone(),
                predicate,
                episode,
                evidence: status.to_string(),
                source: ClaimSource::ItemStatus,
            });
        }

        tracing::info!(target: "storyweave::story_index", item = %subject, episode, status, "recorded item status");
        Ok(())
    }

    /// Item status as of `current_episode` (inclusive).
    pub fn check_item_status(&self, item: &str, current_episode: u32) -> IndexResult<ItemStatusReport> {
        self.items
            .get(&normalize_name(item))
            .map(|record| ItemStatusReport::as_of(record, current_episode))
            .ok_or_else(|| IndexError::ItemNotFound {
                name: item.to_string(),
            })
    }

    /// Get a registered item.
    pub fn item(&self, name: &str) -> Option<&ItemRecord> {
        self.items.get(&normalize_name(name))
    }

    // =========================================================================
    // Timeline
    // =========================================================================

    /// All state claims, in the order they were recorded.
    pub fn claims(&self) -> &[StateClaim] {
        &self.claims
    }

    /// Claims about one subject, by episode.
    pub fn claims_about(&self, subject: &str) -> Vec<&StateClaim> {
        let key = normalize_name(subject);
        let mut claims: Vec<&StateClaim> = self.claims.iter().filter(|c| c.subject_key() == key).collect();
        claims.sort_by_key(|c| c.episode);
        claims
    }

    /// Find mutually exclusive claims among episodes up to `current_episode`.
    pub fn validate_timeline(&self, current_episode: u32) -> Vec<ConsistencyFinding> {
        let findings = self
            .extractor
            .find_conflicts(self.claims.iter().filter(|c| c.episode <= current_episode));
        if !findings.is_empty() {
            tracing::warn!(
                target: "storyweave::story_index",
                current_episode,
                findings = findings.len(),
                "timeline contradictions found"
            );
        }
        findings
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// Export episodes, items and claims.
    pub fn export_state(&self) -> IndexSnapshot {
        IndexSnapshot {
            format_version: INDEX_SNAPSHOT_VERSION,
            episodes: self.episodes.values().cloned().collect(),
            items: self.items.values().cloned().collect(),
            claims: self.claims.clone(),
        }
    }

    /// Replace the contents with a snapshot, rebuilding the inverted index.
    ///
    /// The configuration is kept. A malformed snapshot leaves the index
    /// untouched.
    pub fn import_state(&mut self, snapshot: IndexSnapshot) -> IndexResult<()> {
        if snapshot.format_version != INDEX_SNAPSHOT_VERSION {
            return Err(malformed(format!(
                "unsupported format version {} (expected {INDEX_SNAPSHOT_VERSION})",
                snapshot.format_version
            )));
        }

        let mut episodes = BTreeMap::new();
        for episode in snapshot.episodes {
            if episode.terms.is_empty() {
                return Err(malformed(format!("episode {} has no terms", episode.number)));
            }
            let number = episode.number;
            if episodes.insert(number, episode).is_some() {
                return Err(malformed(format!("episode {number} appears twice")));
            }
        }

        let mut items = BTreeMap::new();
        for item in snapshot.items {
            let key = normalize_name(&item.name);
            if items.insert(key, item).is_some() {
                return Err(malformed("duplicate item name"));
            }
        }

        for claim in &snapshot.claims {
            let known = match claim.source {
                ClaimSource::Text => episodes.contains_key(&claim.episode),
                ClaimSource::ItemStatus => items.contains_key(&claim.subject_key()),
            };
            if !known {
                return Err(malformed(format!(
                    "claim about '{}' in episode {} has no source",
                    claim.subject, claim.episode
                )));
            }
        }

        let mut postings: HashMap<String, BTreeSet<u32>> = HashMap::new();
        for episode in episodes.values() {
            for term in &episode.terms {
                postings.entry(term.clone()).or_default().insert(episode.number);
            }
        }

        self.episodes = episodes;
        self.items = items;
        self.claims = snapshot.claims;
        self.postings = postings;
        tracing::info!(
            target: "storyweave::story_index",
            episodes = self.episodes.len(),
            items = self.items.len(),
            "state imported from snapshot"
        );
        Ok(())
    }
}

fn malformed(reason: impl Into<String>) -> IndexError {
    IndexError::MalformedSnapshot {
        reason: reason.into(),
    }
}

fn compile_descriptors(config: &IndexConfig) -> Vec<(Regex, DescriptorRule)> {
    config
        .descriptors
        .iter()
        .filter_map(|rule| match phrase_matcher(&rule.keyword) {
            Ok(matcher) => Some((matcher, rule.clone())),
            Err(err) => {
                tracing::warn!(
                    target: "storyweave::story_index",
                    keyword = %rule.keyword,
                    error = %err,
                    "skipping descriptor keyword"
                );
                None
            }
        })
        .collect()
}

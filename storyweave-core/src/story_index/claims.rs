//! State claims and timeline contradiction detection.
//!
//! A claim is a subject, a predicate from a fixed table, and the episode that
//! asserts it. Claims are pulled out of episode text sentence by sentence:
//! when a predicate keyword matches, the nearest capitalized name on the
//! configured side of the keyword becomes the subject. This is a bounded
//! heuristic over a small vocabulary, not language understanding.

use crate::config::{ConflictRule, IndexConfig, SubjectSide};
use crate::finding::{ConsistencyFinding, FindingKind};
use crate::text::{capitalized_names, normalize_name, phrase_matcher, split_sentences};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Where a claim came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimSource {
    /// Extracted from episode text.
    Text,
    /// Derived from a recorded item status.
    ItemStatus,
}

/// A subject asserted to be in some state as of an episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateClaim {
    /// Subject as written.
    pub subject: String,
    /// Predicate name from the predicate table.
    pub predicate: String,
    /// Asserting episode.
    pub episode: u32,
    /// Sentence or status the claim was taken from.
    pub evidence: String,
    /// Origin of the claim.
    pub source: ClaimSource,
}

impl StateClaim {
    /// Normalized subject used for comparisons.
    pub fn subject_key(&self) -> String {
        normalize_name(&self.subject)
    }
}

#[derive(Debug, Clone)]
struct CompiledPredicate {
    name: String,
    matchers: Vec<Regex>,
    subject_side: SubjectSide,
}

/// Predicate table compiled once for extraction and conflict checks.
#[derive(Debug, Clone)]
pub(crate) struct ClaimExtractor {
    predicates: Vec<CompiledPredicate>,
    conflicts: Vec<ConflictRule>,
    ignored: HashSet<String>,
}

impl ClaimExtractor {
    pub(crate) fn new(config: &IndexConfig) -> Self {
        let predicates = config
            .predicates
            .iter()
            .map(|rule| CompiledPredicate {
                name: rule.name.clone(),
                matchers: rule
                    .keywords
                    .iter()
                    .filter_map(|k| match phrase_matcher(k) {
                        Ok(regex) => Some(regex),
                        Err(err) => {
                            tracing::warn!(
                                target: "storyweave::story_index",
                                predicate = %rule.name,
                                keyword = %k,
                                error = %err,
                                "skipping predicate keyword"
                            );
                            None
                        }
                    })
                    .collect(),
                subject_side: rule.subject_side,
            })
            .collect();

        Self {
            predicates,
            conflicts: config.conflicts.clone(),
            ignored: config.ignored_names.iter().cloned().collect(),
        }
    }

    /// Extract claims from episode text, one per (subject, predicate).
    pub(crate) fn extract(&self, episode: u32, content: &str) -> Vec<StateClaim> {
        let mut claims: Vec<StateClaim> = Vec::new();
        let mut seen: HashSet<(String, String)> = HashSet::new();

        for sentence in split_sentences(content) {
            let names = capitalized_names(sentence, &self.ignored);
            if names.is_empty() {
                continue;
            }

            for predicate in &self.predicates {
                for matcher in &predicate.matchers {
                    for m in matcher.find_iter(sentence) {
                        let subject = match predicate.subject_side {
                            SubjectSide::Before => names.iter().rev().find(|n| n.end <= m.start()),
                            SubjectSide::After => names.iter().find(|n| n.start >= m.end()),
                        };
                        let Some(subject) = subject else { continue };

                        let key = (normalize_name(&subject.name), predicate.name.clone());
                        if seen.insert(key) {
                            claims.push(StateClaim {
                                subject: subject.name.clone(),
                                predicate: predicate.name.clone(),
                                episode,
                                evidence: sentence.to_string(),
                                source: ClaimSource::Text,
                            });
                        }
                    }
                }
            }
        }
        claims
    }

    /// Predicates whose keywords appear in a status string.
    pub(crate) fn predicates_in(&self, status: &str) -> Vec<&str> {
        self.predicates
            .iter()
            .filter(|p| p.name.eq_ignore_ascii_case(status.trim()) || p.matchers.iter().any(|m| m.is_match(status)))
            .map(|p| p.name.as_str())
            .collect()
    }

    /// Flag later claims that an earlier claim about the same subject rules out.
    ///
    /// Only the earliest establishing claim is reported for each conflicting
    /// later claim. Claims asserted in the same episode never conflict, and a
    /// predicate asserted twice for a subject in one episode counts once.
    pub(crate) fn find_conflicts<'a>(
        &self,
        claims: impl IntoIterator<Item = &'a StateClaim>,
    ) -> Vec<ConsistencyFinding> {
        let mut by_subject: BTreeMap<String, Vec<&StateClaim>> = BTreeMap::new();
        for claim in claims {
            by_subject.entry(claim.subject_key()).or_default().push(claim);
        }

        let mut findings = Vec::new();
        for claims in by_subject.values_mut() {
            claims.sort_by(|a, b| a.episode.cmp(&b.episode).then_with(|| a.predicate.cmp(&b.predicate)));
            // Text and a recorded status can assert the same thing; keep the first
            claims.dedup_by(|b, a| a.episode == b.episode && a.predicate == b.predicate);

            for rule in &self.conflicts {
                let Some(established) = claims.iter().find(|c| c.predicate == rule.established)
                else {
                    continue;
                };

                for later in claims.iter().filter(|c| {
                    c.episode > established.episode && rule.excludes.contains(&c.predicate)
                }) {
                    findings.push(ConsistencyFinding::new(
                        FindingKind::TimelineContradiction,
                        later.subject.clone(),
                        [established.episode, later.episode],
                        format!(
                            "{} is {} in episode {} (\"{}\") but {} in episode {} (\"{}\")",
                            established.subject,
                            established.predicate,
                            established.episode,
                            established.evidence,
                            later.predicate,
                            later.episode,
                            later.evidence
                        ),
                    ));
                }
            }
        }

        findings.sort_by(|a, b| a.episodes.cmp(&b.episodes).then_with(|| a.subject.cmp(&b.subject)));
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> ClaimExtractor {
        ClaimExtractor::new(&IndexConfig::default())
    }

    #[test]
    fn test_extract_subject_before_keyword() {
        let claims = extractor().extract(2, "The battle was long. The Villain died at dawn.");
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].subject, "Villain");
        assert_eq!(claims[0].predicate, "dead");
        assert_eq!(claims[0].evidence, "The Villain died at dawn");
    }

    #[test]
    fn test_extract_subject_after_keyword() {
        let claims = extractor().extract(3, "Mira raised the Amulet high");
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].subject, "Amulet");
        assert_eq!(claims[0].predicate, "used");
    }

    #[test]
    fn test_extract_dedupes_per_subject_and_predicate() {
        let claims = extractor().extract(2, "The Villain died. Yes, the Villain was dead.");
        assert_eq!(claims.len(), 1);
    }

    #[test]
    fn test_extract_needs_a_name() {
        assert!(extractor().extract(1, "everyone survived the night").is_empty());
    }

    #[test]
    fn test_dead_then_alive_conflicts() {
        let ex = extractor();
        let mut claims = ex.extract(2, "The Villain died.");
        claims.extend(ex.extract(4, "The Villain is alive."));

        let findings = ex.find_conflicts(&claims);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].episodes, vec![2, 4]);
        assert_eq!(findings[0].subject, "Villain");
        assert_eq!(findings[0].kind, FindingKind::TimelineContradiction);
    }

    #[test]
    fn test_alive_then_dead_is_not_a_conflict() {
        let ex = extractor();
        let mut claims = ex.extract(1, "The Villain survived the fall.");
        claims.extend(ex.extract(3, "The Villain died."));
        assert!(ex.find_conflicts(&claims).is_empty());
    }

    #[test]
    fn test_same_episode_never_conflicts() {
        let ex = extractor();
        let claims = ex.extract(2, "The Villain died. Then the Villain was alive again.");
        assert!(ex.find_conflicts(&claims).is_empty());
    }

    #[test]
    fn test_lost_item_can_be_found_again() {
        let ex = extractor();
        let mut claims = ex.extract(2, "The Amulet went missing.");
        claims.extend(ex.extract(3, "Mira found the Amulet."));
        assert!(ex.find_conflicts(&claims).is_empty());
    }

    #[test]
    fn test_repeated_assertion_in_one_episode_reports_once() {
        let ex = extractor();
        let status = |predicate: &str, episode: u32| StateClaim {
            subject: "amulet".to_string(),
            predicate: predicate.to_string(),
            episode,
            evidence: predicate.to_string(),
            source: ClaimSource::ItemStatus,
        };
        let mut claims = ex.extract(2, "The Amulet was destroyed.");
        claims.push(status("destroyed", 2));
        claims.extend(ex.extract(3, "Mira raised the Amulet."));
        claims.push(status("used", 3));

        let findings = ex.find_conflicts(&claims);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].episodes, vec![2, 3]);
        // The text claim was seen first and supplies the evidence
        assert!(findings[0].description.contains("The Amulet was destroyed"), "{}", findings[0].description);
    }

    #[test]
    fn test_predicates_in_status() {
        let ex = extractor();
        assert_eq!(ex.predicates_in("destroyed"), vec!["destroyed"]);
        assert_eq!(ex.predicates_in("Lost"), vec!["lost"]);
        assert!(ex.predicates_in("introduced").is_empty());
    }
}

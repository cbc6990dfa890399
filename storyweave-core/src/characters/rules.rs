//! Compiled trait rules.

use crate::config::TrackerConfig;
use crate::text::phrase_matcher;
use regex::Regex;

#[derive(Debug, Clone)]
struct Keyword {
    phrase: String,
    matcher: Regex,
}

#[derive(Debug, Clone)]
struct CompiledRule {
    trait_name: String,
    keywords: Vec<Keyword>,
}

impl CompiledRule {
    fn first_match(&self, text: &str) -> Option<&str> {
        self.keywords
            .iter()
            .find(|k| k.matcher.is_match(text))
            .map(|k| k.phrase.as_str())
    }
}

fn compile(trait_name: &str, phrases: &[String]) -> CompiledRule {
    let keywords = phrases
        .iter()
        .filter_map(|phrase| match phrase_matcher(phrase) {
            Ok(matcher) => Some(Keyword {
                phrase: phrase.clone(),
                matcher,
            }),
            Err(err) => {
                tracing::warn!(
                    target: "storyweave::characters",
                    trait_name,
                    phrase = %phrase,
                    error = %err,
                    "skipping rule keyword"
                );
                None
            }
        })
        .collect();
    CompiledRule {
        trait_name: trait_name.to_string(),
        keywords,
    }
}

/// A behavior line that contradicts a trait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Contradiction<'a> {
    pub trait_name: &'a str,
    pub keyword: &'a str,
}

/// Trait contradiction and inference tables, compiled once.
#[derive(Debug, Clone)]
pub(crate) struct RuleBook {
    contradictions: Vec<CompiledRule>,
    inferences: Vec<CompiledRule>,
}

impl RuleBook {
    pub(crate) fn new(config: &TrackerConfig) -> Self {
        Self {
            contradictions: config
                .trait_rules
                .iter()
                .map(|r| compile(&r.trait_name, &r.contradicted_by))
                .collect(),
            inferences: config
                .inference_rules
                .iter()
                .map(|r| compile(&r.trait_name, &r.keywords))
                .collect(),
        }
    }

    /// Rules broken by `line` for a character with the given trait check.
    pub(crate) fn contradictions<'a>(
        &'a self,
        has_trait: impl Fn(&str) -> bool,
        line: &str,
    ) -> Vec<Contradiction<'a>> {
        self.contradictions
            .iter()
            .filter(|rule| has_trait(rule.trait_name.as_str()))
            .filter_map(|rule| {
                rule.first_match(line).map(|keyword| Contradiction {
                    trait_name: &rule.trait_name,
                    keyword,
                })
            })
            .collect()
    }

    /// Traits revealed by any of the actions, in table order.
    pub(crate) fn infer<S: AsRef<str>>(&self, actions: &[S]) -> Vec<&str> {
        self.inferences
            .iter()
            .filter(|rule| actions.iter().any(|a| rule.first_match(a.as_ref()).is_some()))
            .map(|rule| rule.trait_name.as_str())
            .collect()
    }
}

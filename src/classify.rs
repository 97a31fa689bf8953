//! Post classification.
//!
//! Two strategies attribute a post to at most one entity:
//!
//! - **keyword**: the post text is normalized (`@` and `#` stripped,
//!   lowercased, split on whitespace) and every token is looked up in the
//!   keyword map. A post is attributed only when the matched tokens point to
//!   exactly one entity; no match and matches for several entities both
//!   abstain.
//! - **repost**: the author of the re-shared post is looked up,
//!   case-insensitively, in the handle map.
//!
//! Posts by excluded authors are never attributed under either strategy.
//! Both strategies are pure functions of the post and the lexicon, so they
//! are safe to run from any number of threads.

use clap::ValueEnum;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::lexicon::{ExclusionSet, HandleMap, KeywordMap, Lexicon};
use crate::models::{EntityId, Post};

/// Which signal attributes a post to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Keyword,
    Repost,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Keyword => f.write_str("keyword"),
            Strategy::Repost => f.write_str("repost"),
        }
    }
}

/// Attributes a single post to at most one entity.
pub trait Classifier: Send + Sync {
    /// Strategy name, used in logs and the run summary.
    fn name(&self) -> &str;

    fn classify(&self, post: &Post) -> Option<EntityId>;
}

/// Lowercased whitespace tokens with `@` and `#` removed.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace()
        .map(|word| word.replace(['@', '#'], "").to_lowercase())
        .filter(|token| !token.is_empty())
}

/// Keyword strategy. `keywords` must be keyed by lowercased surface form.
pub fn classify_by_keyword(
    text: &str,
    keywords: &KeywordMap,
    exclusions: &ExclusionSet,
    author_id: &str,
) -> Option<EntityId> {
    if exclusions.contains(author_id) {
        return None;
    }

    let matched: BTreeSet<&EntityId> = tokenize(text)
        .filter_map(|token| keywords.get(&token))
        .collect();

    if matched.len() == 1 {
        matched.into_iter().next().cloned()
    } else {
        None
    }
}

/// Repost strategy. `handles` must be keyed by lowercased handle.
pub fn classify_by_repost_target(
    repost_target_id: Option<&str>,
    handles: &HandleMap,
    exclusions: &ExclusionSet,
    author_id: &str,
) -> Option<EntityId> {
    if exclusions.contains(author_id) {
        return None;
    }
    let target = repost_target_id?;
    handles
        .get(target.trim_start_matches('@').to_lowercase().as_str())
        .cloned()
}

pub struct KeywordClassifier {
    lexicon: Arc<Lexicon>,
}

impl KeywordClassifier {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        Self { lexicon }
    }
}

impl Classifier for KeywordClassifier {
    fn name(&self) -> &str {
        "keyword"
    }

    fn classify(&self, post: &Post) -> Option<EntityId> {
        classify_by_keyword(
            &post.text,
            self.lexicon.keywords(),
            self.lexicon.exclusions(),
            &post.author_id,
        )
    }
}

pub struct RepostClassifier {
    lexicon: Arc<Lexicon>,
}

impl RepostClassifier {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        Self { lexicon }
    }
}

impl Classifier for RepostClassifier {
    fn name(&self) -> &str {
        "repost"
    }

    fn classify(&self, post: &Post) -> Option<EntityId> {
        classify_by_repost_target(
            post.repost_target_id.as_deref(),
            self.lexicon.handles(),
            self.lexicon.exclusions(),
            &post.author_id,
        )
    }
}

pub fn build_classifier(strategy: Strategy, lexicon: Arc<Lexicon>) -> Box<dyn Classifier> {
    match strategy {
        Strategy::Keyword => Box::new(KeywordClassifier::new(lexicon)),
        Strategy::Repost => Box::new(RepostClassifier::new(lexicon)),
    }
}

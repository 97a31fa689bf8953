//! Core data models used throughout the pipeline.
//!
//! These types represent the posts read from the corpus, the entities they
//! are attributed to, and the per-shard statistics that flow from the
//! reader into the run summary.

use serde::Deserialize;
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Identifier of one entity (party) in the configured closed set.
///
/// Cheap to clone: every classified post carries one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(Arc<str>);

impl EntityId {
    pub fn new(id: &str) -> Self {
        Self(Arc::from(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for EntityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A single post, as handed to the classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub author_id: String,
    pub language: String,
    pub text: String,
    /// Author of the re-shared post, if this post is a repost.
    pub repost_target_id: Option<String>,
}

impl Post {
    pub fn new(author_id: &str, language: &str, text: &str) -> Self {
        Self {
            author_id: author_id.to_string(),
            language: language.to_string(),
            text: text.to_string(),
            repost_target_id: None,
        }
    }

    pub fn reposting(mut self, target: &str) -> Self {
        self.repost_target_id = Some(target.to_string());
        self
    }
}

/// One line of an archived tweet file. Every field is optional so that a
/// record missing a field is reported as malformed instead of failing the
/// whole shard.
#[derive(Debug, Deserialize)]
pub struct RawPost {
    pub text: Option<String>,
    pub lang: Option<String>,
    pub user: Option<RawUser>,
    pub retweeted_status: Option<RawRetweet>,
}

#[derive(Debug, Deserialize)]
pub struct RawUser {
    pub screen_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawRetweet {
    pub user: Option<RawUser>,
}

/// Outcome of normalizing a [`RawPost`].
#[derive(Debug, PartialEq, Eq)]
pub enum Normalized {
    Kept(Post),
    /// Valid record in another locale.
    OtherLocale,
    /// Missing text or author.
    Malformed,
}

impl RawPost {
    pub fn normalize(self, locale: &str) -> Normalized {
        let (Some(text), Some(author_id)) = (self.text, self.user.and_then(|u| u.screen_name))
        else {
            return Normalized::Malformed;
        };
        let language = self.lang.unwrap_or_default();
        if language != locale {
            return Normalized::OtherLocale;
        }
        let repost_target_id = self
            .retweeted_status
            .and_then(|rt| rt.user)
            .and_then(|u| u.screen_name);
        Normalized::Kept(Post {
            author_id,
            language,
            text,
            repost_target_id,
        })
    }
}

/// Counters produced while reading a shard. Additive across shards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    pub records: u64,
    pub kept: u64,
    pub other_locale: u64,
    pub malformed: u64,
}

impl ReadStats {
    pub fn merge(self, other: ReadStats) -> ReadStats {
        ReadStats {
            records: self.records + other.records,
            kept: self.kept + other.kept,
            other_locale: self.other_locale + other.other_locale,
            malformed: self.malformed + other.malformed,
        }
    }

    pub fn record(&mut self, outcome: &Normalized) {
        self.records += 1;
        match outcome {
            Normalized::Kept(_) => self.kept += 1,
            Normalized::OtherLocale => self.other_locale += 1,
            Normalized::Malformed => self.malformed += 1,
        }
    }
}

/// Posts read from one shard, already filtered to the configured locale.
#[derive(Debug, Default)]
pub struct ShardBatch {
    pub posts: Vec<Post>,
    pub stats: ReadStats,
}

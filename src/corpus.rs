//! Post sources.
//!
//! A [`PostSource`] splits its input into independent shards that the
//! pipeline reads in parallel. Two sources are provided:
//!
//! - [`Corpus`]: a date-partitioned directory of JSON-lines files, one
//!   archived tweet per line. The leading directories of each file's path
//!   (relative to the root) encode its date, e.g. `2017/03/14/09/00.json`
//!   with the default `%Y/%m/%d` partition format. Archives laid out by
//!   month and day only (`03/14/09/00.json`) take their year from
//!   `corpus.partition_year`.
//! - [`MemorySource`]: posts held in memory, already split into shards.
//!
//! Sources filter to the configured locale and skip malformed records; the
//! counts of both end up in [`ReadStats`].

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::CorpusConfig;
use crate::models::{Normalized, Post, RawPost, ReadStats, ShardBatch};

/// A restartable, sharded supply of posts.
pub trait PostSource: Send + Sync {
    type Shard: Send + Sync;

    /// Short label for logs and the run summary.
    fn name(&self) -> String;

    /// List the shards. Called once per run; calling it again re-reads from
    /// the start.
    fn shards(&self) -> Result<Vec<Self::Shard>>;

    /// Read one shard. Records that cannot be used are counted, not fatal.
    fn read_shard(&self, shard: &Self::Shard) -> Result<ShardBatch>;
}

/// Inclusive date range over corpus partitions. Open ends are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.since.map_or(true, |s| date >= s) && self.until.map_or(true, |u| date <= u)
    }

    pub fn is_unbounded(&self) -> bool {
        self.since.is_none() && self.until.is_none()
    }

    /// Label used for the `{period}` output placeholder.
    pub fn label(&self) -> String {
        match (self.since, self.until) {
            (None, None) => "all".to_string(),
            (since, until) => format!(
                "{}_{}",
                since.map_or_else(|| "start".to_string(), |d| d.to_string()),
                until.map_or_else(|| "end".to_string(), |d| d.to_string())
            ),
        }
    }
}

/// A date-partitioned directory of JSON-lines post files.
#[derive(Debug)]
pub struct Corpus {
    root: PathBuf,
    include: GlobSet,
    exclude: GlobSet,
    partition_format: String,
    partition_depth: usize,
    partition_year: Option<i32>,
    range: DateRange,
    locale: String,
}

impl Corpus {
    pub fn new(config: &CorpusConfig, range: DateRange) -> Result<Self> {
        if !config.root.exists() {
            bail!("Corpus root does not exist: {}", config.root.display());
        }
        let partition_format = match config.partition_year {
            Some(_) => format!("%Y/{}", config.partition_format),
            None => config.partition_format.clone(),
        };
        Ok(Self {
            root: config.root.clone(),
            include: build_globset(&config.include_globs)?,
            exclude: build_globset(&config.exclude_globs)?,
            partition_depth: config.partition_format.split('/').count(),
            partition_format,
            partition_year: config.partition_year,
            range,
            locale: config.locale.clone(),
        })
    }

    /// Date encoded in the leading directories of a root-relative path.
    pub fn partition_date(&self, relative: &Path) -> Option<NaiveDate> {
        let components: Vec<String> = relative
            .parent()?
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        if components.len() < self.partition_depth {
            return None;
        }
        let mut prefix = components[..self.partition_depth].join("/");
        if let Some(year) = self.partition_year {
            prefix = format!("{}/{}", year, prefix);
        }
        NaiveDate::parse_from_str(&prefix, &self.partition_format).ok()
    }

    fn in_range(&self, relative: &Path) -> bool {
        if self.range.is_unbounded() {
            return true;
        }
        match self.partition_date(relative) {
            Some(date) => self.range.contains(date),
            None => {
                warn!(path = %relative.display(), "no partition date; skipping");
                false
            }
        }
    }
}

impl PostSource for Corpus {
    type Shard = PathBuf;

    fn name(&self) -> String {
        format!("corpus:{}", self.root.display())
    }

    fn shards(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(&self.root).unwrap_or(path);
            let rel_str = relative.to_string_lossy().to_string();

            // Apply exclude, then include patterns
            if self.exclude.is_match(&rel_str) || !self.include.is_match(&rel_str) {
                continue;
            }
            if !self.in_range(relative) {
                continue;
            }
            files.push(path.to_path_buf());
        }

        // Sort for deterministic ordering
        files.sort();
        Ok(files)
    }

    fn read_shard(&self, path: &PathBuf) -> Result<ShardBatch> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open corpus file: {}", path.display()))?;
        let mut batch = ShardBatch::default();

        let mut reader = BufReader::new(file);
        let mut line = Vec::new();
        loop {
            line.clear();
            let read = reader
                .read_until(b'\n', &mut line)
                .with_context(|| format!("Failed to read corpus file: {}", path.display()))?;
            if read == 0 {
                break;
            }
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            // Undecodable bytes count as a malformed record
            let outcome = match serde_json::from_slice::<RawPost>(&line) {
                Ok(raw) => raw.normalize(&self.locale),
                Err(_) => Normalized::Malformed,
            };
            batch.stats.record(&outcome);
            if let Normalized::Kept(post) = outcome {
                batch.posts.push(post);
            }
        }

        debug!(
            path = %path.display(),
            kept = batch.stats.kept,
            malformed = batch.stats.malformed,
            "read shard"
        );
        Ok(batch)
    }
}

/// Posts held in memory, for tests and embedding the pipeline in other
/// tools.
#[derive(Debug, Clone)]
pub struct MemorySource {
    shards: Vec<Vec<Post>>,
    locale: String,
}

impl MemorySource {
    pub fn new(locale: &str, shards: Vec<Vec<Post>>) -> Self {
        Self {
            shards,
            locale: locale.to_string(),
        }
    }

    /// One post per shard.
    pub fn from_posts(locale: &str, posts: Vec<Post>) -> Self {
        Self::new(locale, posts.into_iter().map(|p| vec![p]).collect())
    }
}

impl PostSource for MemorySource {
    type Shard = usize;

    fn name(&self) -> String {
        "memory".to_string()
    }

    fn shards(&self) -> Result<Vec<usize>> {
        Ok((0..self.shards.len()).collect())
    }

    fn read_shard(&self, shard: &usize) -> Result<ShardBatch> {
        let Some(posts) = self.shards.get(*shard) else {
            bail!("no such shard: {}", shard);
        };
        let mut batch = ShardBatch::default();
        for post in posts {
            let outcome = if post.author_id.is_empty() {
                Normalized::Malformed
            } else if post.language != self.locale {
                Normalized::OtherLocale
            } else {
                Normalized::Kept(post.clone())
            };
            batch.stats.record(&outcome);
            if let Normalized::Kept(post) = outcome {
                batch.posts.push(post);
            }
        }
        Ok(batch)
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

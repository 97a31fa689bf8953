use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::classify::Strategy;
use crate::corpus::DateRange;
use crate::output::ENTITY_PLACEHOLDER;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub corpus: CorpusConfig,
    pub lexicon: LexiconConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    pub root: PathBuf,
    #[serde(default = "default_partition_format")]
    pub partition_format: String,
    /// Year for archives whose partitions carry no year (`%m/%d`).
    #[serde(default)]
    pub partition_year: Option<i32>,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    /// First day to include (YYYY-MM-DD).
    #[serde(default)]
    pub since: Option<String>,
    /// Last day to include (YYYY-MM-DD).
    #[serde(default)]
    pub until: Option<String>,
    #[serde(default = "default_locale")]
    pub locale: String,
}

fn default_partition_format() -> String {
    "%Y/%m/%d".to_string()
}
fn default_include_globs() -> Vec<String> {
    vec!["**/*.json".to_string(), "**/*.jsonl".to_string()]
}
fn default_locale() -> String {
    "nl".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LexiconConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Per-author majority vote, summed per entity.
    Tally,
    /// Random texts per entity.
    Sample,
}

impl std::fmt::Display for OutputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputMode::Tally => f.write_str("tally"),
            OutputMode::Sample => f.write_str("sample"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    #[serde(default = "default_strategy")]
    pub strategy: Strategy,
    #[serde(default = "default_mode")]
    pub mode: OutputMode,
    /// Texts per entity in sample mode. Zero or negative yields empty samples.
    #[serde(default = "default_sample_size")]
    pub sample_size: i64,
    #[serde(default)]
    pub seed: Option<u64>,
    /// Worker threads; 0 means one per core.
    #[serde(default)]
    pub threads: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Keyword,
            mode: OutputMode::Tally,
            sample_size: 200,
            seed: None,
            threads: 0,
        }
    }
}

fn default_strategy() -> Strategy {
    Strategy::Keyword
}
fn default_mode() -> OutputMode {
    OutputMode::Tally
}
fn default_sample_size() -> i64 {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    /// Per-entity sample file; must contain `{entity}`.
    #[serde(default = "default_sample_path")]
    pub sample_path: String,
    #[serde(default = "default_tally_path")]
    pub tally_path: String,
}

fn default_sample_path() -> String {
    "out/{period}/{entity}.txt".to_string()
}
fn default_tally_path() -> String {
    "out/votes-{period}.csv".to_string()
}

impl PipelineConfig {
    /// Sample size clamped to a usable count.
    pub fn sample_count(&self) -> usize {
        usize::try_from(self.sample_size).unwrap_or(0)
    }
}

impl CorpusConfig {
    pub fn date_range(&self) -> Result<DateRange> {
        let range = DateRange {
            since: parse_date(self.since.as_deref(), "corpus.since")?,
            until: parse_date(self.until.as_deref(), "corpus.until")?,
        };
        if let (Some(since), Some(until)) = (range.since, range.until) {
            if since > until {
                bail!("corpus.since ({}) is after corpus.until ({})", since, until);
            }
        }
        Ok(range)
    }
}

pub fn parse_date(value: Option<&str>, field: &str) -> Result<Option<NaiveDate>> {
    value
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .with_context(|| format!("{} must be a YYYY-MM-DD date, got '{}'", field, s))
        })
        .transpose()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        // Validate corpus
        if self.corpus.partition_format.trim().is_empty() {
            bail!("corpus.partition_format must not be empty");
        }
        if self.corpus.locale.trim().is_empty() {
            bail!("corpus.locale must not be empty");
        }
        if self.corpus.include_globs.is_empty() {
            bail!("corpus.include_globs must list at least one pattern");
        }
        let range = self.corpus.date_range()?;
        let has_year = self.corpus.partition_format.contains("%Y")
            || self.corpus.partition_format.contains("%y");
        match (has_year, self.corpus.partition_year) {
            (true, Some(year)) => bail!(
                "corpus.partition_year ({}) conflicts with a year in corpus.partition_format '{}'",
                year,
                self.corpus.partition_format
            ),
            (false, None) if !range.is_unbounded() => bail!(
                "corpus.partition_format '{}' has no year; set corpus.partition_year to filter by date",
                self.corpus.partition_format
            ),
            _ => {}
        }

        // Validate output
        if !self.output.sample_path.contains(ENTITY_PLACEHOLDER) {
            bail!(
                "output.sample_path must contain '{}', got '{}'",
                ENTITY_PLACEHOLDER,
                self.output.sample_path
            );
        }
        if self.output.tally_path.trim().is_empty() {
            bail!("output.tally_path must not be empty");
        }

        Ok(())
    }
}

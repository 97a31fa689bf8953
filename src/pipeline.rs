//! Pipeline orchestration.
//!
//! Coordinates the full run: source → classify → aggregate → tally, or
//! source → classify → sample. Shards are read and classified on the
//! [`Executor`]'s thread pool; each shard produces a partial result and the
//! partials are reduced with an associative merge. Writing output happens
//! afterwards, on the calling thread.

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::aggregate::AuthorCounts;
use crate::classify::{build_classifier, Classifier, Strategy};
use crate::config::{Config, OutputMode};
use crate::corpus::{Corpus, DateRange, PostSource};
use crate::lexicon::{load_lexicon, Lexicon};
use crate::models::{EntityId, Post, ReadStats};
use crate::output::{self, render_path, WriteReport};
use crate::sample::{merge_buckets, sample, Buckets};
use crate::tally::{tally, Tally};

/// Thread pool that runs the parallel part of a pipeline.
///
/// Built explicitly and passed into every run; there is no global pool.
pub struct Executor {
    pool: rayon::ThreadPool,
}

impl Executor {
    /// `threads == 0` uses one thread per core.
    pub fn new(threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("gwp-worker-{}", i))
            .build()
            .context("Failed to start worker pool")?;
        debug!(threads = pool.current_num_threads(), "executor started");
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }

    /// Stop the worker threads. Dropping the executor has the same effect.
    pub fn shutdown(self) {
        debug!("executor stopped");
        drop(self.pool);
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub shards: u64,
    pub read: ReadStats,
    /// Posts attributed to exactly one entity.
    pub attributed: u64,
    /// Posts that matched no entity or several.
    pub unattributed: u64,
}

impl RunStats {
    fn merge(self, other: RunStats) -> RunStats {
        RunStats {
            shards: self.shards + other.shards,
            read: self.read.merge(other.read),
            attributed: self.attributed + other.attributed,
            unattributed: self.unattributed + other.unattributed,
        }
    }
}

/// Result of a tally run.
#[derive(Debug)]
pub struct TallyOutcome {
    pub stats: RunStats,
    /// Authors with at least one attributed post.
    pub authors: usize,
    /// Authors whose vote was accepted.
    pub voters: usize,
    pub tally: Tally,
}

/// Result of a sample run.
#[derive(Debug)]
pub struct SampleOutcome {
    pub stats: RunStats,
    /// Attributed texts available per entity before sampling.
    pub available: BTreeMap<EntityId, usize>,
    pub samples: Buckets,
}

/// Classify every post in `source` and tally per-author votes.
pub fn run_tally<S: PostSource>(
    source: &S,
    classifier: &dyn Classifier,
    entities: &[EntityId],
    executor: &Executor,
) -> Result<TallyOutcome> {
    let shards = source.shards()?;
    info!(source = %source.name(), shards = shards.len(), classifier = classifier.name(), "tally started");

    let (counts, stats) = executor.install(|| {
        shards
            .par_iter()
            .map(|shard| -> Result<(AuthorCounts, RunStats)> {
                let batch = source.read_shard(shard)?;
                let mut counts = AuthorCounts::new();
                let mut stats = RunStats {
                    shards: 1,
                    read: batch.stats,
                    ..RunStats::default()
                };
                for post in &batch.posts {
                    match classifier.classify(post) {
                        Some(entity) => {
                            counts.record(&post.author_id, entity);
                            stats.attributed += 1;
                        }
                        None => stats.unattributed += 1,
                    }
                }
                Ok((counts, stats))
            })
            .try_reduce(
                || (AuthorCounts::new(), RunStats::default()),
                |(ca, sa), (cb, sb)| Ok((ca.merge(cb), sa.merge(sb))),
            )
    })?;

    let votes = counts.votes();
    let outcome = TallyOutcome {
        stats,
        authors: counts.authors(),
        voters: votes.len(),
        tally: tally(votes.values(), entities),
    };
    info!(
        authors = outcome.authors,
        voters = outcome.voters,
        attributed = stats.attributed,
        "tally finished"
    );
    Ok(outcome)
}

/// Classify every post in `source` and draw up to `n` texts per entity.
///
/// Every entity in `entities` has a bucket in the result, possibly empty.
pub fn run_sample<S: PostSource>(
    source: &S,
    classifier: &dyn Classifier,
    entities: &[EntityId],
    n: usize,
    rng: &mut StdRng,
    executor: &Executor,
) -> Result<SampleOutcome> {
    let shards = source.shards()?;
    info!(source = %source.name(), shards = shards.len(), classifier = classifier.name(), n, "sample started");

    let (mut buckets, stats) = executor.install(|| {
        shards
            .par_iter()
            .map(|shard| -> Result<(Buckets, RunStats)> {
                let batch = source.read_shard(shard)?;
                let mut buckets = Buckets::new();
                let mut stats = RunStats {
                    shards: 1,
                    read: batch.stats,
                    ..RunStats::default()
                };
                for post in batch.posts {
                    match classifier.classify(&post) {
                        Some(entity) => {
                            buckets.entry(entity).or_default().push(post.text);
                            stats.attributed += 1;
                        }
                        None => stats.unattributed += 1,
                    }
                }
                Ok((buckets, stats))
            })
            .try_reduce(
                || (Buckets::new(), RunStats::default()),
                |(ba, sa), (bb, sb)| Ok((merge_buckets(ba, bb), sa.merge(sb))),
            )
    })?;

    for entity in entities {
        buckets.entry(entity.clone()).or_default();
    }
    let available = buckets
        .iter()
        .map(|(entity, texts)| (entity.clone(), texts.len()))
        .collect();
    let samples = sample(&buckets, n, rng);

    info!(attributed = stats.attributed, "sample finished");
    Ok(SampleOutcome {
        stats,
        available,
        samples,
    })
}

/// Overrides for a single `gwp run`, layered on top of the config file.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub strategy: Option<Strategy>,
    pub mode: Option<OutputMode>,
    pub since: Option<String>,
    pub until: Option<String>,
    pub sample_size: Option<i64>,
    pub seed: Option<u64>,
    pub dry_run: bool,
}

/// Run the configured pipeline end to end and print a summary on stdout.
pub fn run(config: &Config, options: RunOptions) -> Result<()> {
    let mut config = config.clone();
    if let Some(strategy) = options.strategy {
        config.pipeline.strategy = strategy;
    }
    if let Some(mode) = options.mode {
        config.pipeline.mode = mode;
    }
    if options.since.is_some() {
        config.corpus.since = options.since;
    }
    if options.until.is_some() {
        config.corpus.until = options.until;
    }
    if let Some(n) = options.sample_size {
        config.pipeline.sample_size = n;
    }
    if options.seed.is_some() {
        config.pipeline.seed = options.seed;
    }
    config.validate()?;

    let range = config.corpus.date_range()?;
    let lexicon = Arc::new(load_lexicon(&config.lexicon.path)?);
    let corpus = Corpus::new(&config.corpus, range)?;

    if options.dry_run {
        return dry_run(&corpus, &config, &range);
    }

    let entities: Vec<EntityId> = lexicon.entities().cloned().collect();
    let classifier = build_classifier(config.pipeline.strategy, lexicon.clone());
    let executor = Executor::new(config.pipeline.threads)?;

    let result = match config.pipeline.mode {
        OutputMode::Tally => run_tally(&corpus, classifier.as_ref(), &entities, &executor)
            .and_then(|outcome| finish_tally(&config, &range, outcome)),
        OutputMode::Sample => {
            let mut rng = match config.pipeline.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            run_sample(
                &corpus,
                classifier.as_ref(),
                &entities,
                config.pipeline.sample_count(),
                &mut rng,
                &executor,
            )
            .and_then(|outcome| finish_sample(&config, &range, &lexicon, outcome))
        }
    };

    executor.shutdown();
    result
}

fn dry_run(corpus: &Corpus, config: &Config, range: &DateRange) -> Result<()> {
    let shards = corpus.shards()?;
    let read = shards
        .iter()
        .map(|shard| corpus.read_shard(shard).map(|batch| batch.stats))
        .try_fold(ReadStats::default(), |acc, stats| stats.map(|s| acc.merge(s)))?;

    println!("run {} {} (dry-run)", config.pipeline.mode, config.pipeline.strategy);
    println!("  period: {}", range.label());
    println!("  shards found: {}", shards.len());
    print_read_stats(&read);
    Ok(())
}

fn finish_tally(config: &Config, range: &DateRange, outcome: TallyOutcome) -> Result<()> {
    let path: PathBuf = render_path(&config.output.tally_path, &range.label(), None);
    output::write_tally(&path, &outcome.tally)?;

    println!("run tally {}", config.pipeline.strategy);
    println!("  period: {}", range.label());
    print_run_stats(&outcome.stats);
    println!("  authors: {}", outcome.authors);
    println!("  accepted votes: {}", outcome.voters);
    for (entity, count) in &outcome.tally {
        println!("    {:<12} {:>8}", entity, count);
    }
    println!("  written: {}", path.display());
    println!("ok");
    Ok(())
}

fn finish_sample(
    config: &Config,
    range: &DateRange,
    lexicon: &Lexicon,
    outcome: SampleOutcome,
) -> Result<()> {
    let report: WriteReport = output::write_samples(
        &config.output.sample_path,
        &range.label(),
        lexicon.entities(),
        &outcome.samples,
    );

    println!("run sample {}", config.pipeline.strategy);
    println!("  period: {}", range.label());
    print_run_stats(&outcome.stats);
    for (entity, path, lines) in &report.written {
        let available = outcome.available.get(entity).copied().unwrap_or(0);
        println!(
            "    {:<12} {:>5} / {:<8} {}",
            entity,
            lines,
            available,
            path.display()
        );
    }

    if !report.is_ok() {
        for (entity, error) in &report.failed {
            eprintln!("  failed {}: {:#}", entity, error);
        }
        bail!(
            "{} of {} sample files could not be written",
            report.failed.len(),
            report.failed.len() + report.written.len()
        );
    }
    println!("ok");
    Ok(())
}

fn print_read_stats(read: &ReadStats) {
    println!("  records read: {}", read.records);
    println!("  kept: {}", read.kept);
    println!("  other locale: {}", read.other_locale);
    println!("  malformed: {}", read.malformed);
}

fn print_run_stats(stats: &RunStats) {
    println!("  shards: {}", stats.shards);
    print_read_stats(&stats.read);
    println!("  attributed posts: {}", stats.attributed);
    println!("  unattributed posts: {}", stats.unattributed);
}

/// Classify one post outside a run. Used by `gwp classify`.
pub fn classify_one(
    lexicon: Arc<Lexicon>,
    strategy: Strategy,
    author: &str,
    text: &str,
    repost_of: Option<&str>,
) -> Option<EntityId> {
    let classifier = build_classifier(strategy, lexicon);
    let mut post = Post::new(author, "", text);
    post.repost_target_id = repost_of.map(str::to_string);
    classifier.classify(&post)
}

//! # Gone With Polls CLI (`gwp`)
//!
//! ## Usage
//!
//! ```bash
//! gwp --config ./config/gwp.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `gwp run` | Classify the corpus and write a tally or samples |
//! | `gwp classify "<text>"` | Classify a single post |
//! | `gwp lexicon` | List configured entities |
//!
//! Diagnostics go to stderr and are filtered by `GWP_LOG`
//! (e.g. `GWP_LOG=gone_with_polls=debug`). Summaries go to stdout.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use gone_with_polls::classify::Strategy;
use gone_with_polls::config::{self, OutputMode};
use gone_with_polls::inspect;
use gone_with_polls::pipeline::{self, RunOptions};

/// Gone With Polls — attribute posts to parties, then tally or sample them.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/gwp.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "gwp",
    about = "Attribute social-media posts to parties and turn them into vote tallies or samples",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/gwp.toml")]
    config: PathBuf,

    /// Log debug diagnostics.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline over the corpus.
    ///
    /// Flags override the matching config values for this run only.
    Run {
        /// Classification strategy.
        #[arg(long, value_enum)]
        strategy: Option<Strategy>,

        /// What to produce.
        #[arg(long, value_enum)]
        mode: Option<OutputMode>,

        /// Only read partitions on or after this date (YYYY-MM-DD).
        #[arg(long)]
        since: Option<String>,

        /// Only read partitions on or before this date (YYYY-MM-DD).
        #[arg(long)]
        until: Option<String>,

        /// Texts per entity in sample mode.
        #[arg(long, allow_hyphen_values = true)]
        sample_size: Option<i64>,

        /// Seed for reproducible samples.
        #[arg(long)]
        seed: Option<u64>,

        /// Count shards and records without classifying or writing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Classify a single post and print the entity, or `none`.
    Classify {
        /// Post text.
        text: String,

        /// Author id (checked against the exclusion list).
        #[arg(long, default_value = "")]
        author: String,

        /// Author of the re-shared post, for the repost strategy.
        #[arg(long)]
        repost_of: Option<String>,

        /// Classification strategy; defaults to the configured one.
        #[arg(long, value_enum)]
        strategy: Option<Strategy>,
    },

    /// List configured entities and their keyword/handle counts.
    Lexicon,
}

fn init_tracing(quiet: bool, verbose: bool) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("GWP_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose)?;

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Run {
            strategy,
            mode,
            since,
            until,
            sample_size,
            seed,
            dry_run,
        } => {
            pipeline::run(
                &cfg,
                RunOptions {
                    strategy,
                    mode,
                    since,
                    until,
                    sample_size,
                    seed,
                    dry_run,
                },
            )?;
        }
        Commands::Classify {
            text,
            author,
            repost_of,
            strategy,
        } => {
            inspect::run_classify(&cfg, strategy, &text, &author, repost_of.as_deref())?;
        }
        Commands::Lexicon => {
            inspect::list_entities(&cfg)?;
        }
    }

    Ok(())
}

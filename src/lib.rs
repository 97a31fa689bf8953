//! # Gone With Polls
//!
//! Attributes short social-media posts to political parties and aggregates
//! the attributions into per-party vote tallies and random text samples.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌────────────┐   ┌────────────┐   ┌──────────┐
//! │   Corpus    │──▶│ Classifier │──▶│ Per-author │──▶│  Tally   │──▶ votes.csv
//! │ JSON lines  │   │ keyword /  │   │  majority  │   └──────────┘
//! └─────────────┘   │  repost    │   └────────────┘
//!                   └─────┬──────┘   ┌────────────┐
//!                         └─────────▶│  Sampler   │──▶ <party>.txt
//!                                    └────────────┘
//! ```
//!
//! Classification and per-author counting run on a thread pool, one corpus
//! file per task; partial counts are merged by addition. Output is written
//! once everything has been reduced.
//!
//! ## Quick Start
//!
//! ```bash
//! gwp lexicon                                   # check the configured parties
//! gwp classify "Ik stem VVD"                    # classify a single post
//! gwp run --mode tally --since 2017-03-01 --until 2017-03-14
//! gwp run --mode sample --sample-size 200 --seed 42
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Posts, entity ids, read statistics |
//! | [`lexicon`] | Keyword, handle and exclusion tables |
//! | [`classify`] | Keyword and repost classifiers |
//! | [`aggregate`] | Per-author majority vote |
//! | [`tally`] | Vote count per entity |
//! | [`sample`] | Stratified random sampling |
//! | [`corpus`] | Post sources |
//! | [`output`] | Flat-file writers and readers |
//! | [`pipeline`] | Executor and end-to-end runs |

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod corpus;
pub mod inspect;
pub mod lexicon;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod sample;
pub mod tally;

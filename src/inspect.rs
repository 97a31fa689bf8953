//! Read-only commands for checking a lexicon before a run.

use anyhow::Result;
use std::sync::Arc;

use crate::classify::Strategy;
use crate::config::Config;
use crate::lexicon::{load_lexicon, Lexicon};
use crate::pipeline::classify_one;

pub fn list_entities(config: &Config) -> Result<()> {
    let lexicon = load_lexicon(&config.lexicon.path)?;
    print!("{}", format_entities(&lexicon));
    Ok(())
}

fn format_entities(lexicon: &Lexicon) -> String {
    let mut out = format!("{:<10} {:>8} {:>8}  NAME\n", "ENTITY", "KEYWORDS", "HANDLES");
    for info in lexicon.entity_info() {
        out.push_str(&format!(
            "{:<10} {:>8} {:>8}  {}\n",
            info.id,
            info.keyword_count,
            info.handle_count,
            info.name.as_deref().unwrap_or("-")
        ));
    }
    out.push_str(&format!("excluded authors: {}\n", lexicon.exclusions().len()));
    out
}

pub fn run_classify(
    config: &Config,
    strategy: Option<Strategy>,
    text: &str,
    author: &str,
    repost_of: Option<&str>,
) -> Result<()> {
    let lexicon = Arc::new(load_lexicon(&config.lexicon.path)?);
    let strategy = strategy.unwrap_or(config.pipeline.strategy);
    match classify_one(lexicon, strategy, author, text, repost_of) {
        Some(entity) => println!("{}", entity),
        None => println!("none"),
    }
    Ok(())
}

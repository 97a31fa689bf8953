//! Flat-file output for tallies and samples.
//!
//! - Tally: one file, `<entity>,<count>` per line.
//! - Sample: one file per entity, one text per line.
//!
//! Both formats end every line with `\n`. Parent directories are created on
//! demand; a directory that already exists (or is created concurrently) is
//! not an error. Sample files are written independently, so one entity
//! failing does not stop the others.

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::models::EntityId;
use crate::sample::Buckets;
use crate::tally::Tally;

/// Placeholder replaced by the entity id in sample paths.
pub const ENTITY_PLACEHOLDER: &str = "{entity}";
/// Placeholder replaced by the date range label in any output path.
pub const PERIOD_PLACEHOLDER: &str = "{period}";

/// Render an output path template.
pub fn render_path(template: &str, period: &str, entity: Option<&EntityId>) -> PathBuf {
    let mut rendered = template.replace(PERIOD_PLACEHOLDER, period);
    if let Some(entity) = entity {
        rendered = rendered.replace(ENTITY_PLACEHOLDER, entity.as_str());
    }
    PathBuf::from(rendered)
}

/// Create the parent directory of `path` if it is missing.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    match std::fs::create_dir_all(parent) {
        Ok(()) => Ok(()),
        // Lost a race with another writer.
        Err(_) if parent.is_dir() => Ok(()),
        Err(e) => Err(e)
            .with_context(|| format!("Failed to create output directory: {}", parent.display())),
    }
}

pub fn write_tally(path: &Path, tally: &Tally) -> Result<()> {
    ensure_parent_dir(path)?;
    let file = File::create(path)
        .with_context(|| format!("Failed to create tally file: {}", path.display()))?;
    let mut out = BufWriter::new(file);
    for (entity, count) in tally {
        writeln!(out, "{},{}", entity, count)?;
    }
    out.flush()
        .with_context(|| format!("Failed to write tally file: {}", path.display()))?;
    Ok(())
}

pub fn read_tally(path: &Path) -> Result<Tally> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read tally file: {}", path.display()))?;

    let mut tally = Tally::new();
    for (i, line) in content.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let Some((entity, count)) = line.rsplit_once(',') else {
            bail!("{}:{}: expected '<entity>,<count>'", path.display(), i + 1);
        };
        let count: u64 = count
            .trim()
            .parse()
            .with_context(|| format!("{}:{}: invalid count '{}'", path.display(), i + 1, count))?;
        tally.insert(EntityId::new(entity.trim()), count);
    }
    Ok(tally)
}

pub fn write_sample(path: &Path, texts: &[String]) -> Result<()> {
    ensure_parent_dir(path)?;
    let file = File::create(path)
        .with_context(|| format!("Failed to create sample file: {}", path.display()))?;
    let mut out = BufWriter::new(file);
    for text in texts {
        writeln!(out, "{}", text)?;
    }
    out.flush()
        .with_context(|| format!("Failed to write sample file: {}", path.display()))?;
    Ok(())
}

pub fn read_sample(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read sample file: {}", path.display()))?;
    Ok(content.lines().map(str::to_string).collect())
}

/// Result of writing one file per entity.
#[derive(Debug, Default)]
pub struct WriteReport {
    pub written: Vec<(EntityId, PathBuf, usize)>,
    pub failed: Vec<(EntityId, anyhow::Error)>,
}

impl WriteReport {
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Write one sample file per entity in `entities`. Entities without texts
/// get an empty file.
pub fn write_samples<'a>(
    template: &str,
    period: &str,
    entities: impl IntoIterator<Item = &'a EntityId>,
    samples: &Buckets,
) -> WriteReport {
    let mut report = WriteReport::default();
    for entity in entities {
        let path = render_path(template, period, Some(entity));
        let texts = samples.get(entity).map(Vec::as_slice).unwrap_or_default();
        match write_sample(&path, texts) {
            Ok(()) => {
                debug!(entity = %entity, path = %path.display(), lines = texts.len(), "wrote sample");
                report.written.push((entity.clone(), path, texts.len()));
            }
            Err(e) => {
                warn!(entity = %entity, error = %e, "failed to write sample");
                report.failed.push((entity.clone(), e));
            }
        }
    }
    report
}

//! Stratified random sampling of attributed texts.
//!
//! For each entity, at most `n` texts are drawn uniformly at random without
//! replacement. Buckets are visited in entity-id order and each bucket is
//! sorted before drawing, so a seeded generator reproduces the same sample
//! no matter in which order shards were merged.

use rand::seq::index;
use rand::Rng;
use std::collections::BTreeMap;

use crate::models::EntityId;

/// Entity → texts attributed to it.
pub type Buckets = BTreeMap<EntityId, Vec<String>>;

/// Remove embedded line breaks so one text fits on one output line.
pub fn single_line(text: &str) -> String {
    text.replace(['\n', '\r'], "")
}

/// Combine two partial bucket maps by concatenating per entity.
pub fn merge_buckets(mut into: Buckets, from: Buckets) -> Buckets {
    for (entity, mut texts) in from {
        into.entry(entity).or_default().append(&mut texts);
    }
    into
}

/// Draw `min(n, k)` distinct texts per entity. Output order is draw order.
pub fn sample<R: Rng + ?Sized>(texts_by_entity: &Buckets, n: usize, rng: &mut R) -> Buckets {
    texts_by_entity
        .iter()
        .map(|(entity, texts)| (entity.clone(), sample_bucket(texts, n, rng)))
        .collect()
}

fn sample_bucket<R: Rng + ?Sized>(texts: &[String], n: usize, rng: &mut R) -> Vec<String> {
    let amount = n.min(texts.len());
    if amount == 0 {
        return Vec::new();
    }

    let mut pool: Vec<&String> = texts.iter().collect();
    pool.sort();

    index::sample(rng, pool.len(), amount)
        .into_iter()
        .map(|i| single_line(pool[i]))
        .collect()
}

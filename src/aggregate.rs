//! Per-author majority vote.
//!
//! Classified posts are grouped by author and counted per entity. An author
//! votes for their top entity only when it is the unique maximum; a tie for
//! first place is an abstention.
//!
//! Partial counts built on disjoint shards combine with [`AuthorCounts::merge`],
//! which adds counts and is therefore associative and commutative. Shards can
//! be reduced in any order and any grouping.

use std::collections::{BTreeMap, HashMap};

use crate::models::EntityId;

/// Ranked (entity, count) pairs for one author.
pub type Ranking = Vec<(EntityId, u64)>;

/// Attribution counts per author per entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorCounts {
    inner: HashMap<String, HashMap<EntityId, u64>>,
}

impl AuthorCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, author_id: &str, entity: EntityId) {
        self.add(author_id, entity, 1);
    }

    fn add(&mut self, author_id: &str, entity: EntityId, count: u64) {
        if let Some(per_entity) = self.inner.get_mut(author_id) {
            *per_entity.entry(entity).or_insert(0) += count;
        } else {
            self.inner
                .insert(author_id.to_string(), HashMap::from([(entity, count)]));
        }
    }

    /// Combine two partial counts by adding them.
    pub fn merge(self, other: AuthorCounts) -> AuthorCounts {
        let (mut into, from) = if self.inner.len() >= other.inner.len() {
            (self, other)
        } else {
            (other, self)
        };
        for (author, per_entity) in from.inner {
            for (entity, count) in per_entity {
                into.add(&author, entity, count);
            }
        }
        into
    }

    /// Number of authors with at least one attributed post.
    pub fn authors(&self) -> usize {
        self.inner.len()
    }

    /// Total number of attributed posts.
    pub fn posts(&self) -> u64 {
        self.inner.values().flat_map(|m| m.values()).sum()
    }

    /// Resolve every author to their accepted vote. Abstaining authors are
    /// omitted.
    pub fn votes(&self) -> BTreeMap<String, EntityId> {
        self.inner
            .iter()
            .filter_map(|(author, per_entity)| {
                resolve_vote(&rank(per_entity)).map(|entity| (author.clone(), entity.clone()))
            })
            .collect()
    }
}

impl<A: AsRef<str>> FromIterator<(A, Option<EntityId>)> for AuthorCounts {
    fn from_iter<I: IntoIterator<Item = (A, Option<EntityId>)>>(iter: I) -> Self {
        let mut counts = AuthorCounts::new();
        for (author, entity) in iter {
            if let Some(entity) = entity {
                counts.record(author.as_ref(), entity);
            }
        }
        counts
    }
}

/// Sort counts descending; equal counts are ordered by entity id so the
/// result never depends on hash order.
pub fn rank(per_entity: &HashMap<EntityId, u64>) -> Ranking {
    let mut ranked: Ranking = per_entity
        .iter()
        .map(|(entity, count)| (entity.clone(), *count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

/// The accepted vote of a ranking: the first entity if it is the only one
/// or strictly ahead of the second.
pub fn resolve_vote(ranked: &[(EntityId, u64)]) -> Option<&EntityId> {
    match ranked {
        [] => None,
        [(only, _)] => Some(only),
        [(first, top), (_, second), ..] if top > second => Some(first),
        _ => None,
    }
}

/// Group classification results by author and resolve each author's vote.
pub fn aggregate<I, A>(classified: I) -> BTreeMap<String, EntityId>
where
    I: IntoIterator<Item = (A, Option<EntityId>)>,
    A: AsRef<str>,
{
    classified.into_iter().collect::<AuthorCounts>().votes()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(id: &str) -> EntityId {
        EntityId::new(id)
    }

    fn repeat(author: &str, entity: &str, n: usize) -> Vec<(String, Option<EntityId>)> {
        (0..n).map(|_| (author.to_string(), Some(e(entity)))).collect()
    }

    #[test]
    fn test_tie_abstains() {
        let mut posts = repeat("x", "a", 3);
        posts.extend(repeat("x", "b", 3));
        assert!(aggregate(posts).is_empty());
    }

    #[test]
    fn test_strict_majority_votes() {
        let mut posts = repeat("x", "b", 2);
        posts.extend(repeat("x", "a", 3));
        let votes = aggregate(posts);
        assert_eq!(votes.get("x"), Some(&e("a")));
    }

    #[test]
    fn test_single_post_votes() {
        let votes = aggregate(vec![("y", Some(e("cda")))]);
        assert_eq!(votes.get("y"), Some(&e("cda")));
    }

    #[test]
    fn test_tie_for_second_place_still_votes() {
        let mut posts = repeat("x", "a", 3);
        posts.extend(repeat("x", "b", 1));
        posts.extend(repeat("x", "c", 1));
        assert_eq!(aggregate(posts).get("x"), Some(&e("a")));
    }

    #[test]
    fn test_unattributed_posts_ignored() {
        let posts = vec![
            ("x", None),
            ("x", Some(e("a"))),
            ("x", None),
            ("z", None),
        ];
        let votes = aggregate(posts);
        assert_eq!(votes.len(), 1);
        assert_eq!(votes.get("x"), Some(&e("a")));
        assert!(!votes.contains_key("z"));
    }

    #[test]
    fn test_rank_tie_break_by_entity_id() {
        let counts = HashMap::from([(e("pvv"), 2), (e("cda"), 2), (e("vvd"), 5)]);
        let ranked = rank(&counts);
        let ids: Vec<&str> = ranked.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["vvd", "cda", "pvv"]);
    }

    #[test]
    fn test_resolve_vote_empty() {
        assert_eq!(resolve_vote(&[]), None);
    }

    #[test]
    fn test_merge_adds_counts() {
        let left: AuthorCounts = repeat("x", "a", 2).into_iter().collect();
        let mut right: AuthorCounts = repeat("x", "b", 2).into_iter().collect();
        right.record("x", e("a"));
        right.record("y", e("b"));

        let merged = left.merge(right);
        assert_eq!(merged.authors(), 2);
        assert_eq!(merged.posts(), 6);
        assert_eq!(
            rank(&merged.inner["x"]),
            vec![(e("a"), 3), (e("b"), 2)]
        );
    }

    #[test]
    fn test_merge_commutative_and_associative() {
        let a: AuthorCounts = repeat("x", "a", 2).into_iter().collect();
        let b: AuthorCounts = repeat("x", "b", 1).into_iter().collect();
        let c: AuthorCounts = repeat("y", "a", 4).into_iter().collect();

        let left = a.clone().merge(b.clone()).merge(c.clone());
        let right = c.merge(b.merge(a));
        assert_eq!(left, right);
    }

    #[test]
    fn test_split_shards_match_single_pass() {
        let mut posts = repeat("x", "a", 3);
        posts.extend(repeat("x", "b", 2));
        posts.extend(repeat("y", "b", 1));

        let whole: AuthorCounts = posts.clone().into_iter().collect();
        let (first, second) = posts.split_at(2);
        let sharded = first
            .iter()
            .cloned()
            .collect::<AuthorCounts>()
            .merge(second.iter().cloned().collect());

        assert_eq!(whole, sharded);
        assert_eq!(whole.votes(), sharded.votes());
    }
}

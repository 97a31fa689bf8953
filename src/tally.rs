//! Global vote count per entity.

use std::collections::BTreeMap;

use crate::models::EntityId;

/// Entity → number of authors voting for it, ordered by entity id.
pub type Tally = BTreeMap<EntityId, u64>;

/// Count accepted votes per entity.
///
/// Every entity in `entities` appears in the result, with zero when nobody
/// voted for it. The result depends only on the multiset of votes.
pub fn tally<'a, V, E>(votes: V, entities: E) -> Tally
where
    V: IntoIterator<Item = &'a EntityId>,
    E: IntoIterator<Item = &'a EntityId>,
{
    let mut counts: Tally = entities.into_iter().map(|e| (e.clone(), 0)).collect();
    for vote in votes {
        *counts.entry(vote.clone()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<EntityId> {
        names.iter().map(|n| EntityId::new(n)).collect()
    }

    #[test]
    fn test_counts_votes() {
        let entities = ids(&["cda", "pvv", "vvd"]);
        let votes = ids(&["vvd", "cda", "vvd"]);
        let result = tally(&votes, &entities);
        assert_eq!(result.get("vvd"), Some(&2));
        assert_eq!(result.get("cda"), Some(&1));
    }

    #[test]
    fn test_zero_fills_configured_entities() {
        let entities = ids(&["cda", "pvv"]);
        let result = tally(&Vec::<EntityId>::new(), &entities);
        assert_eq!(result.len(), 2);
        assert!(result.values().all(|c| *c == 0));
    }

    #[test]
    fn test_order_independent() {
        let entities = ids(&["a", "b", "c"]);
        let votes = ids(&["a", "b", "a", "c", "a", "b"]);
        let mut reversed = votes.clone();
        reversed.reverse();
        let mut rotated = votes.clone();
        rotated.rotate_left(2);

        let expected = tally(&votes, &entities);
        assert_eq!(tally(&reversed, &entities), expected);
        assert_eq!(tally(&rotated, &entities), expected);
    }

    #[test]
    fn test_from_vote_map() {
        let entities = ids(&["cda", "vvd"]);
        let votes = BTreeMap::from([
            ("x".to_string(), EntityId::new("vvd")),
            ("y".to_string(), EntityId::new("cda")),
        ]);
        let result = tally(votes.values(), &entities);
        assert_eq!(result.get("vvd"), Some(&1));
        assert_eq!(result.get("cda"), Some(&1));
    }
}

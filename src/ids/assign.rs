//! Id assignment policies
//!
//! Items arrive as `(key, stable name)` pairs in the order the policy
//! should hand out sequential numbers. Recorded ids are claimed first; every
//! id in the records stays reserved so new items never steal one.

use std::collections::BTreeMap;
use std::hash::Hash;

use rustc_hash::{FxHashMap, FxHashSet};

use super::{Id, IdPolicy};
use crate::utils::{hash_to_number, ContentHasher};

const INITIAL_RANGE: u64 = 1000;
const MAX_OCCUPANCY: f64 = 0.8;

/// Smallest `10^n` (n >= 3) keeping occupancy at or below 80%
pub(crate) fn deterministic_range(count: usize) -> u64 {
    let mut range = INITIAL_RANGE;
    while count as f64 > range as f64 * MAX_OCCUPANCY {
        range = range.saturating_mul(10);
    }
    range
}

pub(crate) fn assign_ids<K>(
    items: &[(K, String)],
    policy: IdPolicy,
    records: Option<&BTreeMap<String, Id>>,
) -> FxHashMap<K, Id>
where
    K: Copy + Eq + Hash,
{
    let mut ids = FxHashMap::default();
    let mut used: FxHashSet<Id> = FxHashSet::default();

    if let Some(records) = records {
        used.extend(records.values().cloned());

        let mut claimed = FxHashSet::default();
        for (key, name) in items {
            let Some(id) = records.get(name) else { continue };
            if policy.accepts(id) && claimed.insert(id.clone()) {
                ids.insert(*key, id.clone());
            }
        }
    }

    let pending: Vec<&(K, String)> = items.iter().filter(|(key, _)| !ids.contains_key(key)).collect();

    match policy {
        IdPolicy::Natural | IdPolicy::Size => {
            let mut next = 0u64;
            for (key, _) in pending {
                while used.contains(&Id::Number(next)) {
                    next += 1;
                }
                used.insert(Id::Number(next));
                ids.insert(*key, Id::Number(next));
                next += 1;
            }
        }
        IdPolicy::Named => {
            let mut pending = pending;
            pending.sort_by(|a, b| a.1.cmp(&b.1));
            for (key, name) in pending {
                let mut candidate = name.clone();
                let mut attempt = 0u32;
                while used.contains(&Id::Name(candidate.clone())) {
                    attempt += 1;
                    let mut hasher = ContentHasher::new();
                    hasher.update(name).update(attempt.to_le_bytes());
                    candidate = format!("{}~{}", name, hasher.digest(4));
                }
                used.insert(Id::Name(candidate.clone()));
                ids.insert(*key, Id::Name(candidate));
            }
        }
        IdPolicy::Deterministic => {
            let range = deterministic_range(items.len() + used.len());
            let mut pending = pending;
            pending.sort_by(|a, b| a.1.cmp(&b.1));
            for (key, name) in pending {
                let mut attempt = 0u64;
                loop {
                    let candidate = if attempt == 0 {
                        name.clone()
                    } else {
                        format!("{}{}", name, attempt)
                    };
                    let id = Id::Number(hash_to_number(&candidate, range));
                    if used.insert(id.clone()) {
                        ids.insert(*key, id);
                        break;
                    }
                    attempt += 1;
                }
            }
        }
    }

    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn items(names: &[&str]) -> Vec<(usize, String)> {
        names.iter().enumerate().map(|(i, n)| (i, n.to_string())).collect()
    }

    #[test]
    fn test_range_grows_with_occupancy() {
        assert_eq!(deterministic_range(0), 1000);
        assert_eq!(deterministic_range(800), 1000);
        assert_eq!(deterministic_range(801), 10_000);
        assert_eq!(deterministic_range(9000), 100_000);
    }

    #[test]
    fn test_natural_is_sequential() {
        let ids = assign_ids(&items(&["b", "a", "c"]), IdPolicy::Natural, None);
        assert_eq!(ids[&0], Id::Number(0));
        assert_eq!(ids[&1], Id::Number(1));
        assert_eq!(ids[&2], Id::Number(2));
    }

    #[test]
    fn test_named_collisions_get_suffix() {
        let ids = assign_ids(&items(&["main", "main", "other"]), IdPolicy::Named, None);
        assert_eq!(ids[&0], Id::Name("main".into()));
        assert_eq!(ids[&2], Id::Name("other".into()));
        let Id::Name(second) = &ids[&1] else { panic!("expected a name") };
        assert!(second.starts_with("main~"));
        assert_eq!(second.len(), "main~".len() + 4);
    }

    #[test]
    fn test_deterministic_ignores_input_order_and_is_unique() {
        let names: Vec<String> = (0..500).map(|i| format!("./src/m{}.js", i)).collect();
        let forward: Vec<(usize, String)> = names.iter().cloned().enumerate().collect();
        let mut backward = forward.clone();
        backward.reverse();

        let a = assign_ids(&forward, IdPolicy::Deterministic, None);
        let b = assign_ids(&backward, IdPolicy::Deterministic, None);
        assert_eq!(a, b);

        let unique: FxHashSet<&Id> = a.values().collect();
        assert_eq!(unique.len(), 500);
        assert!(a.values().all(|id| matches!(id, Id::Number(n) if *n < 1000)));
    }

    #[test]
    fn test_records_are_reused_and_reserved() {
        let mut records = BTreeMap::new();
        records.insert("a".to_string(), Id::Number(0));
        records.insert("gone".to_string(), Id::Number(1));

        let ids = assign_ids(&items(&["b", "a"]), IdPolicy::Natural, Some(&records));
        assert_eq!(ids[&1], Id::Number(0));
        // 0 is claimed and 1 still belongs to a removed item
        assert_eq!(ids[&0], Id::Number(2));
    }

    #[test]
    fn test_records_of_other_kind_are_ignored() {
        let mut records = BTreeMap::new();
        records.insert("a".to_string(), Id::Name("a".into()));

        let ids = assign_ids(&items(&["a"]), IdPolicy::Natural, Some(&records));
        assert_eq!(ids[&0], Id::Number(0));
    }
}

//! Membership differ: actual role holders vs. the desired set.

use std::collections::{BTreeSet, HashSet};

/// Corrective actions that make the actual holders equal the desired set.
///
/// Sorted sets, so the reconciler issues actions in a deterministic order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleDiff {
    /// Desired members currently missing the role.
    pub to_add: BTreeSet<String>,
    /// Current holders no longer desired. A holder with no stored day at all
    /// always lands here; only an exact date match keeps the role.
    pub to_remove: BTreeSet<String>,
}

impl RoleDiff {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Compute the diff: `to_add = desired − holders`, `to_remove = holders − desired`.
pub fn diff(holders: &HashSet<String>, desired: &HashSet<String>) -> RoleDiff {
    RoleDiff {
        to_add: desired.difference(holders).cloned().collect(),
        to_remove: holders.difference(desired).cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn set(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_diff_basic() {
        let d = diff(&set(&["a", "b"]), &set(&["b", "c"]));

        assert_eq!(d.to_add, set(&["c"]).into_iter().collect());
        assert_eq!(d.to_remove, set(&["a"]).into_iter().collect());
    }

    #[test]
    fn test_equal_sets_yield_empty_diff() {
        let d = diff(&set(&["a", "b"]), &set(&["a", "b"]));
        assert!(d.is_empty());
    }

    #[test]
    fn test_holder_without_desired_entry_is_removed() {
        // Models a holder with no stored day: never in the desired set.
        let d = diff(&set(&["stale"]), &set(&[]));
        assert!(d.to_remove.contains("stale"));
        assert!(d.to_add.is_empty());
    }

    #[test]
    fn test_empty_holders() {
        let d = diff(&set(&[]), &set(&["a"]));
        assert_eq!(d.to_add.len(), 1);
        assert!(d.to_remove.is_empty());
    }

    fn id_set() -> impl Strategy<Value = HashSet<String>> {
        proptest::collection::hash_set("[a-z][0-9]{0,3}", 0..12)
    }

    proptest! {
        // to_add never contains a current holder.
        #[test]
        fn to_add_disjoint_from_holders(holders in id_set(), desired in id_set()) {
            let d = diff(&holders, &desired);
            for user in &d.to_add {
                prop_assert!(!holders.contains(user));
            }
        }

        // to_remove only ever contains current holders.
        #[test]
        fn to_remove_subset_of_holders(holders in id_set(), desired in id_set()) {
            let d = diff(&holders, &desired);
            for user in &d.to_remove {
                prop_assert!(holders.contains(user));
            }
        }

        // Applying the diff to the holders reproduces the desired set.
        #[test]
        fn applying_diff_yields_desired(holders in id_set(), desired in id_set()) {
            let d = diff(&holders, &desired);

            let mut applied = holders.clone();
            for user in &d.to_remove {
                applied.remove(user);
            }
            for user in &d.to_add {
                applied.insert(user.clone());
            }

            prop_assert_eq!(applied, desired);
        }

        // A second diff after applying the first is empty (idempotence).
        #[test]
        fn rediffing_applied_state_is_empty(holders in id_set(), desired in id_set()) {
            let d = diff(&holders, &desired);

            let mut applied = holders.clone();
            applied.retain(|u| !d.to_remove.contains(u));
            applied.extend(d.to_add.iter().cloned());

            prop_assert!(diff(&applied, &desired).is_empty());
        }
    }
}

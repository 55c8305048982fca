//! Myers diff over list item-key sequences.
//!
//! The diff plan is wire-facing: it is emitted to the platform list as part
//! of the `list-platform-info` attribute and consumed locally to drive the
//! reuse pool. Indices in `insertions`/`moveTo`/`updateTo` are positions in
//! the new sequence; `removals`/`moveFrom`/`updateFrom` are positions in the
//! old one.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::list::ListComponentInfo;

/// The six-list action plan.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    pub insertions: Vec<usize>,
    pub removals: Vec<usize>,
    pub update_from: Vec<usize>,
    pub update_to: Vec<usize>,
    pub move_from: Vec<usize>,
    pub move_to: Vec<usize>,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.insertions.is_empty()
            && self.removals.is_empty()
            && self.update_from.is_empty()
            && self.move_from.is_empty()
    }

    /// Diff two component sequences. Keys must already be scrubbed (unique,
    /// non-empty).
    pub fn compute(old: &[ListComponentInfo], new: &[ListComponentInfo]) -> DiffResult {
        let old_keys: Vec<&str> = old.iter().map(|c| c.item_key.as_str()).collect();
        let new_keys: Vec<&str> = new.iter().map(|c| c.item_key.as_str()).collect();
        let script = myers_script(&old_keys, &new_keys);

        let mut deleted: HashMap<&str, usize> = HashMap::new();
        let mut inserted: HashMap<&str, usize> = HashMap::new();
        let mut kept: Vec<(usize, usize)> = Vec::new();
        for edit in &script {
            match *edit {
                Edit::Keep { old, new } => kept.push((old, new)),
                Edit::Delete { old } => {
                    deleted.insert(old_keys[old], old);
                }
                Edit::Insert { new } => {
                    inserted.insert(new_keys[new], new);
                }
            }
        }

        let mut result = DiffResult::default();
        // A key that was both deleted and inserted moved.
        for edit in &script {
            if let Edit::Delete { old: old_idx } = *edit {
                let key = old_keys[old_idx];
                if let Some(&new_idx) = inserted.get(key) {
                    result.move_from.push(old_idx);
                    result.move_to.push(new_idx);
                    kept.push((old_idx, new_idx));
                } else {
                    result.removals.push(old_idx);
                }
            }
        }
        for edit in &script {
            if let Edit::Insert { new: new_idx } = *edit {
                if !deleted.contains_key(new_keys[new_idx]) {
                    result.insertions.push(new_idx);
                }
            }
        }
        // Surviving items whose payload changed re-render in place.
        kept.sort_by_key(|&(_, new_idx)| new_idx);
        for (old_idx, new_idx) in kept {
            if old[old_idx] != new[new_idx] {
                result.update_from.push(old_idx);
                result.update_to.push(new_idx);
            }
        }
        result
    }

    /// Replay the plan over `old_keys`, producing the key sequence the
    /// platform list ends up with. Used by tests and the local consumer.
    pub fn apply(&self, old_keys: &[String], new_keys: &[String]) -> Vec<String> {
        let mut dropped = vec![false; old_keys.len()];
        for &idx in self.removals.iter().chain(self.move_from.iter()) {
            if let Some(slot) = dropped.get_mut(idx) {
                *slot = true;
            }
        }
        let mut out: Vec<String> = old_keys
            .iter()
            .zip(&dropped)
            .filter(|(_, dropped)| !**dropped)
            .map(|(key, _)| key.clone())
            .collect();

        let mut arrivals: Vec<usize> = self
            .insertions
            .iter()
            .chain(self.move_to.iter())
            .copied()
            .collect();
        arrivals.sort_unstable();
        for idx in arrivals {
            let at = idx.min(out.len());
            out.insert(at, new_keys[idx].clone());
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit {
    Keep { old: usize, new: usize },
    Delete { old: usize },
    Insert { new: usize },
}

/// Greedy O((N+M)·D) Myers edit script.
fn myers_script(old: &[&str], new: &[&str]) -> Vec<Edit> {
    let n = old.len() as isize;
    let m = new.len() as isize;
    let max = n + m;
    if max == 0 {
        return Vec::new();
    }
    let offset = max;
    let idx = |k: isize| (k + offset) as usize;

    let mut v = vec![0isize; (2 * max + 1) as usize];
    let mut trace: Vec<Vec<isize>> = Vec::new();
    'search: for d in 0..=max {
        trace.push(v.clone());
        let mut k = -d;
        while k <= d {
            let mut x = if k == -d || (k != d && v[idx(k - 1)] < v[idx(k + 1)]) {
                v[idx(k + 1)]
            } else {
                v[idx(k - 1)] + 1
            };
            let mut y = x - k;
            while x < n && y < m && old[x as usize] == new[y as usize] {
                x += 1;
                y += 1;
            }
            v[idx(k)] = x;
            if x >= n && y >= m {
                break 'search;
            }
            k += 2;
        }
    }

    // Backtrack from (n, m) through the recorded frontiers.
    let mut edits = Vec::new();
    let mut x = n;
    let mut y = m;
    for d in (0..trace.len()).rev() {
        let v = &trace[d];
        let d = d as isize;
        let k = x - y;
        let prev_k = if k == -d || (k != d && v[idx(k - 1)] < v[idx(k + 1)]) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = v[idx(prev_k)];
        let prev_y = prev_x - prev_k;
        while x > prev_x && y > prev_y {
            edits.push(Edit::Keep {
                old: (x - 1) as usize,
                new: (y - 1) as usize,
            });
            x -= 1;
            y -= 1;
        }
        if d > 0 {
            if x == prev_x {
                edits.push(Edit::Insert {
                    new: (y - 1) as usize,
                });
            } else {
                edits.push(Edit::Delete {
                    old: (x - 1) as usize,
                });
            }
            x = prev_x;
            y = prev_y;
        }
    }
    edits.reverse();
    edits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infos(keys: &[&str]) -> Vec<ListComponentInfo> {
        keys.iter()
            .map(|k| ListComponentInfo::new("cell", *k))
            .collect()
    }

    fn keys(items: &[ListComponentInfo]) -> Vec<String> {
        items.iter().map(|c| c.item_key.clone()).collect()
    }

    #[test]
    fn identical_sequences_diff_empty() {
        let a = infos(&["a", "b", "c"]);
        let diff = DiffResult::compute(&a, &a);
        assert!(diff.is_empty());
    }

    #[test]
    fn swap_insert_remove_round_trips() {
        let old = infos(&["a", "b", "c", "d"]);
        let new = infos(&["b", "a", "c", "e"]);
        let diff = DiffResult::compute(&old, &new);

        assert_eq!(diff.insertions, vec![3]);
        assert_eq!(diff.removals, vec![3]);
        assert_eq!(diff.move_from.len(), diff.move_to.len());
        assert!(!diff.move_from.is_empty());

        let applied = diff.apply(&keys(&old), &keys(&new));
        assert_eq!(applied, keys(&new));
    }

    #[test]
    fn payload_change_is_an_update_in_place() {
        let old = infos(&["a", "b"]);
        let mut new = infos(&["a", "b"]);
        new[1].estimated_main_axis_size_px = Some(120.0);
        let diff = DiffResult::compute(&old, &new);
        assert_eq!(diff.update_from, vec![1]);
        assert_eq!(diff.update_to, vec![1]);
        assert!(diff.insertions.is_empty() && diff.removals.is_empty());
    }

    #[test]
    fn applying_any_plan_yields_the_new_sequence() {
        let cases: &[(&[&str], &[&str])] = &[
            (&[], &["a"]),
            (&["a"], &[]),
            (&["a", "b", "c"], &["c", "b", "a"]),
            (&["a", "b", "c", "d", "e"], &["b", "d", "f", "a"]),
            (&["x"], &["x", "y", "z"]),
        ];
        for (old, new) in cases {
            let old = infos(old);
            let new = infos(new);
            let diff = DiffResult::compute(&old, &new);
            assert_eq!(diff.apply(&keys(&old), &keys(&new)), keys(&new), "case failed");
        }
    }

    #[test]
    fn serde_uses_camel_case_wire_names() {
        let diff = DiffResult {
            insertions: vec![3],
            update_from: vec![2],
            ..Default::default()
        };
        let json = serde_json::to_string(&diff).expect("serialize diff");
        assert!(json.contains("\"updateFrom\":[2]"));
        assert!(json.contains("\"moveTo\":[]"));
    }
}

//
// Copyright 2025-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Talent selections
//!
//! A [`TalentSelection`] maps tree id → talent id → rank. It is sparse by construction: a rank
//! of zero is never stored and a tree without positive ranks is absent. Selections are
//! snapshots; every edit produces a new value.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Ranks chosen within a single tree.
pub type TreeRanks = BTreeMap<String, u32>;

/// Add up ranks, saturating at `u32::MAX` so hand-edited ranks cannot overflow a total.
pub fn sum_ranks<'r, I: IntoIterator<Item = &'r u32>>(ranks: I) -> u32 {
    ranks.into_iter().fold(0, |total, rank| total.saturating_add(*rank))
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, TreeRanks>")]
pub struct TalentSelection(BTreeMap<String, TreeRanks>);

impl TalentSelection {
    /// Create an empty selection.
    pub fn new() -> TalentSelection {
        Self(BTreeMap::new())
    }

    /// Normalize an untrusted JSON value into a selection.
    ///
    /// Returns `None` when the value is not an object. Trees that are not objects, empty ids,
    /// and ranks that are not finite non-negative numbers are dropped. Fractional ranks are
    /// floored and numeric strings are accepted.
    pub fn from_json(value: &Value) -> Option<TalentSelection> {
        let trees = value.as_object()?;
        let mut selection = BTreeMap::new();

        for (tree_id, tree_value) in trees {
            let Some(talents) = tree_value.as_object() else {
                continue;
            };
            if tree_id.is_empty() {
                continue;
            }

            let ranks: TreeRanks = talents
                .iter()
                .filter(|(talent_id, _)| !talent_id.is_empty())
                .filter_map(|(talent_id, rank)| {
                    json_rank(rank).map(|rank| (talent_id.clone(), rank))
                })
                .filter(|(_, rank)| *rank > 0)
                .collect();

            if !ranks.is_empty() {
                selection.insert(tree_id.clone(), ranks);
            }
        }

        Some(Self(selection))
    }

    /// Rank of a talent, zero when unselected.
    pub fn rank(&self, tree_id: &str, talent_id: &str) -> u32 {
        self.0
            .get(tree_id)
            .and_then(|tree| tree.get(talent_id))
            .copied()
            .unwrap_or(0)
    }

    /// Return this selection with one rank replaced. A zero rank removes the entry.
    pub fn with_rank(mut self, tree_id: &str, talent_id: &str, rank: u32) -> TalentSelection {
        if rank == 0 {
            if let Some(tree) = self.0.get_mut(tree_id) {
                tree.remove(talent_id);
                if tree.is_empty() {
                    self.0.remove(tree_id);
                }
            }
        } else {
            self.0
                .entry(tree_id.to_string())
                .or_default()
                .insert(talent_id.to_string(), rank);
        }
        self
    }

    /// Return this selection with one tree's ranks replaced wholesale.
    pub fn with_tree(mut self, tree_id: &str, ranks: TreeRanks) -> TalentSelection {
        let ranks: TreeRanks = ranks.into_iter().filter(|(_, rank)| *rank > 0).collect();
        if ranks.is_empty() {
            self.0.remove(tree_id);
        } else {
            self.0.insert(tree_id.to_string(), ranks);
        }
        self
    }

    /// Keep only the trees accepted by `keep`.
    pub fn retain_trees<F>(&self, mut keep: F) -> TalentSelection
    where
        F: FnMut(&str) -> bool,
    {
        Self(
            self.0
                .iter()
                .filter(|(tree_id, _)| keep(tree_id))
                .map(|(tree_id, ranks)| (tree_id.clone(), ranks.clone()))
                .collect(),
        )
    }

    /// Ranks chosen in a tree
    pub fn tree(&self, tree_id: &str) -> Option<&TreeRanks> {
        self.0.get(tree_id)
    }

    /// Iterate over non-empty trees in id order
    pub fn trees(&self) -> impl Iterator<Item = (&str, &TreeRanks)> + '_ {
        self.0.iter().map(|(tree_id, ranks)| (tree_id.as_str(), ranks))
    }

    /// Iterate over every selected talent as `(tree id, talent id, rank)`
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, u32)> + '_ {
        self.0.iter().flat_map(|(tree_id, ranks)| {
            ranks
                .iter()
                .map(move |(talent_id, rank)| (tree_id.as_str(), talent_id.as_str(), *rank))
        })
    }

    /// Sum of ranks spent in one tree.
    pub fn tree_points(&self, tree_id: &str) -> u32 {
        self.0
            .get(tree_id)
            .map(|ranks| sum_ranks(ranks.values()))
            .unwrap_or(0)
    }

    /// Sum of ranks spent across all trees.
    pub fn total_points(&self) -> u32 {
        sum_ranks(self.0.values().flat_map(|ranks| ranks.values()))
    }

    /// Whether any points are spent
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of trees with points spent
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<BTreeMap<String, TreeRanks>> for TalentSelection {
    fn from(trees: BTreeMap<String, TreeRanks>) -> Self {
        trees
            .into_iter()
            .fold(TalentSelection::new(), |selection, (tree_id, ranks)| {
                selection.with_tree(&tree_id, ranks)
            })
    }
}

impl<T: AsRef<str>, U: AsRef<str>> FromIterator<(T, U, u32)> for TalentSelection {
    fn from_iter<I: IntoIterator<Item = (T, U, u32)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(TalentSelection::new(), |selection, (tree_id, talent_id, rank)| {
                selection.with_rank(tree_id.as_ref(), talent_id.as_ref(), rank)
            })
    }
}

/// Interpret a JSON rank the way a lenient numeric coercion would.
fn json_rank(value: &Value) -> Option<u32> {
    let number = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !number.is_finite() || number < 0.0 {
        return None;
    }
    let rank = number.floor();
    (rank <= u32::MAX as f64).then_some(rank as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_with_rank_is_sparse() {
        let selection = TalentSelection::new()
            .with_rank("Tree", "A", 2)
            .with_rank("Tree", "B", 1)
            .with_rank("Tree", "A", 0);

        assert_eq!(selection.rank("Tree", "A"), 0);
        assert_eq!(selection.tree_points("Tree"), 1);

        let selection = selection.with_rank("Tree", "B", 0);
        assert!(selection.is_empty());
        assert!(selection.tree("Tree").is_none());
    }

    #[test]
    fn test_from_json_normalizes() {
        let value = json!({
            "Tree": {"A": 2.7, "B": -1, "C": "3", "D": null, "E": 0, "": 4},
            "Empty": {},
            "Broken": [1, 2],
            "": {"X": 1}
        });
        let selection = TalentSelection::from_json(&value).unwrap();

        assert_eq!(selection.len(), 1);
        assert_eq!(selection.rank("Tree", "A"), 2);
        assert_eq!(selection.rank("Tree", "C"), 3);
        assert_eq!(selection.tree("Tree").unwrap().len(), 2);
    }

    #[test]
    fn test_point_totals_saturate() {
        let selection = TalentSelection::new()
            .with_rank("Tree", "A", u32::MAX)
            .with_rank("Tree", "B", u32::MAX)
            .with_rank("Other", "C", 7);

        assert_eq!(selection.tree_points("Tree"), u32::MAX);
        assert_eq!(selection.tree_points("Other"), 7);
        assert_eq!(selection.total_points(), u32::MAX);
        assert_eq!(sum_ranks(&[3, 4]), 7);
    }

    #[test]
    fn test_from_json_rejects_non_objects() {
        assert!(TalentSelection::from_json(&json!([1, 2])).is_none());
        assert!(TalentSelection::from_json(&json!("tree")).is_none());
        assert!(TalentSelection::from_json(&Value::Null).is_none());
    }

    #[test]
    fn test_deserialize_drops_zero_ranks() {
        let selection: TalentSelection =
            serde_json::from_str(r#"{"Tree": {"A": 0}, "Other": {"B": 1}}"#).unwrap();
        assert_eq!(selection.len(), 1);
        assert_eq!(selection.total_points(), 1);
    }

    #[test]
    fn test_equality_ignores_insertion_order() {
        let left: TalentSelection = [("T1", "A", 1), ("T2", "B", 2)].into_iter().collect();
        let right: TalentSelection = [("T2", "B", 2), ("T1", "A", 1)].into_iter().collect();
        assert_eq!(left, right);
    }
}

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

//! # Talent Graph Resolver
//!
//! Trees exported from older data contain relay nodes: talents that are never selectable and
//! exist only to carry prerequisite edges around the layout. The resolver classifies every
//! talent of a tree once, then collapses relay nodes so that each talent's requirement list
//! names only selectable talents.
//!
//! Requirements have OR semantics: a talent is reachable when any one of its effective
//! requirements has a positive rank.

use std::collections::{HashMap, HashSet};
use talentforge_common::catalog::{Talent, Tree};
use talentforge_common::selection::{sum_ranks, TreeRanks};

/// Classification of a talent for selection purposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TalentClass {
    /// A selectable talent with this many ranks.
    Real { ranks: u32 },
    /// A relay node; never selectable.
    HiddenRelay,
}

impl TalentClass {
    pub fn is_hidden(&self) -> bool {
        matches!(self, TalentClass::HiddenRelay)
    }

    /// Maximum rank, zero for relay nodes
    pub fn max_rank(&self) -> u32 {
        match self {
            TalentClass::Real { ranks } => *ranks,
            TalentClass::HiddenRelay => 0,
        }
    }
}

/// Number of ranks a talent offers.
///
/// An explicit non-negative override wins. Otherwise `Reroute` nodes have none, a non-empty
/// reward list gives one rank per tier, a missing reward list gives one rank, and an empty
/// reward list gives none when the node also has no size in legacy layout data.
pub fn effective_rank_count(talent: &Talent) -> i64 {
    if let Some(explicit) = talent.rank_count.filter(|count| *count >= 0) {
        return explicit;
    }
    if talent.is_reroute() {
        return 0;
    }
    match talent.rewards.as_deref() {
        None => 1,
        Some(rewards) if !rewards.is_empty() => rewards.len() as i64,
        Some(_) if talent.has_zero_size() => 0,
        Some(_) => 1,
    }
}

/// Classify a talent as selectable or relay.
pub fn classify(talent: &Talent) -> TalentClass {
    match effective_rank_count(talent) {
        count if count <= 0 => TalentClass::HiddenRelay,
        count => TalentClass::Real {
            ranks: u32::try_from(count).unwrap_or(u32::MAX),
        },
    }
}

pub fn is_hidden(talent: &Talent) -> bool {
    classify(talent).is_hidden()
}

/// Whether enough points are spent in the tree for the talent's rank tier.
pub fn meets_rank_gate(talent: &Talent, tree_points: u32) -> bool {
    talent
        .required_rank
        .is_none_or(|tier| tree_points >= tier.threshold())
}

/// A selectable requirement reached through zero or more relay nodes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EffectiveRequirement {
    pub talent_id: String,
    /// Relay nodes traversed to reach this requirement, outermost first.
    pub via: Vec<String>,
}

enum Step<'a> {
    Enter { id: &'a str, via: Vec<String> },
    Leave(&'a str),
}

/// Per-tree classification and effective requirement sets.
#[derive(Debug)]
pub struct TalentGraphResolver<'a> {
    tree: &'a Tree,
    talents: HashMap<&'a str, (&'a Talent, TalentClass)>,
    requirements: HashMap<&'a str, Vec<EffectiveRequirement>>,
}

impl<'a> TalentGraphResolver<'a> {
    /// Classify every talent in a tree and expand all requirement lists.
    pub fn new(tree: &'a Tree) -> TalentGraphResolver<'a> {
        let talents: HashMap<&str, (&Talent, TalentClass)> = tree
            .talents
            .iter()
            .map(|talent| (talent.id.as_str(), (talent, classify(talent))))
            .collect();

        let mut resolver = Self {
            tree,
            talents,
            requirements: HashMap::new(),
        };
        let requirements: HashMap<&str, Vec<EffectiveRequirement>> = tree
            .talents
            .iter()
            .map(|talent| (talent.id.as_str(), resolver.resolve(talent)))
            .collect();
        resolver.requirements = requirements;
        resolver
    }

    pub fn tree(&self) -> &'a Tree {
        self.tree
    }

    /// Get a talent of this tree by id
    pub fn talent(&self, talent_id: &str) -> Option<&'a Talent> {
        self.talents.get(talent_id).map(|(talent, _)| *talent)
    }

    /// Classification of a talent, `None` if the tree has no such talent
    pub fn class_of(&self, talent_id: &str) -> Option<TalentClass> {
        self.talents.get(talent_id).map(|(_, class)| *class)
    }

    /// Effective requirements of a talent. Empty for unknown talents.
    pub fn effective_requirements(&self, talent_id: &str) -> &[EffectiveRequirement] {
        self.requirements
            .get(talent_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Ids of the effective requirements of a talent
    pub fn required_ids(&self, talent_id: &str) -> impl Iterator<Item = &str> + '_ {
        self.effective_requirements(talent_id)
            .iter()
            .map(|requirement| requirement.talent_id.as_str())
    }

    /// Whether any effective requirement has a positive rank. Talents without requirements
    /// always pass.
    pub fn meets_prerequisites(&self, talent_id: &str, ranks: &TreeRanks) -> bool {
        let requirements = self.effective_requirements(talent_id);
        requirements.is_empty()
            || requirements
                .iter()
                .any(|requirement| ranks.get(&requirement.talent_id).is_some_and(|rank| *rank > 0))
    }

    /// Whether a talent's prerequisite and rank gates both pass.
    pub fn is_unlocked(&self, talent: &Talent, ranks: &TreeRanks) -> bool {
        let tree_points = sum_ranks(ranks.values());
        meets_rank_gate(talent, tree_points) && self.meets_prerequisites(&talent.id, ranks)
    }

    /// Count selected, selectable talents whose gates are unmet.
    pub fn count_unmet(&self, ranks: &TreeRanks) -> usize {
        ranks
            .iter()
            .filter(|(_, rank)| **rank > 0)
            .filter_map(|(talent_id, _)| self.talents.get(talent_id.as_str()))
            .filter(|(_, class)| !class.is_hidden())
            .filter(|(talent, _)| !self.is_unlocked(talent, ranks))
            .count()
    }

    /// Talent a creature tree starts with.
    ///
    /// Among selectable talents with no listed requirements, prefer one that is unlocked by
    /// default and has exactly one reward tier, then the first such talent, then the first
    /// selectable talent.
    pub fn origin_talent(&self) -> Option<&'a Talent> {
        let selectable: Vec<&Talent> = self
            .tree
            .talents
            .iter()
            .filter(|talent| !self.is_hidden(&talent.id))
            .collect();
        let roots: Vec<&Talent> = selectable
            .iter()
            .copied()
            .filter(|talent| talent.required_talents.is_empty())
            .collect();

        roots
            .iter()
            .find(|talent| {
                talent.default_unlocked && talent.rewards.as_ref().is_none_or(|r| r.len() == 1)
            })
            .or_else(|| roots.first())
            .or_else(|| selectable.first())
            .copied()
    }

    fn is_hidden(&self, talent_id: &str) -> bool {
        self.class_of(talent_id).is_some_and(|class| class.is_hidden())
    }

    /// Expand one talent's requirement list, deduplicated in first-seen order.
    fn resolve(&self, talent: &'a Talent) -> Vec<EffectiveRequirement> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::new();

        for required_id in &talent.required_talents {
            for requirement in self.expand(required_id) {
                if seen.insert(requirement.talent_id.clone()) {
                    resolved.push(requirement);
                }
            }
        }
        resolved
    }

    /// Depth-first expansion of one requirement through relay nodes.
    ///
    /// A relay node already on the current path contributes nothing, which breaks cycles.
    /// Requirements naming talents outside the tree are kept as-is.
    fn expand(&self, required_id: &'a str) -> Vec<EffectiveRequirement> {
        let mut expanded = Vec::new();
        let mut visiting: HashSet<&str> = HashSet::new();
        let mut stack = vec![Step::Enter {
            id: required_id,
            via: Vec::new(),
        }];

        while let Some(step) = stack.pop() {
            let (id, via) = match step {
                Step::Leave(id) => {
                    visiting.remove(id);
                    continue;
                }
                Step::Enter { id, via } => (id, via),
            };
            if id.is_empty() || visiting.contains(id) {
                continue;
            }

            let Some(&(talent, class)) = self.talents.get(id) else {
                expanded.push(EffectiveRequirement {
                    talent_id: id.to_string(),
                    via,
                });
                continue;
            };
            if !class.is_hidden() {
                expanded.push(EffectiveRequirement {
                    talent_id: id.to_string(),
                    via,
                });
                continue;
            }

            visiting.insert(id);
            stack.push(Step::Leave(id));
            let mut chain = via;
            chain.push(id.to_string());
            for nested in talent.required_talents.iter().rev() {
                stack.push(Step::Enter {
                    id: nested.as_str(),
                    via: chain.clone(),
                });
            }
        }

        expanded
    }
}

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

//! # Point Pools
//!
//! Player builds spend from two budgets. Trees of the `Solo` archetype draw from the solo pool,
//! every other player tree draws from the main pool. Creature trees each carry their own
//! absolute cap instead.
//!
//! | Pool      | Cap                                   |
//! |-----------|---------------------------------------|
//! | Main      | 90 + sum of selected modifier bonuses |
//! | Solo      | 30                                    |
//! | Mount     | 50 per tree                           |
//! | Pet       | 25 per tree                           |
//!
//! ## Minimum Level
//! Odd levels grant one main point, even levels grant two main points and one solo point. The
//! minimum level of a build is the first level whose earned points cover what the build spends,
//! after modifier bonuses are taken off the main total.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use talentforge_common::TalentSelection;
use talentforge_common::selection::sum_ranks;
use talentforge_common::catalog::{Model, ModelId, TalentCatalog, Tree};

/// Trees whose talent naming would classify them as combat pets although they are livestock.
const REGULAR_PET_TREE_OVERRIDES: &[&str] = &["Creature_Bull", "Creature_Pig"];
const COMBAT_PET_TALENT_PREFIX: &str = "CombatPet_";
const REGULAR_PET_TALENT_PREFIX: &str = "NonCombatPet_";

/// Caps and progression constants, overridable from configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointRules {
    pub main_base_cap: u32,
    pub solo_cap: u32,
    pub mount_cap: u32,
    pub pet_cap: u32,
    pub max_level: u32,
}

impl Default for PointRules {
    fn default() -> Self {
        Self {
            main_base_cap: 90,
            solo_cap: 30,
            mount_cap: 50,
            pet_cap: 25,
            max_level: 60,
        }
    }
}

/// Creature tree classification, inferred from talent naming.
#[derive(Clone, Copy, Debug, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum CreatureCategory {
    Mount,
    CombatPet,
    RegularPet,
}

impl CreatureCategory {
    /// Classify a creature tree
    pub fn of_tree(tree: &Tree) -> CreatureCategory {
        if REGULAR_PET_TREE_OVERRIDES.contains(&tree.id.as_str()) {
            return CreatureCategory::RegularPet;
        }
        let has_prefix = |prefix: &str| tree.talents.iter().any(|t| t.id.starts_with(prefix));
        if has_prefix(REGULAR_PET_TALENT_PREFIX) {
            CreatureCategory::RegularPet
        } else if has_prefix(COMBAT_PET_TALENT_PREFIX) {
            CreatureCategory::CombatPet
        } else {
            CreatureCategory::Mount
        }
    }

    /// Absolute point cap of a tree in this category
    pub fn cap(&self, rules: &PointRules) -> u32 {
        match self {
            CreatureCategory::Mount => rules.mount_cap,
            CreatureCategory::CombatPet | CreatureCategory::RegularPet => rules.pet_cap,
        }
    }
}

/// Budget a tree's ranks are charged against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pool {
    Main,
    Solo,
    Creature { category: CreatureCategory, cap: u32 },
}

/// Points spent per player pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsSummary {
    pub main_points: u32,
    pub solo_points: u32,
}

/// Resolves pools and caps for one model and one set of selected modifiers.
#[derive(Clone, Debug)]
pub struct PointBudget {
    model_id: ModelId,
    rules: PointRules,
    main_cap: u32,
    solo_trees: HashSet<String>,
    creature_pools: BTreeMap<String, Pool>,
}

impl PointBudget {
    pub fn new(
        catalog: &TalentCatalog,
        model_id: ModelId,
        model: &Model,
        modifier_ids: &[String],
        rules: &PointRules,
    ) -> PointBudget {
        let bonus = modifier_bonus(catalog, modifier_ids);
        let main_cap = (i64::from(rules.main_base_cap) + bonus).clamp(0, i64::from(u32::MAX)) as u32;

        let solo_trees = model
            .archetypes
            .iter()
            .filter(|archetype| archetype.is_solo())
            .flat_map(|archetype| archetype.tree_ids().map(str::to_string))
            .collect();

        let creature_pools = match model_id {
            ModelId::Player => BTreeMap::new(),
            ModelId::Creature => model
                .trees()
                .map(|tree| {
                    let category = CreatureCategory::of_tree(tree);
                    let pool = Pool::Creature {
                        category,
                        cap: category.cap(rules),
                    };
                    (tree.id.clone(), pool)
                })
                .collect(),
        };

        Self {
            model_id,
            rules: rules.clone(),
            main_cap,
            solo_trees,
            creature_pools,
        }
    }

    /// Main pool cap including modifier bonuses
    pub fn main_cap(&self) -> u32 {
        self.main_cap
    }

    pub fn solo_cap(&self) -> u32 {
        self.rules.solo_cap
    }

    pub fn rules(&self) -> &PointRules {
        &self.rules
    }

    /// Pool a tree is charged against. Creature trees missing from the catalog have no pool.
    pub fn pool_of(&self, tree_id: &str) -> Option<Pool> {
        match self.model_id {
            ModelId::Creature => self.creature_pools.get(tree_id).copied(),
            ModelId::Player if self.solo_trees.contains(tree_id) => Some(Pool::Solo),
            ModelId::Player => Some(Pool::Main),
        }
    }

    /// Split spent points into main and solo totals.
    pub fn summarize(&self, selection: &TalentSelection) -> PointsSummary {
        selection
            .trees()
            .fold(PointsSummary::default(), |mut summary, (tree_id, ranks)| {
                let points = sum_ranks(ranks.values());
                if self.solo_trees.contains(tree_id) {
                    summary.solo_points = summary.solo_points.saturating_add(points);
                } else {
                    summary.main_points = summary.main_points.saturating_add(points);
                }
                summary
            })
    }

    /// Whether the pool charged for `tree_id` is over its cap in `selection`.
    pub fn exceeds_cap(&self, selection: &TalentSelection, tree_id: &str) -> bool {
        match self.pool_of(tree_id) {
            Some(Pool::Creature { cap, .. }) => selection.tree_points(tree_id) > cap,
            Some(Pool::Solo) => self.summarize(selection).solo_points > self.rules.solo_cap,
            Some(Pool::Main) => self.summarize(selection).main_points > self.main_cap,
            None => false,
        }
    }

    /// Whether any pool or creature tree is over its cap.
    pub fn is_overcap(&self, selection: &TalentSelection) -> bool {
        match self.model_id {
            ModelId::Creature => selection
                .trees()
                .any(|(tree_id, _)| self.exceeds_cap(selection, tree_id)),
            ModelId::Player => {
                let summary = self.summarize(selection);
                summary.main_points > self.main_cap || summary.solo_points > self.rules.solo_cap
            }
        }
    }

    /// Lowest character level able to afford the build, capped at the maximum level.
    pub fn minimum_level(&self, selection: &TalentSelection) -> u32 {
        let summary = self.summarize(selection);
        let bonus = self.main_cap.saturating_sub(self.rules.main_base_cap);
        let main_needed = summary.main_points.saturating_sub(bonus);

        let mut earned_main = 0;
        let mut earned_solo = 0;
        for level in 1..=self.rules.max_level {
            if level % 2 == 1 {
                earned_main += 1;
            } else {
                earned_main += 2;
                earned_solo += 1;
            }
            if earned_main >= main_needed && earned_solo >= summary.solo_points {
                return level;
            }
        }
        self.rules.max_level
    }
}

/// Deduplicate modifier ids in first-seen order, dropping ids the catalog does not list.
///
/// When the catalog lists no modifiers at all every non-empty id is kept.
pub fn normalize_modifier_ids<I, S>(catalog: &TalentCatalog, modifier_ids: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    modifier_ids
        .into_iter()
        .filter_map(|id| {
            let id = id.as_ref();
            let allowed = catalog.player_talent_modifiers.is_empty() || catalog.modifier(id).is_some();
            (!id.is_empty() && allowed && seen.insert(id.to_string())).then(|| id.to_string())
        })
        .collect()
}

/// Total main pool bonus granted by the selected modifiers.
pub fn modifier_bonus(catalog: &TalentCatalog, modifier_ids: &[String]) -> i64 {
    normalize_modifier_ids(catalog, modifier_ids)
        .iter()
        .filter_map(|id| catalog.modifier(id))
        .map(|modifier| modifier.talent_point_modifier)
        .sum()
}

/// Aggregated value of one stat across every selected talent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectTotal {
    pub modifier_id: String,
    pub total: f64,
    pub occurrences: u32,
    /// Talents contributing to this stat, sorted by id
    pub talent_ids: Vec<String>,
}

/// Sum the effects of each selected talent's current reward tier, keyed by stat id.
///
/// `include_tree` limits which trees contribute (e.g. the selected creature archetype, or
/// excluding solo trees).
pub fn effect_summary<F>(model: &Model, selection: &TalentSelection, mut include_tree: F) -> Vec<EffectTotal>
where
    F: FnMut(&str) -> bool,
{
    let mut totals: BTreeMap<String, EffectTotal> = BTreeMap::new();

    for (tree_id, talent_id, rank) in selection.iter() {
        if !include_tree(tree_id) {
            continue;
        }
        let Some(talent) = model.tree(tree_id).and_then(|tree| tree.talent(talent_id)) else {
            continue;
        };
        let Some(rewards) = talent.rewards.as_deref().filter(|rewards| !rewards.is_empty()) else {
            continue;
        };
        let tier = (rank as usize).min(rewards.len()) - 1;

        for effect in &rewards[tier].effects {
            let modifier_id = effect.modifier_id();
            if modifier_id.is_empty() {
                continue;
            }
            let entry = totals
                .entry(modifier_id.to_string())
                .or_insert_with(|| EffectTotal {
                    modifier_id: modifier_id.to_string(),
                    total: 0.0,
                    occurrences: 0,
                    talent_ids: Vec::new(),
                });
            entry.total += effect.value;
            entry.occurrences += 1;
            if !entry.talent_ids.iter().any(|id| id == talent_id) {
                entry.talent_ids.push(talent_id.to_string());
            }
        }
    }

    totals
        .into_values()
        .map(|mut total| {
            total.talent_ids.sort();
            total
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_player_pools() {
        let catalog = player_catalog();
        let model = catalog.model(ModelId::Player).unwrap();
        let budget = PointBudget::new(&catalog, ModelId::Player, model, &[], &PointRules::default());

        let selection = TalentSelection::new()
            .with_rank(CHAIN_TREE, "A", 1)
            .with_rank(SOLO_TREE, "Solo_A", 2);
        let summary = budget.summarize(&selection);

        assert_eq!(summary, PointsSummary { main_points: 1, solo_points: 2 });
        assert_eq!(budget.pool_of(SOLO_TREE), Some(Pool::Solo));
        assert_eq!(budget.pool_of(CHAIN_TREE), Some(Pool::Main));
        assert_eq!(budget.main_cap(), 90);
        assert!(!budget.is_overcap(&selection));
    }

    #[test]
    fn test_modifier_bonus_raises_main_cap() {
        let catalog = player_catalog();
        let model = catalog.model(ModelId::Player).unwrap();
        let modifiers = vec![
            BONUS_MODIFIER.to_string(),
            BONUS_MODIFIER.to_string(),
            "Unknown".to_string(),
        ];
        let budget = PointBudget::new(&catalog, ModelId::Player, model, &modifiers, &PointRules::default());
        assert_eq!(budget.main_cap(), 100);
    }

    #[test]
    fn test_normalize_modifier_ids() {
        let catalog = player_catalog();
        let ids = normalize_modifier_ids(&catalog, ["", BONUS_MODIFIER, "Unknown", BONUS_MODIFIER]);
        assert_eq!(ids, vec![BONUS_MODIFIER.to_string()]);

        let open = TalentCatalog::default();
        assert_eq!(normalize_modifier_ids(&open, ["B", "A", "B"]), vec!["B", "A"]);
    }

    #[test]
    fn test_creature_categories() {
        let catalog = creature_catalog();
        let model = catalog.model(ModelId::Creature).unwrap();
        let budget = PointBudget::new(&catalog, ModelId::Creature, model, &[], &PointRules::default());

        assert!(matches!(
            budget.pool_of(WOLF_TREE),
            Some(Pool::Creature { category: CreatureCategory::CombatPet, cap: 25 })
        ));
        assert!(matches!(
            budget.pool_of(HORSE_TREE),
            Some(Pool::Creature { category: CreatureCategory::Mount, cap: 50 })
        ));
        assert_eq!(budget.pool_of("Creature_Missing"), None);

        let bull = Tree::new("Creature_Bull")
            .with_talent(talentforge_common::catalog::Talent::new("CombatPet_Charge"));
        assert_eq!(CreatureCategory::of_tree(&bull), CreatureCategory::RegularPet);
    }

    #[test]
    fn test_creature_overcap() {
        let catalog = creature_catalog();
        let model = catalog.model(ModelId::Creature).unwrap();
        let budget = PointBudget::new(&catalog, ModelId::Creature, model, &[], &PointRules::default());

        let selection = TalentSelection::new().with_rank(WOLF_TREE, "CombatPet_Bite", 26);
        assert!(budget.is_overcap(&selection));
        let selection = TalentSelection::new().with_rank(HORSE_TREE, "Horse_Gallop", 26);
        assert!(!budget.is_overcap(&selection));
    }

    #[test]
    fn test_minimum_level() {
        let catalog = player_catalog();
        let model = catalog.model(ModelId::Player).unwrap();
        let budget = PointBudget::new(&catalog, ModelId::Player, model, &[], &PointRules::default());

        assert_eq!(budget.minimum_level(&TalentSelection::new()), 1);
        // Level 1: 1 point, level 2: 3 points, level 3: 4 points.
        let main = TalentSelection::new().with_rank(CHAIN_TREE, "Multi", 3);
        assert_eq!(budget.minimum_level(&main), 2);
        let solo = TalentSelection::new().with_rank(SOLO_TREE, "Solo_A", 2);
        assert_eq!(budget.minimum_level(&solo), 4);
    }

    #[test]
    fn test_minimum_level_subtracts_bonus() {
        let catalog = player_catalog();
        let model = catalog.model(ModelId::Player).unwrap();
        let modifiers = vec![BONUS_MODIFIER.to_string()];
        let budget = PointBudget::new(&catalog, ModelId::Player, model, &modifiers, &PointRules::default());

        let selection = TalentSelection::new().with_rank(CHAIN_TREE, "Multi", 3);
        assert_eq!(budget.minimum_level(&selection), 1);
    }

    #[test]
    fn test_effect_summary() {
        let catalog = player_catalog();
        let model = catalog.model(ModelId::Player).unwrap();
        let selection = TalentSelection::new()
            .with_rank(CHAIN_TREE, "Multi", 2)
            .with_rank(CHAIN_TREE, "A", 1);

        let effects = effect_summary(model, &selection, |_| true);
        assert_eq!(effects.len(), 1);
        assert_eq!(effects[0].modifier_id, "BaseStamina");
        assert_eq!(effects[0].total, 6.0);
        assert_eq!(effects[0].occurrences, 2);
        assert_eq!(effects[0].talent_ids, vec!["A".to_string(), "Multi".to_string()]);

        assert!(effect_summary(model, &selection, |tree| tree != CHAIN_TREE).is_empty());
    }
}

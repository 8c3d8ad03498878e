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

//! # Selection State
//!
//! Owns the current [`TalentSelection`] snapshot for one model and replaces it wholesale on every
//! accepted edit. Rejected edits leave the previous `Arc` in place, so callers holding the old
//! snapshot can compare by pointer.
//!
//! ## Rank Changes
//! - Raising a talent from zero requires its rank gate and prerequisites to be met. Raising an
//!   already started talent does not re-check them.
//! - Raising never pushes the charged pool over its cap. A loaded selection may already be over
//!   cap, in which case decreases still apply.
//! - Lowering a talent cascades through its tree until every remaining talent is reachable again.
//! - Creature trees pin their origin talent at rank 1 or more.

use crate::points::{effect_summary, normalize_modifier_ids, EffectTotal, PointBudget, PointRules, PointsSummary};
use crate::resolver::{meets_rank_gate, TalentGraphResolver};
use std::collections::HashMap;
use std::sync::Arc;
use talentforge_common::catalog::{Model, ModelId, TalentCatalog, Tree};
use talentforge_common::selection::{sum_ranks, TreeRanks};
use talentforge_common::TalentSelection;
use thiserror::Error;
use tracing::debug;

/// Errors raised while setting up a selection state.
#[derive(Debug, Error)]
pub enum SelectionError {
    /// The catalog carries no such model.
    #[error("Model not found in catalog: {0}")]
    ModelNotFound(ModelId),
}

/// Reasons a rank change was refused. The selection is left untouched in every case.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RankRejection {
    #[error("Talent not found: {tree_id}/{talent_id}")]
    UnknownTalent { tree_id: String, talent_id: String },

    #[error("Talent {0} is a relay node and cannot be selected")]
    Hidden(String),

    #[error("Rank {rank} exceeds the {max} ranks of {talent_id}")]
    RankOutOfRange { talent_id: String, rank: u32, max: u32 },

    #[error("Talent {0} is locked by its rank tier or prerequisites")]
    GateUnmet(String),

    #[error("Point cap exceeded by tree {0}")]
    CapExceeded(String),

    #[error("Origin talent {0} cannot drop below rank 1")]
    PinnedOrigin(String),
}

/// Outcome of [`SelectionState::set_rank`].
#[derive(Clone, Debug, PartialEq)]
pub enum RankChange {
    /// A new snapshot replaced the previous one.
    Applied(Arc<TalentSelection>),
    /// The requested rank is already set.
    Unchanged,
    Rejected(RankRejection),
}

impl RankChange {
    pub fn is_applied(&self) -> bool {
        matches!(self, RankChange::Applied(_))
    }
}

/// Zero out talents of one tree that are no longer reachable, repeating until a pass changes
/// nothing.
///
/// Tree points are taken once per pass while prerequisites see removals made earlier in the
/// same pass. Talents the tree does not know are kept. The origin talent, if any, is never
/// removed.
pub fn cascade(resolver: &TalentGraphResolver<'_>, mut ranks: TreeRanks, origin: Option<&str>) -> TreeRanks {
    let mut pass = 0;
    loop {
        pass += 1;
        let tree_points = sum_ranks(ranks.values());
        let candidates: Vec<String> = ranks
            .iter()
            .filter(|(talent_id, rank)| **rank > 0 && origin != Some(talent_id.as_str()))
            .map(|(talent_id, _)| talent_id.clone())
            .collect();

        let mut changed = false;
        for talent_id in candidates {
            let Some(talent) = resolver.talent(&talent_id) else {
                continue;
            };
            let hidden = resolver.class_of(&talent_id).is_some_and(|class| class.is_hidden());
            let reachable = !hidden
                && meets_rank_gate(talent, tree_points)
                && resolver.meets_prerequisites(&talent_id, &ranks);
            if !reachable {
                debug!(tree = %resolver.tree().id, talent = %talent_id, pass, "Cascade removed talent");
                ranks.remove(&talent_id);
                changed = true;
            }
        }

        if !changed {
            return ranks;
        }
    }
}

/// Restrict a creature selection to one archetype's trees and seed each tree's origin talent.
///
/// Unknown archetypes yield an empty selection. Selections of other models are returned as-is.
pub fn scope_to_archetype(model: &Model, selection: &TalentSelection, archetype_id: &str) -> TalentSelection {
    if model.id != ModelId::Creature.as_str() {
        return selection.clone();
    }
    let Some(archetype) = model.archetype(archetype_id) else {
        return TalentSelection::new();
    };

    let scoped = selection.retain_trees(|tree_id| archetype.tree_ids().any(|id| id == tree_id));
    archetype.trees.iter().fold(scoped, |scoped, tree| {
        match TalentGraphResolver::new(tree).origin_talent() {
            Some(origin) if scoped.rank(&tree.id, &origin.id) == 0 => {
                scoped.with_rank(&tree.id, &origin.id, 1)
            }
            _ => scoped,
        }
    })
}

/// Count selected talents whose rank gate or prerequisites are unmet. Unknown trees and talents
/// are not counted.
pub fn count_unmet(model: &Model, selection: &TalentSelection) -> usize {
    selection
        .trees()
        .filter_map(|(tree_id, ranks)| model.tree(tree_id).map(|tree| (tree, ranks)))
        .map(|(tree, ranks)| TalentGraphResolver::new(tree).count_unmet(ranks))
        .sum()
}

/// The active selection for one model, with caps and cascade rules applied on every edit.
#[derive(Debug)]
pub struct SelectionState<'a> {
    catalog: &'a TalentCatalog,
    model_id: ModelId,
    model: &'a Model,
    archetype_id: String,
    modifier_ids: Vec<String>,
    rules: PointRules,
    budget: PointBudget,
    resolvers: HashMap<&'a str, TalentGraphResolver<'a>>,
    origins: HashMap<&'a str, &'a str>,
    selection: Arc<TalentSelection>,
}

impl<'a> SelectionState<'a> {
    /// Create an empty selection for a model.
    ///
    /// Creature states fall back to the first archetype when `archetype_id` is unknown and start
    /// with every origin talent seeded.
    pub fn new(
        catalog: &'a TalentCatalog,
        model_id: ModelId,
        archetype_id: &str,
        modifier_ids: &[String],
        rules: &PointRules,
    ) -> Result<SelectionState<'a>, SelectionError> {
        let model = catalog
            .model(model_id)
            .ok_or(SelectionError::ModelNotFound(model_id))?;

        let modifier_ids = match model_id {
            ModelId::Player => normalize_modifier_ids(catalog, modifier_ids),
            ModelId::Creature => Vec::new(),
        };
        let budget = PointBudget::new(catalog, model_id, model, &modifier_ids, rules);

        let resolvers: HashMap<&str, TalentGraphResolver> = model
            .trees()
            .map(|tree| (tree.id.as_str(), TalentGraphResolver::new(tree)))
            .collect();
        let origins = match model_id {
            ModelId::Player => HashMap::new(),
            ModelId::Creature => resolvers
                .iter()
                .filter_map(|(tree_id, resolver)| {
                    resolver.origin_talent().map(|talent| (*tree_id, talent.id.as_str()))
                })
                .collect(),
        };

        let mut state = Self {
            catalog,
            model_id,
            model,
            archetype_id: String::new(),
            modifier_ids,
            rules: rules.clone(),
            budget,
            resolvers,
            origins,
            selection: Arc::new(TalentSelection::new()),
        };
        state.select_archetype(archetype_id);
        Ok(state)
    }

    /// Replace the selection with a loaded one. Creature selections are scoped to the current
    /// archetype. No caps or gates are enforced.
    pub fn with_selection(mut self, selection: TalentSelection) -> SelectionState<'a> {
        self.selection = Arc::new(self.scoped(&selection));
        self
    }

    pub fn selection(&self) -> &Arc<TalentSelection> {
        &self.selection
    }

    pub fn model_id(&self) -> ModelId {
        self.model_id
    }

    pub fn model(&self) -> &'a Model {
        self.model
    }

    pub fn archetype_id(&self) -> &str {
        &self.archetype_id
    }

    /// Normalized modifier ids, always empty for creature states
    pub fn modifier_ids(&self) -> &[String] {
        &self.modifier_ids
    }

    pub fn budget(&self) -> &PointBudget {
        &self.budget
    }

    /// Resolver for a tree of this model
    pub fn resolver(&self, tree_id: &str) -> Option<&TalentGraphResolver<'a>> {
        self.resolvers.get(tree_id)
    }

    /// Pinned origin talent of a creature tree
    pub fn origin_talent(&self, tree_id: &str) -> Option<&'a str> {
        self.origins.get(tree_id).copied()
    }

    /// Switch archetype. Creature states fall back to the first archetype and rescope the
    /// selection.
    pub fn select_archetype(&mut self, archetype_id: &str) {
        match self.model_id {
            ModelId::Player => self.archetype_id = archetype_id.to_string(),
            ModelId::Creature => {
                self.archetype_id = self
                    .model
                    .archetype(archetype_id)
                    .or_else(|| self.model.first_archetype())
                    .map(|archetype| archetype.id.clone())
                    .unwrap_or_default();
                self.selection = Arc::new(self.scoped(&self.selection));
            }
        }
    }

    /// Select or deselect a player talent point modifier, recomputing the main pool cap.
    pub fn toggle_modifier(&mut self, modifier_id: &str) {
        if self.model_id != ModelId::Player || modifier_id.is_empty() {
            return;
        }
        let mut modifier_ids = self.modifier_ids.clone();
        match modifier_ids.iter().position(|id| id == modifier_id) {
            Some(index) => {
                modifier_ids.remove(index);
            }
            None => modifier_ids.push(modifier_id.to_string()),
        }
        self.set_modifiers(&modifier_ids);
    }

    pub fn set_modifiers(&mut self, modifier_ids: &[String]) {
        if self.model_id != ModelId::Player {
            return;
        }
        self.modifier_ids = normalize_modifier_ids(self.catalog, modifier_ids);
        self.budget = PointBudget::new(self.catalog, self.model_id, self.model, &self.modifier_ids, &self.rules);
    }

    /// Request a new rank for one talent.
    ///
    /// Applied changes replace the held snapshot. Every other outcome keeps the previous one.
    pub fn set_rank(&mut self, tree_id: &str, talent_id: &str, new_rank: u32) -> RankChange {
        let current = self.selection.rank(tree_id, talent_id);
        if new_rank == current {
            return RankChange::Unchanged;
        }

        let unknown = || {
            RankChange::Rejected(RankRejection::UnknownTalent {
                tree_id: tree_id.to_string(),
                talent_id: talent_id.to_string(),
            })
        };
        // Creature edits stay inside the current archetype's trees.
        if self.model_id == ModelId::Creature
            && self.model.archetype_of_tree(tree_id) != Some(self.archetype_id.as_str())
        {
            return unknown();
        }
        let Some(resolver) = self.resolvers.get(tree_id) else {
            return unknown();
        };
        let (Some(talent), Some(class)) = (resolver.talent(talent_id), resolver.class_of(talent_id)) else {
            return unknown();
        };
        let origin = self.origins.get(tree_id).copied();

        let next = if new_rank < current {
            if origin == Some(talent_id) && new_rank < 1 {
                return RankChange::Rejected(RankRejection::PinnedOrigin(talent_id.to_string()));
            }
            let lowered = (*self.selection).clone().with_rank(tree_id, talent_id, new_rank);
            let ranks = lowered.tree(tree_id).cloned().unwrap_or_default();
            let ranks = cascade(resolver, ranks, origin);
            lowered.with_tree(tree_id, ranks)
        } else {
            if class.is_hidden() {
                return RankChange::Rejected(RankRejection::Hidden(talent_id.to_string()));
            }
            if new_rank > class.max_rank() {
                return RankChange::Rejected(RankRejection::RankOutOfRange {
                    talent_id: talent_id.to_string(),
                    rank: new_rank,
                    max: class.max_rank(),
                });
            }
            if current == 0 {
                let ranks = self.selection.tree(tree_id).cloned().unwrap_or_default();
                if !resolver.is_unlocked(talent, &ranks) {
                    debug!(tree = tree_id, talent = talent_id, "Rejected locked talent");
                    return RankChange::Rejected(RankRejection::GateUnmet(talent_id.to_string()));
                }
            }
            let raised = (*self.selection).clone().with_rank(tree_id, talent_id, new_rank);
            if self.budget.exceeds_cap(&raised, tree_id) {
                debug!(tree = tree_id, talent = talent_id, rank = new_rank, "Rejected rank over cap");
                return RankChange::Rejected(RankRejection::CapExceeded(tree_id.to_string()));
            }
            raised
        };

        self.selection = Arc::new(next);
        RankChange::Applied(Arc::clone(&self.selection))
    }

    /// Sum of ranks spent in one tree
    pub fn tree_points(&self, tree_id: &str) -> u32 {
        self.selection.tree_points(tree_id)
    }

    pub fn summarize(&self) -> PointsSummary {
        self.budget.summarize(&self.selection)
    }

    /// Whether the held selection exceeds any cap
    pub fn is_overcap(&self) -> bool {
        self.budget.is_overcap(&self.selection)
    }

    pub fn minimum_level(&self) -> u32 {
        self.budget.minimum_level(&self.selection)
    }

    /// Count talents of `selection` whose gates are unmet under this model.
    pub fn count_unmet(&self, selection: &TalentSelection) -> usize {
        selection
            .trees()
            .filter_map(|(tree_id, ranks)| self.resolvers.get(tree_id).map(|resolver| (resolver, ranks)))
            .map(|(resolver, ranks)| resolver.count_unmet(ranks))
            .sum()
    }

    /// Aggregated stat totals. Creature states only count the current archetype; player states
    /// count solo trees only when asked.
    pub fn effect_summary(&self, include_solo: bool) -> Vec<EffectTotal> {
        match self.model_id {
            ModelId::Creature => {
                let archetype = self.model.archetype(&self.archetype_id);
                effect_summary(self.model, &self.selection, |tree_id| {
                    archetype.is_some_and(|archetype| archetype.tree_ids().any(|id| id == tree_id))
                })
            }
            ModelId::Player => effect_summary(self.model, &self.selection, |tree_id| {
                include_solo || !self.is_solo_tree(tree_id)
            }),
        }
    }

    /// Whether the build holds anything worth keeping.
    ///
    /// Player builds count if they spend points or select modifiers. Creature builds count if
    /// they differ from the seeded baseline of their archetype.
    pub fn has_meaningful_state(&self) -> bool {
        match self.model_id {
            ModelId::Player => !self.selection.is_empty() || !self.modifier_ids.is_empty(),
            ModelId::Creature => *self.selection != self.scoped(&TalentSelection::new()),
        }
    }

    /// Drop every spent point. Creature trees keep their seeded origins.
    pub fn reset(&mut self) {
        self.selection = Arc::new(self.scoped(&TalentSelection::new()));
    }

    /// Scope a selection to the current creature archetype.
    pub fn scoped(&self, selection: &TalentSelection) -> TalentSelection {
        scope_to_archetype(self.model, selection, &self.archetype_id)
    }

    fn is_solo_tree(&self, tree_id: &str) -> bool {
        self.model
            .archetype_of_tree(tree_id)
            .and_then(|archetype_id| self.model.archetype(archetype_id))
            .is_some_and(|archetype| archetype.is_solo())
    }

    /// Every tree of this model
    pub fn trees(&self) -> impl Iterator<Item = &'a Tree> + 'a {
        self.model.trees()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    fn player_state(catalog: &TalentCatalog) -> SelectionState<'_> {
        SelectionState::new(catalog, ModelId::Player, "Survival", &[], &PointRules::default()).unwrap()
    }

    fn apply(state: &mut SelectionState<'_>, tree_id: &str, talent_id: &str, rank: u32) {
        let change = state.set_rank(tree_id, talent_id, rank);
        assert!(change.is_applied(), "{tree_id}/{talent_id}={rank}: {change:?}");
    }

    #[test]
    fn test_chain_cascade() {
        let catalog = player_catalog();
        let mut state = player_state(&catalog);
        apply(&mut state, CHAIN_TREE, "A", 1);
        apply(&mut state, CHAIN_TREE, "B", 1);
        apply(&mut state, CHAIN_TREE, "C", 1);
        assert_eq!(state.tree_points(CHAIN_TREE), 3);

        apply(&mut state, CHAIN_TREE, "A", 0);
        assert!(state.selection().is_empty());
    }

    #[test]
    fn test_cascade_through_relay() {
        let catalog = player_catalog();
        let mut state = player_state(&catalog);
        apply(&mut state, CHAIN_TREE, "A", 1);
        apply(&mut state, CHAIN_TREE, "D", 1);
        apply(&mut state, CHAIN_TREE, "Multi", 1);

        apply(&mut state, CHAIN_TREE, "A", 0);
        assert_eq!(state.selection().rank(CHAIN_TREE, "D"), 0);
        assert_eq!(state.selection().rank(CHAIN_TREE, "Multi"), 1);
    }

    #[test]
    fn test_cascade_rank_gate() {
        let catalog = player_catalog();
        let mut state = player_state(&catalog);
        apply(&mut state, CHAIN_TREE, "Multi", 3);
        apply(&mut state, CHAIN_TREE, "A", 1);
        apply(&mut state, CHAIN_TREE, "Gated", 1);

        apply(&mut state, CHAIN_TREE, "Multi", 1);
        assert_eq!(state.selection().rank(CHAIN_TREE, "Gated"), 0);
        assert_eq!(state.tree_points(CHAIN_TREE), 2);
    }

    #[test]
    fn test_cascade_is_idempotent() {
        let catalog = player_catalog();
        let tree = catalog.model(ModelId::Player).unwrap().tree(CHAIN_TREE).unwrap();
        let resolver = TalentGraphResolver::new(tree);
        let ranks: TreeRanks = [("B", 1), ("C", 1), ("Gated", 1), ("Multi", 2)]
            .into_iter()
            .map(|(id, rank)| (id.to_string(), rank))
            .collect();

        let once = cascade(&resolver, ranks, None);
        let twice = cascade(&resolver, once.clone(), None);
        assert_eq!(once, twice);
        assert_eq!(once.keys().collect::<Vec<_>>(), vec!["Multi"]);
    }

    #[test]
    fn test_unknown_talent_keeps_snapshot() {
        let catalog = player_catalog();
        let mut state = player_state(&catalog);
        apply(&mut state, CHAIN_TREE, "A", 1);
        let before = Arc::clone(state.selection());

        assert!(matches!(
            state.set_rank(CHAIN_TREE, "Ghost", 1),
            RankChange::Rejected(RankRejection::UnknownTalent { .. })
        ));
        assert!(matches!(
            state.set_rank("Missing_Tree", "A", 1),
            RankChange::Rejected(RankRejection::UnknownTalent { .. })
        ));
        assert!(Arc::ptr_eq(&before, state.selection()));
    }

    #[test]
    fn test_same_rank_is_unchanged() {
        let catalog = player_catalog();
        let mut state = player_state(&catalog);
        apply(&mut state, CHAIN_TREE, "A", 1);
        let before = Arc::clone(state.selection());
        assert_eq!(state.set_rank(CHAIN_TREE, "A", 1), RankChange::Unchanged);
        assert!(Arc::ptr_eq(&before, state.selection()));
    }

    #[test]
    fn test_gates_checked_only_when_starting() {
        let catalog = player_catalog();
        let mut state = player_state(&catalog);

        assert_eq!(
            state.set_rank(CHAIN_TREE, "B", 1),
            RankChange::Rejected(RankRejection::GateUnmet("B".to_string()))
        );
        assert_eq!(
            state.set_rank(CHAIN_TREE, "Gated", 1),
            RankChange::Rejected(RankRejection::GateUnmet("Gated".to_string()))
        );
        assert_eq!(
            state.set_rank(CHAIN_TREE, "Relay", 1),
            RankChange::Rejected(RankRejection::Hidden("Relay".to_string()))
        );

        // A loaded selection may hold a talent whose prerequisite is gone; raising it further
        // is still allowed.
        let loaded = TalentSelection::new().with_rank(CHAIN_TREE, "Deep", 1);
        let mut state = player_state(&catalog).with_selection(loaded);
        apply(&mut state, CHAIN_TREE, "Deep", 2);
        assert_eq!(state.selection().rank(CHAIN_TREE, "Deep"), 2);
    }

    #[test]
    fn test_rank_out_of_range() {
        let catalog = player_catalog();
        let mut state = player_state(&catalog);
        assert!(matches!(
            state.set_rank(CHAIN_TREE, "A", 2),
            RankChange::Rejected(RankRejection::RankOutOfRange { max: 1, .. })
        ));
    }

    #[test]
    fn test_main_cap() {
        let catalog = player_catalog();
        let mut state = player_state(&catalog);
        apply(&mut state, CHAIN_TREE, "Bulk", 90);
        assert_eq!(
            state.set_rank(CHAIN_TREE, "Bulk", 91),
            RankChange::Rejected(RankRejection::CapExceeded(CHAIN_TREE.to_string()))
        );

        state.toggle_modifier(BONUS_MODIFIER);
        apply(&mut state, CHAIN_TREE, "Bulk", 95);
        assert_eq!(state.summarize().main_points, 95);
    }

    #[test]
    fn test_solo_cap() {
        let catalog = player_catalog();
        let mut state = player_state(&catalog);
        apply(&mut state, SOLO_TREE, "Solo_Bulk", 30);
        assert!(matches!(
            state.set_rank(SOLO_TREE, "Solo_A", 1),
            RankChange::Rejected(RankRejection::CapExceeded(_))
        ));
        apply(&mut state, CHAIN_TREE, "A", 1);
        assert_eq!(state.summarize(), PointsSummary { main_points: 1, solo_points: 30 });
    }

    #[test]
    fn test_overcap_allows_decrease() {
        let catalog = player_catalog();
        let loaded = TalentSelection::new().with_rank(CHAIN_TREE, "Bulk", 95);
        let mut state = player_state(&catalog).with_selection(loaded);
        assert!(state.is_overcap());

        assert!(matches!(state.set_rank(CHAIN_TREE, "A", 1), RankChange::Rejected(RankRejection::CapExceeded(_))));
        apply(&mut state, CHAIN_TREE, "Bulk", 94);
        assert!(state.is_overcap());
        apply(&mut state, CHAIN_TREE, "Bulk", 90);
        assert!(!state.is_overcap());
    }

    #[test]
    fn test_creature_origin_pinned() {
        let catalog = creature_catalog();
        let mut state =
            SelectionState::new(&catalog, ModelId::Creature, WOLF_ARCHETYPE, &[], &PointRules::default()).unwrap();
        assert_eq!(state.origin_talent(WOLF_TREE), Some("CombatPet_Root"));
        assert_eq!(state.selection().rank(WOLF_TREE, "CombatPet_Root"), 1);
        assert!(!state.has_meaningful_state());

        assert_eq!(
            state.set_rank(WOLF_TREE, "CombatPet_Root", 0),
            RankChange::Rejected(RankRejection::PinnedOrigin("CombatPet_Root".to_string()))
        );

        apply(&mut state, WOLF_TREE, "CombatPet_Bite", 24);
        assert!(state.has_meaningful_state());
        assert!(matches!(
            state.set_rank(WOLF_TREE, "CombatPet_Bite", 25),
            RankChange::Rejected(RankRejection::CapExceeded(_))
        ));

        state.reset();
        assert_eq!(state.tree_points(WOLF_TREE), 1);
    }

    #[test]
    fn test_creature_archetype_fallback_and_scope() {
        let catalog = creature_catalog();
        let mut state =
            SelectionState::new(&catalog, ModelId::Creature, "Creature_Gone", &[], &PointRules::default()).unwrap();
        assert_eq!(state.archetype_id(), WOLF_ARCHETYPE);

        state.select_archetype(HORSE_ARCHETYPE);
        assert!(state.selection().tree(WOLF_TREE).is_none());
        assert_eq!(state.selection().rank(HORSE_TREE, "Horse_Saddle"), 1);
    }

    #[test]
    fn test_creature_edit_outside_archetype_rejected() {
        let catalog = creature_catalog();
        let mut state =
            SelectionState::new(&catalog, ModelId::Creature, HORSE_ARCHETYPE, &[], &PointRules::default()).unwrap();
        let before = Arc::clone(state.selection());

        assert_eq!(
            state.set_rank(WOLF_TREE, "CombatPet_Root", 1),
            RankChange::Rejected(RankRejection::UnknownTalent {
                tree_id: WOLF_TREE.to_string(),
                talent_id: "CombatPet_Root".to_string(),
            })
        );
        assert!(Arc::ptr_eq(&before, state.selection()));
        assert_eq!(**state.selection(), state.scoped(state.selection()));
        assert!(state.set_rank(HORSE_TREE, "Horse_Trot", 1).is_applied());
    }

    #[test]
    fn test_scope_to_archetype() {
        let catalog = creature_catalog();
        let model = catalog.model(ModelId::Creature).unwrap();
        let selection = TalentSelection::new()
            .with_rank(WOLF_TREE, "CombatPet_Bite", 3)
            .with_rank(HORSE_TREE, "Horse_Gallop", 2);

        let scoped = scope_to_archetype(model, &selection, WOLF_ARCHETYPE);
        assert_eq!(scoped.rank(WOLF_TREE, "CombatPet_Root"), 1);
        assert_eq!(scoped.rank(WOLF_TREE, "CombatPet_Bite"), 3);
        assert!(scoped.tree(HORSE_TREE).is_none());
        assert!(scope_to_archetype(model, &selection, "Creature_Gone").is_empty());

        let player = player_catalog();
        let player_model = player.model(ModelId::Player).unwrap();
        assert_eq!(scope_to_archetype(player_model, &selection, "Survival"), selection);
    }

    #[test]
    fn test_meaningful_player_state() {
        let catalog = player_catalog();
        let mut state = player_state(&catalog);
        assert!(!state.has_meaningful_state());
        state.toggle_modifier(BONUS_MODIFIER);
        assert!(state.has_meaningful_state());
        state.toggle_modifier(BONUS_MODIFIER);
        assert!(!state.has_meaningful_state());
    }

    #[test]
    fn test_count_unmet() {
        let catalog = player_catalog();
        let model = catalog.model(ModelId::Player).unwrap();
        let selection = TalentSelection::new()
            .with_rank(CHAIN_TREE, "C", 1)
            .with_rank(CHAIN_TREE, "Gated", 1)
            .with_rank("Missing_Tree", "A", 1);
        assert_eq!(count_unmet(model, &selection), 2);
        assert_eq!(player_state(&catalog).count_unmet(&selection), 2);
    }

    #[test]
    fn test_effect_summary_excludes_solo() {
        let catalog = player_catalog();
        let mut state = player_state(&catalog);
        apply(&mut state, CHAIN_TREE, "A", 1);
        apply(&mut state, SOLO_TREE, "Solo_A", 1);
        assert_eq!(state.effect_summary(false).len(), 1);
    }
}

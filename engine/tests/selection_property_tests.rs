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

use proptest::prelude::*;
use std::sync::LazyLock;

use talentforge_common::{ModelId, TalentCatalog};
use talentforge_common::selection::TreeRanks;
use talentforge_engine::state::cascade;
use talentforge_engine::test_utils::{chain_tree, player_catalog, CHAIN_TREE};
use talentforge_engine::{BuildCodec, PointRules, SelectionState, SharedBuild, TalentGraphResolver};

static CATALOG: LazyLock<TalentCatalog> = LazyLock::new(player_catalog);

const CHAIN_TALENTS: &[&str] = &["A", "B", "C", "Deep", "Multi", "Gated", "Relay", "D", "Bulk"];

fn edits() -> impl Strategy<Value = Vec<(usize, u32)>> {
    prop::collection::vec((0..CHAIN_TALENTS.len(), 0u32..4), 0..24)
}

fn edited_state(edits: &[(usize, u32)]) -> SelectionState<'static> {
    let mut state = SelectionState::new(&CATALOG, ModelId::Player, "Survival", &[], &PointRules::default()).unwrap();
    for (index, rank) in edits {
        state.set_rank(CHAIN_TREE, CHAIN_TALENTS[*index], *rank);
    }
    state
}

proptest! {
    #[test]
    fn test_cascade_is_idempotent(ranks in prop::collection::vec((0..CHAIN_TALENTS.len(), 1u32..4), 0..12)) {
        let tree = chain_tree();
        let resolver = TalentGraphResolver::new(&tree);
        let ranks: TreeRanks = ranks
            .into_iter()
            .map(|(index, rank)| (CHAIN_TALENTS[index].to_string(), rank))
            .collect();

        let once = cascade(&resolver, ranks, None);
        let twice = cascade(&resolver, once.clone(), None);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn test_edited_selection_has_no_unmet_talents(edits in edits()) {
        let state = edited_state(&edits);
        prop_assert_eq!(state.count_unmet(state.selection()), 0);
        prop_assert!(!state.is_overcap());
    }

    #[test]
    fn test_decrease_never_adds_points(edits in edits(), pick in 0..CHAIN_TALENTS.len()) {
        let mut state = edited_state(&edits);
        let talent_id = CHAIN_TALENTS[pick];
        let rank = state.selection().rank(CHAIN_TREE, talent_id);
        prop_assume!(rank > 0);

        let before = state.selection().total_points();
        state.set_rank(CHAIN_TREE, talent_id, rank - 1);
        prop_assert!(state.selection().total_points() < before);
    }

    #[test]
    fn test_token_round_trip(edits in edits()) {
        let state = edited_state(&edits);
        let codec = BuildCodec::new(&CATALOG);
        let build = SharedBuild::new(ModelId::Player, "Survival", (**state.selection()).clone());

        let token = codec.encode(&build, None).unwrap();
        prop_assert!(token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        let outcome = codec.decode(Some(&token));
        prop_assert_eq!(outcome.build, Some(build));
        prop_assert!(outcome.warnings.is_empty());
    }
}


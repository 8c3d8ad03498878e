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

//! Test utilities: small catalogs exercising every resolver and pool rule.

use talentforge_common::catalog::{
    Archetype, Model, ModelId, RankTier, Reward, Talent, TalentCatalog, Tree,
};

/// Schema version carried by the fixture catalogs
pub const SCHEMA_VERSION: i64 = 4;
/// Player tree with a plain A → B → C chain, a gated talent and bulk ranks
pub const CHAIN_TREE: &str = "Survival_Chain";
/// Player tree built around relay nodes
pub const REROUTE_TREE: &str = "Survival_Reroute";
/// Player tree in the solo archetype
pub const SOLO_TREE: &str = "Solo_Tree";
/// Modifier adding ten main pool points
pub const BONUS_MODIFIER: &str = "Bonus_Ten";
pub const WOLF_ARCHETYPE: &str = "Creature_Wolf";
pub const WOLF_TREE: &str = "Creature_Wolf_Tree";
pub const HORSE_ARCHETYPE: &str = "Creature_Horse";
pub const HORSE_TREE: &str = "Creature_Horse_Tree";

fn stamina(values: &[f64]) -> Vec<Reward> {
    values
        .iter()
        .map(|value| Reward::default().with_effect("(Value=\"BaseStamina\")", *value))
        .collect()
}

/// Chain tree:
///
/// ```text
/// A ─ B ─ C ─ Deep    Multi (3 ranks)    Gated (Apprentice)
/// └─ Relay ─ D     Bulk (95 ranks)
/// ```
pub fn chain_tree() -> Tree {
    Tree::new(CHAIN_TREE)
        .with_talent(Talent::new("A").with_rewards(stamina(&[1.0])))
        .with_talent(Talent::new("B").requires(&["A"]))
        .with_talent(Talent::new("C").requires(&["B"]))
        .with_talent(Talent::new("Deep").with_ranks(3).requires(&["C"]))
        .with_talent(Talent::new("Multi").with_rewards(stamina(&[2.0, 5.0, 10.0])))
        .with_talent(Talent::new("Gated").gated(RankTier::Apprentice))
        .with_talent(Talent::reroute("Relay").requires(&["A"]))
        .with_talent(Talent::new("D").requires(&["Relay"]))
        .with_talent(Talent::new("Bulk").with_ranks(95))
}

/// Relay tree:
///
/// ```text
/// Root ─ R1 ─ R2 ─ X           C1 ⇄ C2 ─ Y (also requires Root)
/// DeadEnd ─ Z                  W requires R1, Root, Other
/// ```
pub fn reroute_tree() -> Tree {
    Tree::new(REROUTE_TREE)
        .with_talent(Talent::new("Root"))
        .with_talent(Talent::new("Other"))
        .with_talent(Talent::reroute("R1").requires(&["Root"]))
        .with_talent(Talent::reroute("R2").requires(&["R1"]))
        .with_talent(Talent::new("X").requires(&["R2"]))
        .with_talent(Talent::reroute("C1").requires(&["C2"]))
        .with_talent(Talent::reroute("C2").requires(&["C1"]))
        .with_talent(Talent::new("Y").requires(&["C1", "Root"]))
        .with_talent(Talent::reroute("DeadEnd"))
        .with_talent(Talent::new("Z").requires(&["DeadEnd"]))
        .with_talent(Talent::new("W").requires(&["R1", "Root", "Other"]))
}

pub fn solo_tree() -> Tree {
    Tree::new(SOLO_TREE)
        .with_talent(Talent::new("Solo_A").with_ranks(3))
        .with_talent(Talent::new("Solo_Bulk").with_ranks(40))
}

/// Player model with a main archetype, a solo archetype and one point modifier.
pub fn player_catalog() -> TalentCatalog {
    let model = Model::new(ModelId::Player)
        .with_archetype(
            Archetype::new("Survival")
                .with_tree(chain_tree())
                .with_tree(reroute_tree()),
        )
        .with_archetype(Archetype::new("Solo").with_tree(solo_tree()));

    TalentCatalog::default()
        .with_schema_version(SCHEMA_VERSION)
        .with_modifier(BONUS_MODIFIER, 10)
        .with_model(model)
}

/// Creature model with a combat pet and a mount archetype.
///
/// The wolf origin is its default-unlocked single-tier root; the horse has no default-unlocked
/// root so its first requirement-free talent is the origin.
pub fn creature_catalog() -> TalentCatalog {
    let wolf = Tree::new(WOLF_TREE)
        .with_talent(Talent::new("CombatPet_Bite").with_ranks(30).requires(&["CombatPet_Root"]))
        .with_talent(Talent::new("CombatPet_Root").unlocked())
        .with_talent(Talent::new("CombatPet_Howl").requires(&["CombatPet_Bite"]));
    let horse = Tree::new(HORSE_TREE)
        .with_talent(Talent::new("Horse_Saddle"))
        .with_talent(Talent::new("Horse_Gallop").with_ranks(60).requires(&["Horse_Saddle"]))
        .with_talent(Talent::new("Horse_Trot").with_ranks(2));

    let model = Model::new(ModelId::Creature)
        .with_archetype(Archetype::new(WOLF_ARCHETYPE).with_tree(wolf))
        .with_archetype(Archetype::new(HORSE_ARCHETYPE).with_tree(horse));

    TalentCatalog::default()
        .with_schema_version(SCHEMA_VERSION)
        .with_model(model)
}

/// Catalog carrying both models.
pub fn full_catalog() -> TalentCatalog {
    let creature = creature_catalog();
    let mut catalog = player_catalog();
    catalog.models.extend(creature.models);
    catalog
}

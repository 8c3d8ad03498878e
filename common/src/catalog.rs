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

//! # Talent Catalog
//!
//! Read-only description of every model, archetype, tree and talent a build can reference. The
//! catalog is produced by the offline export pipeline as a single JSON document and is loaded
//! once at startup. Nothing in the engine mutates it.
//!
//! ```text
//! TalentCatalog
//! ├── playerTalentModifiers[]   (id, talentPointModifier)
//! └── models{Player, Creature}
//!     └── archetypes{id → Archetype}
//!         └── trees{id → Tree}
//!             └── talents{id → Talent}
//! ```
//!
//! Archetypes, trees and talents are keyed JSON objects. Their document order is meaningful
//! (the first archetype of a model is the creature fallback, the first requirement-free talent
//! is a creature origin candidate) so they are kept as ordered lists.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Archetype id whose trees draw from the solo point pool.
pub const SOLO_ARCHETYPE_ID: &str = "Solo";

/// Talent type tag marking a pure prerequisite relay node.
pub const REROUTE_TALENT_TYPE: &str = "Reroute";

/// Top-level subject a build applies to.
#[derive(Clone, Copy, Debug, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ModelId {
    Player,
    Creature,
}

impl ModelId {
    /// Wire name of this model
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::Player => "Player",
            ModelId::Creature => "Creature",
        }
    }

    /// Get all supported models
    pub fn all() -> &'static [ModelId] {
        &[ModelId::Player, ModelId::Creature]
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Player" => Ok(ModelId::Player),
            "Creature" => Ok(ModelId::Creature),
            _ => Err(format!("Unknown Model {}", s)),
        }
    }
}

/// Cumulative tree investment tiers gating talents.
#[derive(Clone, Copy, Debug, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum RankTier {
    Novice,
    Apprentice,
    Journeyman,
    Master,
}

impl RankTier {
    /// Points that must already be spent in the tree before talents gated at this tier unlock.
    pub fn threshold(&self) -> u32 {
        match self {
            RankTier::Novice => 0,
            RankTier::Apprentice => 4,
            RankTier::Journeyman => 8,
            RankTier::Master => 12,
        }
    }

    /// Get all tiers in ascending order
    pub fn all() -> &'static [RankTier] {
        &[
            RankTier::Novice,
            RankTier::Apprentice,
            RankTier::Journeyman,
            RankTier::Master,
        ]
    }
}

/// Player talent point modifier, e.g. a purchased bonus that raises the main pool cap.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerTalentModifier {
    pub id: String,
    #[serde(default)]
    pub talent_point_modifier: i64,
}

/// Root of the catalog document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TalentCatalog {
    /// Version of the exported talent data
    #[serde(default)]
    pub schema_version: Option<i64>,
    #[serde(default)]
    pub player_talent_modifiers: Vec<PlayerTalentModifier>,
    #[serde(default)]
    pub models: BTreeMap<String, Model>,
}

impl TalentCatalog {
    /// Parse a catalog from its JSON export.
    pub fn from_json(json: &str) -> Result<TalentCatalog, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Get a model present in this catalog
    pub fn model(&self, model_id: ModelId) -> Option<&Model> {
        self.models.get(model_id.as_str())
    }

    /// Get a player talent modifier by id
    pub fn modifier(&self, modifier_id: &str) -> Option<&PlayerTalentModifier> {
        self.player_talent_modifiers
            .iter()
            .find(|modifier| modifier.id == modifier_id)
    }

    /// Add or replace a model, keyed by its id.
    pub fn with_model(mut self, model: Model) -> TalentCatalog {
        self.models.insert(model.id.clone(), model);
        self
    }

    pub fn with_modifier(mut self, id: &str, talent_point_modifier: i64) -> TalentCatalog {
        self.player_talent_modifiers.push(PlayerTalentModifier {
            id: id.to_string(),
            talent_point_modifier,
        });
        self
    }

    pub fn with_schema_version(mut self, schema_version: i64) -> TalentCatalog {
        self.schema_version = Some(schema_version);
        self
    }
}

/// A model and the archetypes available to it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub id: String,
    #[serde(default, deserialize_with = "keyed::deserialize")]
    pub archetypes: Vec<Archetype>,
}

impl Model {
    pub fn new(model_id: ModelId) -> Model {
        Model {
            id: model_id.as_str().to_string(),
            archetypes: Vec::new(),
        }
    }

    pub fn with_archetype(mut self, archetype: Archetype) -> Model {
        self.archetypes.push(archetype);
        self
    }

    /// Get an archetype by id
    pub fn archetype(&self, archetype_id: &str) -> Option<&Archetype> {
        self.archetypes
            .iter()
            .find(|archetype| archetype.id == archetype_id)
    }

    /// First archetype in document order
    pub fn first_archetype(&self) -> Option<&Archetype> {
        self.archetypes.first()
    }

    /// Iterate over every tree of every archetype
    pub fn trees(&self) -> impl Iterator<Item = &Tree> + '_ {
        self.archetypes
            .iter()
            .flat_map(|archetype| archetype.trees.iter())
    }

    /// Get a tree by id across all archetypes
    pub fn tree(&self, tree_id: &str) -> Option<&Tree> {
        self.trees().find(|tree| tree.id == tree_id)
    }

    /// Id of the archetype owning a tree
    pub fn archetype_of_tree(&self, tree_id: &str) -> Option<&str> {
        self.archetypes
            .iter()
            .find(|archetype| archetype.trees.iter().any(|tree| tree.id == tree_id))
            .map(|archetype| archetype.id.as_str())
    }
}

/// Themed grouping of trees under a model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Archetype {
    pub id: String,
    #[serde(default)]
    pub model_id: String,
    #[serde(default, deserialize_with = "keyed::deserialize")]
    pub trees: Vec<Tree>,
}

impl Archetype {
    pub fn new(id: &str) -> Archetype {
        Archetype {
            id: id.to_string(),
            model_id: String::new(),
            trees: Vec::new(),
        }
    }

    pub fn with_tree(mut self, mut tree: Tree) -> Archetype {
        tree.archetype_id = self.id.clone();
        self.trees.push(tree);
        self
    }

    /// Ids of every tree in this archetype, in document order
    pub fn tree_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.trees.iter().map(|tree| tree.id.as_str())
    }

    /// Whether trees of this archetype draw from the solo pool
    pub fn is_solo(&self) -> bool {
        self.id == SOLO_ARCHETYPE_ID
    }
}

/// A graph of talents belonging to one archetype.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tree {
    pub id: String,
    #[serde(default)]
    pub archetype_id: String,
    #[serde(default, deserialize_with = "keyed::deserialize")]
    pub talents: Vec<Talent>,
}

impl Tree {
    pub fn new(id: &str) -> Tree {
        Tree {
            id: id.to_string(),
            archetype_id: String::new(),
            talents: Vec::new(),
        }
    }

    pub fn with_talent(mut self, mut talent: Talent) -> Tree {
        talent.tree_id = self.id.clone();
        self.talents.push(talent);
        self
    }

    /// Get a talent by id
    pub fn talent(&self, talent_id: &str) -> Option<&Talent> {
        self.talents.iter().find(|talent| talent.id == talent_id)
    }
}

/// A single node of a talent tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Talent {
    pub id: String,
    #[serde(default)]
    pub tree_id: String,
    /// Structural type tag from the export, `"Reroute"` for relay nodes.
    #[serde(default, rename = "type", alias = "talentType")]
    pub talent_type: Option<String>,
    /// Explicit rank count override, ignored when negative.
    #[serde(default)]
    pub rank_count: Option<i64>,
    /// Reward tiers, one per rank. `None` when the export carried no reward list at all.
    #[serde(default)]
    pub rewards: Option<Vec<Reward>>,
    #[serde(default)]
    pub required_rank: Option<RankTier>,
    /// Any one of these unlocks the talent.
    #[serde(default)]
    pub required_talents: Vec<String>,
    #[serde(default)]
    pub default_unlocked: bool,
    #[serde(default)]
    pub size: Option<Extent>,
}

impl Talent {
    /// Create a single rank talent with no requirements.
    pub fn new(id: &str) -> Talent {
        Talent {
            id: id.to_string(),
            tree_id: String::new(),
            talent_type: None,
            rank_count: None,
            rewards: Some(vec![Reward::default()]),
            required_rank: None,
            required_talents: Vec::new(),
            default_unlocked: false,
            size: Some(Extent { x: 1.0, y: 1.0 }),
        }
    }

    /// Create a relay node tagged `Reroute`.
    pub fn reroute(id: &str) -> Talent {
        Talent {
            talent_type: Some(REROUTE_TALENT_TYPE.to_string()),
            rewards: Some(Vec::new()),
            size: None,
            ..Talent::new(id)
        }
    }

    /// Replace the reward list with `ranks` empty tiers.
    pub fn with_ranks(mut self, ranks: usize) -> Talent {
        self.rewards = Some(vec![Reward::default(); ranks]);
        self
    }

    pub fn with_rewards(mut self, rewards: Vec<Reward>) -> Talent {
        self.rewards = Some(rewards);
        self
    }

    pub fn requires(mut self, talent_ids: &[&str]) -> Talent {
        self.required_talents = talent_ids.iter().map(|id| id.to_string()).collect();
        self
    }

    pub fn gated(mut self, tier: RankTier) -> Talent {
        self.required_rank = Some(tier);
        self
    }

    pub fn unlocked(mut self) -> Talent {
        self.default_unlocked = true;
        self
    }

    /// Whether the export tags this talent as a relay node
    pub fn is_reroute(&self) -> bool {
        self.talent_type.as_deref() == Some(REROUTE_TALENT_TYPE)
    }

    /// Whether legacy data gave this talent no visual footprint
    pub fn has_zero_size(&self) -> bool {
        self.size.is_none_or(|size| size.x == 0.0 && size.y == 0.0)
    }
}

/// Width and height of a node in legacy layout data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

/// Effects granted at one rank of a talent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Reward {
    #[serde(default)]
    pub effects: Vec<Effect>,
    #[serde(default)]
    pub flags: Vec<String>,
}

impl Reward {
    pub fn with_effect(mut self, raw_key: &str, value: f64) -> Reward {
        self.effects.push(Effect {
            raw_key: raw_key.to_string(),
            value,
        });
        self
    }
}

/// A named numeric stat change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Effect {
    pub raw_key: String,
    #[serde(default)]
    pub value: f64,
}

impl Effect {
    /// Stat identifier, taken from a `Value="..."` clause when the raw key carries one.
    pub fn modifier_id(&self) -> &str {
        const MARKER: &str = "Value=\"";
        self.raw_key
            .find(MARKER)
            .map(|start| &self.raw_key[start + MARKER.len()..])
            .and_then(|rest| rest.find('"').map(|end| &rest[..end]))
            .filter(|id| !id.is_empty())
            .unwrap_or(&self.raw_key)
    }
}

/// Deserializes a keyed JSON object (or a plain list) into its values, preserving document order.
mod keyed {
    use serde::de::{Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
    use std::fmt;
    use std::marker::PhantomData;

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        deserializer.deserialize_any(KeyedVisitor(PhantomData))
    }

    struct KeyedVisitor<T>(PhantomData<T>);

    impl<'de, T: Deserialize<'de>> Visitor<'de> for KeyedVisitor<T> {
        type Value = Vec<T>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("an object keyed by id or a list")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Vec<T>, A::Error> {
            let mut values = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((_, value)) = map.next_entry::<String, T>()? {
                values.push(value);
            }
            Ok(values)
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Vec<T>, A::Error> {
            let mut values = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(value) = seq.next_element()? {
                values.push(value);
            }
            Ok(values)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "schemaVersion": 4,
        "playerTalentModifiers": [{"id": "Bonus_Ten", "talentPointModifier": 10}],
        "models": {
            "Player": {
                "id": "Player",
                "archetypes": {
                    "Survival": {
                        "id": "Survival",
                        "trees": {
                            "Survival_Gathering": {
                                "id": "Survival_Gathering",
                                "talents": {
                                    "Zeta": {"id": "Zeta", "rewards": [{"effects": []}]},
                                    "Alpha": {
                                        "id": "Alpha",
                                        "type": "Reroute",
                                        "requiredRank": "Apprentice",
                                        "requiredTalents": ["Zeta"]
                                    }
                                }
                            }
                        }
                    },
                    "Solo": {"id": "Solo", "trees": {}}
                }
            }
        }
    }"#;

    #[test]
    fn test_catalog_preserves_document_order() {
        let catalog = TalentCatalog::from_json(CATALOG).unwrap();
        let model = catalog.model(ModelId::Player).unwrap();

        assert_eq!(model.first_archetype().unwrap().id, "Survival");
        let tree = model.tree("Survival_Gathering").unwrap();
        let ids: Vec<&str> = tree.talents.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["Zeta", "Alpha"]);
    }

    #[test]
    fn test_catalog_talent_fields() {
        let catalog = TalentCatalog::from_json(CATALOG).unwrap();
        let model = catalog.model(ModelId::Player).unwrap();
        let alpha = model.tree("Survival_Gathering").unwrap().talent("Alpha").unwrap();

        assert!(alpha.is_reroute());
        assert_eq!(alpha.required_rank, Some(RankTier::Apprentice));
        assert_eq!(alpha.required_talents, vec!["Zeta".to_string()]);
        assert!(alpha.rewards.is_none());
        assert!(alpha.has_zero_size());
        assert_eq!(catalog.schema_version, Some(4));
        assert_eq!(catalog.modifier("Bonus_Ten").unwrap().talent_point_modifier, 10);
        assert!(catalog.model(ModelId::Creature).is_none());
    }

    #[test]
    fn test_archetype_of_tree() {
        let catalog = TalentCatalog::from_json(CATALOG).unwrap();
        let model = catalog.model(ModelId::Player).unwrap();
        assert_eq!(model.archetype_of_tree("Survival_Gathering"), Some("Survival"));
        assert_eq!(model.archetype_of_tree("Missing"), None);
        assert!(model.archetype("Solo").unwrap().is_solo());
    }

    #[test]
    fn test_rank_tier_thresholds() {
        let thresholds: Vec<u32> = RankTier::all().iter().map(RankTier::threshold).collect();
        assert_eq!(thresholds, vec![0, 4, 8, 12]);
    }

    #[test]
    fn test_model_id_from_str() {
        assert_eq!("Creature".parse::<ModelId>(), Ok(ModelId::Creature));
        assert!("InvalidModel".parse::<ModelId>().is_err());
    }

    #[test]
    fn test_effect_modifier_id() {
        let keyed = Effect {
            raw_key: "(Value=\"BaseMovementSpeed_%\")".to_string(),
            value: 5.0,
        };
        let plain = Effect {
            raw_key: "BaseStamina".to_string(),
            value: 1.0,
        };
        assert_eq!(keyed.modifier_id(), "BaseMovementSpeed_%");
        assert_eq!(plain.modifier_id(), "BaseStamina");
    }
}

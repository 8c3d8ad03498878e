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

//! Build metadata, saved builds and active build snapshots
//!
//! These are the logical shapes written to the build store. How they are stored is up to the
//! store implementation.

use crate::catalog::ModelId;
use crate::selection::TalentSelection;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Maximum title length in characters
pub const TITLE_MAX_CHARS: usize = 80;

/// Maximum description length in characters
pub const DESCRIPTION_MAX_CHARS: usize = 240;

/// Title given to builds saved without one
pub const UNTITLED_BUILD: &str = "Untitled Build";

/// Subject key used for every player build
pub const PLAYER_CONTEXT_ID: &str = "Player";

/// Human readable title and description attached to a build.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl BuildMetadata {
    /// Trim and length-cap a title and description, returning `None` when both end up empty.
    pub fn normalize(title: Option<&str>, description: Option<&str>) -> Option<BuildMetadata> {
        let title = truncate_chars(title.unwrap_or_default().trim(), TITLE_MAX_CHARS);
        let description = truncate_chars(
            description.unwrap_or_default().trim(),
            DESCRIPTION_MAX_CHARS,
        );

        if title.is_empty() && description.is_empty() {
            return None;
        }

        Some(BuildMetadata { title, description })
    }

    /// Re-normalize metadata loaded from an untrusted source.
    pub fn normalized(&self) -> Option<BuildMetadata> {
        Self::normalize(Some(&self.title), Some(&self.description))
    }
}

fn truncate_chars(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

/// A named build kept in the saved builds list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedBuild {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    pub model_id: ModelId,
    #[serde(default)]
    pub archetype_id: String,
    #[serde(default)]
    pub talents: TalentSelection,
    #[serde(default)]
    pub player_modifier_ids: Vec<String>,
    /// Archetype id for creature builds, [`PLAYER_CONTEXT_ID`] for player builds.
    #[serde(default)]
    pub context_id: String,
}

impl SavedBuild {
    /// Create a new saved build with a fresh id and the current time.
    pub fn new(
        title: &str,
        description: &str,
        model_id: ModelId,
        archetype_id: &str,
        talents: TalentSelection,
        player_modifier_ids: Vec<String>,
    ) -> SavedBuild {
        let title = match title.trim() {
            "" => UNTITLED_BUILD.to_string(),
            title => title.to_string(),
        };
        let (context_id, player_modifier_ids) = match model_id {
            ModelId::Player => (PLAYER_CONTEXT_ID.to_string(), player_modifier_ids),
            ModelId::Creature => (archetype_id.to_string(), Vec::new()),
        };

        Self {
            id: Uuid::new_v4(),
            title,
            description: description.trim().to_string(),
            created_at: Utc::now().trunc_subsecs(3),
            model_id,
            archetype_id: archetype_id.to_string(),
            talents,
            player_modifier_ids,
            context_id,
        }
    }

    /// Context id, falling back to the archetype id for entries written without one.
    pub fn effective_context_id(&self) -> &str {
        if self.context_id.is_empty() {
            &self.archetype_id
        } else {
            &self.context_id
        }
    }
}

/// Model and archetype the user was last editing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildContext {
    pub model_id: ModelId,
    #[serde(default)]
    pub archetype_id: String,
}

impl Default for BuildContext {
    fn default() -> Self {
        Self {
            model_id: ModelId::Player,
            archetype_id: String::new(),
        }
    }
}

/// Work-in-progress player build.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerActiveBuild {
    #[serde(default)]
    pub archetype_id: String,
    #[serde(default)]
    pub talents: TalentSelection,
    #[serde(default)]
    pub modifier_ids: Vec<String>,
    #[serde(default)]
    pub metadata: Option<BuildMetadata>,
}

/// Work-in-progress creature build for one archetype.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatureActiveBuild {
    pub archetype_id: String,
    #[serde(default)]
    pub talents: TalentSelection,
    #[serde(default)]
    pub metadata: Option<BuildMetadata>,
}

/// Snapshot used to resume editing, one build per model and per creature archetype.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveBuilds {
    #[serde(default)]
    pub last_context: BuildContext,
    #[serde(default)]
    pub player: PlayerActiveBuild,
    #[serde(default)]
    pub creatures: BTreeMap<String, CreatureActiveBuild>,
}

impl ActiveBuilds {
    /// Metadata of the active build for a context
    pub fn metadata(&self, model_id: ModelId, archetype_id: &str) -> Option<&BuildMetadata> {
        match model_id {
            ModelId::Player => self.player.metadata.as_ref(),
            ModelId::Creature => self
                .creatures
                .get(archetype_id)
                .and_then(|build| build.metadata.as_ref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_normalize() {
        let long_title = "t".repeat(100);
        let metadata = BuildMetadata::normalize(Some(&long_title), Some("  notes  ")).unwrap();
        assert_eq!(metadata.title.chars().count(), TITLE_MAX_CHARS);
        assert_eq!(metadata.description, "notes");

        assert!(BuildMetadata::normalize(Some("   "), None).is_none());
        assert!(BuildMetadata::normalize(None, None).is_none());
    }

    #[test]
    fn test_saved_build_defaults() {
        let build = SavedBuild::new(
            "  ",
            "",
            ModelId::Creature,
            "Creature_Wolf",
            TalentSelection::new(),
            vec!["Bonus".to_string()],
        );
        assert_eq!(build.title, UNTITLED_BUILD);
        assert_eq!(build.context_id, "Creature_Wolf");
        assert!(build.player_modifier_ids.is_empty());

        let player = SavedBuild::new(
            "Tank",
            "",
            ModelId::Player,
            "",
            TalentSelection::new(),
            vec!["Bonus".to_string()],
        );
        assert_eq!(player.context_id, PLAYER_CONTEXT_ID);
        assert_eq!(player.player_modifier_ids.len(), 1);
    }

    #[test]
    fn test_saved_build_serde_shape() {
        let build = SavedBuild::new(
            "Tank",
            "",
            ModelId::Player,
            "",
            TalentSelection::new().with_rank("Tree", "A", 1),
            Vec::new(),
        );
        let value = serde_json::to_value(&build).unwrap();
        assert!(value["createdAt"].is_i64());
        assert_eq!(value["modelId"], "Player");
        assert_eq!(value["talents"]["Tree"]["A"], 1);

        let parsed: SavedBuild = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.id, build.id);
        assert_eq!(parsed.talents, build.talents);
    }

    #[test]
    fn test_active_builds_defaults_missing_sections() {
        let builds: ActiveBuilds = serde_json::from_str(r#"{"creatures": {}}"#).unwrap();
        assert_eq!(builds.last_context.model_id, ModelId::Player);
        assert!(builds.player.talents.is_empty());
        assert!(builds.metadata(ModelId::Creature, "Missing").is_none());
    }
}

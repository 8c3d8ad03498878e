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

//! # Build Session
//!
//! Ties one user's editing context to a [`BuildStore`]: the active selection, pending title and
//! description, the saved builds list, and the status left by the last load. Every accepted
//! edit rewrites the active builds snapshot so the session can be resumed later.

use crate::codec::{BuildCodec, DecodeError, DecodeOutcome, DecodeWarning, SharedBuild};
use crate::index::{equal_selections, subject_key, SaveOutcome, SavedBuildIndex};
use crate::points::{normalize_modifier_ids, PointRules};
use crate::state::{RankChange, SelectionError, SelectionState};
use crate::store::{BuildStore, StoreError};
use talentforge_common::build::PLAYER_CONTEXT_ID;
use talentforge_common::catalog::{ModelId, TalentCatalog};
use talentforge_common::{
    ActiveBuilds, BuildContext, BuildMetadata, CreatureActiveBuild, PlayerActiveBuild, SavedBuild,
    TalentSelection,
};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

/// Status code reported while a loaded build exceeds its caps
pub const OVERCAP_CODE: &str = "overcap";

/// Errors that can occur during session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to encode build: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// One editing session over a catalog and a store.
pub struct BuildSession<'a, S: BuildStore> {
    catalog: &'a TalentCatalog,
    rules: PointRules,
    store: S,
    saved: SavedBuildIndex,
    active: ActiveBuilds,
    state: SelectionState<'a>,
    creature_archetype: String,
    metadata: Option<BuildMetadata>,
    error: Option<DecodeError>,
    warnings: Vec<DecodeWarning>,
}

impl<'a, S: BuildStore> BuildSession<'a, S> {
    /// Open a session resuming the stored player draft.
    pub fn open(catalog: &'a TalentCatalog, rules: &PointRules, store: S) -> SessionResult<BuildSession<'a, S>> {
        let saved = SavedBuildIndex::new(store.saved_builds());
        let active = store.active_builds();
        let player = &active.player;
        let state = SelectionState::new(catalog, ModelId::Player, &player.archetype_id, &player.modifier_ids, rules)?
            .with_selection(player.talents.clone());
        let creature_archetype = match active.last_context.model_id {
            ModelId::Creature => active.last_context.archetype_id.clone(),
            ModelId::Player => String::new(),
        };
        let metadata = active.metadata(ModelId::Player, PLAYER_CONTEXT_ID).cloned();

        info!(saved = saved.builds().len(), "Opened build session");
        Ok(Self {
            catalog,
            rules: rules.clone(),
            store,
            saved,
            active,
            state,
            creature_archetype,
            metadata,
            error: None,
            warnings: Vec::new(),
        })
    }

    pub fn state(&self) -> &SelectionState<'a> {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn saved_builds(&self) -> &[SavedBuild] {
        self.saved.builds()
    }

    pub fn active_builds(&self) -> &ActiveBuilds {
        &self.active
    }

    /// Title and description of the build being edited
    pub fn metadata(&self) -> Option<&BuildMetadata> {
        self.metadata.as_ref()
    }

    /// Warnings left by the last shared build load
    pub fn warnings(&self) -> &[DecodeWarning] {
        &self.warnings
    }

    /// Hard decode error of the last load, else `overcap` while the selection exceeds its caps,
    /// else empty.
    pub fn status_code(&self) -> &'static str {
        match self.error {
            Some(error) => error.code(),
            None if self.state.is_overcap() => OVERCAP_CODE,
            None => "",
        }
    }

    /// Load the build carried by a share token. Failed decodes keep the current selection and
    /// its title and description.
    pub fn apply_token(&mut self, token: Option<&str>) -> SessionResult<DecodeOutcome> {
        let outcome = BuildCodec::new(self.catalog).decode(token);
        if !outcome.has_param {
            return Ok(outcome);
        }

        self.error = outcome.error;
        self.warnings = outcome.warnings.clone();

        if let Some(build) = &outcome.build {
            self.metadata = outcome.metadata.clone();
            self.replace_state(build.model_id, &build.archetype_id, &build.player_modifier_ids, &build.talents)?;
            info!(model = %build.model_id, archetype = %build.archetype_id, status = self.status_code(), "Loaded shared build");
            self.persist_active()?;
        }
        Ok(outcome)
    }

    /// Request a rank change, persisting the snapshot when it applies.
    pub fn set_rank(&mut self, tree_id: &str, talent_id: &str, rank: u32) -> SessionResult<RankChange> {
        let change = self.state.set_rank(tree_id, talent_id, rank);
        if change.is_applied() {
            self.persist_active()?;
        }
        Ok(change)
    }

    pub fn toggle_modifier(&mut self, modifier_id: &str) -> SessionResult<()> {
        self.state.toggle_modifier(modifier_id);
        self.persist_active()
    }

    /// Switch to another model, resuming its stored draft.
    pub fn select_model(&mut self, model_id: ModelId) -> SessionResult<()> {
        if model_id == self.state.model_id() {
            return Ok(());
        }
        match model_id {
            ModelId::Player => {
                let PlayerActiveBuild {
                    archetype_id,
                    talents,
                    modifier_ids,
                    metadata,
                } = self.active.player.clone();
                self.replace_state(ModelId::Player, &archetype_id, &modifier_ids, &talents)?;
                self.metadata = metadata;
            }
            ModelId::Creature => {
                let archetype_id = self.creature_archetype.clone();
                self.resume_creature(&archetype_id)?;
            }
        }
        self.clear_status();
        self.persist_active()
    }

    /// Switch archetype. Creature archetypes resume their own stored draft.
    pub fn select_archetype(&mut self, archetype_id: &str) -> SessionResult<()> {
        if archetype_id.is_empty() || archetype_id == self.state.archetype_id() {
            return Ok(());
        }
        match self.state.model_id() {
            ModelId::Player => self.state.select_archetype(archetype_id),
            ModelId::Creature => {
                self.resume_creature(archetype_id)?;
                self.clear_status();
            }
        }
        self.persist_active()
    }

    /// Drop all spent points along with the pending title and any load status.
    pub fn reset(&mut self) -> SessionResult<()> {
        self.state.reset();
        self.metadata = None;
        self.clear_status();
        self.persist_active()
    }

    /// Encode the current build.
    pub fn share(&self) -> SessionResult<String> {
        let build = SharedBuild {
            model_id: self.state.model_id(),
            archetype_id: self.state.archetype_id().to_string(),
            talents: (**self.state.selection()).clone(),
            player_modifier_ids: self.state.modifier_ids().to_vec(),
        };
        Ok(BuildCodec::new(self.catalog).encode(&build, self.metadata.as_ref())?)
    }

    /// Save the current build under a title.
    ///
    /// A build with the same title and subject is only replaced when `overwrite` is set.
    pub fn save(&mut self, title: &str, description: &str, overwrite: bool) -> SessionResult<SaveOutcome> {
        let build = SavedBuild::new(
            title,
            description,
            self.state.model_id(),
            self.state.archetype_id(),
            self.state.scoped(self.state.selection()),
            self.state.modifier_ids().to_vec(),
        );
        let metadata = BuildMetadata::normalize(Some(&build.title), Some(&build.description));

        let outcome = self.saved.save(build, overwrite);
        if let SaveOutcome::Duplicate(_) = outcome {
            return Ok(outcome);
        }

        self.store.set_saved_builds(self.saved.builds())?;
        self.metadata = metadata;
        info!(?outcome, "Saved build");
        self.persist_active()?;
        Ok(outcome)
    }

    /// Load a saved build. Returns `false` when no build has this id.
    pub fn load_saved(&mut self, id: Uuid) -> SessionResult<bool> {
        let Some(build) = self.saved.get(id).cloned() else {
            return Ok(false);
        };
        let model_id = match self.catalog.model(build.model_id) {
            Some(_) => build.model_id,
            None => ModelId::Player,
        };
        let archetype_id = match model_id {
            ModelId::Creature => build.effective_context_id(),
            ModelId::Player => build.archetype_id.as_str(),
        };

        self.replace_state(model_id, archetype_id, &build.player_modifier_ids, &build.talents)?;
        self.metadata = BuildMetadata::normalize(Some(&build.title), Some(&build.description));
        self.clear_status();
        debug!(%id, status = self.status_code(), "Loaded saved build");
        self.persist_active()?;
        Ok(true)
    }

    /// Encode a saved build with its title and description.
    pub fn share_saved(&self, id: Uuid) -> SessionResult<Option<String>> {
        let Some(build) = self.saved.get(id) else {
            return Ok(None);
        };
        let shared = SharedBuild {
            model_id: build.model_id,
            archetype_id: build.effective_context_id().to_string(),
            talents: build.talents.clone(),
            player_modifier_ids: build.player_modifier_ids.clone(),
        };
        let metadata = BuildMetadata {
            title: build.title.clone(),
            description: build.description.clone(),
        };
        Ok(Some(BuildCodec::new(self.catalog).encode(&shared, Some(&metadata))?))
    }

    pub fn delete_saved(&mut self, id: Uuid) -> SessionResult<bool> {
        if self.saved.remove(id).is_none() {
            return Ok(false);
        }
        self.store.set_saved_builds(self.saved.builds())?;
        Ok(true)
    }

    /// Saved build sharing the current title and subject
    pub fn matching_saved(&self) -> Option<&SavedBuild> {
        let title = self.metadata.as_ref().map(|metadata| metadata.title.trim())?;
        let subject = subject_key(self.state.model_id(), self.context_id())?;
        self.saved.find_duplicate(title, &subject)
    }

    /// Whether the build being edited differs from the saved build it is titled after.
    pub fn is_unsaved(&self) -> bool {
        if !self.state.has_meaningful_state() {
            return false;
        }
        let Some(saved) = self.matching_saved() else {
            return false;
        };

        let talents_changed = !equal_selections(
            &self.state.scoped(self.state.selection()),
            &self.state.scoped(&saved.talents),
        );
        let saved_modifiers = match self.state.model_id() {
            ModelId::Player => normalize_modifier_ids(self.catalog, &saved.player_modifier_ids),
            ModelId::Creature => Vec::new(),
        };
        let modifiers_changed = saved_modifiers != self.state.modifier_ids();
        let description = self
            .metadata
            .as_ref()
            .map(|metadata| metadata.description.trim())
            .unwrap_or_default();

        talents_changed || modifiers_changed || description != saved.description.trim()
    }

    fn context_id(&self) -> &str {
        match self.state.model_id() {
            ModelId::Player => PLAYER_CONTEXT_ID,
            ModelId::Creature => self.state.archetype_id(),
        }
    }

    fn clear_status(&mut self) {
        self.error = None;
        self.warnings.clear();
    }

    fn replace_state(
        &mut self,
        model_id: ModelId,
        archetype_id: &str,
        modifier_ids: &[String],
        talents: &TalentSelection,
    ) -> SessionResult<()> {
        self.state = SelectionState::new(self.catalog, model_id, archetype_id, modifier_ids, &self.rules)?
            .with_selection(talents.clone());
        if model_id == ModelId::Creature {
            self.creature_archetype = self.state.archetype_id().to_string();
        }
        Ok(())
    }

    fn resume_creature(&mut self, archetype_id: &str) -> SessionResult<()> {
        let model = self
            .catalog
            .model(ModelId::Creature)
            .ok_or(SelectionError::ModelNotFound(ModelId::Creature))?;
        let archetype_id = model
            .archetype(archetype_id)
            .or_else(|| model.first_archetype())
            .map(|archetype| archetype.id.clone())
            .unwrap_or_default();

        let draft = self.active.creatures.get(&archetype_id).cloned().unwrap_or_default();
        self.replace_state(ModelId::Creature, &archetype_id, &[], &draft.talents)?;
        self.metadata = draft.metadata;
        Ok(())
    }

    /// Fold the current context into the active builds snapshot and store it.
    fn persist_active(&mut self) -> SessionResult<()> {
        let model_id = self.state.model_id();
        let archetype_id = self.state.archetype_id().to_string();
        self.active.last_context = BuildContext {
            model_id,
            archetype_id: archetype_id.clone(),
        };
        let metadata = self.metadata.as_ref().and_then(BuildMetadata::normalized);

        match model_id {
            ModelId::Player => {
                self.active.player = PlayerActiveBuild {
                    archetype_id,
                    talents: (**self.state.selection()).clone(),
                    modifier_ids: self.state.modifier_ids().to_vec(),
                    metadata,
                };
            }
            ModelId::Creature if !archetype_id.is_empty() => {
                let build = CreatureActiveBuild {
                    archetype_id: archetype_id.clone(),
                    talents: self.state.scoped(self.state.selection()),
                    metadata,
                };
                self.active.creatures.insert(archetype_id, build);
            }
            ModelId::Creature => {}
        }

        self.store.set_active_builds(&self.active)?;
        Ok(())
    }
}

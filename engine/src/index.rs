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

//! # Saved Build Index
//!
//! Identity rules for the saved builds list. Two saved builds collide when their trimmed,
//! case-folded titles match and they describe the same subject: the player, or one creature
//! archetype. The list is kept newest first.

use talentforge_common::catalog::ModelId;
use talentforge_common::{SavedBuild, TalentSelection};
use tracing::debug;
use uuid::Uuid;

const CREATURE_SUBJECT_PREFIX: &str = "Creature:";

/// Subject a build belongs to. Creature builds without a context have no subject.
pub fn subject_key(model_id: ModelId, context_id: &str) -> Option<String> {
    match model_id {
        ModelId::Player => Some(ModelId::Player.as_str().to_string()),
        ModelId::Creature => match context_id.trim() {
            "" => None,
            context_id => Some(format!("{}{}", CREATURE_SUBJECT_PREFIX, context_id)),
        },
    }
}

/// Whether two selections hold the same ranks in the same trees, regardless of order.
pub fn equal_selections(left: &TalentSelection, right: &TalentSelection) -> bool {
    left.len() == right.len()
        && left.trees().all(|(tree_id, ranks)| right.tree(tree_id) == Some(ranks))
}

fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Result of [`SavedBuildIndex::save`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    /// A new entry was added at the front.
    Created(Uuid),
    /// The duplicate entry was replaced, kept its id, and moved to the front.
    Overwritten(Uuid),
    /// A duplicate exists and overwriting was not requested. Nothing changed.
    Duplicate(Uuid),
}

/// Saved builds in stored order, newest first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SavedBuildIndex {
    builds: Vec<SavedBuild>,
}

impl SavedBuildIndex {
    pub fn new(builds: Vec<SavedBuild>) -> SavedBuildIndex {
        Self { builds }
    }

    pub fn builds(&self) -> &[SavedBuild] {
        &self.builds
    }

    pub fn into_inner(self) -> Vec<SavedBuild> {
        self.builds
    }

    pub fn get(&self, id: Uuid) -> Option<&SavedBuild> {
        self.builds.iter().find(|build| build.id == id)
    }

    /// First entry whose title and subject both match. Blank titles never match.
    pub fn find_duplicate(&self, title: &str, subject_key: &str) -> Option<&SavedBuild> {
        let title = normalize_title(title);
        if title.is_empty() || subject_key.is_empty() {
            return None;
        }

        self.builds.iter().find(|build| {
            normalize_title(&build.title) == title
                && self::subject_key(build.model_id, build.effective_context_id()).as_deref()
                    == Some(subject_key)
        })
    }

    /// Duplicate of a build about to be saved
    pub fn duplicate_of(&self, build: &SavedBuild) -> Option<&SavedBuild> {
        subject_key(build.model_id, build.effective_context_id())
            .and_then(|subject| self.find_duplicate(&build.title, &subject))
    }

    /// Add a build at the front, or replace its duplicate when `overwrite` is set.
    pub fn save(&mut self, build: SavedBuild, overwrite: bool) -> SaveOutcome {
        match self.duplicate_of(&build).map(|duplicate| duplicate.id) {
            Some(id) if !overwrite => {
                debug!(%id, title = %build.title, "Saved build already exists");
                SaveOutcome::Duplicate(id)
            }
            Some(id) => {
                self.builds.retain(|existing| existing.id != id);
                self.builds.insert(0, SavedBuild { id, ..build });
                SaveOutcome::Overwritten(id)
            }
            None => {
                let id = build.id;
                self.builds.insert(0, build);
                SaveOutcome::Created(id)
            }
        }
    }

    /// Remove an entry by id
    pub fn remove(&mut self, id: Uuid) -> Option<SavedBuild> {
        let index = self.builds.iter().position(|build| build.id == id)?;
        Some(self.builds.remove(index))
    }
}

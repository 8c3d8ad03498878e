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

//! # Build Stores
//!
//! Persisted state lives behind [`BuildStore`] so that selection, codec and index logic stay
//! free of I/O. Two keys are stored: the saved builds list and the active builds snapshot.
//!
//! Reads never fail. Missing or malformed data degrades to an empty list or the default
//! snapshot, logged at `warn`. Writes report failures to the caller.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use talentforge_common::{ActiveBuilds, SavedBuild};
use thiserror::Error;
use tracing::{debug, warn};

/// File name of the saved builds list
pub const SAVED_BUILDS_KEY: &str = "talent_saved_builds_v1";
/// File name of the active builds snapshot
pub const ACTIVE_BUILDS_KEY: &str = "talent_active_builds_v2";

/// Errors that can occur while writing stored state.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Storage for saved and active builds.
#[cfg_attr(test, mockall::automock)]
pub trait BuildStore {
    /// Saved builds, newest first
    fn saved_builds(&self) -> Vec<SavedBuild>;

    fn set_saved_builds(&mut self, builds: &[SavedBuild]) -> Result<(), StoreError>;

    /// Active builds snapshot, the default when nothing is stored
    fn active_builds(&self) -> ActiveBuilds;

    fn set_active_builds(&mut self, builds: &ActiveBuilds) -> Result<(), StoreError>;
}

/// In-memory store.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    saved: Vec<SavedBuild>,
    active: ActiveBuilds,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        Self::default()
    }
}

impl BuildStore for MemoryStore {
    fn saved_builds(&self) -> Vec<SavedBuild> {
        self.saved.clone()
    }

    fn set_saved_builds(&mut self, builds: &[SavedBuild]) -> Result<(), StoreError> {
        self.saved = builds.to_vec();
        Ok(())
    }

    fn active_builds(&self) -> ActiveBuilds {
        self.active.clone()
    }

    fn set_active_builds(&mut self, builds: &ActiveBuilds) -> Result<(), StoreError> {
        self.active = builds.clone();
        Ok(())
    }
}

/// Store writing one pretty-printed JSON file per key into a directory.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<JsonFileStore, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        debug!(path = %root.display(), "Opened build store");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }

    fn read(&self, key: &str) -> Option<serde_json::Value> {
        let path = self.path(key);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return None,
            Err(error) => {
                warn!(path = %path.display(), %error, "Failed to read stored builds");
                return None;
            }
        };
        match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(path = %path.display(), %error, "Stored builds are not valid JSON");
                None
            }
        }
    }

    fn write<T: serde::Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(value)?;
        fs::write(self.path(key), json)?;
        Ok(())
    }
}

impl BuildStore for JsonFileStore {
    /// Entries that fail to parse are skipped individually.
    fn saved_builds(&self) -> Vec<SavedBuild> {
        let Some(serde_json::Value::Array(entries)) = self.read(SAVED_BUILDS_KEY) else {
            return Vec::new();
        };
        entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value(entry) {
                Ok(build) => Some(build),
                Err(error) => {
                    warn!(%error, "Skipping malformed saved build");
                    None
                }
            })
            .collect()
    }

    fn set_saved_builds(&mut self, builds: &[SavedBuild]) -> Result<(), StoreError> {
        self.write(SAVED_BUILDS_KEY, builds)
    }

    fn active_builds(&self) -> ActiveBuilds {
        let Some(value) = self.read(ACTIVE_BUILDS_KEY) else {
            return ActiveBuilds::default();
        };
        match serde_json::from_value::<ActiveBuilds>(value) {
            Ok(builds) => normalize_active(builds),
            Err(error) => {
                warn!(%error, "Malformed active builds snapshot, using defaults");
                ActiveBuilds::default()
            }
        }
    }

    fn set_active_builds(&mut self, builds: &ActiveBuilds) -> Result<(), StoreError> {
        self.write(ACTIVE_BUILDS_KEY, builds)
    }
}

/// Re-normalize metadata and drop creature entries with blank keys.
fn normalize_active(mut builds: ActiveBuilds) -> ActiveBuilds {
    builds.player.metadata = builds.player.metadata.and_then(|metadata| metadata.normalized());
    builds.creatures = builds
        .creatures
        .into_iter()
        .filter(|(archetype_id, _)| !archetype_id.is_empty())
        .map(|(archetype_id, mut build)| {
            build.archetype_id = archetype_id.clone();
            build.metadata = build.metadata.and_then(|metadata| metadata.normalized());
            (archetype_id, build)
        })
        .collect::<BTreeMap<_, _>>();
    builds
}

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

//! Talentforge Common Types
//!
//! This crate defines the shared data types used across Talentforge:
//! - The read-only talent catalog contract (models, archetypes, trees, talents)
//! - Sparse talent selections
//! - Build metadata, saved builds and active build snapshots

pub mod build;
pub mod catalog;
pub mod selection;

pub use build::{ActiveBuilds, BuildContext, BuildMetadata, CreatureActiveBuild, PlayerActiveBuild, SavedBuild};
pub use catalog::{ModelId, RankTier, TalentCatalog};
pub use selection::TalentSelection;

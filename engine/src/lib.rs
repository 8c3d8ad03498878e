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

//! Talentforge Engine
//!
//! Resolves talent prerequisite graphs, edits selections under rank gates and point caps,
//! encodes builds as URL-safe share tokens, and keeps saved and active builds in a store.

pub mod codec;
pub mod config;
pub mod index;
pub mod points;
pub mod resolver;
pub mod session;
pub mod state;
pub mod store;
pub mod test_utils;

// Re-export commonly used types
pub use codec::{BuildCodec, DecodeError, DecodeOutcome, DecodeWarning, SharedBuild};
pub use index::{SaveOutcome, SavedBuildIndex};
pub use points::{PointBudget, PointRules, PointsSummary};
pub use resolver::TalentGraphResolver;
pub use session::{BuildSession, SessionError};
pub use state::{RankChange, RankRejection, SelectionState};
pub use store::{BuildStore, JsonFileStore, MemoryStore, StoreError};

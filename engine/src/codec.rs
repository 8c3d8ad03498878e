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

//! # Build Codec
//!
//! Converts a build to and from the compact token embedded in share links under the `build`
//! query key. A token is unpadded URL-safe base64 over the UTF-8 JSON payload:
//!
//! | Key  | Value                                                   |
//! |------|---------------------------------------------------------|
//! | `cv` | codec version                                           |
//! | `sv` | catalog schema version or `null`                        |
//! | `m`  | `"Player"` or `"Creature"`                              |
//! | `a`  | archetype id                                            |
//! | `t`  | tree id → talent id → rank                              |
//! | `pm` | ordered unique modifier ids, player builds only         |
//! | `n`  | title, only with metadata                               |
//! | `d`  | description, only with metadata                         |
//!
//! Decoding never fails past the model and talent checks. Stale versions, substituted
//! archetypes and unmet prerequisites are reported as warnings and the build is returned as-is.

use crate::points::normalize_modifier_ids;
use crate::state::{count_unmet, scope_to_archetype};
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use talentforge_common::catalog::{ModelId, TalentCatalog};
use talentforge_common::{BuildMetadata, TalentSelection};
use thiserror::Error;
use tracing::warn;

/// Version written into every token
pub const CODEC_VERSION: i64 = 1;

/// Query parameter carrying the token in share links
pub const SHARE_QUERY_KEY: &str = "build";

/// URL-safe alphabet, no padding on encode, padding optional and trailing bits tolerated on
/// decode.
const TOKEN_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Hard decode failures. No build is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The token is empty or does not carry a complete build record.
    #[error("Shared build is incomplete")]
    Incomplete,

    /// The token is not valid base64, UTF-8 or JSON.
    #[error("Shared build is corrupted")]
    Corrupted,

    /// The token names a model that is unsupported or absent from the catalog.
    #[error("Shared build references an unsupported model")]
    InvalidModel,
}

impl DecodeError {
    /// Wire name of this error
    pub fn code(&self) -> &'static str {
        match self {
            DecodeError::Incomplete => "incomplete",
            DecodeError::Corrupted => "corrupted",
            DecodeError::InvalidModel => "invalidModel",
        }
    }
}

/// Advisory findings of a successful decode.
#[derive(Clone, Debug, PartialEq)]
pub enum DecodeWarning {
    /// The creature archetype is gone and the first archetype replaced it.
    ArchetypeSubstituted { requested: String, fallback: String },
    /// The codec version is missing or differs from [`CODEC_VERSION`].
    OutdatedFormat,
    /// The token was produced against another catalog schema version.
    SchemaMismatch { shared: f64, current: i64 },
    /// Selected talents whose gates are unmet under the current catalog.
    MissingPrerequisites(usize),
}

impl fmt::Display for DecodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeWarning::ArchetypeSubstituted { .. } => write!(
                f,
                "This shared build references a creature archetype that no longer exists. A fallback archetype is shown."
            ),
            DecodeWarning::OutdatedFormat => {
                write!(f, "This shared build uses an outdated share format version.")
            }
            DecodeWarning::SchemaMismatch { .. } => {
                write!(f, "This shared build was created for a different talent data version.")
            }
            DecodeWarning::MissingPrerequisites(1) => {
                write!(f, "1 selected talent is missing prerequisites in the current data.")
            }
            DecodeWarning::MissingPrerequisites(count) => {
                write!(f, "{} selected talents are missing prerequisites in the current data.", count)
            }
        }
    }
}

/// A build as carried by a token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedBuild {
    pub model_id: ModelId,
    pub archetype_id: String,
    pub talents: TalentSelection,
    #[serde(default)]
    pub player_modifier_ids: Vec<String>,
}

impl SharedBuild {
    pub fn new(model_id: ModelId, archetype_id: &str, talents: TalentSelection) -> SharedBuild {
        Self {
            model_id,
            archetype_id: archetype_id.to_string(),
            talents,
            player_modifier_ids: Vec::new(),
        }
    }

    pub fn with_modifiers(mut self, modifier_ids: &[&str]) -> SharedBuild {
        self.player_modifier_ids = modifier_ids.iter().map(|id| id.to_string()).collect();
        self
    }
}

/// Canonical token payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SharePayload {
    #[serde(rename = "cv")]
    pub codec_version: i64,
    #[serde(rename = "sv")]
    pub schema_version: Option<i64>,
    #[serde(rename = "m")]
    pub model_id: ModelId,
    #[serde(rename = "a")]
    pub archetype_id: String,
    #[serde(rename = "t")]
    pub talents: TalentSelection,
    #[serde(rename = "pm", default, skip_serializing_if = "Option::is_none")]
    pub player_modifier_ids: Option<Vec<String>>,
    #[serde(rename = "n", default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "d", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Result of decoding a token.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecodeOutcome {
    /// Whether a token was supplied at all
    pub has_param: bool,
    pub error: Option<DecodeError>,
    pub warnings: Vec<DecodeWarning>,
    pub metadata: Option<BuildMetadata>,
    pub build: Option<SharedBuild>,
}

impl DecodeOutcome {
    fn absent() -> DecodeOutcome {
        DecodeOutcome::default()
    }

    fn failed(error: DecodeError) -> DecodeOutcome {
        warn!(code = error.code(), "Rejected shared build");
        DecodeOutcome {
            has_param: true,
            error: Some(error),
            ..DecodeOutcome::default()
        }
    }

    /// Wire error code, empty on success or when no token was supplied.
    pub fn error_code(&self) -> &'static str {
        self.error.map(|error| error.code()).unwrap_or_default()
    }

    /// Warning messages in the order they were raised
    pub fn messages(&self) -> Vec<String> {
        self.warnings.iter().map(ToString::to_string).collect()
    }
}

/// Token encoder and decoder bound to one catalog.
#[derive(Clone, Copy, Debug)]
pub struct BuildCodec<'a> {
    catalog: &'a TalentCatalog,
}

impl<'a> BuildCodec<'a> {
    pub fn new(catalog: &'a TalentCatalog) -> BuildCodec<'a> {
        Self { catalog }
    }

    /// Build the canonical payload for a build.
    ///
    /// Creature builds fall back to the first archetype and are scoped to it. Modifier ids are
    /// only carried for player builds.
    pub fn payload(&self, build: &SharedBuild, metadata: Option<&BuildMetadata>) -> SharePayload {
        let model = self.catalog.model(build.model_id);
        let (archetype_id, talents) = match (build.model_id, model) {
            (ModelId::Creature, Some(model)) => {
                let archetype_id = model
                    .archetype(&build.archetype_id)
                    .or_else(|| model.first_archetype())
                    .map(|archetype| archetype.id.clone())
                    .unwrap_or_default();
                let talents = scope_to_archetype(model, &build.talents, &archetype_id);
                (archetype_id, talents)
            }
            (ModelId::Creature, None) => (String::new(), build.talents.clone()),
            (ModelId::Player, _) => (build.archetype_id.clone(), build.talents.clone()),
        };
        let player_modifier_ids = (build.model_id == ModelId::Player)
            .then(|| normalize_modifier_ids(self.catalog, &build.player_modifier_ids));
        let metadata = metadata.and_then(BuildMetadata::normalized);

        SharePayload {
            codec_version: CODEC_VERSION,
            schema_version: self.catalog.schema_version,
            model_id: build.model_id,
            archetype_id,
            talents,
            player_modifier_ids,
            title: metadata.as_ref().map(|metadata| metadata.title.clone()),
            description: metadata.map(|metadata| metadata.description),
        }
    }

    /// Encode a build into a share token.
    pub fn encode(&self, build: &SharedBuild, metadata: Option<&BuildMetadata>) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(&self.payload(build, metadata))?;
        Ok(TOKEN_ENGINE.encode(json))
    }

    /// Decode the `build` parameter of a query string or full URL.
    pub fn decode_query(&self, query: &str) -> DecodeOutcome {
        self.decode(token_from_query(query))
    }

    /// Decode a token. `None` means the share parameter was absent.
    pub fn decode(&self, token: Option<&str>) -> DecodeOutcome {
        let Some(token) = token else {
            return DecodeOutcome::absent();
        };
        if token.is_empty() {
            return DecodeOutcome::failed(DecodeError::Incomplete);
        }

        let text = match decode_text(token) {
            Ok(text) => text,
            Err(error) => return DecodeOutcome::failed(error),
        };
        if text.is_empty() {
            return DecodeOutcome::failed(DecodeError::Incomplete);
        }

        let parsed: Value = match serde_json::from_str(&text) {
            Ok(parsed) => parsed,
            Err(error) => {
                warn!(%error, "Shared build is not valid JSON");
                return DecodeOutcome::failed(DecodeError::Corrupted);
            }
        };
        if !parsed.is_object() && !parsed.is_array() {
            return DecodeOutcome::failed(DecodeError::Incomplete);
        }

        let resolved = parsed
            .get("m")
            .and_then(Value::as_str)
            .and_then(|model_id| model_id.parse::<ModelId>().ok())
            .and_then(|model_id| self.catalog.model(model_id).map(|model| (model_id, model)));
        let Some((model_id, model)) = resolved else {
            return DecodeOutcome::failed(DecodeError::InvalidModel);
        };

        let raw_talents = match parsed.get("t") {
            Some(talents @ Value::Object(_)) => TalentSelection::from_json(talents).unwrap_or_default(),
            Some(Value::Array(_)) => TalentSelection::new(),
            _ => return DecodeOutcome::failed(DecodeError::Incomplete),
        };

        let mut warnings = Vec::new();
        let mut archetype_id = parsed
            .get("a")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let talents = match model_id {
            ModelId::Creature => {
                if model.archetype(&archetype_id).is_none() {
                    let fallback = model
                        .first_archetype()
                        .map(|archetype| archetype.id.clone())
                        .unwrap_or_default();
                    warnings.push(DecodeWarning::ArchetypeSubstituted {
                        requested: std::mem::replace(&mut archetype_id, fallback.clone()),
                        fallback,
                    });
                }
                scope_to_archetype(model, &raw_talents, &archetype_id)
            }
            ModelId::Player => raw_talents,
        };

        let player_modifier_ids = match (model_id, parsed.get("pm").and_then(Value::as_array)) {
            (ModelId::Player, Some(ids)) => {
                normalize_modifier_ids(self.catalog, ids.iter().filter_map(Value::as_str))
            }
            _ => Vec::new(),
        };

        if json_number(parsed.get("cv")) != Some(CODEC_VERSION as f64) {
            warnings.push(DecodeWarning::OutdatedFormat);
        }

        if let (Some(shared), Some(current)) = (json_number(parsed.get("sv")), self.catalog.schema_version) {
            if shared != current as f64 {
                warnings.push(DecodeWarning::SchemaMismatch { shared, current });
            }
        }

        let missing = count_unmet(model, &talents);
        if missing > 0 {
            warnings.push(DecodeWarning::MissingPrerequisites(missing));
        }

        for warning in &warnings {
            warn!(model = %model_id, archetype = %archetype_id, "{}", warning);
        }

        let metadata = BuildMetadata::normalize(
            parsed.get("n").and_then(Value::as_str),
            parsed.get("d").and_then(Value::as_str),
        );

        DecodeOutcome {
            has_param: true,
            error: None,
            warnings,
            metadata,
            build: Some(SharedBuild {
                model_id,
                archetype_id,
                talents,
                player_modifier_ids,
            }),
        }
    }
}

/// Extract the share parameter from a query string or URL. A bare token is returned as-is.
pub fn token_from_query(input: &str) -> Option<&str> {
    let input = input.trim();
    let query = match input.split_once('?') {
        Some((_, query)) => query,
        None if input.contains('=') => input,
        None => return Some(input),
    };
    let query = query.split('#').next().unwrap_or_default();

    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        (key == SHARE_QUERY_KEY).then_some(value)
    })
}

/// Base64 and UTF-8 decode a token. The standard alphabet is accepted as well.
fn decode_text(token: &str) -> Result<String, DecodeError> {
    let normalized = token.trim().replace('+', "-").replace('/', "_");
    let bytes = TOKEN_ENGINE.decode(normalized).map_err(|error| {
        warn!(%error, "Shared build is not valid base64");
        DecodeError::Corrupted
    })?;
    String::from_utf8(bytes).map_err(|error| {
        warn!(%error, "Shared build is not valid UTF-8");
        DecodeError::Corrupted
    })
}

/// Coerce a JSON value to a number. `null`, `false` and blank strings read as 0; missing
/// fields, arrays, objects and unparsable strings have no numeric value.
fn json_number(value: Option<&Value>) -> Option<f64> {
    let number = match value? {
        Value::Null => Some(0.0),
        Value::Bool(flag) => Some(f64::from(u8::from(*flag))),
        Value::Number(number) => number.as_f64(),
        Value::String(text) if text.trim().is_empty() => Some(0.0),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|number| number.is_finite())
}

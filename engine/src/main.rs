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

use clap::Parser;
use std::error::Error;
use std::path::Path;
use talentforge_common::build::BuildMetadata;
use talentforge_common::TalentCatalog;
use talentforge_engine::codec::{token_from_query, BuildCodec, DecodeOutcome, SharedBuild};
use talentforge_engine::config::{Arguments, Command, Configuration};
use talentforge_engine::{BuildSession, JsonFileStore, PointRules, SelectionState};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    // Load arguments from the command line
    let arguments: Arguments = Parser::parse();

    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_level(true)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .init();

    // Load environment variables from .env file if specified
    if let Some(ref env_file) = arguments.env_file {
        if Path::new(env_file).exists() {
            tracing::debug!("Loading environment variables from file: {}", env_file);
            dotenv::from_filename(env_file).ok();
        }
    } else {
        tracing::debug!("Loading environment variables from default file");
        dotenv::dotenv().ok();
    }

    // Configuration file is optional, every section has defaults
    let config = if Path::new(&arguments.config_file).exists() {
        Configuration::load(&arguments.config_file)?
    } else {
        tracing::debug!("No configuration file at {}, using defaults", arguments.config_file);
        Configuration::default()
    };
    tracing::debug!("Configuration loaded: {:?}", config);

    tracing::info!("Loading talent catalog from {}", *config.catalog.path);
    let catalog = TalentCatalog::from_json(&std::fs::read_to_string(config.catalog.path.as_path())?)?;
    tracing::info!("Loaded catalog schema version {:?}", catalog.schema_version);

    match arguments.command {
        None => describe_catalog(&catalog),
        Some(Command::Decode { token, json }) => {
            let outcome = decode(&catalog, &token);
            match (&outcome.build, json) {
                (Some(build), true) => println!("{}", serde_json::to_string_pretty(build)?),
                (Some(build), false) => describe_build(&catalog, &config.rules, build)?,
                (None, _) => {}
            }
        }
        Some(Command::Encode {
            build,
            title,
            description,
        }) => {
            let shared: SharedBuild = serde_json::from_reader(std::fs::File::open(build)?)?;
            let metadata = BuildMetadata::normalize(title.as_deref(), description.as_deref());
            println!("{}", BuildCodec::new(&catalog).encode(&shared, metadata.as_ref())?);
        }
        Some(Command::Check { token }) => {
            let outcome = decode(&catalog, &token);
            if let Some(error) = outcome.error {
                return Err(error.into());
            }
            if let Some(build) = &outcome.build {
                let state = build_state(&catalog, &config.rules, build)?;
                if state.is_overcap() {
                    return Err("build exceeds its talent point caps".into());
                }
                println!("ok: {} points, minimum level {}", state.selection().total_points(), state.minimum_level());
            }
        }
        Some(Command::Import {
            token,
            title,
            overwrite,
        }) => {
            let store = JsonFileStore::open(config.store.path.as_path())?;
            let mut session = BuildSession::open(&catalog, &config.rules, store)?;
            let outcome = session.apply_token(Some(token_from_query(&token).unwrap_or_default()))?;
            if let Some(error) = outcome.error {
                return Err(error.into());
            }
            let description = outcome
                .metadata
                .as_ref()
                .map(|metadata| metadata.description.clone())
                .unwrap_or_default();
            let saved = session.save(&title, &description, overwrite)?;
            tracing::info!("Import finished: {:?}", saved);
            println!("{:?}", saved);
        }
        Some(Command::List) => {
            let store = JsonFileStore::open(config.store.path.as_path())?;
            let session = BuildSession::open(&catalog, &config.rules, store)?;
            for build in session.saved_builds() {
                println!(
                    "{}  {}  {}/{}  {}",
                    build.id,
                    build.created_at.to_rfc3339(),
                    build.model_id,
                    build.effective_context_id(),
                    build.title
                );
            }
        }
    }

    Ok(())
}

fn decode(catalog: &TalentCatalog, input: &str) -> DecodeOutcome {
    let outcome = BuildCodec::new(catalog).decode_query(input);
    if let Some(error) = outcome.error {
        println!("error: {} ({})", error, error.code());
    }
    for message in outcome.messages() {
        println!("warning: {}", message);
    }
    outcome
}

fn build_state<'a>(
    catalog: &'a TalentCatalog,
    rules: &PointRules,
    build: &SharedBuild,
) -> Result<SelectionState<'a>, Box<dyn Error>> {
    let state = SelectionState::new(catalog, build.model_id, &build.archetype_id, &build.player_modifier_ids, rules)?
        .with_selection(build.talents.clone());
    Ok(state)
}

fn describe_build(catalog: &TalentCatalog, rules: &PointRules, build: &SharedBuild) -> Result<(), Box<dyn Error>> {
    let state = build_state(catalog, rules, build)?;
    let summary = state.summarize();

    println!("model: {}", state.model_id());
    println!("archetype: {}", state.archetype_id());
    println!("main points: {} / {}", summary.main_points, state.budget().main_cap());
    println!("solo points: {} / {}", summary.solo_points, state.budget().solo_cap());
    println!("minimum level: {}", state.minimum_level());
    if state.is_overcap() {
        println!("status: overcap");
    }
    for (tree_id, ranks) in state.selection().trees() {
        println!("{} ({} points)", tree_id, state.tree_points(tree_id));
        for (talent_id, rank) in ranks {
            println!("  {} {}", talent_id, rank);
        }
    }
    for effect in state.effect_summary(false) {
        println!("{}: {}", effect.modifier_id, effect.total);
    }
    Ok(())
}

fn describe_catalog(catalog: &TalentCatalog) {
    for (model_id, model) in &catalog.models {
        println!("{} ({} archetypes)", model_id, model.archetypes.len());
        for archetype in &model.archetypes {
            println!("  {} ({} trees)", archetype.id, archetype.trees.len());
        }
    }
}

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

use crate::points::PointRules;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use serde_env_field::EnvField;
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Arguments {
    #[arg(
        short = 'c',
        long = "config",
        help = "Path to configuration file",
        default_value = "talentforge.yaml"
    )]
    pub config_file: String,

    #[arg(short = 'e', long = "env", help = "Path to environment file", default_value = ".env")]
    pub env_file: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Default for Arguments {
    fn default() -> Self {
        Self {
            config_file: "talentforge.yaml".to_string(),
            env_file: Some(".env".to_string()),
            command: None,
        }
    }
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Decode a build token or share link and describe the build
    Decode {
        token: String,
        /// Print the decoded build as JSON
        #[arg(long)]
        json: bool,
    },
    /// Encode a build description file into a share token
    Encode {
        build: PathBuf,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Validate a build token, failing on decode errors or exceeded caps
    Check { token: String },
    /// Import a shared build into the saved builds
    Import {
        token: String,
        #[arg(short, long)]
        title: String,
        #[arg(long)]
        overwrite: bool,
    },
    /// List saved builds
    List,
}

/// Errors raised while loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be opened
    #[error("Failed to open config file: {0}")]
    Open(#[from] std::io::Error),

    /// The configuration file is not valid YAML for this schema
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub catalog: CatalogConfig,
    pub store: StoreConfig,
    pub rules: PointRules,
}

impl Configuration {
    pub fn load(path: &str) -> Result<Configuration, ConfigError> {
        let conf = serde_yaml::from_reader(std::fs::File::open(path)?)?;

        Ok(conf)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Talent catalog JSON produced by the data pipeline
    pub path: EnvField<CatalogPath>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding saved and active builds
    pub path: EnvField<StorePath>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogPath(PathBuf);

impl CatalogPath {
    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl FromStr for CatalogPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl Default for CatalogPath {
    fn default() -> Self {
        Self(PathBuf::from("talents.json"))
    }
}

impl std::fmt::Display for CatalogPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorePath(PathBuf);

impl StorePath {
    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl FromStr for StorePath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl Default for StorePath {
    fn default() -> Self {
        Self(PathBuf::from(".talentforge"))
    }
}

impl std::fmt::Display for StorePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_arguments_default() {
        let args = Arguments::default();
        assert_eq!(args.config_file, "talentforge.yaml");
        assert_eq!(args.env_file, Some(".env".to_string()));
        assert!(args.command.is_none());
    }

    #[test]
    fn test_arguments_parse_subcommand() {
        let args = Arguments::parse_from(["talentforge", "-c", "custom.yaml", "import", "abc", "--title", "Tank"]);
        assert_eq!(args.config_file, "custom.yaml");
        assert_eq!(
            args.command,
            Some(Command::Import {
                token: "abc".to_string(),
                title: "Tank".to_string(),
                overwrite: false,
            })
        );
    }

    #[test]
    fn test_configuration_default() {
        let config = Configuration::default();
        assert_eq!(config.catalog.path.as_path(), Path::new("talents.json"));
        assert_eq!(config.store.path.as_path(), Path::new(".talentforge"));
        assert_eq!(config.rules, PointRules::default());
    }

    #[test]
    fn test_configuration_load_missing_file() {
        let result = Configuration::load("non_existent.yaml");
        assert!(matches!(result, Err(ConfigError::Open(_))));
    }

    #[test]
    fn test_configuration_load_from_file() {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        unsafe {
            std::env::remove_var("TALENTFORGE_STORE");
        }

        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("config.yaml");
        std::fs::write(
            &file_path,
            "catalog:\n  path: \"data/talents.json\"\nrules:\n  main_base_cap: 120\n",
        )
        .unwrap();

        let config = Configuration::load(file_path.to_str().unwrap()).unwrap();
        assert_eq!(config.catalog.path.as_path(), Path::new("data/talents.json"));
        assert_eq!(config.store.path.as_path(), Path::new(".talentforge"));
        assert_eq!(config.rules.main_base_cap, 120);
        assert_eq!(config.rules.solo_cap, 30);
    }

    #[test]
    fn test_configuration_env_substitution() {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        unsafe {
            std::env::set_var("TALENTFORGE_STORE", "/var/lib/talentforge");
        }

        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("config.yaml");
        std::fs::write(&file_path, "store:\n  path: \"${TALENTFORGE_STORE}\"\n").unwrap();

        let config = Configuration::load(file_path.to_str().unwrap()).unwrap();
        assert_eq!(config.store.path.as_path(), Path::new("/var/lib/talentforge"));

        unsafe {
            std::env::remove_var("TALENTFORGE_STORE");
        }
    }

    #[test]
    fn test_configuration_rejects_bad_yaml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("config.yaml");
        std::fs::write(&file_path, "rules: [not, a, map]\n").unwrap();

        let result = Configuration::load(file_path.to_str().unwrap());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}

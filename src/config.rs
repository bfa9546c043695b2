//! Host configuration using Figment
//!
//! Configuration is loaded from:
//! 1. `config/labhost.toml` (base configuration)
//! 2. Environment variables prefixed with `LABHOST_`, nested keys separated by `__`
//!
//! # Example
//! ```no_run
//! use labhost::config::HostConfig;
//!
//! let config = HostConfig::load()?;
//! config.validate().map_err(|e| anyhow::anyhow!(e))?;
//! println!("Application: {}", config.application.name);
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::composer::DependencyDescriptor;
use crate::probing::{ProbingContext, SEARCH_PATH_SEPARATOR};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/labhost.toml";

/// Prefix of environment variable overrides.
pub const ENV_PREFIX: &str = "LABHOST_";

/// Top-level host configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostConfig {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Module probing settings
    #[serde(default)]
    pub probing: ProbingConfig,
    /// External implementations, registered in declaration order
    #[serde(default)]
    pub dependencies: Vec<DependencyDescriptor>,
    /// Collections composed from two configured dependencies
    #[serde(default)]
    pub collections: Vec<CollectionConfig>,
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_name")]
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format (pretty, compact, json)
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

/// Where referenced modules are searched for
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbingConfig {
    /// Fallback directories, as a list or a `;`-separated string
    #[serde(default, deserialize_with = "deserialize_search_path")]
    pub fallback_directories: Vec<PathBuf>,
}

/// A collection dependency closed over an element dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Name of the element dependency
    pub element: String,
    /// Name of the generic collection dependency
    pub collection: String,
}

fn default_name() -> String {
    "labhost".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SearchPath {
    List(Vec<PathBuf>),
    Joined(String),
}

fn deserialize_search_path<'de, D>(deserializer: D) -> Result<Vec<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match SearchPath::deserialize(deserializer)? {
        SearchPath::List(directories) => directories
            .into_iter()
            .filter(|dir| !dir.as_os_str().is_empty())
            .collect(),
        SearchPath::Joined(joined) => ProbingContext::from_search_path(&joined)
            .fallback_directories()
            .to_vec(),
    })
}

impl HostConfig {
    /// Load configuration from `config/labhost.toml` and environment variables
    ///
    /// Example override: `LABHOST_APPLICATION__LOG_LEVEL=debug`
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path, then environment overrides
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
    }

    /// Parse configuration from TOML text, without environment overrides
    pub fn from_toml_str(toml: &str) -> Result<Self, figment::Error> {
        Figment::new().merge(Toml::string(toml)).extract()
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        let level = self.application.log_level.to_lowercase();
        if !valid_levels.contains(&level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            ));
        }

        let valid_formats = ["pretty", "compact", "json"];
        let format = self.application.log_format.to_lowercase();
        if !valid_formats.contains(&format.as_str()) {
            return Err(format!(
                "Invalid log_format '{}'. Must be one of: {}",
                self.application.log_format,
                valid_formats.join(", ")
            ));
        }

        let mut names = HashSet::new();
        for dependency in &self.dependencies {
            if dependency.name.is_empty() {
                return Err("Dependency with empty name".to_string());
            }
            if !names.insert(dependency.name.as_str()) {
                return Err(format!("Duplicate dependency name: {}", dependency.name));
            }
        }

        for entry in &self.collections {
            for name in [&entry.element, &entry.collection] {
                if !names.contains(name.as_str()) {
                    return Err(format!(
                        "Collection entry references unknown dependency '{name}'"
                    ));
                }
            }
        }

        Ok(())
    }

    /// Probing context seeded with the configured fallback directories
    pub fn probing_context(&self) -> ProbingContext {
        ProbingContext::new(self.probing.fallback_directories.iter().cloned())
    }

    /// Fallback directories joined into a single search path string
    pub fn search_path(&self) -> String {
        self.probing
            .fallback_directories
            .iter()
            .map(|dir| dir.display().to_string())
            .collect::<Vec<_>>()
            .join(&SEARCH_PATH_SEPARATOR.to_string())
    }

    /// Look up a dependency by name
    pub fn dependency(&self, name: &str) -> Option<&DependencyDescriptor> {
        self.dependencies.iter().find(|dep| dep.name == name)
    }

    /// Dependencies marked for automatic registration, in declaration order
    pub fn auto_dependencies(&self) -> impl Iterator<Item = &DependencyDescriptor> {
        self.dependencies.iter().filter(|dep| dep.auto_load)
    }
}

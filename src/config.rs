//! Configuration file schema for prettylint.
//!
//! Configuration is optional; every field falls back to a default that runs
//! plain `pylint -f parseable` over whatever the command line names.

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::lint::OutputConvention;

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["prettylint.yaml", ".prettylint.yaml"];

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Analyzer command line prefix, e.g. `["python3", "-m", "pylint"]`.
    #[serde(default = "default_command")]
    pub command: Vec<String>,
    /// Output convention the analyzer is asked to use.
    #[serde(default)]
    pub convention: OutputConvention,
    /// Extra analyzer arguments, placed before the module names
    #[serde(default)]
    pub extra_args: Vec<String>,
    /// Glob patterns for paths to skip during discovery (e.g. "**/build/**")
    #[serde(default)]
    pub excluded_paths: Vec<String>,
}

fn default_command() -> Vec<String> {
    vec!["pylint".to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            command: default_command(),
            convention: OutputConvention::default(),
            extra_args: Vec::new(),
            excluded_paths: Vec::new(),
        }
    }
}

impl Config {
    /// Parse a configuration from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load the configuration named on the command line, or the first
    /// default file found in the working directory, or the defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => discover_config(),
        };
        match path {
            Some(path) => {
                log::debug!("Loading configuration from {}", path.display());
                Self::parse_file(&path).map_err(|e| {
                    anyhow::anyhow!("parsing configuration {}: {}", path.display(), e)
                })
            }
            None => Ok(Self::default()),
        }
    }

    /// Compile `excluded_paths` into a matcher, if there are any.
    pub fn excluded_set(&self) -> anyhow::Result<Option<GlobSet>> {
        if self.excluded_paths.is_empty() {
            return Ok(None);
        }
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.excluded_paths {
            let glob = Glob::new(pattern).map_err(|e| {
                anyhow::anyhow!("invalid excluded_paths pattern {:?}: {}", pattern, e)
            })?;
            builder.add(glob);
        }
        Ok(Some(builder.build()?))
    }
}

/// Discover a configuration file in the current directory.
fn discover_config() -> Option<PathBuf> {
    DEFAULT_CONFIG_NAMES
        .iter()
        .map(PathBuf::from)
        .find(|path| path.is_file())
}

/// Validate a configuration for correctness.
pub fn validate(config: &Config) -> anyhow::Result<()> {
    if config.command.is_empty() || config.command[0].trim().is_empty() {
        anyhow::bail!("command must name the analyzer program");
    }

    for pattern in &config.excluded_paths {
        Glob::new(pattern)
            .map_err(|e| anyhow::anyhow!("invalid excluded_paths pattern {:?}: {}", pattern, e))?;
    }

    Ok(())
}

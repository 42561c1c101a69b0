//! Configuration Loader
//!
//! Finds forge.toml, applies environment overrides and settles the build
//! identifier.

use crate::build_id;
use crate::project::{validate_java_release, ProjectConfig, DEFAULT_JAVA_RELEASE};
use crate::{ConfigError, ConfigResult};
use std::env;
use std::path::{Path, PathBuf};

/// Name of the workspace configuration file
pub const CONFIG_FILE_NAME: &str = "forge.toml";

/// Configuration loader
///
/// Sources, lowest priority first:
/// 1. Workspace config (./forge.toml, found by walking up)
/// 2. Environment variables (FORGE_*)
/// 3. CLI flags (handled by caller)
///
/// The build identifier additionally falls back to the git `HEAD` commit.
pub struct ConfigLoader {
    /// Consult `.git` when no build identifier is configured
    discover_build_id: bool,
}

/// Loaded configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Workspace configuration
    pub project: ProjectConfig,

    /// Workspace root directory (where forge.toml was found)
    pub root: PathBuf,

    /// Effective build identifier, if any source provided one
    pub build_id: Option<String>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            discover_build_id: true,
        }
    }

    /// Disable the `.git` fallback for the build identifier
    pub fn without_git(mut self) -> Self {
        self.discover_build_id = false;
        self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find forge.toml.
    pub fn load_from_directory(&self, start_dir: &Path) -> ConfigResult<Config> {
        let config_path = Self::find_config_file(start_dir)
            .ok_or_else(|| ConfigError::NotFound(start_dir.join(CONFIG_FILE_NAME)))?;
        self.load_from_file(&config_path)
    }

    /// Load configuration from a specific forge.toml
    pub fn load_from_file(&self, config_path: &Path) -> ConfigResult<Config> {
        let project = ProjectConfig::load_from_file(config_path)?;
        let project = self.apply_env_overrides(project)?;

        let root = match config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let build_id = match project.project.build_id.clone() {
            Some(id) => Some(id),
            None if self.discover_build_id => build_id::read_head_commit(&root),
            None => None,
        };

        tracing::debug!(
            root = %root.display(),
            build_id = build_id.as_deref().unwrap_or("<none>"),
            modules = project.modules.len(),
            "loaded workspace configuration"
        );

        Ok(Config {
            project,
            root,
            build_id,
        })
    }

    /// Walk up from `start_dir` looking for forge.toml
    pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
        start_dir
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .find(|path| path.is_file())
    }

    /// Apply environment variable overrides
    ///
    /// Recognized: FORGE_BUILD_ID, FORGE_JAVA_RELEASE, FORGE_SOURCES_JAR,
    /// FORGE_BAN_SLF4J.
    fn apply_env_overrides(&self, mut config: ProjectConfig) -> ConfigResult<ProjectConfig> {
        if let Ok(build_id) = env::var("FORGE_BUILD_ID") {
            if !build_id.trim().is_empty() {
                config.project.build_id = Some(build_id.trim().to_string());
            }
        }

        if let Ok(release) = env::var("FORGE_JAVA_RELEASE") {
            let release: u32 = release.trim().parse().map_err(|_| ConfigError::InvalidValue {
                field: "FORGE_JAVA_RELEASE".to_string(),
                reason: format!("'{}' is not a number", release),
            })?;
            validate_java_release(release)?;
            config.options.java_release = Some(release);
        }

        if let Ok(sources_jar) = env::var("FORGE_SOURCES_JAR") {
            config.options.sources_jar = Some(parse_bool(&sources_jar));
        }

        if let Ok(ban_slf4j) = env::var("FORGE_BAN_SLF4J") {
            config.options.ban_slf4j = Some(parse_bool(&ban_slf4j));
        }

        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}

impl Config {
    /// Effective target language level
    pub fn java_release(&self) -> u32 {
        self.project
            .options
            .java_release
            .unwrap_or(DEFAULT_JAVA_RELEASE)
    }

    /// Whether modules produce a sources artifact
    pub fn sources_jar(&self) -> bool {
        self.project.options.sources_jar.unwrap_or(true)
    }

    /// Whether the slf4j facade is banned
    pub fn ban_slf4j(&self) -> bool {
        self.project.options.ban_slf4j.unwrap_or(false)
    }

    /// Output directory for assembled artifacts
    pub fn target_dir(&self) -> PathBuf {
        let dir = self
            .project
            .project
            .target_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("build"));
        self.root.join(dir)
    }

    /// Absolute checkstyle rule file
    pub fn checkstyle_config_file(&self) -> PathBuf {
        self.root.join(self.project.checkstyle.config_file())
    }

    /// Resolve a workspace-relative path
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

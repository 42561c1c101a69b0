//! Forge Configuration System
//!
//! Loads the workspace configuration (`forge.toml`) that drives every forge
//! command:
//! - project coordinates and the build identifier
//! - profile options (`java-release`, `sources-jar`, `ban-slf4j`)
//! - the sources allow-list, checkstyle and dependency versions
//! - module declarations and their shadow (merge) settings
//!
//! # Configuration Hierarchy
//!
//! Later sources override earlier ones:
//! 1. Workspace config (./forge.toml, found by walking up)
//! 2. Environment variables (FORGE_*)
//! 3. CLI flags (handled by the caller)
//!
//! The build identifier falls back to the commit checked out in `.git` when
//! neither the file nor the environment provide one.
//!
//! # Example
//!
//! ```no_run
//! use forge_config::ConfigLoader;
//! use std::path::Path;
//!
//! let loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! ```

pub mod build_id;
pub mod loader;
pub mod project;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid semver version: {0}")]
    InvalidVersion(String),

    #[error("Duplicate module '{0}'")]
    DuplicateModule(String),

    #[error("Module '{module}' references unknown module '{reference}'")]
    UnknownModule { module: String, reference: String },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use loader::{Config, ConfigLoader};
pub use project::{
    CheckstyleConfig, ModuleConfig, OptionsConfig, ProjectConfig, ProjectSection,
    PublishingConfig, RelocateConfig, ShadowConfig, VersionsConfig,
};

//! Forge package model
//!
//! Shared vocabulary for the forge workspace: dependency coordinates and
//! coordinate patterns, dependency scopes, the resolved-artifact lockfile
//! (`forge.lock`) written by the external resolver, and validation of the
//! names that flow through all of them.

pub mod coordinate;
pub mod lockfile;
pub mod validator;

pub use coordinate::{CoordinatePattern, DependencyCoordinate, DependencyScope};
pub use lockfile::{compute_checksum, Lockfile, ResolvedArtifact};
pub use validator::{ValidationError, Validator};

/// Package model errors
#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("Failed to parse lockfile: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize lockfile: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid coordinate '{input}': {reason}")]
    InvalidCoordinate { input: String, reason: String },

    #[error("Unknown dependency scope '{0}'")]
    UnknownScope(String),

    #[error("Lockfile error: {0}")]
    LockfileError(String),
}

pub type Result<T> = std::result::Result<T, PackageError>;

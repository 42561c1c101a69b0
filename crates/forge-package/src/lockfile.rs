//! Resolved-artifact lockfile (forge.lock)
//!
//! Forge never resolves dependencies itself. The external resolver writes the
//! outcome of resolution here: one entry per coordinate with the on-disk
//! location of the artifact and an optional sha-256 checksum.

use crate::coordinate::DependencyCoordinate;
use crate::{PackageError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Lockfile structure (forge.lock)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Lockfile {
    /// Lockfile format version
    pub version: u32,
    /// Resolved artifacts
    #[serde(default, rename = "artifact")]
    pub artifacts: Vec<ResolvedArtifact>,
    /// Metadata
    #[serde(default)]
    pub metadata: LockfileMetadata,
}

impl Lockfile {
    /// Current lockfile format version
    pub const VERSION: u32 = 1;

    /// Conventional file name at the workspace root
    pub const FILE_NAME: &'static str = "forge.lock";

    /// Create new empty lockfile
    pub fn new() -> Self {
        Self {
            version: Self::VERSION,
            artifacts: Vec::new(),
            metadata: LockfileMetadata::default(),
        }
    }

    /// Parse lockfile from TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let lockfile: Self = toml::from_str(content)?;
        lockfile.verify()?;
        Ok(lockfile)
    }

    /// Load lockfile from file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Serialize to TOML string
    pub fn to_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write lockfile to file
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = self.to_string()?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Add or replace the resolved artifact for a module
    pub fn add_artifact(&mut self, artifact: ResolvedArtifact) {
        self.artifacts
            .retain(|a| !a.coordinate.same_module(&artifact.coordinate));
        self.artifacts.push(artifact);
        self.artifacts.sort_by(|a, b| a.coordinate.cmp(&b.coordinate));
    }

    /// Get the artifact resolved for an exact coordinate
    pub fn get(&self, coordinate: &DependencyCoordinate) -> Option<&ResolvedArtifact> {
        self.artifacts.iter().find(|a| &a.coordinate == coordinate)
    }

    /// Get the artifact resolved for `group:name`, whatever its version
    pub fn find_module(&self, group: &str, name: &str) -> Option<&ResolvedArtifact> {
        self.artifacts
            .iter()
            .find(|a| a.coordinate.group == group && a.coordinate.name == name)
    }

    /// All resolved coordinates
    pub fn coordinates(&self) -> impl Iterator<Item = &DependencyCoordinate> {
        self.artifacts.iter().map(|a| &a.coordinate)
    }

    /// Verify lockfile integrity
    ///
    /// Each `group:name` may appear once: the resolver has already picked
    /// a single version.
    pub fn verify(&self) -> Result<()> {
        if self.version > Self::VERSION {
            return Err(PackageError::LockfileError(format!(
                "Lockfile version {} is newer than supported version {}",
                self.version,
                Self::VERSION
            )));
        }

        let mut seen = HashSet::new();
        for artifact in &self.artifacts {
            if !seen.insert(artifact.coordinate.module_id()) {
                return Err(PackageError::LockfileError(format!(
                    "Duplicate module in lockfile: {}",
                    artifact.coordinate.module_id()
                )));
            }
        }

        Ok(())
    }
}

impl Default for Lockfile {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolved artifact entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolvedArtifact {
    /// Resolved coordinate
    pub coordinate: DependencyCoordinate,
    /// Artifact location, relative to the lockfile's directory
    pub path: PathBuf,
    /// sha-256 of the artifact bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl ResolvedArtifact {
    /// Create a new entry without checksum
    pub fn new(coordinate: DependencyCoordinate, path: impl Into<PathBuf>) -> Self {
        Self {
            coordinate,
            path: path.into(),
            checksum: None,
        }
    }

    /// Set checksum
    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }

    /// Check artifact bytes against the recorded checksum, if any
    pub fn verify_checksum(&self, bytes: &[u8]) -> Result<()> {
        let Some(expected) = &self.checksum else {
            return Ok(());
        };
        let actual = compute_checksum(bytes);
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(PackageError::LockfileError(format!(
                "Checksum mismatch for {}: expected {}, got {}",
                self.coordinate, expected, actual
            )));
        }
        Ok(())
    }
}

/// Lockfile metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LockfileMetadata {
    /// Tool that produced the lockfile
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_by: Option<String>,
}

/// Compute the hex sha-256 of some bytes
pub fn compute_checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

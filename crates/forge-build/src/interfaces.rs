//! External collaborators
//!
//! Compilation, resolution, style checking, documentation and upload are
//! done by tools outside forge. The build only talks to them through these
//! traits.

use crate::error::{BuildError, BuildResult};
use crate::module::{JavadocSettings, Module, TestSettings};
use crate::publication::PublishRequest;
use crate::shadow::Archive;
use forge_package::{DependencyCoordinate, Lockfile};
use std::fmt;
use std::path::{Path, PathBuf};

/// Source set a style check runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceSet {
    Main,
    Test,
}

impl SourceSet {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for SourceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Result of a test run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestOutcome {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl TestOutcome {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }
}

/// Result of a style check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleCheckReport {
    pub passed: bool,
    /// Human-readable findings
    pub report: String,
}

/// Compiler toolchain
pub trait Toolchain: Send + Sync {
    /// Compile main sources to class files for a language level
    fn compile(&self, module: &Module, release: u32) -> BuildResult<Archive>;

    /// Main sources as an archive
    fn sources(&self, module: &Module) -> BuildResult<Archive>;

    fn run_tests(&self, module: &Module, settings: &TestSettings) -> BuildResult<TestOutcome>;
}

/// Style checker
pub trait StyleChecker: Send + Sync {
    fn run_style_check(
        &self,
        module: &Module,
        source_set: SourceSet,
        rule_file: &Path,
        tool_version: &str,
    ) -> BuildResult<StyleCheckReport>;
}

/// API documentation generator
pub trait DocGenerator: Send + Sync {
    fn generate_docs(&self, module: &Module, settings: &JavadocSettings) -> BuildResult<Archive>;
}

/// Source of resolved third-party archives
pub trait DependencyResolver: Send + Sync {
    fn resolve(&self, coordinate: &DependencyCoordinate) -> BuildResult<Archive>;
}

/// Artifact repository upload client
pub trait RepositoryClient {
    fn upload(&self, request: &PublishRequest) -> BuildResult<()>;
}

/// Resolver backed by `forge.lock`
///
/// Artifact paths are relative to the lockfile's directory. Recorded
/// checksums are verified on every read.
#[derive(Debug, Clone)]
pub struct LockfileResolver {
    root: PathBuf,
    lockfile: Lockfile,
}

impl LockfileResolver {
    pub fn new(root: impl Into<PathBuf>, lockfile: Lockfile) -> Self {
        Self {
            root: root.into(),
            lockfile,
        }
    }

    /// Read `forge.lock` from a workspace root; an absent file resolves nothing
    pub fn load(root: &Path) -> BuildResult<Self> {
        let path = root.join(Lockfile::FILE_NAME);
        let lockfile = if path.exists() {
            Lockfile::from_file(&path)?
        } else {
            tracing::debug!(path = %path.display(), "no lockfile; dependency resolution disabled");
            Lockfile::new()
        };
        Ok(Self::new(root, lockfile))
    }

    pub fn lockfile(&self) -> &Lockfile {
        &self.lockfile
    }
}

impl DependencyResolver for LockfileResolver {
    fn resolve(&self, coordinate: &DependencyCoordinate) -> BuildResult<Archive> {
        let artifact = self
            .lockfile
            .get(coordinate)
            .ok_or_else(|| BuildError::resolution(coordinate, "not present in forge.lock"))?;
        let path = self.root.join(&artifact.path);

        if path.is_dir() {
            return Archive::from_dir(&path);
        }

        let bytes = std::fs::read(&path).map_err(|e| BuildError::io(&path, e))?;
        artifact.verify_checksum(&bytes)?;
        tracing::trace!(coordinate = %coordinate, path = %path.display(), "resolved");
        Archive::from_zip_bytes(&bytes)
    }
}

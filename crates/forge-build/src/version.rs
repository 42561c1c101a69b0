//! Root scope: workspace-level values computed once per build
//!
//! The internal version (`<declared>+<build id>`) is computed here before any
//! module is configured and handed to the profile applier by reference.

use crate::error::{BuildError, BuildResult};
use forge_config::Config;
use semver::{BuildMetadata, Version};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Module name used for errors raised at the root scope
pub const ROOT_SCOPE: &str = "<root>";

/// Declared version plus build identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InternalVersion {
    declared: Version,
    full: Version,
}

impl InternalVersion {
    /// Compute `<declared>+<build id>`
    ///
    /// The declared version must not already carry build metadata and the
    /// build identifier must be valid semver build metadata.
    pub fn compute(declared: &Version, build_id: &str) -> BuildResult<Self> {
        if !declared.build.is_empty() {
            return Err(BuildError::configuration(
                ROOT_SCOPE,
                format!(
                    "declared version '{}' already carries build metadata",
                    declared
                ),
            ));
        }

        let build = BuildMetadata::new(build_id).map_err(|e| {
            BuildError::configuration(
                ROOT_SCOPE,
                format!("build identifier '{}' is invalid: {}", build_id, e),
            )
        })?;
        if build.is_empty() {
            return Err(BuildError::configuration(
                ROOT_SCOPE,
                "build identifier cannot be empty",
            ));
        }

        let mut full = declared.clone();
        full.build = build;
        Ok(Self {
            declared: declared.clone(),
            full,
        })
    }

    /// The declared version, without build metadata
    pub fn declared(&self) -> &Version {
        &self.declared
    }

    /// The full version including build metadata
    pub fn as_version(&self) -> &Version {
        &self.full
    }

    /// The build identifier part
    pub fn build_id(&self) -> &str {
        self.full.build.as_str()
    }
}

impl fmt::Display for InternalVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full)
    }
}

/// Checkstyle inputs shared by every module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckstyleSettings {
    /// Absolute rule file
    pub config_file: PathBuf,
    /// Checkstyle version
    pub tool_version: String,
}

/// Versions of the conventional dependencies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyVersions {
    pub junit: String,
    pub mockito: String,
    pub jsr305: String,
}

impl Default for DependencyVersions {
    fn default() -> Self {
        Self {
            junit: forge_config::VersionsConfig::JUNIT.to_string(),
            mockito: forge_config::VersionsConfig::MOCKITO.to_string(),
            jsr305: forge_config::VersionsConfig::JSR305.to_string(),
        }
    }
}

/// Artifact repository shared by every module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySettings {
    pub url: String,
    pub releases_repo: String,
    pub snapshots_repo: String,
}

/// Workspace-level values, read-only once modules are configured
#[derive(Debug, Clone)]
pub struct RootScope {
    root: PathBuf,
    group: String,
    version: Version,
    internal_version: Option<InternalVersion>,
    sources_allow_list: BTreeMap<String, bool>,
    checkstyle: CheckstyleSettings,
    versions: DependencyVersions,
    repository: Option<RepositorySettings>,
}

impl RootScope {
    /// Create a root scope without an internal version
    pub fn new(root: impl Into<PathBuf>, group: impl Into<String>, version: Version) -> Self {
        let root = root.into();
        let checkstyle = CheckstyleSettings {
            config_file: root.join(forge_config::project::DEFAULT_CHECKSTYLE_CONFIG),
            tool_version: forge_config::project::DEFAULT_CHECKSTYLE_VERSION.to_string(),
        };
        Self {
            root,
            group: group.into(),
            version,
            internal_version: None,
            sources_allow_list: BTreeMap::new(),
            checkstyle,
            versions: DependencyVersions::default(),
            repository: None,
        }
    }

    /// Build the root scope from loaded configuration
    ///
    /// The internal version is established when a build identifier is known.
    pub fn from_config(config: &Config) -> BuildResult<Self> {
        let project = &config.project;
        let version = Version::parse(&project.project.version).map_err(|e| {
            BuildError::configuration(
                ROOT_SCOPE,
                format!("invalid version '{}': {}", project.project.version, e),
            )
        })?;

        let mut scope = Self::new(&config.root, &project.project.group, version)
            .with_sources_allow_list(project.publish_sources.clone())
            .with_checkstyle(CheckstyleSettings {
                config_file: config.checkstyle_config_file(),
                tool_version: project.checkstyle.tool_version().to_string(),
            })
            .with_versions(DependencyVersions {
                junit: project.versions.junit().to_string(),
                mockito: project.versions.mockito().to_string(),
                jsr305: project.versions.jsr305().to_string(),
            });

        if let Some(publishing) = &project.publishing {
            scope = scope.with_repository(RepositorySettings {
                url: publishing.url.clone(),
                releases_repo: publishing.releases_repo.clone(),
                snapshots_repo: publishing.snapshots_repo.clone(),
            });
        }

        match &config.build_id {
            Some(build_id) => scope.with_build_id(build_id),
            None => {
                tracing::warn!("no build identifier available; internal version not established");
                Ok(scope)
            }
        }
    }

    /// Establish the internal version from a build identifier
    pub fn with_build_id(mut self, build_id: &str) -> BuildResult<Self> {
        let internal = InternalVersion::compute(&self.version, build_id)?;
        tracing::debug!(internal_version = %internal, "computed internal version");
        self.internal_version = Some(internal);
        Ok(self)
    }

    /// Set the sources allow-list (module name -> publish sources)
    pub fn with_sources_allow_list(mut self, allow_list: BTreeMap<String, bool>) -> Self {
        self.sources_allow_list = allow_list;
        self
    }

    /// Set checkstyle inputs
    pub fn with_checkstyle(mut self, checkstyle: CheckstyleSettings) -> Self {
        self.checkstyle = checkstyle;
        self
    }

    /// Set conventional dependency versions
    pub fn with_versions(mut self, versions: DependencyVersions) -> Self {
        self.versions = versions;
        self
    }

    /// Set the artifact repository
    pub fn with_repository(mut self, repository: RepositorySettings) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn internal_version(&self) -> Option<&InternalVersion> {
        self.internal_version.as_ref()
    }

    /// Internal version, or a configuration error scoped to `module`
    pub fn require_internal_version(&self, module: &str) -> BuildResult<&InternalVersion> {
        self.internal_version.as_ref().ok_or_else(|| {
            BuildError::configuration(
                module,
                "internal version has not been established by the root scope (no build identifier)",
            )
        })
    }

    /// Whether a module is on the sources allow-list
    pub fn publishes_sources(&self, module: &str) -> bool {
        self.sources_allow_list.get(module).copied().unwrap_or(false)
    }

    pub fn checkstyle(&self) -> &CheckstyleSettings {
        &self.checkstyle
    }

    pub fn versions(&self) -> &DependencyVersions {
        &self.versions
    }

    pub fn repository(&self) -> Option<&RepositorySettings> {
        self.repository.as_ref()
    }
}

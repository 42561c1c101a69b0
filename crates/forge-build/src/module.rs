//! Module model
//!
//! A module is the unit every profile step, the merge engine and the
//! publication manager mutate. All collections are ordered sets/maps so that
//! repeated configuration yields identical state.

use crate::error::{BuildError, BuildResult};
use crate::publication::{Publication, RepositoryTarget, SoftwareComponent};
use crate::shadow::MergeSpec;
use crate::tasks::TaskGraph;
use crate::version::{CheckstyleSettings, InternalVersion, RootScope};
use forge_config::ModuleConfig;
use forge_package::{CoordinatePattern, DependencyCoordinate, DependencyScope};
use semver::Version;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// Compiler settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileSettings {
    /// Target language-level revision
    pub release: u32,
    pub encoding: String,
}

/// Documentation generator settings
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JavadocSettings {
    /// Raw options (`-Xdoclint:none`, `-quiet`)
    pub options: Vec<String>,
    /// Custom tag definitions (`name:placement:header`)
    pub tags: Vec<String>,
}

/// Test runner used by the `test` task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestRunner {
    JUnitPlatform,
}

impl TestRunner {
    pub fn name(&self) -> &'static str {
        match self {
            Self::JUnitPlatform => "junit-platform",
        }
    }
}

/// Test execution settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSettings {
    pub runner: TestRunner,
}

/// Kind of artifact a module produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactKind {
    /// The canonical, unmerged jar
    Primary,
    Sources,
    Javadoc,
    /// The merged distributable
    Merged,
}

impl ArtifactKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Sources => "sources",
            Self::Javadoc => "javadoc",
            Self::Merged => "merged",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// An artifact declared by a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    /// Classifier appended to the file name (`sources`, `javadoc`, `dist`)
    pub classifier: Option<String>,
    pub file_name: String,
    /// Task that produces the artifact
    pub task: String,
}

/// A named build unit
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub name: String,
    pub group: String,
    /// Declared version
    pub version: Version,
    /// Module directory, relative to the workspace root
    pub dir: PathBuf,
    /// Prebuilt output (directory or jar), relative to the workspace root
    pub output: Option<PathBuf>,
    /// Source directory, relative to the workspace root
    pub sources: Option<PathBuf>,
    /// Owned modules this module depends on
    pub project_dependencies: BTreeSet<String>,
    /// External dependencies by scope
    pub dependencies: BTreeMap<DependencyScope, BTreeSet<DependencyCoordinate>>,
    /// Coordinates the module must not depend on
    pub banned: BTreeSet<CoordinatePattern>,
    /// Merge settings declared in configuration
    pub declared_shadow: Option<MergeSpec>,

    /// Profiles applied so far, in order
    pub applied_profiles: Vec<String>,
    pub internal_version: Option<InternalVersion>,
    pub compile: Option<CompileSettings>,
    pub checkstyle: Option<CheckstyleSettings>,
    pub javadoc: Option<JavadocSettings>,
    pub test: Option<TestSettings>,
    /// Active merge settings (set by the shadow profile)
    pub merge_spec: Option<MergeSpec>,
    pub repository: Option<RepositoryTarget>,
    pub tasks: TaskGraph,
    pub artifacts: BTreeMap<ArtifactKind, Artifact>,
    pub component: Option<SoftwareComponent>,
    pub publications: BTreeMap<String, Publication>,
}

impl Module {
    /// Create an unconfigured module
    pub fn new(name: impl Into<String>, group: impl Into<String>, version: Version) -> Self {
        let name = name.into();
        Self {
            dir: PathBuf::from(&name),
            tasks: TaskGraph::new(&name),
            name,
            group: group.into(),
            version,
            output: None,
            sources: None,
            project_dependencies: BTreeSet::new(),
            dependencies: BTreeMap::new(),
            banned: BTreeSet::new(),
            declared_shadow: None,
            applied_profiles: Vec::new(),
            internal_version: None,
            compile: None,
            checkstyle: None,
            javadoc: None,
            test: None,
            merge_spec: None,
            repository: None,
            artifacts: BTreeMap::new(),
            component: None,
            publications: BTreeMap::new(),
        }
    }

    /// Build a module from its configuration entry
    pub fn from_config(config: &ModuleConfig, scope: &RootScope) -> BuildResult<Self> {
        let mut module = Self::new(&config.name, scope.group(), scope.version().clone())
            .with_dir(config.path());
        module.output = config.output.clone();
        module.sources = config.sources.clone();

        for dependency in &config.project_dependencies {
            module.project_dependencies.insert(dependency.clone());
        }

        for (scope_name, coordinates) in &config.dependencies {
            let scope: DependencyScope = scope_name
                .parse()
                .map_err(|e| BuildError::configuration(&config.name, e))?;
            for coordinate in coordinates {
                let coordinate: DependencyCoordinate = coordinate
                    .parse()
                    .map_err(|e| BuildError::configuration(&config.name, e))?;
                module.add_dependency(scope, coordinate);
            }
        }

        if let Some(shadow) = &config.shadow {
            module.declared_shadow = Some(MergeSpec::from_config(&config.name, shadow)?);
        }

        Ok(module)
    }

    /// Set the module directory
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    /// Set the prebuilt output location
    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Declare merge settings
    pub fn with_shadow(mut self, spec: MergeSpec) -> Self {
        self.declared_shadow = Some(spec);
        self
    }

    /// Coordinate of the module's canonical publication
    pub fn coordinate(&self) -> DependencyCoordinate {
        DependencyCoordinate::new(&self.group, &self.name, self.version.to_string())
    }

    /// Declare a dependency; returns false if already declared
    pub fn add_dependency(&mut self, scope: DependencyScope, coordinate: DependencyCoordinate) -> bool {
        self.dependencies.entry(scope).or_default().insert(coordinate)
    }

    /// Dependencies declared in a scope
    pub fn dependencies_in(&self, scope: DependencyScope) -> impl Iterator<Item = &DependencyCoordinate> {
        self.dependencies.get(&scope).into_iter().flatten()
    }

    /// Every declared dependency with its scope
    pub fn all_dependencies(&self) -> impl Iterator<Item = (DependencyScope, &DependencyCoordinate)> {
        self.dependencies
            .iter()
            .flat_map(|(scope, coordinates)| coordinates.iter().map(move |c| (*scope, c)))
    }

    /// Forbid a dependency pattern
    pub fn ban(&mut self, pattern: CoordinatePattern) -> bool {
        self.banned.insert(pattern)
    }

    /// Declared dependencies matching a banned pattern
    pub fn banned_dependencies(&self) -> Vec<(&CoordinatePattern, &DependencyCoordinate)> {
        let mut found = Vec::new();
        for pattern in &self.banned {
            for (_, coordinate) in self.all_dependencies() {
                if pattern.matches(coordinate) {
                    found.push((pattern, coordinate));
                }
            }
        }
        found
    }

    /// File name for an artifact of this module
    pub fn artifact_file_name(&self, classifier: Option<&str>) -> String {
        match classifier {
            Some(classifier) => format!("{}-{}-{}.jar", self.name, self.version, classifier),
            None => format!("{}-{}.jar", self.name, self.version),
        }
    }

    /// Declare an artifact; returns false if an identical one already existed
    pub fn add_artifact(&mut self, kind: ArtifactKind, classifier: Option<&str>, task: &str) -> bool {
        let artifact = Artifact {
            kind,
            classifier: classifier.map(str::to_string),
            file_name: self.artifact_file_name(classifier),
            task: task.to_string(),
        };
        if self.artifacts.get(&kind) == Some(&artifact) {
            return false;
        }
        self.artifacts.insert(kind, artifact);
        true
    }

    pub fn artifact(&self, kind: ArtifactKind) -> Option<&Artifact> {
        self.artifacts.get(&kind)
    }

    pub fn has_profile(&self, profile: &str) -> bool {
        self.applied_profiles.iter().any(|p| p == profile)
    }

    /// Module directory resolved against a workspace root
    pub fn dir_in(&self, root: &Path) -> PathBuf {
        root.join(&self.dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn module() -> Module {
        Module::new(
            "worldguard-core",
            "com.sk89q.worldguard",
            Version::parse("7.0.9-SNAPSHOT").unwrap(),
        )
    }

    #[test]
    fn test_dependencies_are_sets() {
        let mut module = module();
        let jsr305: DependencyCoordinate = "com.google.code.findbugs:jsr305:3.0.2".parse().unwrap();
        assert!(module.add_dependency(DependencyScope::CompileOnly, jsr305.clone()));
        assert!(!module.add_dependency(DependencyScope::CompileOnly, jsr305.clone()));
        assert!(module.add_dependency(DependencyScope::TestCompileOnly, jsr305));
        assert_eq!(module.all_dependencies().count(), 2);
    }

    #[test]
    fn test_artifact_file_names() {
        let module = module();
        assert_eq!(
            module.artifact_file_name(None),
            "worldguard-core-7.0.9-SNAPSHOT.jar"
        );
        assert_eq!(
            module.artifact_file_name(Some("dist")),
            "worldguard-core-7.0.9-SNAPSHOT-dist.jar"
        );
    }

    #[test]
    fn test_banned_dependencies() {
        let mut module = module();
        module.add_dependency(
            DependencyScope::Implementation,
            "org.slf4j:slf4j-api:1.7.36".parse().unwrap(),
        );
        module.ban("org.slf4j:slf4j-api".parse().unwrap());
        let banned = module.banned_dependencies();
        assert_eq!(banned.len(), 1);
        assert_eq!(banned[0].1.to_string(), "org.slf4j:slf4j-api:1.7.36");
    }

    #[test]
    fn test_from_config() {
        let scope = RootScope::new(
            "/ws",
            "com.sk89q.worldguard",
            Version::parse("7.0.9-SNAPSHOT").unwrap(),
        );
        let mut config = ModuleConfig::new("worldguard-bukkit");
        config.project_dependencies.push("worldguard-core".to_string());
        config.dependencies.insert(
            "api".to_string(),
            vec!["com.sk89q.worldedit:worldedit-core:7.2.0".to_string()],
        );

        let module = Module::from_config(&config, &scope).unwrap();
        assert_eq!(module.group, "com.sk89q.worldguard");
        assert_eq!(module.dir, PathBuf::from("worldguard-bukkit"));
        assert!(module.project_dependencies.contains("worldguard-core"));
        assert_eq!(module.dependencies_in(DependencyScope::Api).count(), 1);
    }
}

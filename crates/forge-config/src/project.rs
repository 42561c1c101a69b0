//! Workspace Configuration (forge.toml)
//!
//! Typed sections of the workspace configuration file plus the validation
//! that can be done without looking at anything outside the file.

use crate::{ConfigError, ConfigResult};
use forge_package::{CoordinatePattern, DependencyCoordinate, DependencyScope, Validator};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Default target language level
pub const DEFAULT_JAVA_RELEASE: u32 = 17;

/// Default checkstyle rule file, relative to the workspace root
pub const DEFAULT_CHECKSTYLE_CONFIG: &str = "config/checkstyle/checkstyle.xml";

/// Default checkstyle tool version
pub const DEFAULT_CHECKSTYLE_VERSION: &str = "10.3";

/// Workspace configuration from forge.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Project coordinates
    pub project: ProjectSection,

    /// Profile options
    #[serde(default)]
    pub options: OptionsConfig,

    /// Modules that publish their sources artifact (name -> enabled)
    #[serde(default, rename = "publish-sources")]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub publish_sources: BTreeMap<String, bool>,

    /// Checkstyle configuration
    #[serde(default)]
    pub checkstyle: CheckstyleConfig,

    /// Versions of the conventional test and annotation dependencies
    #[serde(default)]
    pub versions: VersionsConfig,

    /// Artifact repository configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publishing: Option<PublishingConfig>,

    /// Module declarations
    #[serde(default, rename = "module")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<ModuleConfig>,
}

/// `[project]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ProjectSection {
    /// Group shared by all modules
    pub group: String,

    /// Declared version (semver)
    pub version: String,

    /// Build identifier appended to the internal version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_id: Option<String>,

    /// Output directory (default: "build")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_dir: Option<PathBuf>,
}

/// `[options]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct OptionsConfig {
    /// Target language-level revision (default: 17)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub java_release: Option<u32>,

    /// Produce a sources artifact (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources_jar: Option<bool>,

    /// Forbid the slf4j logging facade (default: false)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ban_slf4j: Option<bool>,
}

/// `[checkstyle]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct CheckstyleConfig {
    /// Rule file, relative to the workspace root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,

    /// Checkstyle version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_version: Option<String>,
}

impl CheckstyleConfig {
    /// Rule file, falling back to the conventional location
    pub fn config_file(&self) -> &Path {
        self.config_file
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_CHECKSTYLE_CONFIG))
    }

    /// Tool version, falling back to the default
    pub fn tool_version(&self) -> &str {
        self.tool_version
            .as_deref()
            .unwrap_or(DEFAULT_CHECKSTYLE_VERSION)
    }
}

/// `[versions]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct VersionsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub junit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mockito: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jsr305: Option<String>,
}

impl VersionsConfig {
    pub const JUNIT: &'static str = "5.9.1";
    pub const MOCKITO: &'static str = "4.9.0";
    pub const JSR305: &'static str = "3.0.2";

    pub fn junit(&self) -> &str {
        self.junit.as_deref().unwrap_or(Self::JUNIT)
    }

    pub fn mockito(&self) -> &str {
        self.mockito.as_deref().unwrap_or(Self::MOCKITO)
    }

    pub fn jsr305(&self) -> &str {
        self.jsr305.as_deref().unwrap_or(Self::JSR305)
    }
}

/// `[publishing]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct PublishingConfig {
    /// Repository base URL
    pub url: String,
    /// Repository key for release versions
    pub releases_repo: String,
    /// Repository key for snapshot versions
    pub snapshots_repo: String,
}

/// `[[module]]` entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ModuleConfig {
    /// Module name (unique in the workspace)
    pub name: String,

    /// Module directory, relative to the workspace root (default: name)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Profiles to apply, in order
    #[serde(default)]
    pub profiles: Vec<String>,

    /// Compiled output (directory or jar), relative to the workspace root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    /// Source directory, relative to the workspace root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<PathBuf>,

    /// Owned modules this module depends on
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub project_dependencies: Vec<String>,

    /// External dependencies by scope name
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, Vec<String>>,

    /// Shadow (merged artifact) settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shadow: Option<ShadowConfig>,
}

impl ModuleConfig {
    /// Create a module declaration with no settings
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            profiles: Vec::new(),
            output: None,
            sources: None,
            project_dependencies: Vec::new(),
            dependencies: BTreeMap::new(),
            shadow: None,
        }
    }

    /// Module directory relative to the workspace root
    pub fn path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| PathBuf::from(&self.name))
    }
}

/// `[module.shadow]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ShadowConfig {
    /// Artifact classifier (default: "dist")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,

    /// Owned modules folded into the artifact, in precedence order
    #[serde(default)]
    pub include_modules: Vec<String>,

    /// Third-party coordinates folded into the artifact
    #[serde(default)]
    pub include_dependencies: Vec<String>,

    /// Coordinate patterns never folded in
    #[serde(default)]
    pub exclude_dependencies: Vec<String>,

    /// Path globs dropped from the artifact
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Namespace relocations
    #[serde(default)]
    pub relocate: Vec<RelocateConfig>,

    /// Extra manifest attributes
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub manifest: BTreeMap<String, String>,
}

/// `[[module.shadow.relocate]]` entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct RelocateConfig {
    /// Source package prefix
    pub from: String,
    /// Target package prefix
    pub to: String,
    /// Coordinates the relocation applies to (empty: every included dependency)
    #[serde(default)]
    pub applies_to: Vec<String>,
}

impl ProjectConfig {
    /// Load workspace configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config = Self::parse(&content).map_err(|e| match e {
            ConfigError::TomlParseError { error, .. } => ConfigError::TomlParseError {
                file: path.to_path_buf(),
                error,
            },
            other => other,
        })?;
        Ok(config)
    }

    /// Parse and validate configuration from a TOML string
    pub fn parse(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::TomlParseError {
            file: PathBuf::from("<string>"),
            error: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the workspace configuration
    pub fn validate(&self) -> ConfigResult<()> {
        Validator::validate_group(&self.project.group).map_err(|e| ConfigError::InvalidValue {
            field: "project.group".to_string(),
            reason: e.to_string(),
        })?;

        semver::Version::parse(&self.project.version)
            .map_err(|_| ConfigError::InvalidVersion(self.project.version.clone()))?;

        if let Some(release) = self.options.java_release {
            validate_java_release(release)?;
        }

        let mut names = HashSet::new();
        for module in &self.modules {
            Validator::validate_module_name(&module.name).map_err(|e| {
                ConfigError::InvalidValue {
                    field: "module.name".to_string(),
                    reason: e.to_string(),
                }
            })?;
            if !names.insert(module.name.as_str()) {
                return Err(ConfigError::DuplicateModule(module.name.clone()));
            }
        }

        for module in &self.modules {
            module.validate(&names)?;
        }

        for name in self.publish_sources.keys() {
            if !names.contains(name.as_str()) {
                return Err(ConfigError::UnknownModule {
                    module: "publish-sources".to_string(),
                    reference: name.clone(),
                });
            }
        }

        Ok(())
    }

    /// Get a module declaration by name
    pub fn module(&self, name: &str) -> Option<&ModuleConfig> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// Effective sources allow-list entry for a module
    pub fn publishes_sources(&self, module: &str) -> bool {
        self.publish_sources.get(module).copied().unwrap_or(false)
    }
}

impl ModuleConfig {
    fn validate(&self, known_modules: &HashSet<&str>) -> ConfigResult<()> {
        let field = |suffix: &str| format!("module.{}.{}", self.name, suffix);

        for reference in &self.project_dependencies {
            if !known_modules.contains(reference.as_str()) {
                return Err(ConfigError::UnknownModule {
                    module: self.name.clone(),
                    reference: reference.clone(),
                });
            }
        }

        for (scope, coordinates) in &self.dependencies {
            scope
                .parse::<DependencyScope>()
                .map_err(|e| ConfigError::InvalidValue {
                    field: field("dependencies"),
                    reason: e.to_string(),
                })?;
            for coordinate in coordinates {
                parse_coordinate(coordinate, &field("dependencies"))?;
            }
        }

        if let Some(shadow) = &self.shadow {
            for reference in &shadow.include_modules {
                if !known_modules.contains(reference.as_str()) {
                    return Err(ConfigError::UnknownModule {
                        module: self.name.clone(),
                        reference: reference.clone(),
                    });
                }
            }
            for coordinate in &shadow.include_dependencies {
                parse_coordinate(coordinate, &field("shadow.include-dependencies"))?;
            }
            for pattern in &shadow.exclude_dependencies {
                pattern
                    .parse::<CoordinatePattern>()
                    .map_err(|e| ConfigError::InvalidValue {
                        field: field("shadow.exclude-dependencies"),
                        reason: e.to_string(),
                    })?;
            }
            for relocate in &shadow.relocate {
                for prefix in [&relocate.from, &relocate.to] {
                    Validator::validate_package_name(prefix).map_err(|e| {
                        ConfigError::InvalidValue {
                            field: field("shadow.relocate"),
                            reason: e.to_string(),
                        }
                    })?;
                }
                for coordinate in &relocate.applies_to {
                    parse_coordinate(coordinate, &field("shadow.relocate.applies-to"))?;
                }
            }
            if let Some(classifier) = &shadow.classifier {
                if classifier.is_empty() || classifier.contains(['/', ':', ' ']) {
                    return Err(ConfigError::InvalidValue {
                        field: field("shadow.classifier"),
                        reason: format!("'{}' is not a valid classifier", classifier),
                    });
                }
            }
        }

        Ok(())
    }
}

/// Check a language level is one we can target
pub fn validate_java_release(release: u32) -> ConfigResult<()> {
    if !(8..=99).contains(&release) {
        return Err(ConfigError::InvalidValue {
            field: "options.java-release".to_string(),
            reason: format!("{} is not a supported release (8 or newer)", release),
        });
    }
    Ok(())
}

fn parse_coordinate(input: &str, field: &str) -> ConfigResult<DependencyCoordinate> {
    let coordinate: DependencyCoordinate =
        input.parse().map_err(|e: forge_package::PackageError| ConfigError::InvalidValue {
            field: field.to_string(),
            reason: e.to_string(),
        })?;
    Validator::validate_coordinate(&coordinate).map_err(|e| ConfigError::InvalidValue {
        field: field.to_string(),
        reason: e.to_string(),
    })?;
    Ok(coordinate)
}

//! Dependency coordinates, coordinate patterns and scopes

use crate::{PackageError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Resolved identity of an artifact: `group:name:version`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DependencyCoordinate {
    pub group: String,
    pub name: String,
    pub version: String,
}

impl DependencyCoordinate {
    /// Create a coordinate from its parts
    pub fn new(
        group: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            version: version.into(),
        }
    }

    /// `group:name` without the version
    pub fn module_id(&self) -> String {
        format!("{}:{}", self.group, self.name)
    }

    /// Check whether two coordinates name the same module, ignoring version
    pub fn same_module(&self, other: &DependencyCoordinate) -> bool {
        self.group == other.group && self.name == other.name
    }
}

impl FromStr for DependencyCoordinate {
    type Err = PackageError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 3 {
            return Err(PackageError::InvalidCoordinate {
                input: s.to_string(),
                reason: "expected group:name:version".to_string(),
            });
        }
        if let Some(empty) = ["group", "name", "version"]
            .iter()
            .zip(&parts)
            .find(|(_, part)| part.trim().is_empty())
        {
            return Err(PackageError::InvalidCoordinate {
                input: s.to_string(),
                reason: format!("{} cannot be empty", empty.0),
            });
        }
        Ok(Self::new(parts[0], parts[1], parts[2]))
    }
}

impl TryFrom<String> for DependencyCoordinate {
    type Error = PackageError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<DependencyCoordinate> for String {
    fn from(value: DependencyCoordinate) -> Self {
        value.to_string()
    }
}

impl fmt::Display for DependencyCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.version)
    }
}

/// Pattern over coordinates: `group:name[:version]`
///
/// Each segment is either a literal or `*`. A missing version segment matches
/// every version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CoordinatePattern {
    group: String,
    name: String,
    version: Option<String>,
}

impl CoordinatePattern {
    const WILDCARD: &'static str = "*";

    /// Pattern matching exactly one coordinate
    pub fn exact(coordinate: &DependencyCoordinate) -> Self {
        Self {
            group: coordinate.group.clone(),
            name: coordinate.name.clone(),
            version: Some(coordinate.version.clone()),
        }
    }

    /// Check whether a coordinate matches this pattern
    pub fn matches(&self, coordinate: &DependencyCoordinate) -> bool {
        segment_matches(&self.group, &coordinate.group)
            && segment_matches(&self.name, &coordinate.name)
            && self
                .version
                .as_deref()
                .map_or(true, |v| segment_matches(v, &coordinate.version))
    }

    /// Whether this pattern can only ever match a single coordinate
    pub fn is_exact(&self) -> bool {
        self.group != Self::WILDCARD
            && self.name != Self::WILDCARD
            && self
                .version
                .as_deref()
                .is_some_and(|v| v != Self::WILDCARD)
    }

    /// The coordinate this pattern names, when it is exact
    pub fn as_coordinate(&self) -> Option<DependencyCoordinate> {
        if !self.is_exact() {
            return None;
        }
        Some(DependencyCoordinate::new(
            self.group.clone(),
            self.name.clone(),
            self.version.clone().unwrap_or_default(),
        ))
    }
}

fn segment_matches(pattern: &str, value: &str) -> bool {
    pattern == CoordinatePattern::WILDCARD || pattern == value
}

impl FromStr for CoordinatePattern {
    type Err = PackageError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        if !(2..=3).contains(&parts.len()) || parts.iter().any(|p| p.trim().is_empty()) {
            return Err(PackageError::InvalidCoordinate {
                input: s.to_string(),
                reason: "expected group:name or group:name:version".to_string(),
            });
        }
        Ok(Self {
            group: parts[0].to_string(),
            name: parts[1].to_string(),
            version: parts.get(2).map(|v| v.to_string()),
        })
    }
}

impl TryFrom<String> for CoordinatePattern {
    type Error = PackageError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<CoordinatePattern> for String {
    fn from(value: CoordinatePattern) -> Self {
        value.to_string()
    }
}

impl fmt::Display for CoordinatePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}:{}:{}", self.group, self.name, version),
            None => write!(f, "{}:{}", self.group, self.name),
        }
    }
}

/// Dependency scope (configuration a dependency is declared in)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DependencyScope {
    /// Part of the module's public API
    Api,
    /// Needed to compile and run, not exposed to consumers
    Implementation,
    /// Compile classpath only
    CompileOnly,
    /// Runtime classpath only
    RuntimeOnly,
    /// Test compile and runtime
    TestImplementation,
    /// Test compile classpath only
    TestCompileOnly,
    /// Test runtime classpath only
    TestRuntimeOnly,
}

impl DependencyScope {
    /// Get scope name as it appears in build scripts
    pub fn name(&self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Implementation => "implementation",
            Self::CompileOnly => "compileOnly",
            Self::RuntimeOnly => "runtimeOnly",
            Self::TestImplementation => "testImplementation",
            Self::TestCompileOnly => "testCompileOnly",
            Self::TestRuntimeOnly => "testRuntimeOnly",
        }
    }

    /// All scopes in declaration order
    pub fn all() -> [DependencyScope; 7] {
        [
            Self::Api,
            Self::Implementation,
            Self::CompileOnly,
            Self::RuntimeOnly,
            Self::TestImplementation,
            Self::TestCompileOnly,
            Self::TestRuntimeOnly,
        ]
    }

    /// Whether dependencies in this scope reach the main runtime classpath
    pub fn on_runtime_classpath(&self) -> bool {
        matches!(self, Self::Api | Self::Implementation | Self::RuntimeOnly)
    }

    /// Whether dependencies in this scope are visible to API consumers
    pub fn on_api_surface(&self) -> bool {
        matches!(self, Self::Api)
    }

    /// Whether this is a test-only scope
    pub fn is_test(&self) -> bool {
        matches!(
            self,
            Self::TestImplementation | Self::TestCompileOnly | Self::TestRuntimeOnly
        )
    }
}

impl FromStr for DependencyScope {
    type Err = PackageError;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .into_iter()
            .find(|scope| scope.name() == s)
            .ok_or_else(|| PackageError::UnknownScope(s.to_string()))
    }
}

impl fmt::Display for DependencyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

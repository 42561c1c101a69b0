//! Merge specification and relocation rules

use crate::error::{BuildError, BuildResult};
use crate::shadow::pattern::PathPattern;
use forge_config::ShadowConfig;
use forge_package::{CoordinatePattern, DependencyCoordinate};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// Classifier of the merged artifact unless configured otherwise
pub const DEFAULT_CLASSIFIER: &str = "dist";

/// Paths dropped from every merged artifact by the conventional rule table
pub const DEFAULT_EXCLUDES: [&str; 4] = ["GradleStart**", ".cache", "LICENSE*", "META-INF/maven/**"];

/// Dependencies never folded in by the conventional rule table
pub const DEFAULT_EXCLUDED_DEPENDENCIES: [&str; 1] = ["com.google.code.findbugs:jsr305"];

/// Namespace relocation: `from` prefix becomes `to` in matching dependencies
///
/// Prefixes are stored in dotted form (`org.flywaydb`). An empty
/// applicability set means every included third-party dependency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelocationRule {
    from: String,
    to: String,
    applies_to: BTreeSet<DependencyCoordinate>,
}

impl RelocationRule {
    /// Create a rule; accepts dotted or slashed prefixes
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: normalize_prefix(from),
            to: normalize_prefix(to),
            applies_to: BTreeSet::new(),
        }
    }

    /// Restrict the rule to the given coordinates
    pub fn with_applies_to(
        mut self,
        coordinates: impl IntoIterator<Item = DependencyCoordinate>,
    ) -> Self {
        self.applies_to.extend(coordinates);
        self
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn applies_to(&self) -> &BTreeSet<DependencyCoordinate> {
        &self.applies_to
    }

    /// Whether the rule rewrites content of `coordinate`
    pub fn applies_to_coordinate(&self, coordinate: &DependencyCoordinate) -> bool {
        self.applies_to.is_empty() || self.applies_to.contains(coordinate)
    }

    /// Where this rule would send `name` (dotted), if it covers it
    pub fn destination_of(&self, name: &str) -> Option<String> {
        if name == self.from {
            return Some(self.to.clone());
        }
        name.strip_prefix(&self.from)
            .and_then(|rest| rest.strip_prefix('.'))
            .map(|rest| format!("{}.{}", self.to, rest))
    }

    fn overlaps_applicability(&self, other: &RelocationRule) -> bool {
        self.applies_to.is_empty()
            || other.applies_to.is_empty()
            || !self.applies_to.is_disjoint(&other.applies_to)
    }
}

impl fmt::Display for RelocationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

fn normalize_prefix(prefix: &str) -> String {
    prefix.trim().replace('/', ".").trim_matches('.').to_string()
}

/// What to fold into a merged artifact and how
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSpec {
    /// Artifact classifier
    pub classifier: String,
    /// Owned modules, in precedence order
    pub include_modules: Vec<String>,
    /// Third-party coordinates, in precedence order
    pub include_dependencies: Vec<DependencyCoordinate>,
    /// Coordinates never folded in, even when included
    pub exclude_dependencies: Vec<CoordinatePattern>,
    pub relocations: Vec<RelocationRule>,
    /// Path globs dropped from the output
    pub excludes: Vec<String>,
    /// Extra manifest attributes
    pub manifest: BTreeMap<String, String>,
}

impl MergeSpec {
    /// Create an empty spec with the default classifier
    pub fn new() -> Self {
        Self {
            classifier: DEFAULT_CLASSIFIER.to_string(),
            include_modules: Vec::new(),
            include_dependencies: Vec::new(),
            exclude_dependencies: Vec::new(),
            relocations: Vec::new(),
            excludes: Vec::new(),
            manifest: BTreeMap::new(),
        }
    }

    /// The conventional rule table used when a module declares no settings
    pub fn conventional() -> Self {
        let mut spec = Self::new();
        spec.excludes = DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect();
        spec.exclude_dependencies = DEFAULT_EXCLUDED_DEPENDENCIES
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect();
        spec
    }

    /// Build a spec from a `[module.shadow]` section
    pub fn from_config(module: &str, config: &ShadowConfig) -> BuildResult<Self> {
        let parse_coordinate = |input: &str| -> BuildResult<DependencyCoordinate> {
            input
                .parse()
                .map_err(|e| BuildError::configuration(module, e))
        };

        let mut spec = Self::new();
        if let Some(classifier) = &config.classifier {
            spec.classifier = classifier.clone();
        }
        spec.include_modules = config.include_modules.clone();
        for coordinate in &config.include_dependencies {
            spec.include_dependencies.push(parse_coordinate(coordinate)?);
        }
        for pattern in &config.exclude_dependencies {
            spec.exclude_dependencies.push(
                pattern
                    .parse()
                    .map_err(|e| BuildError::configuration(module, e))?,
            );
        }
        for relocate in &config.relocate {
            let applies_to = relocate
                .applies_to
                .iter()
                .map(|c| parse_coordinate(c))
                .collect::<BuildResult<Vec<_>>>()?;
            spec.relocations
                .push(RelocationRule::new(&relocate.from, &relocate.to).with_applies_to(applies_to));
        }
        spec.excludes = config.exclude.clone();
        spec.manifest = config.manifest.clone();
        Ok(spec)
    }

    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = classifier.into();
        self
    }

    pub fn include_module(mut self, module: impl Into<String>) -> Self {
        self.include_modules.push(module.into());
        self
    }

    pub fn include_dependency(mut self, coordinate: DependencyCoordinate) -> Self {
        self.include_dependencies.push(coordinate);
        self
    }

    pub fn exclude_dependency(mut self, pattern: CoordinatePattern) -> Self {
        self.exclude_dependencies.push(pattern);
        self
    }

    pub fn relocate(mut self, rule: RelocationRule) -> Self {
        self.relocations.push(rule);
        self
    }

    pub fn exclude(mut self, glob: impl Into<String>) -> Self {
        self.excludes.push(glob.into());
        self
    }

    pub fn with_manifest_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.manifest.insert(key.into(), value.into());
        self
    }

    /// Whether a dependency is dropped by an exclude pattern
    pub fn excludes_dependency(&self, coordinate: &DependencyCoordinate) -> Option<&CoordinatePattern> {
        self.exclude_dependencies
            .iter()
            .find(|pattern| pattern.matches(coordinate))
    }

    /// Validate the spec and compile it for merging
    ///
    /// Fails with `RelocationConflict` for ambiguous rule sets and with
    /// `Configuration` for ambiguous inclusion order.
    pub fn validate(&self, module: &str) -> BuildResult<ValidatedSpec> {
        if self.classifier.is_empty() || self.classifier.contains(['/', ':', ' ']) {
            return Err(BuildError::configuration(
                module,
                format!("'{}' is not a valid classifier", self.classifier),
            ));
        }

        let mut seen_modules = BTreeSet::new();
        let mut include_modules = Vec::new();
        for included in &self.include_modules {
            if included == module {
                tracing::debug!(module, "own output is always merged; ignoring self-inclusion");
                continue;
            }
            if !seen_modules.insert(included.as_str()) {
                return Err(BuildError::configuration(
                    module,
                    format!("module '{}' is included more than once", included),
                ));
            }
            include_modules.push(included.clone());
        }

        let mut dependencies: Vec<DependencyCoordinate> = Vec::new();
        let mut by_module: HashMap<String, &DependencyCoordinate> = HashMap::new();
        for coordinate in &self.include_dependencies {
            match by_module.get(&coordinate.module_id()) {
                Some(existing) if *existing == coordinate => continue,
                Some(existing) => {
                    return Err(BuildError::configuration(
                        module,
                        format!(
                            "dependency '{}' is included as both {} and {}",
                            coordinate.module_id(),
                            existing.version,
                            coordinate.version
                        ),
                    ));
                }
                None => {
                    by_module.insert(coordinate.module_id(), coordinate);
                    dependencies.push(coordinate.clone());
                }
            }
        }

        let relocations = validate_relocations(module, &self.relocations)?;

        let excludes = self
            .excludes
            .iter()
            .map(|glob| PathPattern::new(glob))
            .collect::<BuildResult<Vec<_>>>()?;

        Ok(ValidatedSpec {
            include_modules,
            include_dependencies: dependencies,
            relocations,
            excludes,
        })
    }
}

impl Default for MergeSpec {
    fn default() -> Self {
        Self::new()
    }
}

/// A spec that passed validation: deduplicated inclusions, conflict-free
/// relocations and compiled exclude patterns
#[derive(Debug, Clone)]
pub struct ValidatedSpec {
    pub include_modules: Vec<String>,
    pub include_dependencies: Vec<DependencyCoordinate>,
    pub relocations: Vec<RelocationRule>,
    pub excludes: Vec<PathPattern>,
}

impl ValidatedSpec {
    /// Rules that rewrite content of `coordinate`
    pub fn relocations_for(&self, coordinate: &DependencyCoordinate) -> Vec<&RelocationRule> {
        self.relocations
            .iter()
            .filter(|rule| rule.applies_to_coordinate(coordinate))
            .collect()
    }
}

/// Check relocation rules pairwise and collapse identical duplicates
///
/// Two rules conflict when their source prefixes overlap, they can apply to
/// the same dependency, and they would send a name to different places.
fn validate_relocations(module: &str, rules: &[RelocationRule]) -> BuildResult<Vec<RelocationRule>> {
    let mut unique: Vec<RelocationRule> = Vec::new();

    for rule in rules {
        for prefix in [&rule.from, &rule.to] {
            forge_package::Validator::validate_package_name(prefix).map_err(|e| {
                BuildError::relocation_conflict(module, rule, rule, e)
            })?;
        }
        if rule.from == rule.to {
            return Err(BuildError::relocation_conflict(
                module,
                rule,
                rule,
                "source and target prefixes are identical",
            ));
        }
        if unique.contains(rule) {
            continue;
        }
        unique.push(rule.clone());
    }

    for (i, first) in unique.iter().enumerate() {
        for second in &unique[i + 1..] {
            if !first.overlaps_applicability(second) {
                continue;
            }

            // The longer prefix is the one both rules can claim
            let (outer, inner) = if first.from.len() <= second.from.len() {
                (first, second)
            } else {
                (second, first)
            };
            let Some(implied) = outer.destination_of(&inner.from) else {
                continue;
            };
            if implied != inner.to {
                return Err(BuildError::relocation_conflict(
                    module,
                    first,
                    second,
                    format!(
                        "'{}' would be relocated to both '{}' and '{}'",
                        inner.from, implied, inner.to
                    ),
                ));
            }
        }
    }

    Ok(unique)
}

//! Merge pipeline: include, relocate, exclude, merge
//!
//! `merge` is a pure function of its inputs. `assemble` runs it for a
//! configured module and records the merged artifact on the module.

use crate::error::{BuildError, BuildResult};
use crate::module::{ArtifactKind, Module};
use crate::publication;
use crate::shadow::archive::{Archive, MANIFEST_PATH};
use crate::shadow::pattern::{matches_any, PathPattern};
use crate::shadow::relocate::Relocator;
use crate::shadow::spec::MergeSpec;
use crate::tasks::names;
use forge_package::DependencyCoordinate;
use rayon::prelude::*;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Maximum manifest line length in bytes, including the continuation space
const MANIFEST_LINE_LIMIT: usize = 72;

/// Identity of the merged artifact being produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeTarget {
    pub name: String,
    pub version: Version,
    /// Written as `Implementation-Version`
    pub implementation_version: String,
}

impl MergeTarget {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        let implementation_version = version.to_string();
        Self {
            name: name.into(),
            version,
            implementation_version,
        }
    }

    pub fn with_implementation_version(mut self, version: impl Into<String>) -> Self {
        self.implementation_version = version.into();
        self
    }

    /// Target for a configured module; requires the internal version
    pub fn from_module(module: &Module) -> BuildResult<Self> {
        let internal = module.internal_version.as_ref().ok_or_else(|| {
            BuildError::configuration(
                &module.name,
                "internal version not set; apply the platform-and-core profile first",
            )
        })?;
        Ok(Self::new(&module.name, module.version.clone())
            .with_implementation_version(internal.to_string()))
    }

    fn file_name(&self, classifier: &str) -> String {
        format!("{}-{}-{}.jar", self.name, self.version, classifier)
    }
}

/// Archives available to the merge: the assembling module's own output,
/// included module outputs and resolved dependencies
#[derive(Debug, Clone, Default)]
pub struct AssemblyInputs {
    own: Option<Archive>,
    modules: BTreeMap<String, Archive>,
    dependencies: BTreeMap<DependencyCoordinate, Archive>,
}

impl AssemblyInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_own_output(mut self, archive: Archive) -> Self {
        self.set_own_output(archive);
        self
    }

    pub fn with_module(mut self, name: impl Into<String>, archive: Archive) -> Self {
        self.add_module(name, archive);
        self
    }

    pub fn with_dependency(mut self, coordinate: DependencyCoordinate, archive: Archive) -> Self {
        self.add_dependency(coordinate, archive);
        self
    }

    /// Compiled output of the module being assembled
    pub fn set_own_output(&mut self, archive: Archive) {
        self.own = Some(archive);
    }

    pub fn add_module(&mut self, name: impl Into<String>, archive: Archive) {
        self.modules.insert(name.into(), archive);
    }

    pub fn add_dependency(&mut self, coordinate: DependencyCoordinate, archive: Archive) {
        self.dependencies.insert(coordinate, archive);
    }

    pub fn own_output(&self) -> Option<&Archive> {
        self.own.as_ref()
    }

    pub fn module(&self, name: &str) -> Option<&Archive> {
        self.modules.get(name)
    }

    pub fn dependency(&self, coordinate: &DependencyCoordinate) -> Option<&Archive> {
        self.dependencies.get(coordinate)
    }
}

/// Where a merged entry came from
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum Origin {
    /// An owned module
    Module(String),
    /// A third-party dependency
    Dependency(DependencyCoordinate),
}

impl Origin {
    pub fn is_owned(&self) -> bool {
        matches!(self, Self::Module(_))
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Module(name) => write!(f, "module {}", name),
            Self::Dependency(coordinate) => write!(f, "dependency {}", coordinate),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedEntry {
    pub origin: Origin,
    pub bytes: Vec<u8>,
}

/// A third-party path collision resolved by inclusion order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collision {
    pub path: String,
    pub kept: Origin,
    pub discarded: Origin,
}

/// Result of a merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedArtifact {
    pub module: String,
    pub classifier: String,
    pub file_name: String,
    pub implementation_version: String,
    pub entries: BTreeMap<String, MergedEntry>,
    pub collisions: Vec<Collision>,
    manifest_attributes: Vec<(String, String)>,
}

impl MergedArtifact {
    pub fn get(&self, path: &str) -> Option<&MergedEntry> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Paths contributed by one origin
    pub fn paths_from<'a>(&'a self, origin: &'a Origin) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(_, entry)| &entry.origin == origin)
            .map(|(path, _)| path.as_str())
    }

    /// Generated `META-INF/MANIFEST.MF`
    pub fn manifest(&self) -> String {
        render_manifest(&self.manifest_attributes)
    }

    /// Entries plus the generated manifest
    pub fn to_archive(&self) -> Archive {
        let mut archive: Archive = self
            .entries
            .iter()
            .map(|(path, entry)| (path.clone(), entry.bytes.clone()))
            .collect();
        archive.insert(MANIFEST_PATH, self.manifest().into_bytes());
        archive
    }

    /// Deterministic jar bytes
    pub fn to_jar_bytes(&self) -> BuildResult<Vec<u8>> {
        self.to_archive().to_zip_bytes()
    }

    /// Write the jar into `dir`, returning its path
    pub fn write_to(&self, dir: &Path) -> BuildResult<PathBuf> {
        fs::create_dir_all(dir).map_err(|e| BuildError::io(dir, e))?;
        let path = dir.join(&self.file_name);
        fs::write(&path, self.to_jar_bytes()?).map_err(|e| BuildError::io(&path, e))?;
        Ok(path)
    }
}

/// Merge the archives selected by `spec` into one artifact
pub fn merge(target: &MergeTarget, spec: &MergeSpec, inputs: &AssemblyInputs) -> BuildResult<MergedArtifact> {
    let validated = spec.validate(&target.name)?;
    let mut merger = Merger {
        module: &target.name,
        excludes: &validated.excludes,
        entries: BTreeMap::new(),
        collisions: Vec::new(),
    };

    if let Some(own) = inputs.own_output() {
        let origin = Origin::Module(target.name.clone());
        for (path, bytes) in own.iter() {
            merger.offer(path, path, &origin, bytes.to_vec())?;
        }
    }

    for name in &validated.include_modules {
        let archive = inputs.module(name).ok_or_else(|| {
            BuildError::configuration(
                &target.name,
                format!("output of included module '{}' is not available", name),
            )
        })?;
        let origin = Origin::Module(name.clone());
        for (path, bytes) in archive.iter() {
            merger.offer(path, path, &origin, bytes.to_vec())?;
        }
    }

    for coordinate in &validated.include_dependencies {
        if let Some(pattern) = spec.excludes_dependency(coordinate) {
            tracing::debug!(
                module = %target.name,
                dependency = %coordinate,
                pattern = %pattern,
                "dependency excluded from merge"
            );
            continue;
        }

        let archive = inputs.dependency(coordinate).ok_or_else(|| {
            BuildError::configuration(
                &target.name,
                format!("resolved artifact for '{}' is not available", coordinate),
            )
        })?;
        let origin = Origin::Dependency(coordinate.clone());

        let relocator = Relocator::new(validated.relocations_for(coordinate));
        if relocator.is_empty() {
            for (path, bytes) in archive.iter() {
                merger.offer(path, path, &origin, bytes.to_vec())?;
            }
            continue;
        }

        let items: Vec<(&str, &[u8])> = archive.iter().collect();
        let relocated = items
            .par_iter()
            .map(|&(path, bytes)| -> BuildResult<(String, String, Vec<u8>)> {
                let (new_path, content) = relocator.relocate_entry(path, bytes)?;
                Ok((path.to_string(), new_path, content.unwrap_or_else(|| bytes.to_vec())))
            })
            .collect::<BuildResult<Vec<_>>>()?;

        tracing::debug!(
            module = %target.name,
            dependency = %coordinate,
            entries = relocated.len(),
            "relocated dependency"
        );

        for (original, new_path, bytes) in relocated {
            merger.offer(&original, &new_path, &origin, bytes)?;
        }
    }

    let mut manifest_attributes = vec![
        ("Manifest-Version".to_string(), "1.0".to_string()),
        (
            "Implementation-Version".to_string(),
            target.implementation_version.clone(),
        ),
    ];
    for (key, value) in &spec.manifest {
        if manifest_attributes
            .iter()
            .any(|(existing, _)| existing.eq_ignore_ascii_case(key))
        {
            tracing::warn!(module = %target.name, attribute = %key, "ignoring reserved manifest attribute");
            continue;
        }
        manifest_attributes.push((key.clone(), value.clone()));
    }

    let artifact = MergedArtifact {
        module: target.name.clone(),
        classifier: spec.classifier.clone(),
        file_name: target.file_name(&spec.classifier),
        implementation_version: target.implementation_version.clone(),
        entries: merger.entries,
        collisions: merger.collisions,
        manifest_attributes,
    };

    tracing::info!(
        module = %artifact.module,
        file = %artifact.file_name,
        entries = artifact.len(),
        collisions = artifact.collisions.len(),
        "merged artifact"
    );

    Ok(artifact)
}

/// Merge for a configured module and record the merged artifact on it
///
/// A merged variant registered here is not suppressed; the shadow profile
/// does that, and the publication policy check reports it otherwise.
pub fn assemble(module: &mut Module, spec: &MergeSpec, inputs: &AssemblyInputs) -> BuildResult<MergedArtifact> {
    let target = MergeTarget::from_module(module)?;
    let artifact = merge(&target, spec, inputs)?;

    module.add_artifact(ArtifactKind::Merged, Some(&spec.classifier), names::SHADOW_JAR);
    publication::add_merged_variant(module);

    Ok(artifact)
}

struct Merger<'a> {
    module: &'a str,
    excludes: &'a [PathPattern],
    entries: BTreeMap<String, MergedEntry>,
    collisions: Vec<Collision>,
}

impl Merger<'_> {
    /// Offer one entry; `original` is its path before relocation
    fn offer(&mut self, original: &str, path: &str, origin: &Origin, bytes: Vec<u8>) -> BuildResult<()> {
        if is_always_dropped(original) {
            return Ok(());
        }
        if let Some(pattern) = matches_any(self.excludes, original).or_else(|| matches_any(self.excludes, path)) {
            tracing::trace!(path, pattern = %pattern, "excluded");
            return Ok(());
        }

        let Some(existing) = self.entries.get(path) else {
            self.entries.insert(
                path.to_string(),
                MergedEntry {
                    origin: origin.clone(),
                    bytes,
                },
            );
            return Ok(());
        };

        match (existing.origin.is_owned(), origin.is_owned()) {
            (true, true) => Err(BuildError::assembly(
                self.module,
                path,
                existing.origin.to_string(),
                origin.to_string(),
            )),
            (true, false) => {
                tracing::debug!(path, kept = %existing.origin, discarded = %origin, "owned content wins");
                Ok(())
            }
            (false, true) => {
                tracing::debug!(path, kept = %origin, discarded = %existing.origin, "owned content wins");
                self.entries.insert(
                    path.to_string(),
                    MergedEntry {
                        origin: origin.clone(),
                        bytes,
                    },
                );
                Ok(())
            }
            (false, false) => {
                if existing.bytes == bytes {
                    return Ok(());
                }
                tracing::warn!(
                    module = self.module,
                    path,
                    kept = %existing.origin,
                    discarded = %origin,
                    "duplicate path in dependencies; keeping first"
                );
                self.collisions.push(Collision {
                    path: path.to_string(),
                    kept: existing.origin.clone(),
                    discarded: origin.clone(),
                });
                Ok(())
            }
        }
    }
}

/// Input entries that never reach a merged artifact
///
/// Manifests are regenerated, and signatures no longer match rewritten
/// content.
pub fn is_always_dropped(path: &str) -> bool {
    if path == MANIFEST_PATH || path == "META-INF/INDEX.LIST" {
        return true;
    }
    match path.strip_prefix("META-INF/") {
        Some(name) if !name.contains('/') => {
            let upper = name.to_ascii_uppercase();
            [".SF", ".DSA", ".RSA", ".EC"]
                .iter()
                .any(|ext| upper.ends_with(ext))
        }
        _ => false,
    }
}

/// Render manifest attributes with CRLF line endings and 72-byte wrapping
pub fn render_manifest(attributes: &[(String, String)]) -> String {
    let mut out = String::new();
    for (key, value) in attributes {
        let line = format!("{}: {}", key, value);
        let mut current = String::new();
        let mut first = true;
        for c in line.chars() {
            let limit = if first {
                MANIFEST_LINE_LIMIT
            } else {
                MANIFEST_LINE_LIMIT - 1
            };
            if current.len() + c.len_utf8() > limit {
                if !first {
                    out.push(' ');
                }
                out.push_str(&current);
                out.push_str("\r\n");
                current.clear();
                first = false;
            }
            current.push(c);
        }
        if !first {
            out.push(' ');
        }
        out.push_str(&current);
        out.push_str("\r\n");
    }
    out.push_str("\r\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shadow::spec::RelocationRule;
    use pretty_assertions::assert_eq;

    fn target() -> MergeTarget {
        MergeTarget::new("worldguard-bukkit", Version::parse("7.0.9").unwrap())
            .with_implementation_version("7.0.9+abc1234")
    }

    fn coord(s: &str) -> DependencyCoordinate {
        s.parse().unwrap()
    }

    #[test]
    fn test_always_dropped() {
        assert!(is_always_dropped("META-INF/MANIFEST.MF"));
        assert!(is_always_dropped("META-INF/INDEX.LIST"));
        assert!(is_always_dropped("META-INF/SIGNER.SF"));
        assert!(is_always_dropped("META-INF/signer.rsa"));
        assert!(!is_always_dropped("META-INF/services/org.example.Spi"));
        assert!(!is_always_dropped("org/example/Foo.class"));
    }

    #[test]
    fn test_manifest_wrapping() {
        let long = "x".repeat(100);
        let manifest = render_manifest(&[("Class-Path".to_string(), long.clone())]);
        let lines: Vec<&str> = manifest.split("\r\n").collect();
        assert!(lines.iter().all(|line| line.len() <= MANIFEST_LINE_LIMIT));
        assert!(lines[1].starts_with(' '));
        let unwrapped: String = lines
            .iter()
            .take_while(|line| !line.is_empty())
            .enumerate()
            .map(|(i, line)| if i == 0 { *line } else { &line[1..] })
            .collect();
        assert_eq!(unwrapped, format!("Class-Path: {}", long));
        assert!(manifest.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_owned_content_wins_over_dependency() {
        let spec = MergeSpec::new()
            .include_module("worldguard-core")
            .include_dependency(coord("org.example:lib:1.0"));
        let inputs = AssemblyInputs::new()
            .with_module("worldguard-core", Archive::new().with_entry("config.yml", b"owned".to_vec()))
            .with_dependency(
                coord("org.example:lib:1.0"),
                Archive::new().with_entry("config.yml", b"third".to_vec()),
            );

        let artifact = merge(&target(), &spec, &inputs).unwrap();
        assert_eq!(artifact.get("config.yml").unwrap().bytes, b"owned");
        assert!(artifact.collisions.is_empty());
    }

    #[test]
    fn test_dependency_collision_keeps_first() {
        let first = coord("org.example:a:1.0");
        let second = coord("org.example:b:1.0");
        let spec = MergeSpec::new()
            .include_dependency(first.clone())
            .include_dependency(second.clone());
        let inputs = AssemblyInputs::new()
            .with_dependency(first.clone(), Archive::new().with_entry("plugin.properties", b"a".to_vec()))
            .with_dependency(second.clone(), Archive::new().with_entry("plugin.properties", b"b".to_vec()));

        let artifact = merge(&target(), &spec, &inputs).unwrap();
        assert_eq!(artifact.get("plugin.properties").unwrap().bytes, b"a");
        assert_eq!(
            artifact.collisions,
            vec![Collision {
                path: "plugin.properties".to_string(),
                kept: Origin::Dependency(first),
                discarded: Origin::Dependency(second),
            }]
        );
    }

    #[test]
    fn test_missing_input_is_configuration_error() {
        let spec = MergeSpec::new().include_module("worldguard-core");
        assert!(matches!(
            merge(&target(), &spec, &AssemblyInputs::new()),
            Err(BuildError::Configuration { .. })
        ));
    }

    #[test]
    fn test_excluded_dependency_needs_no_input() {
        let spec = MergeSpec::conventional().include_dependency(coord("com.google.code.findbugs:jsr305:3.0.2"));
        let artifact = merge(&target(), &spec, &AssemblyInputs::new()).unwrap();
        assert!(artifact.is_empty());
    }

    #[test]
    fn test_manifest_generated() {
        let spec = MergeSpec::new()
            .with_manifest_attribute("Main-Class", "com.example.Main")
            .with_manifest_attribute("Manifest-Version", "2.0");
        let artifact = merge(&target(), &spec, &AssemblyInputs::new()).unwrap();
        assert_eq!(
            artifact.manifest(),
            "Manifest-Version: 1.0\r\nImplementation-Version: 7.0.9+abc1234\r\nMain-Class: com.example.Main\r\n\r\n"
        );
        assert_eq!(artifact.file_name, "worldguard-bukkit-7.0.9-dist.jar");
    }

    #[test]
    fn test_relocated_path_excluded() {
        let lib = coord("com.libx:libx:1.0");
        let spec = MergeSpec::new()
            .include_dependency(lib.clone())
            .relocate(RelocationRule::new("com.libx", "shaded.libx"))
            .exclude("shaded/libx/internal/**");
        let inputs = AssemblyInputs::new().with_dependency(
            lib,
            Archive::new()
                .with_entry("com/libx/Api.txt", b"com.libx.Api".to_vec())
                .with_entry("com/libx/internal/Secret.txt", b"secret".to_vec()),
        );

        let artifact = merge(&target(), &spec, &inputs).unwrap();
        assert_eq!(artifact.paths().collect::<Vec<_>>(), vec!["shaded/libx/Api.txt"]);
        assert_eq!(artifact.get("shaded/libx/Api.txt").unwrap().bytes, b"shaded.libx.Api");
    }
}

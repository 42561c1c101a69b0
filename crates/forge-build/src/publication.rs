//! Publication variant manager
//!
//! A module exposes one `java` software component whose variants are the
//! consumable artifact sets. The `maven` publication publishes that
//! component; variants marked skipped are structurally absent from the
//! generated metadata and from upload requests.

use crate::error::{BuildError, BuildResult};
use crate::interfaces::RepositoryClient;
use crate::module::{ArtifactKind, Module};
use crate::version::RepositorySettings;
use forge_package::{DependencyCoordinate, DependencyScope, Lockfile};
use semver::Version;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Name of the component registered by the platform profile
pub const JAVA_COMPONENT: &str = "java";

/// Name of the canonical publication
pub const MAVEN_PUBLICATION: &str = "maven";

/// Metadata format version written to `.module` files
pub const METADATA_FORMAT_VERSION: &str = "1.1";

/// Well-known variant names
pub mod variants {
    pub const API_ELEMENTS: &str = "apiElements";
    pub const RUNTIME_ELEMENTS: &str = "runtimeElements";
    pub const JAVADOC_ELEMENTS: &str = "javadocElements";
    pub const SOURCES_ELEMENTS: &str = "sourcesElements";
    pub const SHADOW_RUNTIME_ELEMENTS: &str = "shadowRuntimeElements";
}

/// Usage context a variant is consumed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Usage {
    JavaApi,
    JavaRuntime,
}

impl Usage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::JavaApi => "java-api",
            Self::JavaRuntime => "java-runtime",
        }
    }

    /// Scopes whose dependencies a variant of this usage exposes
    pub fn scopes(&self) -> &'static [DependencyScope] {
        match self {
            Self::JavaApi => &[DependencyScope::Api],
            Self::JavaRuntime => &[
                DependencyScope::Api,
                DependencyScope::Implementation,
                DependencyScope::RuntimeOnly,
            ],
        }
    }
}

/// A consumable artifact set of a component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub name: String,
    pub artifact: ArtifactKind,
    pub usage: Usage,
    /// `library` or `documentation`
    pub category: &'static str,
    /// `javadoc` or `sources` for documentation variants
    pub docs_type: Option<&'static str>,
    /// Whether the variant carries dependencies in metadata
    pub with_dependencies: bool,
    pub skipped: bool,
}

impl Variant {
    fn library(name: &str, artifact: ArtifactKind, usage: Usage) -> Self {
        Self {
            name: name.to_string(),
            artifact,
            usage,
            category: "library",
            docs_type: None,
            with_dependencies: true,
            skipped: false,
        }
    }

    fn documentation(name: &str, artifact: ArtifactKind, docs_type: &'static str) -> Self {
        Self {
            name: name.to_string(),
            artifact,
            usage: Usage::JavaRuntime,
            category: "documentation",
            docs_type: Some(docs_type),
            with_dependencies: false,
            skipped: false,
        }
    }

    pub fn api_elements() -> Self {
        Self::library(variants::API_ELEMENTS, ArtifactKind::Primary, Usage::JavaApi)
    }

    pub fn runtime_elements() -> Self {
        Self::library(variants::RUNTIME_ELEMENTS, ArtifactKind::Primary, Usage::JavaRuntime)
    }

    pub fn javadoc_elements() -> Self {
        Self::documentation(variants::JAVADOC_ELEMENTS, ArtifactKind::Javadoc, "javadoc")
    }

    pub fn sources_elements() -> Self {
        Self::documentation(variants::SOURCES_ELEMENTS, ArtifactKind::Sources, "sources")
    }

    /// Runtime variant of the merged artifact; carries no dependencies since
    /// they are folded in
    pub fn shadow_runtime_elements() -> Self {
        let mut variant = Self::library(
            variants::SHADOW_RUNTIME_ELEMENTS,
            ArtifactKind::Merged,
            Usage::JavaRuntime,
        );
        variant.with_dependencies = false;
        variant
    }
}

/// Named set of variants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftwareComponent {
    pub name: String,
    pub variants: BTreeMap<String, Variant>,
}

impl SoftwareComponent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variants: BTreeMap::new(),
        }
    }

    /// Add a variant unless one with that name exists (its skip flag is kept)
    pub fn add_variant(&mut self, variant: Variant) -> bool {
        if self.variants.contains_key(&variant.name) {
            return false;
        }
        self.variants.insert(variant.name.clone(), variant);
        true
    }

    pub fn variant(&self, name: &str) -> Option<&Variant> {
        self.variants.get(name)
    }
}

/// Resolution view a usage's dependency versions are taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionView {
    /// Versions resolved on the runtime classpath
    RuntimeClasspath,
    /// The full resolution result
    ResolutionResult,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMapping {
    pub usage: Usage,
    pub view: ResolutionView,
}

/// A publication of a component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    pub name: String,
    pub component: String,
    pub version_mappings: Vec<VersionMapping>,
}

impl Publication {
    /// View used for a usage; declared versions when unmapped
    pub fn view_for(&self, usage: Usage) -> Option<ResolutionView> {
        self.version_mappings
            .iter()
            .find(|mapping| mapping.usage == usage)
            .map(|mapping| mapping.view)
    }
}

/// Repository a module publishes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryTarget {
    pub url: String,
    pub repository: String,
}

impl RepositoryTarget {
    /// Snapshot repository for pre-release versions, release otherwise
    pub fn for_version(settings: &RepositorySettings, version: &Version) -> Self {
        let repository = if version.pre.is_empty() {
            &settings.releases_repo
        } else {
            &settings.snapshots_repo
        };
        Self {
            url: settings.url.clone(),
            repository: repository.clone(),
        }
    }

    /// Full repository URL
    pub fn location(&self) -> String {
        format!("{}/{}", self.url.trim_end_matches('/'), self.repository)
    }
}

/// Resolved dependency versions (`group:name -> version`) per view
#[derive(Debug, Clone, Default)]
pub struct ResolutionViews {
    runtime_classpath: HashMap<String, String>,
    resolution_result: HashMap<String, String>,
}

impl ResolutionViews {
    /// No resolved versions; metadata falls back to declared versions
    pub fn declared() -> Self {
        Self::default()
    }

    /// Both views from a resolved lockfile
    pub fn from_lockfile(lockfile: &Lockfile) -> Self {
        let resolved: HashMap<String, String> = lockfile
            .coordinates()
            .map(|c| (c.module_id(), c.version.clone()))
            .collect();
        Self {
            runtime_classpath: resolved.clone(),
            resolution_result: resolved,
        }
    }

    pub fn with_runtime_classpath(mut self, coordinate: &DependencyCoordinate) -> Self {
        self.runtime_classpath
            .insert(coordinate.module_id(), coordinate.version.clone());
        self
    }

    pub fn with_resolution_result(mut self, coordinate: &DependencyCoordinate) -> Self {
        self.resolution_result
            .insert(coordinate.module_id(), coordinate.version.clone());
        self
    }

    fn version_of<'a>(&'a self, view: Option<ResolutionView>, coordinate: &'a DependencyCoordinate) -> &'a str {
        let resolved = match view {
            Some(ResolutionView::RuntimeClasspath) => self.runtime_classpath.get(&coordinate.module_id()),
            Some(ResolutionView::ResolutionResult) => self.resolution_result.get(&coordinate.module_id()),
            None => None,
        };
        resolved.map(String::as_str).unwrap_or(&coordinate.version)
    }
}

/// Create the module's `java` component if missing
pub fn ensure_component(module: &mut Module) -> &mut SoftwareComponent {
    module
        .component
        .get_or_insert_with(|| SoftwareComponent::new(JAVA_COMPONENT))
}

/// Register the canonical `maven` publication of the `java` component
///
/// API-visible dependencies take versions from the runtime classpath view,
/// runtime dependencies from the full resolution result. Idempotent.
pub fn register_publication(module: &mut Module) -> BuildResult<bool> {
    if module.component.is_none() {
        return Err(BuildError::configuration(
            &module.name,
            "cannot register a publication without the java component",
        ));
    }
    if module.publications.contains_key(MAVEN_PUBLICATION) {
        return Ok(false);
    }

    module.publications.insert(
        MAVEN_PUBLICATION.to_string(),
        Publication {
            name: MAVEN_PUBLICATION.to_string(),
            component: JAVA_COMPONENT.to_string(),
            version_mappings: vec![
                VersionMapping {
                    usage: Usage::JavaApi,
                    view: ResolutionView::RuntimeClasspath,
                },
                VersionMapping {
                    usage: Usage::JavaRuntime,
                    view: ResolutionView::ResolutionResult,
                },
            ],
        },
    );
    tracing::debug!(module = %module.name, "registered maven publication");
    Ok(true)
}

/// Mark a variant skipped so it is absent from publication metadata
pub fn suppress_variant(module: &mut Module, variant: &str) -> BuildResult<()> {
    let name = module.name.clone();
    let entry = module
        .component
        .as_mut()
        .and_then(|component| component.variants.get_mut(variant))
        .ok_or_else(|| {
            BuildError::configuration(&name, format!("unknown variant '{}'", variant))
        })?;

    if !entry.skipped {
        entry.skipped = true;
        tracing::debug!(module = %name, variant, "suppressed variant");
    }
    Ok(())
}

/// Register the merged artifact's variant (not suppressed)
pub fn add_merged_variant(module: &mut Module) -> bool {
    match module.component.as_mut() {
        Some(component) => component.add_variant(Variant::shadow_runtime_elements()),
        None => false,
    }
}

/// Variants that appear in the module's publication, in name order
pub fn published_variants(module: &Module) -> Vec<&Variant> {
    let Some(publication) = module.publications.get(MAVEN_PUBLICATION) else {
        return Vec::new();
    };
    match &module.component {
        Some(component) if component.name == publication.component => component
            .variants
            .values()
            .filter(|variant| !variant.skipped)
            .collect(),
        _ => Vec::new(),
    }
}

/// Build-time publication policy
///
/// A merged artifact must never be advertised, and a module has exactly one
/// canonical publication.
pub fn verify_policy(module: &Module) -> BuildResult<()> {
    if module.publications.len() > 1 {
        return Err(BuildError::policy_violation(
            &module.name,
            format!(
                "expected one canonical publication, found {}",
                module.publications.len()
            ),
        ));
    }

    if let Some(component) = &module.component {
        for variant in component.variants.values() {
            if variant.artifact == ArtifactKind::Merged && !variant.skipped {
                return Err(BuildError::policy_violation(
                    &module.name,
                    format!(
                        "variant '{}' of the merged artifact is not suppressed",
                        variant.name
                    ),
                ));
            }
        }
    }

    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ModuleMetadata<'a> {
    format_version: &'static str,
    component: ComponentMetadata<'a>,
    created_by: BTreeMap<&'static str, CreatedBy>,
    variants: Vec<VariantMetadata<'a>>,
}

#[derive(Serialize)]
struct ComponentMetadata<'a> {
    group: &'a str,
    module: &'a str,
    version: String,
    attributes: BTreeMap<&'static str, &'static str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatedBy {
    version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    build_id: Option<String>,
}

#[derive(Serialize)]
struct VariantMetadata<'a> {
    name: &'a str,
    attributes: BTreeMap<&'static str, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    dependencies: Vec<DependencyMetadata<'a>>,
    files: Vec<FileMetadata>,
}

#[derive(Serialize)]
struct DependencyMetadata<'a> {
    group: &'a str,
    module: &'a str,
    version: VersionConstraint<'a>,
}

#[derive(Serialize)]
struct VersionConstraint<'a> {
    requires: &'a str,
}

#[derive(Serialize)]
struct FileMetadata {
    name: String,
    url: String,
}

/// Render publication metadata for the module (JSON)
///
/// Skipped variants are omitted entirely.
pub fn module_metadata(module: &Module, views: &ResolutionViews) -> BuildResult<String> {
    let publication = module.publications.get(MAVEN_PUBLICATION).ok_or_else(|| {
        BuildError::configuration(&module.name, "no publication registered")
    })?;

    let status = if module.version.pre.is_empty() {
        "release"
    } else {
        "integration"
    };

    let mut variants = Vec::new();
    for variant in published_variants(module) {
        let mut attributes = BTreeMap::new();
        attributes.insert("org.gradle.category", variant.category.to_string());
        attributes.insert("org.gradle.usage", variant.usage.name().to_string());
        if let Some(docs_type) = variant.docs_type {
            attributes.insert("org.gradle.docstype", docs_type.to_string());
        } else {
            attributes.insert("org.gradle.libraryelements", "jar".to_string());
            attributes.insert("org.gradle.dependency.bundling", "external".to_string());
            if let Some(compile) = &module.compile {
                attributes.insert("org.gradle.jvm.version", compile.release.to_string());
            }
        }

        let mut dependencies = Vec::new();
        if variant.with_dependencies {
            let view = publication.view_for(variant.usage);
            for scope in variant.usage.scopes() {
                for coordinate in module.dependencies_in(*scope) {
                    dependencies.push(DependencyMetadata {
                        group: &coordinate.group,
                        module: &coordinate.name,
                        version: VersionConstraint {
                            requires: views.version_of(view, coordinate),
                        },
                    });
                }
            }
        }

        let files = module
            .artifact(variant.artifact)
            .map(|artifact| {
                vec![FileMetadata {
                    name: artifact.file_name.clone(),
                    url: artifact.file_name.clone(),
                }]
            })
            .unwrap_or_default();

        variants.push(VariantMetadata {
            name: &variant.name,
            attributes,
            dependencies,
            files,
        });
    }

    let mut created_by = BTreeMap::new();
    created_by.insert(
        "forge",
        CreatedBy {
            version: env!("CARGO_PKG_VERSION"),
            build_id: module
                .internal_version
                .as_ref()
                .map(|v| v.build_id().to_string()),
        },
    );

    let mut component_attributes = BTreeMap::new();
    component_attributes.insert("org.gradle.status", status);

    let metadata = ModuleMetadata {
        format_version: METADATA_FORMAT_VERSION,
        component: ComponentMetadata {
            group: &module.group,
            module: &module.name,
            version: module.version.to_string(),
            attributes: component_attributes,
        },
        created_by,
        variants,
    };

    Ok(serde_json::to_string_pretty(&metadata)?)
}

/// One file handed to the repository client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedFile {
    pub classifier: Option<String>,
    pub file_name: String,
    pub path: PathBuf,
}

/// Everything the repository client uploads for one module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub coordinate: DependencyCoordinate,
    pub repository: Option<RepositoryTarget>,
    pub files: Vec<PublishedFile>,
    /// Module metadata JSON
    pub metadata: String,
}

/// Assemble the canonical publication of a module
///
/// Artifact files are expected in `artifact_dir`. Fails with
/// `PolicyViolation` when the policy check fails.
pub fn publication_request(
    module: &Module,
    artifact_dir: &Path,
    views: &ResolutionViews,
) -> BuildResult<PublishRequest> {
    verify_policy(module)?;
    let metadata = module_metadata(module, views)?;

    let mut files: Vec<PublishedFile> = Vec::new();
    for variant in published_variants(module) {
        let Some(artifact) = module.artifact(variant.artifact) else {
            continue;
        };
        if files.iter().any(|f| f.file_name == artifact.file_name) {
            continue;
        }
        files.push(PublishedFile {
            classifier: artifact.classifier.clone(),
            file_name: artifact.file_name.clone(),
            path: artifact_dir.join(&artifact.file_name),
        });
    }

    Ok(PublishRequest {
        coordinate: module.coordinate(),
        repository: module.repository.clone(),
        files,
        metadata,
    })
}

/// Hand the canonical publication to a repository client
pub fn publish(
    module: &Module,
    client: &dyn RepositoryClient,
    artifact_dir: &Path,
    views: &ResolutionViews,
) -> BuildResult<PublishRequest> {
    let request = publication_request(module, artifact_dir, views)?;
    client.upload(&request)?;
    tracing::info!(
        module = %module.name,
        coordinate = %request.coordinate,
        files = request.files.len(),
        "published"
    );
    Ok(request)
}

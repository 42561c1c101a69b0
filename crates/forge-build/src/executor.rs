//! Task execution
//!
//! Runs a module's tasks in dependency order against the external
//! collaborators and writes produced jars to the workspace `libs` directory.

use crate::error::{BuildError, BuildResult};
use crate::interfaces::{DependencyResolver, DocGenerator, RepositoryClient, SourceSet, StyleChecker, Toolchain};
use crate::module::{ArtifactKind, Module};
use crate::publication::{self, PublishRequest, ResolutionViews};
use crate::shadow::archive::MANIFEST_PATH;
use crate::shadow::merge::render_manifest;
use crate::shadow::{merge, Archive, AssemblyCache, AssemblyInputs, Collision, MergeTarget};
use crate::tasks::names;
use crate::workspace::Workspace;
use std::fs;
use std::path::{Path, PathBuf};

/// External tools a build runs against
pub struct Collaborators<'a> {
    pub toolchain: &'a dyn Toolchain,
    pub style_checker: &'a dyn StyleChecker,
    pub doc_generator: &'a dyn DocGenerator,
    pub resolver: &'a dyn DependencyResolver,
    pub repository: Option<&'a dyn RepositoryClient>,
}

/// What a task run did
#[derive(Debug, Default)]
pub struct ExecutionReport {
    pub module: String,
    /// Tasks run, in order
    pub executed: Vec<String>,
    /// Files written
    pub outputs: Vec<PathBuf>,
    /// Dependency/dependency path collisions of the merged artifact
    pub collisions: Vec<Collision>,
    /// Whether the merged artifact came from the cache
    pub cache_hit: Option<bool>,
    pub published: Option<PublishRequest>,
}

/// Per-run intermediate outputs
#[derive(Default)]
struct RunState {
    classes: Option<Archive>,
    docs: Option<Archive>,
}

/// Runs tasks of configured modules
pub struct TaskExecutor<'a> {
    collaborators: Collaborators<'a>,
    cache: Option<AssemblyCache>,
    views: ResolutionViews,
}

impl<'a> TaskExecutor<'a> {
    pub fn new(collaborators: Collaborators<'a>) -> Self {
        Self {
            collaborators,
            cache: None,
            views: ResolutionViews::declared(),
        }
    }

    /// Reuse merged artifacts with identical inputs
    pub fn with_cache(mut self, cache: AssemblyCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Resolved versions used for publication metadata
    pub fn with_views(mut self, views: ResolutionViews) -> Self {
        self.views = views;
        self
    }

    /// Run `task` of `module` and everything it depends on
    pub fn run(&self, workspace: &Workspace, module: &str, task: &str) -> BuildResult<ExecutionReport> {
        let module = workspace.require_module(module)?;
        let order = module.tasks.execution_order(task)?;
        let libs = workspace.libs_dir();

        let mut report = ExecutionReport {
            module: module.name.clone(),
            ..ExecutionReport::default()
        };
        let mut state = RunState::default();

        for name in order {
            tracing::debug!(module = %module.name, task = %name, "running task");
            self.run_task(workspace, module, &name, &libs, &mut state, &mut report)?;
            report.executed.push(name);
        }

        tracing::info!(
            module = %module.name,
            task,
            tasks = report.executed.len(),
            "tasks completed"
        );
        Ok(report)
    }

    fn run_task(
        &self,
        workspace: &Workspace,
        module: &Module,
        task: &str,
        libs: &Path,
        state: &mut RunState,
        report: &mut ExecutionReport,
    ) -> BuildResult<()> {
        match task {
            names::COMPILE_JAVA => {
                state.classes = Some(self.compile(module)?);
            }
            names::JAR => {
                let classes = match state.classes.take() {
                    Some(classes) => classes,
                    None => self.compile(module)?,
                };
                let jar = with_manifest(classes.clone(), module);
                report.outputs.push(write_artifact(module, ArtifactKind::Primary, &jar, libs)?);
                state.classes = Some(classes);
            }
            names::JAVADOC => {
                let settings = module.javadoc.clone().unwrap_or_default();
                state.docs = Some(self.collaborators.doc_generator.generate_docs(module, &settings)?);
            }
            names::JAVADOC_JAR => {
                let docs = state.docs.take().unwrap_or_default();
                report.outputs.push(write_artifact(module, ArtifactKind::Javadoc, &docs, libs)?);
            }
            names::SOURCES_JAR => {
                let sources = self.collaborators.toolchain.sources(module)?;
                report.outputs.push(write_artifact(module, ArtifactKind::Sources, &sources, libs)?);
            }
            names::CHECKSTYLE_MAIN => self.style_check(module, SourceSet::Main)?,
            names::CHECKSTYLE_TEST => self.style_check(module, SourceSet::Test)?,
            names::TEST => {
                let Some(settings) = &module.test else {
                    return Ok(());
                };
                let outcome = self.collaborators.toolchain.run_tests(module, settings)?;
                if !outcome.is_success() {
                    return Err(BuildError::TestsFailed {
                        module: module.name.clone(),
                        failed: outcome.failed,
                        total: outcome.total(),
                    });
                }
            }
            names::VERIFY_PUBLICATION_POLICY => publication::verify_policy(module)?,
            names::VERIFY_BANNED_DEPENDENCIES => {
                if let Some((_, coordinate)) = module.banned_dependencies().first() {
                    return Err(BuildError::BannedDependency {
                        module: module.name.clone(),
                        coordinate: coordinate.to_string(),
                    });
                }
            }
            names::SHADOW_JAR => {
                let classes = match state.classes.take() {
                    Some(classes) => classes,
                    None => self.compile(module)?,
                };
                let path = self.shadow_jar(workspace, module, classes.clone(), libs, report)?;
                state.classes = Some(classes);
                report.outputs.push(path);
            }
            names::PUBLISH => {
                let client = self.collaborators.repository.ok_or_else(|| {
                    BuildError::configuration(&module.name, "no repository client configured")
                })?;
                report.published = Some(publication::publish(module, client, libs, &self.views)?);
            }
            // compileTestJava and check only aggregate their dependencies
            _ => {}
        }
        Ok(())
    }

    fn compile(&self, module: &Module) -> BuildResult<Archive> {
        let release = module
            .compile
            .as_ref()
            .map(|c| c.release)
            .unwrap_or(forge_config::project::DEFAULT_JAVA_RELEASE);
        self.collaborators.toolchain.compile(module, release)
    }

    fn style_check(&self, module: &Module, source_set: SourceSet) -> BuildResult<()> {
        let Some(settings) = &module.checkstyle else {
            return Ok(());
        };
        let result = self.collaborators.style_checker.run_style_check(
            module,
            source_set,
            &settings.config_file,
            &settings.tool_version,
        )?;
        if !result.passed {
            return Err(BuildError::StyleCheckFailed {
                module: module.name.clone(),
                source_set: source_set.to_string(),
                report: result.report,
            });
        }
        Ok(())
    }

    /// Gather inputs for the module's merge spec and write the merged jar
    ///
    /// `classes` is the module's own compiled output, always merged first.
    fn shadow_jar(
        &self,
        workspace: &Workspace,
        module: &Module,
        classes: Archive,
        libs: &Path,
        report: &mut ExecutionReport,
    ) -> BuildResult<PathBuf> {
        let spec = module.merge_spec.as_ref().ok_or_else(|| {
            BuildError::configuration(&module.name, "shadowJar requires the shadow-enabled profile")
        })?;
        let target = MergeTarget::from_module(module)?;

        let mut inputs = AssemblyInputs::new().with_own_output(classes);
        for name in &spec.include_modules {
            if *name == module.name {
                continue;
            }
            let included = workspace.require_module(name)?;
            inputs.add_module(name.clone(), self.compile(included)?);
        }
        for coordinate in &spec.include_dependencies {
            if spec.excludes_dependency(coordinate).is_some() {
                continue;
            }
            inputs.add_dependency(coordinate.clone(), self.collaborators.resolver.resolve(coordinate)?);
        }

        let file_name = module
            .artifact(ArtifactKind::Merged)
            .map(|a| a.file_name.clone())
            .unwrap_or_else(|| module.artifact_file_name(Some(&spec.classifier)));
        let destination = libs.join(file_name);

        match &self.cache {
            Some(cache) => {
                let cached = cache.get_or_assemble(&target, spec, &inputs)?;
                fs::create_dir_all(libs).map_err(|e| BuildError::io(libs, e))?;
                fs::copy(&cached.path, &destination).map_err(|e| BuildError::io(&destination, e))?;
                report.collisions = cached.collisions;
                report.cache_hit = Some(cached.hit);
            }
            None => {
                let artifact = merge(&target, spec, &inputs)?;
                artifact.to_archive().write_jar(&destination)?;
                report.collisions = artifact.collisions;
                report.cache_hit = Some(false);
            }
        }
        Ok(destination)
    }
}

/// Add a generated manifest to a jar's content
fn with_manifest(mut archive: Archive, module: &Module) -> Archive {
    let mut attributes = vec![("Manifest-Version".to_string(), "1.0".to_string())];
    if let Some(internal) = &module.internal_version {
        attributes.push(("Implementation-Version".to_string(), internal.to_string()));
    }
    archive.insert(MANIFEST_PATH, render_manifest(&attributes).into_bytes());
    archive
}

fn write_artifact(module: &Module, kind: ArtifactKind, archive: &Archive, libs: &Path) -> BuildResult<PathBuf> {
    let file_name = module
        .artifact(kind)
        .map(|a| a.file_name.clone())
        .ok_or_else(|| BuildError::configuration(&module.name, format!("no {} artifact declared", kind)))?;
    let path = libs.join(file_name);
    archive.write_jar(&path)?;
    tracing::debug!(module = %module.name, artifact = %kind, path = %path.display(), "wrote artifact");
    Ok(path)
}

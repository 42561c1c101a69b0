//! Collaborators backed by files an external build already produced
//!
//! Forge never runs a compiler. The CLI reads each module's declared
//! `output` (class directory or jar) and `sources` from disk, takes
//! generated docs from `<module>/build/docs/javadoc` and uploads into a
//! plain directory laid out like a Maven repository.

use forge_build::module::{JavadocSettings, TestSettings};
use forge_build::shadow::Archive;
use forge_build::{
    BuildError, BuildResult, Collaborators, DependencyResolver, DocGenerator, Module,
    PublishRequest, RepositoryClient, SourceSet, StyleCheckReport, StyleChecker, TestOutcome,
    Toolchain,
};
use std::fs;
use std::path::{Path, PathBuf};

/// The local collaborator set used by every command
pub struct Local {
    toolchain: PrebuiltToolchain,
    docs: PrebuiltDocs,
}

impl Local {
    pub fn new(root: &Path) -> Self {
        Self {
            toolchain: PrebuiltToolchain::new(root),
            docs: PrebuiltDocs::new(root),
        }
    }

    pub fn collaborators<'a>(
        &'a self,
        resolver: &'a dyn DependencyResolver,
        repository: Option<&'a dyn RepositoryClient>,
    ) -> Collaborators<'a> {
        Collaborators {
            toolchain: &self.toolchain,
            style_checker: &SkippedStyleCheck,
            doc_generator: &self.docs,
            resolver,
            repository,
        }
    }
}

/// Toolchain reading prebuilt module outputs
pub struct PrebuiltToolchain {
    root: PathBuf,
}

impl PrebuiltToolchain {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn sources_dir(&self, module: &Module) -> PathBuf {
        match &module.sources {
            Some(sources) => self.root.join(sources),
            None => module.dir_in(&self.root).join("src/main/java"),
        }
    }
}

impl Toolchain for PrebuiltToolchain {
    fn compile(&self, module: &Module, release: u32) -> BuildResult<Archive> {
        let output = module.output.as_ref().ok_or_else(|| {
            BuildError::configuration(&module.name, "no prebuilt `output` declared in forge.toml")
        })?;
        let path = self.root.join(output);
        if !path.exists() {
            return Err(BuildError::configuration(
                &module.name,
                format!("prebuilt output {} does not exist", path.display()),
            ));
        }
        tracing::debug!(module = %module.name, release, path = %path.display(), "using prebuilt classes");
        Archive::load(&path)
    }

    fn sources(&self, module: &Module) -> BuildResult<Archive> {
        let dir = self.sources_dir(module);
        if !dir.is_dir() {
            tracing::warn!(module = %module.name, dir = %dir.display(), "no sources found");
            return Ok(Archive::new());
        }
        Archive::from_dir(&dir)
    }

    fn run_tests(&self, module: &Module, settings: &TestSettings) -> BuildResult<TestOutcome> {
        tracing::info!(
            module = %module.name,
            runner = settings.runner.name(),
            "prebuilt toolchain does not run tests"
        );
        Ok(TestOutcome::default())
    }
}

/// Style checker that reports the rule file but runs nothing
pub struct SkippedStyleCheck;

impl StyleChecker for SkippedStyleCheck {
    fn run_style_check(
        &self,
        module: &Module,
        source_set: SourceSet,
        rule_file: &Path,
        tool_version: &str,
    ) -> BuildResult<StyleCheckReport> {
        tracing::info!(
            module = %module.name,
            source_set = %source_set,
            rules = %rule_file.display(),
            tool_version,
            "style check skipped"
        );
        Ok(StyleCheckReport {
            passed: true,
            report: String::new(),
        })
    }
}

/// Documentation read from `<module>/build/docs/javadoc`
pub struct PrebuiltDocs {
    root: PathBuf,
}

impl PrebuiltDocs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl DocGenerator for PrebuiltDocs {
    fn generate_docs(&self, module: &Module, settings: &JavadocSettings) -> BuildResult<Archive> {
        let dir = module.dir_in(&self.root).join("build/docs/javadoc");
        if !dir.is_dir() {
            tracing::warn!(
                module = %module.name,
                options = %settings.options.join(" "),
                "no generated docs; javadoc jar will be empty"
            );
            return Ok(Archive::new());
        }
        Archive::from_dir(&dir)
    }
}

/// Repository client writing a Maven-style directory layout
pub struct DirectoryRepository {
    dir: PathBuf,
}

impl DirectoryRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<dir>/<group as path>/<name>/<version>`
    pub fn version_dir(&self, request: &PublishRequest) -> PathBuf {
        let coordinate = &request.coordinate;
        let mut dir = self.dir.clone();
        for part in coordinate.group.split('.') {
            dir.push(part);
        }
        dir.join(&coordinate.name).join(&coordinate.version)
    }
}

impl RepositoryClient for DirectoryRepository {
    fn upload(&self, request: &PublishRequest) -> BuildResult<()> {
        let dir = self.version_dir(request);
        fs::create_dir_all(&dir).map_err(|e| BuildError::io(&dir, e))?;

        for file in &request.files {
            let destination = dir.join(&file.file_name);
            fs::copy(&file.path, &destination).map_err(|e| BuildError::io(&file.path, e))?;
        }

        let metadata = dir.join(format!(
            "{}-{}.module",
            request.coordinate.name, request.coordinate.version
        ));
        fs::write(&metadata, &request.metadata).map_err(|e| BuildError::io(&metadata, e))?;

        if let Some(target) = &request.repository {
            tracing::debug!(location = %target.location(), "remote target recorded; writing locally");
        }
        Ok(())
    }
}

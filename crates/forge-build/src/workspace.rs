//! Workspace orchestration
//!
//! Owns the root scope and every module of a build. Modules are configured
//! in parallel, each on its own copy; a module is committed only when all of
//! its profiles apply, so one failing module never disturbs its siblings.

use crate::error::{BuildError, BuildResult};
use crate::graph::DependencyGraph;
use crate::module::Module;
use crate::profile::{ProfileApplier, ProfileOptions};
use crate::version::RootScope;
use forge_config::Config;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Outcome of configuring a workspace
#[derive(Debug, Default)]
pub struct ConfigureReport {
    /// Modules whose profiles all applied
    pub configured: Vec<String>,
    /// Modules left unconfigured, with the error that stopped them
    pub failures: Vec<(String, BuildError)>,
}

impl ConfigureReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failure(&self, module: &str) -> Option<&BuildError> {
        self.failures
            .iter()
            .find(|(name, _)| name == module)
            .map(|(_, error)| error)
    }
}

/// A multi-module build
#[derive(Debug)]
pub struct Workspace {
    scope: RootScope,
    options: ProfileOptions,
    target_dir: PathBuf,
    modules: BTreeMap<String, Module>,
    profiles: BTreeMap<String, Vec<String>>,
}

impl Workspace {
    /// Create an empty workspace
    pub fn new(scope: RootScope, options: ProfileOptions) -> Self {
        let target_dir = scope.root().join("build");
        Self {
            scope,
            options,
            target_dir,
            modules: BTreeMap::new(),
            profiles: BTreeMap::new(),
        }
    }

    /// Build a workspace from loaded configuration; modules are not yet
    /// configured
    pub fn from_config(config: &Config) -> BuildResult<Self> {
        let scope = RootScope::from_config(config)?;
        let mut workspace =
            Self::new(scope, ProfileOptions::from_config(config)).with_target_dir(config.target_dir());

        for module_config in &config.project.modules {
            let module = Module::from_config(module_config, &workspace.scope)?;
            workspace.add_module(module, module_config.profiles.clone())?;
        }
        workspace.module_order()?;

        tracing::debug!(modules = workspace.modules.len(), "loaded workspace");
        Ok(workspace)
    }

    pub fn with_target_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.target_dir = dir.into();
        self
    }

    /// Add a module with the profiles to apply to it
    pub fn add_module(&mut self, module: Module, profiles: Vec<String>) -> BuildResult<()> {
        if self.modules.contains_key(&module.name) {
            return Err(BuildError::configuration(&module.name, "module is declared twice"));
        }
        self.profiles.insert(module.name.clone(), profiles);
        self.modules.insert(module.name.clone(), module);
        Ok(())
    }

    /// Apply every module's profiles
    pub fn configure(&mut self) -> ConfigureReport {
        let applier = ProfileApplier::new(&self.scope);
        let options = &self.options;
        let profiles = &self.profiles;

        let results: Vec<(String, BuildResult<Module>)> = self
            .modules
            .par_iter()
            .map(|(name, module)| {
                let mut staged = module.clone();
                let requested = profiles.get(name).map(Vec::as_slice).unwrap_or_default();
                let result = applier
                    .apply_all(&mut staged, requested, options)
                    .map(|_| staged);
                (name.clone(), result)
            })
            .collect();

        let mut report = ConfigureReport::default();
        for (name, result) in results {
            match result {
                Ok(module) => {
                    self.modules.insert(name.clone(), module);
                    report.configured.push(name);
                }
                Err(error) => {
                    tracing::warn!(module = %name, error = %error, "module configuration failed");
                    report.failures.push((name, error));
                }
            }
        }

        tracing::info!(
            configured = report.configured.len(),
            failed = report.failures.len(),
            "configured workspace"
        );
        report
    }

    /// Module names with owned dependencies first
    pub fn module_order(&self) -> BuildResult<Vec<String>> {
        let mut graph = DependencyGraph::new();
        for name in self.modules.keys() {
            graph.add_node(name.as_str());
        }
        for module in self.modules.values() {
            for dependency in &module.project_dependencies {
                if !graph.contains(dependency) {
                    return Err(BuildError::configuration(
                        &module.name,
                        format!("unknown project dependency '{}'", dependency),
                    ));
                }
                graph.add_edge(&module.name, dependency);
            }
        }
        graph.topological_order()
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    pub fn module_mut(&mut self, name: &str) -> Option<&mut Module> {
        self.modules.get_mut(name)
    }

    /// Module by name or `ModuleNotFound`
    pub fn require_module(&self, name: &str) -> BuildResult<&Module> {
        self.modules
            .get(name)
            .ok_or_else(|| BuildError::module_not_found(name))
    }

    /// Modules in name order
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    pub fn profiles_of(&self, name: &str) -> &[String] {
        self.profiles.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn scope(&self) -> &RootScope {
        &self.scope
    }

    pub fn options(&self) -> &ProfileOptions {
        &self.options
    }

    pub fn root(&self) -> &Path {
        self.scope.root()
    }

    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    /// Where jars are written
    pub fn libs_dir(&self) -> PathBuf {
        self.target_dir.join("libs")
    }
}

//! Loading and configuring the workspace a command runs against

use anyhow::{anyhow, Context, Result};
use forge_build::{AssemblyCache, ConfigureReport, LockfileResolver, Workspace};
use forge_config::{Config, ConfigLoader};
use std::path::{Path, PathBuf};

/// A configured workspace plus everything loaded alongside it
pub struct Session {
    pub config: Config,
    pub workspace: Workspace,
    pub report: ConfigureReport,
    pub resolver: LockfileResolver,
}

impl Session {
    /// Find `forge.toml` from `project_dir`, build the workspace and apply
    /// every module's profiles
    pub fn open(project_dir: &Path) -> Result<Self> {
        let config = ConfigLoader::new()
            .load_from_directory(project_dir)
            .with_context(|| format!("Failed to load forge.toml from {}", project_dir.display()))?;
        let mut workspace = Workspace::from_config(&config).context("Invalid workspace")?;
        let report = workspace.configure();
        let resolver = LockfileResolver::load(&config.root).context("Failed to read forge.lock")?;

        Ok(Self {
            config,
            workspace,
            report,
            resolver,
        })
    }

    /// Fail unless `module` exists and configured successfully
    pub fn require_configured(&self, module: &str) -> Result<()> {
        if let Some(error) = self.report.failure(module) {
            return Err(anyhow!("Module '{}' failed to configure: {}", module, error));
        }
        self.workspace
            .require_module(module)
            .map(|_| ())
            .map_err(|e| anyhow!(e))
    }

    pub fn cache(&self) -> AssemblyCache {
        AssemblyCache::new(self.cache_dir())
    }

    fn cache_dir(&self) -> PathBuf {
        self.workspace.target_dir().join("shadow-cache")
    }
}

//! Publish command - upload a module's canonical artifacts

use crate::collaborators::{DirectoryRepository, Local};
use crate::session::Session;
use anyhow::{Context, Result};
use forge_build::publication::ResolutionViews;
use forge_build::tasks::names;
use forge_build::TaskExecutor;
use std::path::Path;

/// Run the publish command
pub fn run(project_dir: &Path, module: &str, repository: &Path) -> Result<()> {
    let session = Session::open(project_dir)?;
    session.require_configured(module)?;

    let client = DirectoryRepository::new(repository);
    let local = Local::new(&session.config.root);
    let executor = TaskExecutor::new(local.collaborators(&session.resolver, Some(&client)))
        .with_views(ResolutionViews::from_lockfile(session.resolver.lockfile()));

    let report = executor
        .run(&session.workspace, module, names::PUBLISH)
        .with_context(|| format!("Publishing '{}' failed", module))?;

    if let Some(request) = report.published {
        println!("Published {}", request.coordinate);
        for file in &request.files {
            println!("  {}", file.file_name);
        }
        println!("  into {}", client.version_dir(&request).display());
    }
    Ok(())
}

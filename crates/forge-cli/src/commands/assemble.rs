//! Assemble command - build a module's merged (dist) jar

use crate::collaborators::Local;
use crate::session::Session;
use anyhow::{Context, Result};
use forge_build::tasks::names;
use forge_build::TaskExecutor;
use std::path::Path;

/// Run the assemble command
pub fn run(project_dir: &Path, module: &str, use_cache: bool) -> Result<()> {
    let session = Session::open(project_dir)?;
    session.require_configured(module)?;

    let local = Local::new(&session.config.root);
    let mut executor = TaskExecutor::new(local.collaborators(&session.resolver, None));
    if use_cache {
        executor = executor.with_cache(session.cache());
    }

    let report = executor
        .run(&session.workspace, module, names::SHADOW_JAR)
        .with_context(|| format!("Assembly of '{}' failed", module))?;

    for collision in &report.collisions {
        println!(
            "warning: {} provided by both {} and {}; kept {}",
            collision.path, collision.kept, collision.discarded, collision.kept
        );
    }
    if let Some(path) = report.outputs.last() {
        let cached = if report.cache_hit == Some(true) { " (cached)" } else { "" };
        println!("Assembled {}{}", path.display(), cached);
    }
    Ok(())
}

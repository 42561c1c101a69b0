//! Publications command - show which variants a module publishes

use crate::session::Session;
use anyhow::{Context, Result};
use forge_build::publication::{self, ResolutionViews};
use std::path::Path;

/// Run the publications command
pub fn run(project_dir: &Path, module: &str, metadata: bool) -> Result<()> {
    let session = Session::open(project_dir)?;
    session.require_configured(module)?;
    let module = session.workspace.require_module(module)?;

    if metadata {
        let views = ResolutionViews::from_lockfile(session.resolver.lockfile());
        let document = publication::module_metadata(module, &views)
            .with_context(|| format!("Failed to render metadata for '{}'", module.name))?;
        println!("{}", document);
        return Ok(());
    }

    let published = publication::published_variants(module);
    if published.is_empty() {
        println!("{} publishes nothing", module.name);
        return Ok(());
    }

    println!("Published variants of {}:", module.coordinate());
    for variant in published {
        let file = module
            .artifact(variant.artifact)
            .map(|a| a.file_name.as_str())
            .unwrap_or("-");
        println!("  {:<24} {}", variant.name, file);
    }

    if let Some(component) = &module.component {
        for variant in component.variants.values().filter(|v| v.skipped) {
            println!("  {:<24} (suppressed)", variant.name);
        }
    }
    if let Some(target) = &module.repository {
        println!("Repository: {}", target.location());
    }
    Ok(())
}

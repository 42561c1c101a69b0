//! Tasks command - list the tasks registered for a module

use crate::session::Session;
use anyhow::Result;
use std::path::Path;

/// Run the tasks command
pub fn run(project_dir: &Path, module: &str) -> Result<()> {
    let session = Session::open(project_dir)?;
    session.require_configured(module)?;
    let module = session.workspace.require_module(module)?;

    println!("Tasks for {}:", module.name);
    for name in module.tasks.names() {
        let description = module.tasks.description(name).unwrap_or_default();
        let dependencies = module.tasks.dependencies_of(name);
        if dependencies.is_empty() {
            println!("  {:<26} {}", name, description);
        } else {
            println!("  {:<26} {} (after {})", name, description, dependencies.join(", "));
        }
    }
    Ok(())
}

//! Check command - run the check gate of one module or the whole workspace

use crate::collaborators::Local;
use crate::session::Session;
use anyhow::{bail, Result};
use forge_build::tasks::names;
use forge_build::TaskExecutor;
use std::path::Path;

/// Run the check command
pub fn run(project_dir: &Path, module: Option<&str>) -> Result<()> {
    let session = Session::open(project_dir)?;
    let modules = match module {
        Some(name) => {
            session.require_configured(name)?;
            vec![name.to_string()]
        }
        None => session.workspace.module_order()?,
    };

    let local = Local::new(&session.config.root);
    let executor = TaskExecutor::new(local.collaborators(&session.resolver, None));

    let mut failed = 0;
    for name in &modules {
        if let Some(error) = session.report.failure(name) {
            println!("✗ {}: {}", name, error);
            failed += 1;
            continue;
        }
        match executor.run(&session.workspace, name, names::CHECK) {
            Ok(report) => println!("✓ {} ({} tasks)", name, report.executed.len()),
            Err(error) => {
                println!("✗ {}: {}", name, error);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("check failed for {} of {} module(s)", failed, modules.len());
    }
    Ok(())
}

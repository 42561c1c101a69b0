//! Configure command - apply profiles to every module and report the outcome

use crate::session::Session;
use anyhow::{bail, Result};
use std::path::Path;

/// Run the configure command
pub fn run(project_dir: &Path, json: bool) -> Result<()> {
    let session = Session::open(project_dir)?;
    let workspace = &session.workspace;
    let report = &session.report;

    if json {
        let modules: Vec<_> = workspace
            .modules()
            .map(|module| {
                let error = report.failure(&module.name).map(|e| e.to_string());
                serde_json::json!({
                    "name": module.name,
                    "configured": error.is_none(),
                    "profiles": workspace.profiles_of(&module.name),
                    "internalVersion": module.internal_version.as_ref().map(ToString::to_string),
                    "tasks": module.tasks.len(),
                    "error": error,
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "success": report.is_success(),
                "modules": modules,
            }))?
        );
    } else {
        for module in workspace.modules() {
            match report.failure(&module.name) {
                Some(error) => println!("✗ {}: {}", module.name, error),
                None => println!(
                    "✓ {} [{}] {} tasks",
                    module.name,
                    module.applied_profiles.join(", "),
                    module.tasks.len()
                ),
            }
        }
    }

    if !report.is_success() {
        bail!("{} module(s) failed to configure", report.failures.len());
    }
    Ok(())
}

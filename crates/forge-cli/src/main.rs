use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod collaborators;
mod commands;
mod session;

/// Forge build-convention orchestrator.
///
/// Applies named profiles to the modules of a forge workspace, assembles
/// relocated `dist` jars and publishes only the canonical artifacts.
///
/// EXAMPLES:
///     forge configure                      Apply profiles to every module
///     forge tasks worldguard-core          List a module's tasks
///     forge publications worldguard-bukkit Show published variants
///     forge assemble worldguard-bukkit     Build the merged jar
///     forge check                          Run the check gate everywhere
///
/// ENVIRONMENT VARIABLES:
///     FORGE_BUILD_ID      Build identifier (overrides forge.toml and .git)
///     FORGE_JAVA_RELEASE  Target language level
///     FORGE_SOURCES_JAR   Produce sources artifacts (true/false)
///     FORGE_BAN_SLF4J     Forbid the slf4j facade (true/false)
///     RUST_LOG            Log filter (e.g. forge_build=debug)
#[derive(Parser)]
#[command(name = "forge")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Workspace directory (searched upwards for forge.toml)
    #[arg(short = 'C', long, global = true, default_value = ".")]
    project_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply profiles to every module and report failures
    ///
    /// A module that fails to configure is reported and left untouched;
    /// its siblings are still configured.
    Configure {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the tasks a module's profiles registered
    Tasks {
        /// Module name
        module: String,
    },

    /// Show a module's published variants
    ///
    /// EXAMPLES:
    ///     forge publications worldguard-bukkit
    ///     forge publications worldguard-bukkit --metadata
    Publications {
        /// Module name
        module: String,
        /// Print the module metadata document instead
        #[arg(long)]
        metadata: bool,
    },

    /// Assemble a module's merged (dist) jar
    Assemble {
        /// Module name
        module: String,
        /// Always merge, ignoring cached results
        #[arg(long)]
        no_cache: bool,
    },

    /// Run the check gate (style checks, tests, policy checks)
    Check {
        /// Module name (default: every module in dependency order)
        module: Option<String>,
    },

    /// Publish a module's canonical artifacts into a directory repository
    Publish {
        /// Module name
        module: String,
        /// Repository directory
        #[arg(long, short = 'r')]
        repository: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Configure { json } => commands::configure::run(&cli.project_dir, json),
        Commands::Tasks { module } => commands::tasks::run(&cli.project_dir, &module),
        Commands::Publications { module, metadata } => {
            commands::publications::run(&cli.project_dir, &module, metadata)
        }
        Commands::Assemble { module, no_cache } => {
            commands::assemble::run(&cli.project_dir, &module, !no_cache)
        }
        Commands::Check { module } => commands::check::run(&cli.project_dir, module.as_deref()),
        Commands::Publish { module, repository } => {
            commands::publish::run(&cli.project_dir, &module, &repository)
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

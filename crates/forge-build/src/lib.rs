//! Forge build conventions
//!
//! Configures the modules of a multi-module JVM workspace:
//! - Profiles that apply compile, style-check, documentation, test,
//!   dependency and publication rules in a fixed order
//! - A relocation and merge engine producing a `dist` jar from owned modules
//!   and selected third-party dependencies
//! - A publication variant manager that keeps merged artifacts out of
//!   published metadata
//! - Workspace orchestration with per-module failure isolation and a task
//!   executor driving external tools through traits

pub mod error;
pub mod executor;
pub mod graph;
pub mod interfaces;
pub mod module;
pub mod profile;
pub mod publication;
pub mod shadow;
pub mod tasks;
pub mod version;
pub mod workspace;

// Re-export main types
pub use error::{BuildError, BuildResult};
pub use executor::{Collaborators, ExecutionReport, TaskExecutor};
pub use graph::DependencyGraph;
pub use interfaces::{
    DependencyResolver, DocGenerator, LockfileResolver, RepositoryClient, SourceSet,
    StyleCheckReport, StyleChecker, TestOutcome, Toolchain,
};
pub use module::{Artifact, ArtifactKind, Module};
pub use profile::{Profile, ProfileApplier, ProfileOptions, Step};
pub use publication::{
    PublishRequest, PublishedFile, RepositoryTarget, ResolutionViews, SoftwareComponent, Variant,
};
pub use shadow::{AssemblyCache, AssemblyInputs, MergeSpec, MergedArtifact, RelocationRule};
pub use tasks::TaskGraph;
pub use version::{InternalVersion, RootScope};
pub use workspace::{ConfigureReport, Workspace};

// Re-export forge-package types for convenience
pub use forge_package::{CoordinatePattern, DependencyCoordinate, DependencyScope};

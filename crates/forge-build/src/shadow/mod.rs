//! Relocation & merge engine
//!
//! Folds owned module outputs and selected third-party archives into one
//! distributable jar:
//! 1. include: the module's own output, the listed modules, then the listed
//!    dependencies (allow-list)
//! 2. relocate: rewrite namespaces inside matched dependencies only
//! 3. exclude: drop paths matching a glob, checked before and after relocation
//! 4. merge: owned modules win over dependencies; two owned modules providing
//!    the same path is an error
//!
//! The result is tagged with its own classifier (`dist` by default) so it is
//! never mistaken for the module's primary jar.

pub mod archive;
pub mod cache;
pub mod classfile;
pub mod merge;
pub mod pattern;
pub mod relocate;
pub mod spec;

pub use archive::Archive;
pub use cache::{fingerprint, AssemblyCache, CachedAssembly};
pub use merge::{assemble, merge, AssemblyInputs, Collision, MergeTarget, MergedArtifact, MergedEntry, Origin};
pub use pattern::PathPattern;
pub use relocate::Relocator;
pub use spec::{MergeSpec, RelocationRule, ValidatedSpec};

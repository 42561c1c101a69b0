/// Build system error types
use std::path::PathBuf;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Configuration error in module '{module}': {reason}")]
    Configuration { module: String, reason: String },

    #[error(
        "Assembly of '{module}' failed: path '{path}' is provided by both '{first}' and '{second}'"
    )]
    Assembly {
        module: String,
        path: String,
        first: String,
        second: String,
    },

    #[error("Conflicting relocations in module '{module}': {first} vs {second} ({reason})")]
    RelocationConflict {
        module: String,
        first: String,
        second: String,
        reason: String,
    },

    #[error("Publication policy violated by module '{module}': {reason}")]
    PolicyViolation { module: String, reason: String },

    #[error("Style check failed for '{module}' ({source_set}):\n{report}")]
    StyleCheckFailed {
        module: String,
        source_set: String,
        report: String,
    },

    #[error("Tests failed for '{module}': {failed} of {total} failed")]
    TestsFailed {
        module: String,
        failed: usize,
        total: usize,
    },

    #[error("Module '{module}' depends on banned dependency '{coordinate}'")]
    BannedDependency { module: String, coordinate: String },

    #[error("Task '{task}' not found in module '{module}'")]
    TaskNotFound { module: String, task: String },

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Module not found: {module}")]
    ModuleNotFound { module: String },

    #[error("Failed to resolve '{coordinate}': {reason}")]
    Resolution { coordinate: String, reason: String },

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Malformed class file '{path}': {reason}")]
    ClassFormat { path: String, reason: String },

    #[error("I/O error at {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Package error: {0}")]
    Package(#[from] forge_package::PackageError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BuildError {
    /// Create a configuration error scoped to a module
    pub fn configuration(module: impl Into<String>, reason: impl ToString) -> Self {
        Self::Configuration {
            module: module.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an owned-content collision error
    pub fn assembly(
        module: impl Into<String>,
        path: impl Into<String>,
        first: impl Into<String>,
        second: impl Into<String>,
    ) -> Self {
        Self::Assembly {
            module: module.into(),
            path: path.into(),
            first: first.into(),
            second: second.into(),
        }
    }

    /// Create a relocation conflict error
    pub fn relocation_conflict(
        module: impl Into<String>,
        first: impl ToString,
        second: impl ToString,
        reason: impl ToString,
    ) -> Self {
        Self::RelocationConflict {
            module: module.into(),
            first: first.to_string(),
            second: second.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a publication policy violation
    pub fn policy_violation(module: impl Into<String>, reason: impl ToString) -> Self {
        Self::PolicyViolation {
            module: module.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }

    /// Create a resolution error
    pub fn resolution(coordinate: impl ToString, reason: impl ToString) -> Self {
        Self::Resolution {
            coordinate: coordinate.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a task not found error
    pub fn task_not_found(module: impl Into<String>, task: impl Into<String>) -> Self {
        Self::TaskNotFound {
            module: module.into(),
            task: task.into(),
        }
    }

    /// Create a module not found error
    pub fn module_not_found(module: impl Into<String>) -> Self {
        Self::ModuleNotFound {
            module: module.into(),
        }
    }

    /// Name of the module the error is scoped to, if any
    pub fn module(&self) -> Option<&str> {
        match self {
            Self::Configuration { module, .. }
            | Self::Assembly { module, .. }
            | Self::RelocationConflict { module, .. }
            | Self::PolicyViolation { module, .. }
            | Self::StyleCheckFailed { module, .. }
            | Self::TestsFailed { module, .. }
            | Self::BannedDependency { module, .. }
            | Self::TaskNotFound { module, .. }
            | Self::ModuleNotFound { module } => Some(module),
            _ => None,
        }
    }
}

//! Name validation for modules, groups and JVM package prefixes

use crate::coordinate::DependencyCoordinate;

/// Validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Invalid module name format
    InvalidModuleName(String),
    /// Invalid group id
    InvalidGroup(String),
    /// Invalid JVM package name or prefix
    InvalidPackageName(String),
    /// Invalid dependency coordinate
    InvalidCoordinate { coordinate: String, reason: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidModuleName(msg) => write!(f, "Invalid module name: {}", msg),
            ValidationError::InvalidGroup(msg) => write!(f, "Invalid group: {}", msg),
            ValidationError::InvalidPackageName(msg) => {
                write!(f, "Invalid package name: {}", msg)
            }
            ValidationError::InvalidCoordinate { coordinate, reason } => {
                write!(f, "Invalid coordinate '{}': {}", coordinate, reason)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validator for the names forge passes around
pub struct Validator;

impl Validator {
    /// Validate module name format
    ///
    /// Lowercase letters, digits, `-` and `_`; must start with a letter or
    /// digit and must not end with `-` or `_`.
    pub fn validate_module_name(name: &str) -> Result<(), ValidationError> {
        let Some(first) = name.chars().next() else {
            return Err(ValidationError::InvalidModuleName(
                "Module name cannot be empty".to_string(),
            ));
        };

        if !first.is_ascii_lowercase() && !first.is_ascii_digit() {
            return Err(ValidationError::InvalidModuleName(format!(
                "'{}' must start with lowercase letter or digit",
                name
            )));
        }

        if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
        {
            return Err(ValidationError::InvalidModuleName(format!(
                "'{}' contains invalid characters (only lowercase, digits, -, _ allowed)",
                name
            )));
        }

        if name.ends_with('-') || name.ends_with('_') {
            return Err(ValidationError::InvalidModuleName(format!(
                "'{}' cannot end with - or _",
                name
            )));
        }

        Ok(())
    }

    /// Validate a group id (`com.sk89q.worldguard`)
    pub fn validate_group(group: &str) -> Result<(), ValidationError> {
        if group.is_empty() {
            return Err(ValidationError::InvalidGroup(
                "Group cannot be empty".to_string(),
            ));
        }

        for part in group.split('.') {
            if part.is_empty()
                || !part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            {
                return Err(ValidationError::InvalidGroup(format!(
                    "'{}' must be dot-separated segments of letters, digits, - or _",
                    group
                )));
            }
        }

        Ok(())
    }

    /// Validate a JVM package name or prefix
    ///
    /// Accepts dotted (`org.flywaydb`) or internal (`org/flywaydb`) form.
    pub fn validate_package_name(name: &str) -> Result<(), ValidationError> {
        if name.is_empty() {
            return Err(ValidationError::InvalidPackageName(
                "Package name cannot be empty".to_string(),
            ));
        }

        let separator = if name.contains('/') { '/' } else { '.' };
        for part in name.split(separator) {
            if !is_java_identifier(part) {
                return Err(ValidationError::InvalidPackageName(format!(
                    "'{}' has invalid segment '{}'",
                    name, part
                )));
            }
        }

        Ok(())
    }

    /// Validate a dependency coordinate
    pub fn validate_coordinate(coordinate: &DependencyCoordinate) -> Result<(), ValidationError> {
        Self::validate_group(&coordinate.group).map_err(|e| ValidationError::InvalidCoordinate {
            coordinate: coordinate.to_string(),
            reason: e.to_string(),
        })?;

        if coordinate.version.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidCoordinate {
                coordinate: coordinate.to_string(),
                reason: "version cannot contain whitespace".to_string(),
            });
        }

        Ok(())
    }
}

fn is_java_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_module_names() {
        assert!(Validator::validate_module_name("worldguard-core").is_ok());
        assert!(Validator::validate_module_name("worldguard_libs_core").is_ok());
        assert!(Validator::validate_module_name("core2").is_ok());
    }

    #[test]
    fn test_invalid_module_names() {
        assert!(Validator::validate_module_name("").is_err());
        assert!(Validator::validate_module_name("WorldGuard").is_err());
        assert!(Validator::validate_module_name("-core").is_err());
        assert!(Validator::validate_module_name("core-").is_err());
        assert!(Validator::validate_module_name("core:libs").is_err());
    }

    #[test]
    fn test_groups() {
        assert!(Validator::validate_group("com.sk89q.worldguard").is_ok());
        assert!(Validator::validate_group("com..sk89q").is_err());
        assert!(Validator::validate_group("com sk89q").is_err());
    }

    #[test]
    fn test_package_names() {
        assert!(Validator::validate_package_name("org.flywaydb").is_ok());
        assert!(Validator::validate_package_name("org/flywaydb").is_ok());
        assert!(Validator::validate_package_name("com.sk89q.worldguard.internal.flywaydb").is_ok());
        assert!(Validator::validate_package_name("org.1flyway").is_err());
        assert!(Validator::validate_package_name("org..flyway").is_err());
        assert!(Validator::validate_package_name("").is_err());
    }

    #[test]
    fn test_coordinate_validation() {
        let good = DependencyCoordinate::new("org.flywaydb", "flyway-core", "3.0");
        assert!(Validator::validate_coordinate(&good).is_ok());

        let bad = DependencyCoordinate::new("org flywaydb", "flyway-core", "3.0");
        assert!(Validator::validate_coordinate(&bad).is_err());
    }
}

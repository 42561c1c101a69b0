//! Ant-style path patterns
//!
//! `*` matches within one path segment, `?` one character, and a `**`
//! segment any number of segments. A pattern excludes a path when it matches
//! the path itself or one of its parent directories.

use crate::error::{BuildError, BuildResult};
use regex::Regex;
use std::fmt;

/// A compiled path glob
#[derive(Debug, Clone)]
pub struct PathPattern {
    glob: String,
    regex: Regex,
}

impl PathPattern {
    /// Compile a glob
    pub fn new(glob: &str) -> BuildResult<Self> {
        let trimmed = glob.trim().trim_start_matches('/');
        if trimmed.is_empty() {
            return Err(BuildError::InvalidPattern {
                pattern: glob.to_string(),
                reason: "pattern is empty".to_string(),
            });
        }

        let regex = Regex::new(&glob_to_regex(trimmed)).map_err(|e| BuildError::InvalidPattern {
            pattern: glob.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            glob: glob.to_string(),
            regex,
        })
    }

    pub fn glob(&self) -> &str {
        &self.glob
    }

    /// Whether the pattern matches `path` exactly
    pub fn matches_exact(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Whether the pattern matches `path` or any of its parent directories
    pub fn matches(&self, path: &str) -> bool {
        let mut current = path.trim_end_matches('/');
        loop {
            if self.regex.is_match(current) {
                return true;
            }
            match current.rfind('/') {
                Some(index) => current = &current[..index],
                None => return false,
            }
        }
    }
}

impl PartialEq for PathPattern {
    fn eq(&self, other: &Self) -> bool {
        self.glob == other.glob
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.glob)
    }
}

/// Check a path against a set of patterns
pub fn matches_any<'a>(patterns: &'a [PathPattern], path: &str) -> Option<&'a PathPattern> {
    patterns.iter().find(|pattern| pattern.matches(path))
}

fn glob_to_regex(glob: &str) -> String {
    let segments: Vec<&str> = glob.split('/').collect();
    let mut regex = String::from("^");

    for (index, segment) in segments.iter().enumerate() {
        let last = index + 1 == segments.len();
        if *segment == "**" {
            if last {
                regex.push_str(".*");
            } else {
                regex.push_str("(?:[^/]*/)*");
            }
            continue;
        }

        for c in segment.chars() {
            match c {
                '*' => regex.push_str("[^/]*"),
                '?' => regex.push_str("[^/]"),
                c => regex.push_str(&regex::escape(&c.to_string())),
            }
        }
        if !last {
            regex.push('/');
        }
    }

    regex.push('$');
    regex
}

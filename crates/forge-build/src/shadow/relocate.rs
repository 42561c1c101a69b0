//! Namespace relocation of dependency content
//!
//! A prefix is only rewritten at a namespace boundary: the byte before it
//! must not continue an identifier (a descriptor's `L` is allowed) and the
//! byte after it must be a separator or end the name. A slashed prefix may
//! also follow a leading `/`, as in absolute resource names.

use crate::error::BuildResult;
use crate::shadow::classfile;
use crate::shadow::spec::RelocationRule;

/// Directory holding service-provider descriptors
pub const SERVICES_DIR: &str = "META-INF/services/";

/// Root of versioned entries in a multi-release jar
pub const VERSIONS_DIR: &str = "META-INF/versions/";

/// Extensions of resources rewritten as text
pub const TEXT_EXTENSIONS: [&str; 7] = [".properties", ".xml", ".txt", ".json", ".MF", ".yml", ".yaml"];

/// One prefix form (dotted or slashed) and its replacement
#[derive(Debug, Clone)]
struct Mapping {
    from: Vec<u8>,
    to: Vec<u8>,
    separator: u8,
}

/// Applies a set of relocation rules to entries of one dependency
#[derive(Debug, Clone)]
pub struct Relocator {
    /// Longest prefix first
    mappings: Vec<Mapping>,
}

impl Relocator {
    /// Create a relocator; the most specific rule wins where prefixes nest
    pub fn new<'a>(rules: impl IntoIterator<Item = &'a RelocationRule>) -> Self {
        let mut mappings = Vec::new();
        for rule in rules {
            mappings.push(Mapping {
                from: rule.from().as_bytes().to_vec(),
                to: rule.to().as_bytes().to_vec(),
                separator: b'.',
            });
            mappings.push(Mapping {
                from: rule.from().replace('.', "/").into_bytes(),
                to: rule.to().replace('.', "/").into_bytes(),
                separator: b'/',
            });
        }
        mappings.sort_by(|a, b| b.from.len().cmp(&a.from.len()));
        Self { mappings }
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Rewrite every boundary-delimited occurrence of a source prefix
    ///
    /// Returns `None` when nothing matched.
    pub fn rewrite_bytes(&self, input: &[u8]) -> Option<Vec<u8>> {
        if self.mappings.is_empty() {
            return None;
        }

        let mut output: Option<Vec<u8>> = None;
        let mut copied_to = 0;
        let mut i = 0;

        while i < input.len() {
            if let Some(mapping) = self.match_at(input, i) {
                let out = output.get_or_insert_with(|| Vec::with_capacity(input.len() + 32));
                out.extend_from_slice(&input[copied_to..i]);
                out.extend_from_slice(&mapping.to);
                i += mapping.from.len();
                copied_to = i;
            } else {
                i += 1;
            }
        }

        output.map(|mut out| {
            out.extend_from_slice(&input[copied_to..]);
            out
        })
    }

    /// Rewrite a string, returning it unchanged when nothing matched
    pub fn rewrite_str(&self, input: &str) -> String {
        match self.rewrite_bytes(input.as_bytes()) {
            // Prefixes are ASCII, so splicing keeps UTF-8 valid
            Some(bytes) => String::from_utf8(bytes).unwrap_or_else(|_| input.to_string()),
            None => input.to_string(),
        }
    }

    fn match_at(&self, input: &[u8], i: usize) -> Option<&Mapping> {
        let leading_slash =
            i > 0 && input[i - 1] == b'/' && (i == 1 || !is_identifier_byte(input[i - 2]));
        if i > 0 && !leading_slash {
            let previous = input[i - 1];
            if is_identifier_byte(previous) && previous != b'L' {
                return None;
            }
        }

        self.mappings.iter().find(|mapping| {
            (!leading_slash || mapping.separator == b'/')
                && input[i..].starts_with(&mapping.from)
                && match input.get(i + mapping.from.len()) {
                    None => true,
                    Some(&next) => next == mapping.separator || !is_identifier_byte(next),
                }
        })
    }

    /// Relocated entry path
    ///
    /// Class and resource paths move with their package; service descriptors
    /// are renamed after the relocated interface. Entries under
    /// `META-INF/versions/<n>/` keep that prefix and relocate the rest.
    pub fn relocate_path(&self, path: &str) -> String {
        if let Some(rest) = path.strip_prefix(VERSIONS_DIR) {
            if let Some((version, inner)) = rest.split_once('/') {
                if !version.is_empty() && version.bytes().all(|b| b.is_ascii_digit()) {
                    return format!("{}{}/{}", VERSIONS_DIR, version, self.relocate_path(inner));
                }
            }
        }
        if let Some(service) = path.strip_prefix(SERVICES_DIR) {
            if !service.contains('/') {
                return format!("{}{}", SERVICES_DIR, self.rewrite_str(service));
            }
        }
        self.rewrite_str(path)
    }

    /// Relocate one entry: its path and, where the format is understood,
    /// its content
    pub fn relocate_entry(&self, path: &str, bytes: &[u8]) -> BuildResult<(String, Option<Vec<u8>>)> {
        let new_path = self.relocate_path(path);

        let content = if path.ends_with(".class") && classfile::is_class_file(bytes) {
            classfile::rewrite_utf8_constants(path, bytes, |value| self.rewrite_bytes(value))?
        } else if is_text_resource(path) {
            self.rewrite_bytes(bytes)
        } else {
            None
        };

        Ok((new_path, content))
    }
}

/// Whether an entry's content is relocated as text
pub fn is_text_resource(path: &str) -> bool {
    if path.starts_with(SERVICES_DIR) {
        return true;
    }
    TEXT_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

fn is_identifier_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'$' | b'.' | b'/')
}

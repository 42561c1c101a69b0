//! In-memory archives and deterministic jar output

use crate::error::{BuildError, BuildResult};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{Cursor, ErrorKind, Read, Write};
use std::path::Path;
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

/// Path of the jar manifest
pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

/// Ordered file entries of an archive (`path -> bytes`)
///
/// Paths use `/` separators and never start with `/`. Directories are not
/// stored; they are synthesised when writing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Archive {
    entries: BTreeMap<String, Vec<u8>>,
}

impl Archive {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Insert an entry, returning the previous content
    pub fn insert(&mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Option<Vec<u8>> {
        self.entries.insert(path.into(), bytes.into())
    }

    /// Builder-style insert
    pub fn with_entry(mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(path, bytes);
        self
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.entries.get(path).map(Vec::as_slice)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn remove(&mut self, path: &str) -> Option<Vec<u8>> {
        self.entries.remove(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry paths in sorted order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries
            .iter()
            .map(|(path, bytes)| (path.as_str(), bytes.as_slice()))
    }

    /// Total size of all entries in bytes
    pub fn content_size(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Read a zip/jar from memory
    pub fn from_zip_bytes(bytes: &[u8]) -> BuildResult<Self> {
        let mut zip = ZipArchive::new(Cursor::new(bytes))?;
        let mut archive = Self::new();

        for i in 0..zip.len() {
            let mut file = zip.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let Some(path) = normalize_entry_name(file.name()) else {
                tracing::warn!(entry = file.name(), "skipping entry with unsafe path");
                continue;
            };
            let mut content = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut content)?;
            archive.insert(path, content);
        }

        Ok(archive)
    }

    /// Read a jar file from disk
    pub fn read_jar(path: &Path) -> BuildResult<Self> {
        let bytes = fs::read(path).map_err(|e| BuildError::io(path, e))?;
        Self::from_zip_bytes(&bytes)
    }

    /// Read every file below a directory
    pub fn from_dir(dir: &Path) -> BuildResult<Self> {
        let mut archive = Self::new();

        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(dir).to_path_buf();
                BuildError::io(path, e.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(dir)
                .map_err(|e| {
                    BuildError::io(entry.path(), std::io::Error::new(ErrorKind::Other, e))
                })?;
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let content = fs::read(entry.path()).map_err(|e| BuildError::io(entry.path(), e))?;
            archive.insert(name, content);
        }

        Ok(archive)
    }

    /// Load a directory tree or a jar file
    pub fn load(path: &Path) -> BuildResult<Self> {
        if path.is_dir() {
            Self::from_dir(path)
        } else {
            Self::read_jar(path)
        }
    }

    /// Write a deterministic jar
    ///
    /// The manifest comes first, parent directories are synthesised, entries
    /// are sorted and every timestamp is fixed, so identical archives produce
    /// identical bytes.
    pub fn to_zip_bytes(&self) -> BuildResult<Vec<u8>> {
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default())
            .unix_permissions(0o644);
        let dir_options = options.unix_permissions(0o755);

        let mut names: BTreeSet<String> = BTreeSet::new();
        for path in self.entries.keys() {
            let mut end = 0;
            while let Some(index) = path[end..].find('/') {
                end += index + 1;
                names.insert(path[..end].to_string());
            }
            names.insert(path.clone());
        }

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        if let Some(manifest) = self.entries.get(MANIFEST_PATH) {
            writer.add_directory("META-INF/", dir_options)?;
            writer.start_file(MANIFEST_PATH, options)?;
            writer.write_all(manifest)?;
            names.remove("META-INF/");
            names.remove(MANIFEST_PATH);
        }

        for name in names {
            if name.ends_with('/') {
                writer.add_directory(name, dir_options)?;
            } else if let Some(content) = self.entries.get(&name) {
                writer.start_file(name, options)?;
                writer.write_all(content)?;
            }
        }

        Ok(writer.finish()?.into_inner())
    }

    /// Write a deterministic jar to disk, creating parent directories
    pub fn write_jar(&self, path: &Path) -> BuildResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }
        let bytes = self.to_zip_bytes()?;
        fs::write(path, bytes).map_err(|e| BuildError::io(path, e))
    }
}

impl FromIterator<(String, Vec<u8>)> for Archive {
    fn from_iter<T: IntoIterator<Item = (String, Vec<u8>)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Normalise a zip entry name; `None` for names escaping the archive root
fn normalize_entry_name(name: &str) -> Option<String> {
    let name = name.replace('\\', "/");
    let name = name.trim_start_matches('/');
    if name.is_empty() || name.split('/').any(|segment| segment == "..") {
        return None;
    }
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sample() -> Archive {
        Archive::new()
            .with_entry("org/example/B.class", b"b".to_vec())
            .with_entry(MANIFEST_PATH, b"Manifest-Version: 1.0\r\n\r\n".to_vec())
            .with_entry("org/example/A.class", b"a".to_vec())
    }

    #[test]
    fn test_zip_round_trip() {
        let archive = sample();
        let bytes = archive.to_zip_bytes().unwrap();
        assert_eq!(Archive::from_zip_bytes(&bytes).unwrap(), archive);
    }

    #[test]
    fn test_output_is_deterministic() {
        assert_eq!(sample().to_zip_bytes().unwrap(), sample().to_zip_bytes().unwrap());
    }

    #[test]
    fn test_manifest_first_and_directories_synthesised() {
        let bytes = sample().to_zip_bytes().unwrap();
        let mut zip = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<String> = (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "META-INF/",
                MANIFEST_PATH,
                "org/",
                "org/example/",
                "org/example/A.class",
                "org/example/B.class",
            ]
        );
    }

    #[test]
    fn test_from_dir() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("com/example")).unwrap();
        fs::write(temp.path().join("com/example/Main.class"), b"main").unwrap();
        fs::write(temp.path().join("plugin.yml"), b"name: WorldGuard").unwrap();

        let archive = Archive::load(temp.path()).unwrap();
        assert_eq!(
            archive.paths().collect::<Vec<_>>(),
            vec!["com/example/Main.class", "plugin.yml"]
        );
        assert_eq!(archive.get("plugin.yml"), Some(&b"name: WorldGuard"[..]));
    }

    #[test]
    fn test_write_and_read_jar() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("libs/sample.jar");
        sample().write_jar(&path).unwrap();
        assert_eq!(Archive::load(&path).unwrap(), sample());
    }

    #[test]
    fn test_unsafe_names_rejected() {
        assert_eq!(normalize_entry_name("../evil"), None);
        assert_eq!(normalize_entry_name("/abs/ok").as_deref(), Some("abs/ok"));
        assert_eq!(normalize_entry_name("a\\b").as_deref(), Some("a/b"));
    }
}

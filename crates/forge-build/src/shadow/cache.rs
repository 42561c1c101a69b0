//! Content-addressed cache of merged artifacts
//!
//! A merge is a pure function of its spec, its target and the bytes of the
//! archives it includes, so its output is stored under a sha-256 of those.
//! The collisions a merge reported are kept in a JSON sidecar next to the
//! jar so a hit reports the same collisions as the miss that stored it.

use crate::error::{BuildError, BuildResult};
use crate::shadow::merge::{merge, AssemblyInputs, Collision, MergeTarget};
use crate::shadow::spec::MergeSpec;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Bumped whenever merge output changes for identical inputs
const FINGERPRINT_VERSION: &str = "forge-assembly-2";

/// Fingerprint of everything a merge reads
pub fn fingerprint(target: &MergeTarget, spec: &MergeSpec, inputs: &AssemblyInputs) -> String {
    let mut hasher = Sha256::new();
    feed(&mut hasher, FINGERPRINT_VERSION);
    feed(&mut hasher, &target.name);
    feed(&mut hasher, &target.version.to_string());
    feed(&mut hasher, &target.implementation_version);
    feed(&mut hasher, &spec.classifier);

    if let Some(own) = inputs.own_output() {
        feed(&mut hasher, "own");
        for (path, bytes) in own.iter() {
            feed(&mut hasher, path);
            feed(&mut hasher, bytes);
        }
    }
    for name in &spec.include_modules {
        feed(&mut hasher, "module");
        feed(&mut hasher, name);
        if let Some(archive) = inputs.module(name) {
            for (path, bytes) in archive.iter() {
                feed(&mut hasher, path);
                feed(&mut hasher, bytes);
            }
        }
    }
    for coordinate in &spec.include_dependencies {
        feed(&mut hasher, "dependency");
        feed(&mut hasher, &coordinate.to_string());
        if let Some(archive) = inputs.dependency(coordinate) {
            for (path, bytes) in archive.iter() {
                feed(&mut hasher, path);
                feed(&mut hasher, bytes);
            }
        }
    }
    for pattern in &spec.exclude_dependencies {
        feed(&mut hasher, "exclude-dependency");
        feed(&mut hasher, &pattern.to_string());
    }
    for rule in &spec.relocations {
        feed(&mut hasher, "relocate");
        feed(&mut hasher, rule.from());
        feed(&mut hasher, rule.to());
        for coordinate in rule.applies_to() {
            feed(&mut hasher, &coordinate.to_string());
        }
    }
    for glob in &spec.excludes {
        feed(&mut hasher, "exclude");
        feed(&mut hasher, glob);
    }
    for (key, value) in &spec.manifest {
        feed(&mut hasher, "manifest");
        feed(&mut hasher, key);
        feed(&mut hasher, value);
    }

    format!("{:x}", hasher.finalize())
}

/// Length-prefixed so adjacent fields cannot run together
fn feed(hasher: &mut Sha256, data: impl AsRef<[u8]>) {
    let data = data.as_ref();
    hasher.update((data.len() as u64).to_le_bytes());
    hasher.update(data);
}

/// Outcome of a cached assembly
#[derive(Debug, Clone)]
pub struct CachedAssembly {
    pub fingerprint: String,
    /// Jar inside the cache directory
    pub path: PathBuf,
    pub hit: bool,
    /// Dependency collisions the merge resolved
    pub collisions: Vec<Collision>,
}

/// Directory of merged jars keyed by fingerprint
#[derive(Debug, Clone)]
pub struct AssemblyCache {
    dir: PathBuf,
}

impl AssemblyCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, fingerprint: &str) -> PathBuf {
        self.dir.join(format!("{}.jar", fingerprint))
    }

    fn collisions_path(&self, fingerprint: &str) -> PathBuf {
        self.dir.join(format!("{}.collisions.json", fingerprint))
    }

    /// Cached jar for a fingerprint
    pub fn get(&self, fingerprint: &str) -> Option<PathBuf> {
        let path = self.entry_path(fingerprint);
        path.is_file().then_some(path)
    }

    /// Store jar bytes under a fingerprint
    pub fn store(&self, fingerprint: &str, bytes: &[u8]) -> BuildResult<PathBuf> {
        fs::create_dir_all(&self.dir).map_err(|e| BuildError::io(&self.dir, e))?;
        let path = self.entry_path(fingerprint);
        let partial = self.dir.join(format!("{}.jar.partial", fingerprint));
        fs::write(&partial, bytes).map_err(|e| BuildError::io(&partial, e))?;
        fs::rename(&partial, &path).map_err(|e| BuildError::io(&path, e))?;
        Ok(path)
    }

    /// Collisions recorded alongside a cached jar; none if no sidecar exists
    pub fn collisions(&self, fingerprint: &str) -> BuildResult<Vec<Collision>> {
        let path = self.collisions_path(fingerprint);
        if !path.is_file() {
            return Ok(Vec::new());
        }
        let json = fs::read_to_string(&path).map_err(|e| BuildError::io(&path, e))?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Record the collisions of a merge; written before its jar
    pub fn store_collisions(&self, fingerprint: &str, collisions: &[Collision]) -> BuildResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| BuildError::io(&self.dir, e))?;
        let path = self.collisions_path(fingerprint);
        fs::write(&path, serde_json::to_vec_pretty(collisions)?).map_err(|e| BuildError::io(&path, e))
    }

    /// Return the cached jar or merge and store it
    pub fn get_or_assemble(
        &self,
        target: &MergeTarget,
        spec: &MergeSpec,
        inputs: &AssemblyInputs,
    ) -> BuildResult<CachedAssembly> {
        let fingerprint = fingerprint(target, spec, inputs);

        if let Some(path) = self.get(&fingerprint) {
            tracing::info!(module = %target.name, fingerprint = %fingerprint, "merged artifact cache hit");
            let collisions = self.collisions(&fingerprint)?;
            return Ok(CachedAssembly {
                fingerprint,
                path,
                hit: true,
                collisions,
            });
        }

        let artifact = merge(target, spec, inputs)?;
        self.store_collisions(&fingerprint, &artifact.collisions)?;
        let path = self.store(&fingerprint, &artifact.to_jar_bytes()?)?;
        Ok(CachedAssembly {
            fingerprint,
            path,
            hit: false,
            collisions: artifact.collisions,
        })
    }

    /// Remove every cached jar and sidecar
    pub fn clear(&self) -> BuildResult<()> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir).map_err(|e| BuildError::io(&self.dir, e))?;
        }
        Ok(())
    }
}

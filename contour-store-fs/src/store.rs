// contour-store-fs/src/store.rs
// ============================================================================
// Module: File-System Specification Store
// Description: Durable SpecPersistence backed by a directory of JSON files.
// Purpose: Persist specifications as {appId}-{version}.json with strict limits.
// Dependencies: contour-core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Specifications persist as one JSON document per `(app_id, version)` pair
//! under a root directory. Enumeration is stable (sorted by filename), writes
//! go through a temp file and rename, and identifier components are
//! sanitized before they touch a path. Decode failures fail closed: a
//! corrupt file aborts `load_all` rather than being skipped silently.
//!
//! Security posture: stored files and identifiers are untrusted; see the
//! component sanitization below.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use contour_core::AppId;
use contour_core::PersistError;
use contour_core::SpecPersistence;
use contour_core::SpecVersion;
use contour_core::Specification;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum size of one persisted specification document, in bytes.
pub const MAX_SPEC_FILE_BYTES: u64 = 4 * 1024 * 1024;
/// Maximum length of an identifier used as a filename component.
const MAX_COMPONENT_LENGTH: usize = 255;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// File-store errors, mapped into [`PersistError`] at the trait boundary.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum FsStoreError {
    /// Identifier unusable as a filename component.
    #[error("unsafe identifier component: {0}")]
    UnsafeComponent(String),
    /// A stored file exceeds the size limit.
    #[error("specification file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Directory-backed specification persistence.
#[derive(Debug, Clone)]
pub struct FsSpecStore {
    /// Root directory holding `{appId}-{version}.json` files.
    root: PathBuf,
}

impl FsSpecStore {
    /// Creates a store rooted at the given directory.
    ///
    /// The directory is created lazily on first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// Returns the store's root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Builds the file path for a specification pair.
    fn spec_path(&self, app_id: &AppId, version: &SpecVersion) -> Result<PathBuf, FsStoreError> {
        ensure_safe_component(app_id.as_str())?;
        ensure_safe_component(version.as_str())?;
        Ok(self.root.join(format!("{}-{}.json", app_id.as_str(), version.as_str())))
    }
}

impl SpecPersistence for FsSpecStore {
    fn load_all(&self) -> Result<Vec<Specification>, PersistError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.root).map_err(|err| PersistError::Io(err.to_string()))?;
        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| PersistError::Io(err.to_string()))?;
            let path = entry.path();
            if path.extension().is_some_and(|extension| extension == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut specs = Vec::with_capacity(paths.len());
        for path in paths {
            let metadata =
                fs::metadata(&path).map_err(|err| PersistError::Io(err.to_string()))?;
            if metadata.len() > MAX_SPEC_FILE_BYTES {
                return Err(PersistError::Invalid(
                    FsStoreError::TooLarge(path.display().to_string()).to_string(),
                ));
            }
            let raw = fs::read(&path).map_err(|err| PersistError::Io(err.to_string()))?;
            let spec: Specification = serde_json::from_slice(&raw).map_err(|err| {
                PersistError::Invalid(format!("{}: {err}", path.display()))
            })?;
            specs.push(spec);
        }
        Ok(specs)
    }

    fn persist(&self, spec: &Specification) -> Result<(), PersistError> {
        let path = self
            .spec_path(&spec.app_id, &spec.version)
            .map_err(|err| PersistError::Invalid(err.to_string()))?;
        fs::create_dir_all(&self.root).map_err(|err| PersistError::Io(err.to_string()))?;

        let rendered = serde_json::to_vec_pretty(spec)
            .map_err(|err| PersistError::Invalid(err.to_string()))?;
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, &rendered).map_err(|err| PersistError::Io(err.to_string()))?;
        fs::rename(&staging, &path).map_err(|err| PersistError::Io(err.to_string()))?;
        Ok(())
    }

    fn remove(&self, app_id: &AppId, version: &SpecVersion) -> Result<(), PersistError> {
        let path = self
            .spec_path(app_id, version)
            .map_err(|err| PersistError::Invalid(err.to_string()))?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(PersistError::Io(err.to_string())),
        }
    }
}

// ============================================================================
// SECTION: Sanitization
// ============================================================================

/// Rejects identifiers unusable as filename components.
fn ensure_safe_component(component: &str) -> Result<(), FsStoreError> {
    let safe = !component.is_empty()
        && component.len() <= MAX_COMPONENT_LENGTH
        && component != "."
        && component != ".."
        && component
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_'));
    if safe {
        Ok(())
    } else {
        Err(FsStoreError::UnsafeComponent(component.to_string()))
    }
}

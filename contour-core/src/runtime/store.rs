// contour-core/src/runtime/store.rs
// ============================================================================
// Module: Contour In-Memory Specification Store
// Description: Concurrent in-memory registry keyed by (app id, version).
// Purpose: Serve read-heavy resolution traffic with occasional writer mutations.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! The specification store is an in-memory map behind a reader-writer lock:
//! resolve requests take shared read access while `save` and `delete` take
//! exclusive access. Durability is delegated to a
//! [`crate::interfaces::SpecPersistence`] implementation owned by the host.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::RwLock;

use thiserror::Error;

use crate::core::identifiers::AppId;
use crate::core::identifiers::SpecVersion;
use crate::core::spec::Specification;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Specification store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The store lock was poisoned by a panicking writer.
    #[error("specification store lock poisoned")]
    Poisoned,
}

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory specification registry keyed by `(app_id, version)`.
#[derive(Debug, Default, Clone)]
pub struct InMemorySpecStore {
    /// Specification map behind a reader-writer lock.
    specs: Arc<RwLock<BTreeMap<(AppId, SpecVersion), Specification>>>,
}

impl InMemorySpecStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the specification for `(app_id, version)`, when present.
    pub fn get(
        &self,
        app_id: &AppId,
        version: &SpecVersion,
    ) -> Result<Option<Specification>, StoreError> {
        let guard = self.specs.read().map_err(|_| StoreError::Poisoned)?;
        Ok(guard.get(&(app_id.clone(), version.clone())).cloned())
    }

    /// Returns every stored specification in key order.
    pub fn list(&self) -> Result<Vec<Specification>, StoreError> {
        let guard = self.specs.read().map_err(|_| StoreError::Poisoned)?;
        Ok(guard.values().cloned().collect())
    }

    /// Upserts a specification, stamping `updated_at` with the given time.
    ///
    /// Returns the stored value.
    pub fn save(
        &self,
        mut spec: Specification,
        now: Timestamp,
    ) -> Result<Specification, StoreError> {
        spec.updated_at = now;
        let key = (spec.app_id.clone(), spec.version.clone());
        let mut guard = self.specs.write().map_err(|_| StoreError::Poisoned)?;
        guard.insert(key, spec.clone());
        Ok(spec)
    }

    /// Deletes the specification for `(app_id, version)`.
    ///
    /// Returns whether an entry was removed.
    pub fn delete(&self, app_id: &AppId, version: &SpecVersion) -> Result<bool, StoreError> {
        let mut guard = self.specs.write().map_err(|_| StoreError::Poisoned)?;
        Ok(guard.remove(&(app_id.clone(), version.clone())).is_some())
    }

    /// Returns the number of stored specifications.
    pub fn len(&self) -> Result<usize, StoreError> {
        let guard = self.specs.read().map_err(|_| StoreError::Poisoned)?;
        Ok(guard.len())
    }

    /// Returns whether the store is empty.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

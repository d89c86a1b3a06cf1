//! Snapshot keys and the copy-and-swap index cache.
//!
//! A search index is derived from a working set of actions. The cache keys it
//! by a SHA-256 hash of that working set, rebuilds it wholesale when the hash
//! changes, and publishes the new index by swapping an `Arc`. Readers holding
//! the previous `Arc` finish against the old index undisturbed.

use crate::catalog::Catalog;
use crate::search::SearchIndex;
use sha2::{Digest, Sha256};
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// Identity of a working set.
pub type SnapshotKey = [u8; 32];

/// Hash of everything that feeds the search documents of `catalog`.
///
/// Every field is length-prefixed and every list is counted, so names that
/// contain separator characters cannot make two working sets collide.
pub fn snapshot_key(catalog: &Catalog) -> SnapshotKey {
    let mut hasher = Sha256::new();

    hasher.update((catalog.len() as u64).to_le_bytes());
    for action in catalog.iter() {
        update_field(&mut hasher, &action.name);
        update_field(&mut hasher, &action.description);
        hasher.update((action.parameters.len() as u64).to_le_bytes());
        for param in action.parameters.keys() {
            update_field(&mut hasher, param);
        }
    }

    hasher.finalize().into()
}

fn update_field(hasher: &mut Sha256, field: &str) {
    hasher.update((field.len() as u64).to_le_bytes());
    hasher.update(field.as_bytes());
}

/// An index together with the key of the working set it was built from.
#[derive(Debug)]
pub struct CachedIndex {
    pub key: SnapshotKey,
    pub index: SearchIndex,
}

/// Holds at most one index; replaced atomically on rebuild.
#[derive(Debug, Default)]
pub struct IndexCache {
    slot: RwLock<Option<Arc<CachedIndex>>>,
}

impl IndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached index if it was built for `key`.
    pub fn get(&self, key: &SnapshotKey) -> Option<Arc<CachedIndex>> {
        let slot = self.slot.read().unwrap_or_else(|e| e.into_inner());
        slot.as_ref().filter(|c| &c.key == key).cloned()
    }

    /// Return the index for `key`, building it with `build` on a miss.
    ///
    /// The build runs outside the lock; only the final swap takes the write
    /// lock, so concurrent readers are never blocked by a rebuild.
    pub fn get_or_build<F>(&self, key: SnapshotKey, build: F) -> Arc<CachedIndex>
    where
        F: FnOnce() -> SearchIndex,
    {
        if let Some(cached) = self.get(&key) {
            return cached;
        }

        let start = Instant::now();
        let fresh = Arc::new(CachedIndex {
            key,
            index: build(),
        });
        let elapsed = start.elapsed();

        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        // Another caller may have published the same snapshot meanwhile.
        if let Some(existing) = slot.as_ref().filter(|c| c.key == key) {
            return Arc::clone(existing);
        }
        *slot = Some(Arc::clone(&fresh));
        drop(slot);

        tracing::info!(
            documents = fresh.index.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Search index rebuilt"
        );
        metrics::counter!("index_builds_total").increment(1);
        metrics::histogram!("index_build_ms").record(elapsed.as_secs_f64() * 1000.0);

        fresh
    }

    /// Drop the cached index; the next lookup rebuilds.
    pub fn invalidate(&self) {
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }
}

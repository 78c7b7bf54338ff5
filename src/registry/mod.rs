//! Persisted registry of active tunnels.
//!
//! The registry is the only memory shared between invocations: each command
//! loads it once, and every mutation rewrites the whole store before it
//! returns (write-through).
//!
//! # Concurrency
//!
//! Within one process a reader/writer lock linearizes access: reads run
//! alongside other reads, mutations are exclusive and hold the lock across
//! the save. Across processes there is no lock. Two invocations mutating the
//! same file at once can lose one of the writes.
//!
//! # Example
//!
//! ```no_run
//! use tunnel_manager::registry::TunnelRegistry;
//!
//! # fn example() -> tunnel_manager::Result<()> {
//! let registry = TunnelRegistry::open("/tmp/tunnels.json")?;
//! for record in registry.list() {
//!     println!("{} -> {}", record.id, record.pod_name);
//! }
//! # Ok(())
//! # }
//! ```

mod store;

pub use store::{JsonFileStore, MemoryStore, RecordMap, RegistryStore};

use crate::error::Result;
use crate::tunnel::TunnelRecord;
use parking_lot::RwLock;
use std::path::PathBuf;

pub struct TunnelRegistry {
    store: Box<dyn RegistryStore>,
    records: RwLock<RecordMap>,
}

impl std::fmt::Debug for TunnelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TunnelRegistry")
            .field("store", &self.store.location())
            .field("records", &self.records.read().len())
            .finish()
    }
}

impl TunnelRegistry {
    /// Build a registry over `store` and load its current contents.
    pub fn with_store(store: impl RegistryStore + 'static) -> Result<Self> {
        let registry = Self {
            store: Box::new(store),
            records: RwLock::new(RecordMap::new()),
        };
        registry.load()?;
        Ok(registry)
    }

    /// Open the JSON registry file at `path`. A missing file is an empty registry.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_store(JsonFileStore::new(path))
    }

    pub fn location(&self) -> String {
        self.store.location()
    }

    /// Replace the in-memory view with the persisted contents.
    pub fn load(&self) -> Result<()> {
        let mut records = self.records.write();
        *records = self.store.load()?;
        tracing::debug!(
            "loaded {} tunnel record(s) from {}",
            records.len(),
            self.store.location()
        );
        Ok(())
    }

    /// Persist the full current state.
    pub fn save(&self) -> Result<()> {
        let records = self.records.write();
        self.store.save(&records)
    }

    /// Apply `f` to a copy, persist it, then publish it. A failed save leaves
    /// the in-memory view unchanged.
    fn mutate<T>(&self, f: impl FnOnce(&mut RecordMap) -> T) -> Result<T> {
        let mut records = self.records.write();
        let mut next = records.clone();
        let out = f(&mut next);
        self.store.save(&next)?;
        *records = next;
        Ok(out)
    }

    /// Insert or overwrite by id.
    pub fn add(&self, record: TunnelRecord) -> Result<()> {
        self.mutate(|records| {
            records.insert(record.id.clone(), record);
        })
    }

    /// Remove by id, returning the removed record. Absent ids are a no-op
    /// (the store is still rewritten).
    pub fn remove(&self, id: &str) -> Result<Option<TunnelRecord>> {
        self.mutate(|records| records.remove(id))
    }

    pub fn clear(&self) -> Result<()> {
        self.mutate(|records| records.clear())
    }

    pub fn get(&self, id: &str) -> Option<TunnelRecord> {
        self.records.read().get(id).cloned()
    }

    pub fn get_by_service_env(&self, service: &str, environment: &str) -> Option<TunnelRecord> {
        self.records
            .read()
            .values()
            .find(|r| r.matches(service, environment))
            .cloned()
    }

    /// All records, ordered by id.
    pub fn list(&self) -> Vec<TunnelRecord> {
        self.records.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

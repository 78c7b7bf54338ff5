use crate::error::{Error, Result};
use crate::tunnel::TunnelRecord;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Records keyed by tunnel id.
pub type RecordMap = BTreeMap<String, TunnelRecord>;

/// Durable form of the tunnel registry.
///
/// `load` returns the full persisted map; `save` replaces it wholesale. The
/// registry never patches individual entries.
///
/// # Implementations
///
/// - [`JsonFileStore`]: a single JSON file, written via atomic rename
/// - [`MemoryStore`]: in-process buffer for tests; clones share contents
pub trait RegistryStore: Send + Sync {
    /// Read the persisted map. A store that has never been written is empty.
    fn load(&self) -> Result<RecordMap>;

    /// Overwrite the persisted map with `records`.
    fn save(&self, records: &RecordMap) -> Result<()>;

    /// Human-readable location, for log and error messages.
    fn location(&self) -> String;
}

/// Registry persisted as one JSON object (`id -> record`).
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomic file write using write-then-rename pattern
    fn atomic_write(path: &Path, contents: &str) -> Result<()> {
        use std::io::Write;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = path.with_extension("json.tmp");
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, path)?;
        Ok(())
    }
}

impl RegistryStore for JsonFileStore {
    fn load(&self) -> Result<RecordMap> {
        // Read directly instead of checking existence first
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(RecordMap::new()),
            Err(e) => return Err(e.into()),
        };
        if contents.trim().is_empty() {
            return Ok(RecordMap::new());
        }
        serde_json::from_str(&contents).map_err(|source| Error::RegistryCorrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, records: &RecordMap) -> Result<()> {
        let contents = serde_json::to_string_pretty(records)?;
        Self::atomic_write(&self.path, &contents)
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory store. Contents go through the same JSON encoding as the file
/// store, and clones share the buffer, so a second registry built from a clone
/// behaves like a fresh process reading the same file.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    contents: Option<String>,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from raw persisted contents (which may be malformed).
    pub fn with_contents(contents: impl Into<String>) -> Self {
        let store = Self::default();
        store.inner.lock().contents = Some(contents.into());
        store
    }

    /// Raw persisted JSON, if anything was saved.
    pub fn contents(&self) -> Option<String> {
        self.inner.lock().contents.clone()
    }

    /// Number of completed `save` calls.
    pub fn save_count(&self) -> usize {
        self.inner.lock().saves
    }
}

impl RegistryStore for MemoryStore {
    fn load(&self) -> Result<RecordMap> {
        match &self.inner.lock().contents {
            None => Ok(RecordMap::new()),
            Some(contents) => {
                serde_json::from_str(contents).map_err(|source| Error::RegistryCorrupt {
                    path: PathBuf::from(self.location()),
                    source,
                })
            }
        }
    }

    fn save(&self, records: &RecordMap) -> Result<()> {
        let contents = serde_json::to_string(records)?;
        let mut inner = self.inner.lock();
        inner.contents = Some(contents);
        inner.saves += 1;
        Ok(())
    }

    fn location(&self) -> String {
        "<memory>".to_string()
    }
}

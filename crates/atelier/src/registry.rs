use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config;
use crate::error::Error;

/// Persistence seam for the fine-tune registry.
pub trait RegistryStore: Send + Sync {
    fn load(&self) -> Result<BTreeMap<String, String>, Error>;
    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), Error>;
}

/// Registry store over a single pretty-printed JSON file.
///
/// Writes go through a temp file in the same directory followed by a
/// rename, so a crash mid-write never leaves a truncated registry behind.
/// An absent file reads as an empty registry.
pub struct FileRegistryStore {
    path: PathBuf,
}

impl FileRegistryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the per-user data directory, e.g.
    /// `~/.local/share/atelier/finetunes.json`.
    pub fn default_location() -> Result<Self, Error> {
        Ok(Self::new(config::default_registry_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RegistryStore for FileRegistryStore {
    fn load(&self) -> Result<BTreeMap<String, String>, Error> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        serde_json::from_str(&contents).map_err(|e| {
            Error::Storage(format!(
                "registry file {} is corrupt: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| Error::Storage(format!("could not encode registry: {}", e)))?;

        let temp_path = self.path.with_extension("tmp");
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

/// Name → fine-tune id mapping persisted across runs.
///
/// Every operation reads and writes a whole snapshot; `put` is
/// read-modify-write with last-write-wins semantics. Assumes a single
/// writer; the rename discipline only guarantees the file is never
/// half-written.
pub struct FinetuneRegistry<S: RegistryStore = FileRegistryStore> {
    store: S,
}

impl FinetuneRegistry<FileRegistryStore> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            store: FileRegistryStore::new(path),
        }
    }

    pub fn default_location() -> Result<Self, Error> {
        Ok(Self {
            store: FileRegistryStore::default_location()?,
        })
    }
}

impl<S: RegistryStore> FinetuneRegistry<S> {
    pub fn with_store(store: S) -> Self {
        Self { store }
    }

    /// Records a fine-tune under a human-readable name, overwriting any
    /// previous id stored under the same name.
    pub fn put(&self, name: &str, finetune_id: &str) -> Result<(), Error> {
        let mut entries = self.store.load()?;
        entries.insert(name.to_string(), finetune_id.to_string());
        self.store.save(&entries)?;
        debug!("Registered fine-tune {} as {:?}", finetune_id, name);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Option<String>, Error> {
        Ok(self.store.load()?.get(name).cloned())
    }

    pub fn get_all(&self) -> Result<BTreeMap<String, String>, Error> {
        self.store.load()
    }
}

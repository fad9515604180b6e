use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const STORAGE_FILE: &str = "storage.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to prepare storage directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode storage: {0}")]
    Encode(#[from] serde_json::Error),
}

/// String key/value storage, the desktop counterpart of browser local storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Keeps every key in one JSON object on disk and rewrites it on each `set`.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Opens the store in `dir`. Read problems are returned as warnings and
    /// leave the store empty.
    pub fn open(dir: impl Into<PathBuf>) -> (Self, Vec<String>) {
        let dir = dir.into();
        let mut warnings = Vec::new();
        let path = dir.join(STORAGE_FILE);
        let entries = if path.exists() {
            match read_entries(&path) {
                Ok(entries) => entries,
                Err(warning) => {
                    warnings.push(warning);
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        (Self { dir, entries }, warnings)
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(STORAGE_FILE)
    }

    fn ensure_dir(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Directory {
            path: self.dir.clone(),
            source,
        })
    }

    fn persist(&self) -> Result<(), StoreError> {
        self.ensure_dir()?;
        let final_path = self.path();
        let tmp_path = self.dir.join(format!("{STORAGE_FILE}.tmp"));
        let bytes = serde_json::to_vec_pretty(&self.entries)?;
        let write_error = |source| StoreError::Write {
            path: final_path.clone(),
            source,
        };

        fs::write(&tmp_path, bytes).map_err(write_error)?;
        match fs::rename(&tmp_path, &final_path) {
            Ok(()) => Ok(()),
            Err(rename_err) => {
                if final_path.exists() {
                    fs::remove_file(&final_path).map_err(write_error)?;
                    fs::rename(&tmp_path, &final_path).map_err(write_error)?;
                    Ok(())
                } else {
                    Err(write_error(rename_err))
                }
            }
        }
    }
}

fn read_entries(path: &Path) -> Result<BTreeMap<String, String>, String> {
    let data = fs::read(path).map_err(|err| format!("failed to read {}: {err}", path.display()))?;
    serde_json::from_slice(&data).map_err(|err| format!("failed to parse {}: {err}", path.display()))
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let previous = self.entries.insert(key.to_string(), value.to_string());
        if let Err(err) = self.persist() {
            match previous {
                Some(previous) => self.entries.insert(key.to_string(), previous),
                None => self.entries.remove(key),
            };
            return Err(err);
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

//! Single-use staged-fetch store.
//!
//! External fetch collaborators stage their downloaded artifacts here and
//! hand the caller an opaque key. The resolver consumes keys exactly once:
//! a successful read removes the entry, and unknown or already-consumed keys
//! are an ordinary miss, never an error.

use crate::error::DocketError;
use rand::RngCore;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const INDEX_FILE: &str = "index.json";

pub struct StagedStore {
    dir: PathBuf,
}

impl StagedStore {
    pub fn open(dir: &Path) -> Result<StagedStore, DocketError> {
        fs::create_dir_all(dir)
            .map_err(|err| DocketError::Storage(format!("create {}: {err}", dir.display())))?;
        Ok(StagedStore {
            dir: dir.to_path_buf(),
        })
    }

    /// Copy a fetched artifact into the store and return its single-use key.
    pub fn stage(&self, source: &Path) -> Result<String, DocketError> {
        use std::fmt::Write as _;
        let mut raw = [0u8; 16];
        rand::rngs::OsRng.fill_bytes(&mut raw);
        let mut key = String::with_capacity(raw.len() * 2);
        for byte in raw {
            let _ = write!(key, "{byte:02x}");
        }

        let dest = self.dir.join(format!("{key}.pdf"));
        fs::copy(source, &dest).map_err(|err| {
            DocketError::Storage(format!(
                "stage {} as {}: {err}",
                source.display(),
                dest.display()
            ))
        })?;

        let mut index = self.read_index();
        index.insert(key.clone(), dest);
        self.write_index(&index)?;
        Ok(key)
    }

    /// Consume a key: returns the staged file path and forgets the entry.
    /// The caller owns deleting the file itself once it is done with it.
    pub fn take(&self, key: &str) -> Option<PathBuf> {
        let mut index = self.read_index();
        let path = index.remove(key)?;
        if self.write_index(&index).is_err() {
            return None;
        }
        Some(path)
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    fn read_index(&self) -> BTreeMap<String, PathBuf> {
        let Ok(bytes) = fs::read(self.index_path()) else {
            return BTreeMap::new();
        };
        serde_json::from_slice(&bytes).unwrap_or_default()
    }

    fn write_index(&self, index: &BTreeMap<String, PathBuf>) -> Result<(), DocketError> {
        let bytes = serde_json::to_vec_pretty(index)
            .map_err(|err| DocketError::Storage(format!("serialize staging index: {err}")))?;
        let path = self.index_path();
        fs::write(&path, bytes)
            .map_err(|err| DocketError::Storage(format!("write {}: {err}", path.display())))?;
        Ok(())
    }
}

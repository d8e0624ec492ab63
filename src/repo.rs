//! Docket manifest persistence and lookup.
//!
//! Manifests are pretty-printed JSON in a date-sharded, append-only tree:
//! `{dockets}/{YYYY}/{MM}/{id}.json`, sharded by the save-time date rather
//! than the timestamp embedded in the ID. Writes are create-if-absent under
//! an exclusive lock, so an ID collision fails loudly instead of silently
//! replacing a record.

use crate::docket::DocketRecord;
use crate::error::DocketError;
use crate::util;
use chrono::Local;
use fs2::FileExt;
use rand::RngCore;
use regex::Regex;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;

const LIST_LIMIT_MAX: usize = 100;

fn docket_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^DOCKET-\d{8}-\d{6}-[A-F0-9]{6}$").expect("docket id regex"))
}

/// Generate a fresh docket ID: timestamp plus 3 random bytes, hex-encoded
/// uppercase. Uniqueness is probabilistic; collisions surface at save time.
pub fn new_docket_id() -> String {
    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    let mut suffix = [0u8; 3];
    rand::rngs::OsRng.fill_bytes(&mut suffix);
    format!(
        "DOCKET-{stamp}-{:02X}{:02X}{:02X}",
        suffix[0], suffix[1], suffix[2]
    )
}

/// Grammar gate for externally supplied IDs. Anything that fails it is
/// treated as "not found" so callers never learn filesystem detail.
pub fn is_valid_docket_id(id: &str) -> bool {
    docket_id_re().is_match(id)
}

/// Enumeration seam behind the repository queries. The default implementation
/// walks the whole tree; a maintained index can replace it without touching
/// the repository contract.
pub trait DocketIndex {
    /// All manifest files under `base`. Unreadable directories yield what
    /// could be seen, not an error.
    fn manifest_files(&self, base: &Path) -> Vec<PathBuf>;
}

/// Full-tree recursive scan, O(total dockets ever created).
pub struct FsScanIndex;

impl DocketIndex for FsScanIndex {
    fn manifest_files(&self, base: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        collect_json_files(base, &mut files);
        files
    }
}

fn collect_json_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_json_files(&path, out);
        } else if path.is_file()
            && path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        {
            out.push(path);
        }
    }
}

pub struct DocketRepository {
    base: PathBuf,
    index: Box<dyn DocketIndex>,
}

impl DocketRepository {
    pub fn new(base: PathBuf) -> DocketRepository {
        DocketRepository {
            base,
            index: Box::new(FsScanIndex),
        }
    }

    pub fn with_index(base: PathBuf, index: Box<dyn DocketIndex>) -> DocketRepository {
        DocketRepository { base, index }
    }

    fn manifest_path(&self, id: &str) -> PathBuf {
        let now = Local::now();
        self.base
            .join(now.format("%Y").to_string())
            .join(now.format("%m").to_string())
            .join(format!("{id}.json"))
    }

    /// Persist one record. Fails if a manifest for this ID already exists.
    pub fn save(&self, record: &DocketRecord) -> Result<(), DocketError> {
        let path = self.manifest_path(&record.id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                DocketError::Storage(format!("create {}: {err}", parent.display()))
            })?;
        }

        let json = serde_json::to_vec_pretty(record)
            .map_err(|err| DocketError::Storage(format!("encode docket JSON: {err}")))?;

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|err| DocketError::Storage(format!("create {}: {err}", path.display())))?;
        file.lock_exclusive()
            .map_err(|err| DocketError::Storage(format!("lock {}: {err}", path.display())))?;
        let written = file.write_all(&json);
        let _ = fs2::FileExt::unlock(&file);
        written.map_err(|err| DocketError::Storage(format!("write {}: {err}", path.display())))?;
        drop(file);

        util::restrict_permissions(&path).map_err(|err| DocketError::Storage(err.to_string()))?;
        tracing::info!(id = %record.id, path = %path.display(), "docket manifest saved");
        Ok(())
    }

    /// Most recent records by manifest modification time, newest first.
    /// `limit` is clamped to `[1, 100]`.
    pub fn list_recent(&self, limit: usize) -> Vec<DocketRecord> {
        let limit = limit.clamp(1, LIST_LIMIT_MAX);
        if !self.base.is_dir() {
            return Vec::new();
        }

        let mut files = self.index.manifest_files(&self.base);
        files.sort_by_key(|path| std::cmp::Reverse(mtime(path)));
        files.truncate(limit);

        files
            .iter()
            .filter_map(|path| read_record(path))
            .collect()
    }

    /// Look up one record by ID. Malformed IDs and benign misses are the
    /// same `None`; read or parse failures along the way never surface.
    pub fn load_by_id(&self, id: &str) -> Option<DocketRecord> {
        if !is_valid_docket_id(id) {
            return None;
        }
        let wanted = format!("{id}.json");
        self.index
            .manifest_files(&self.base)
            .into_iter()
            .find(|path| {
                path.file_name()
                    .is_some_and(|name| name.to_str() == Some(wanted.as_str()))
            })
            .and_then(|path| read_record(&path))
    }
}

fn mtime(path: &Path) -> SystemTime {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

fn read_record(path: &Path) -> Option<DocketRecord> {
    let bytes = fs::read(path).ok()?;
    serde_json::from_slice(&bytes).ok()
}

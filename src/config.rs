use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_OPERATOR: &str = "OTR Aviation";
const DEFAULT_MAX_UPLOAD_BYTES: u64 = 30 * 1024 * 1024;

/// Runtime configuration, loadable from a JSON file. Every field has a
/// default so an empty file (or no file) yields a working local setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_operator")]
    pub operator: String,
    /// Cover-page logo; skipped when absent.
    #[serde(default)]
    pub logo: Option<PathBuf>,
    #[serde(default)]
    pub paths: StoragePaths,
    /// Per-file upload cap, re-checked when accepting slot uploads.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
    /// Optional merge-tool override, e.g.
    /// `"qpdf --empty --pages {inputs} -- {output}"`. Parsed with shell-words;
    /// `{inputs}` expands to the source list and `{output}` to the
    /// destination. When set it replaces the built-in gs/pdftk chain.
    #[serde(default)]
    pub merge_tool: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoragePaths {
    pub uploads: PathBuf,
    pub dockets: PathBuf,
    pub generated: PathBuf,
    pub aip: PathBuf,
    pub staging: PathBuf,
    pub aircraft: PathBuf,
}

fn default_operator() -> String {
    DEFAULT_OPERATOR.to_string()
}

fn default_max_upload_bytes() -> u64 {
    DEFAULT_MAX_UPLOAD_BYTES
}

impl Default for StoragePaths {
    fn default() -> Self {
        let base = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("flight-docket");
        StoragePaths::under(&base)
    }
}

impl StoragePaths {
    /// The storage layout rooted at one directory.
    pub fn under(base: &Path) -> StoragePaths {
        StoragePaths {
            uploads: base.join("uploads"),
            dockets: base.join("dockets"),
            generated: base.join("generated"),
            aip: base.join("aip"),
            staging: base.join("staging"),
            aircraft: base.join("aircraft"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            operator: default_operator(),
            logo: None,
            paths: StoragePaths::default(),
            max_upload_bytes: default_max_upload_bytes(),
            merge_tool: None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Config> {
        let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
        let config: Config = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse config {}", path.display()))?;
        Ok(config)
    }

    /// Load from a file when given, defaults otherwise. An optional storage
    /// root overrides the path layout wholesale.
    pub fn resolve(file: Option<&Path>, storage_root: Option<&Path>) -> Result<Config> {
        let mut config = match file {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(root) = storage_root {
            config.paths = StoragePaths::under(root);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, b"{}").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.operator, DEFAULT_OPERATOR);
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert!(config.merge_tool.is_none());
    }

    #[test]
    fn storage_root_overrides_layout() {
        let config = Config::resolve(None, Some(Path::new("/srv/docket"))).unwrap();
        assert_eq!(config.paths.dockets, Path::new("/srv/docket/dockets"));
        assert_eq!(config.paths.aip, Path::new("/srv/docket/aip"));
    }
}

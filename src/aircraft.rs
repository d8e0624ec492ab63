//! Aircraft configuration repository.
//!
//! Flat JSON store, one file per aircraft under `{aircraft}/{id}.json`.
//! Externally supplied IDs pass the same grammar-gate-then-lookup posture as
//! docket IDs: a malformed ID is an ordinary miss.

use crate::error::DocketError;
use crate::util;
use chrono::Local;
use rand::RngCore;
use regex::Regex;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

fn aircraft_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^aircraft_(default_[A-Za-z0-9]+|[a-f0-9]+\.[0-9]+)$").expect("aircraft id regex")
    })
}

pub fn is_valid_aircraft_id(id: &str) -> bool {
    aircraft_id_re().is_match(id)
}

pub fn new_aircraft_id() -> String {
    let now = Local::now();
    let mut entropy = [0u8; 4];
    rand::rngs::OsRng.fill_bytes(&mut entropy);
    let fraction = u32::from_be_bytes(entropy) % 100_000_000;
    format!(
        "aircraft_{:08x}{:05x}.{fraction:08}",
        now.timestamp(),
        now.timestamp_subsec_micros()
    )
}

pub struct AircraftRepository {
    dir: PathBuf,
}

impl AircraftRepository {
    pub fn new(dir: PathBuf) -> AircraftRepository {
        AircraftRepository { dir }
    }

    fn config_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Persist one configuration. `id` and `updated_at` are stamped into the
    /// stored object.
    pub fn save(&self, id: &str, mut data: Value) -> Result<(), DocketError> {
        if !is_valid_aircraft_id(id) {
            return Err(DocketError::Storage(format!("invalid aircraft id: {id}")));
        }
        let Some(object) = data.as_object_mut() else {
            return Err(DocketError::Storage(
                "aircraft config must be a JSON object".to_string(),
            ));
        };
        object.insert("id".to_string(), Value::String(id.to_string()));
        object.insert(
            "updated_at".to_string(),
            Value::String(Local::now().format("%Y-%m-%d %H:%M:%S").to_string()),
        );

        fs::create_dir_all(&self.dir)
            .map_err(|err| DocketError::Storage(format!("create {}: {err}", self.dir.display())))?;
        let path = self.config_path(id);
        let json = serde_json::to_vec_pretty(&data)
            .map_err(|err| DocketError::Storage(format!("encode aircraft JSON: {err}")))?;
        fs::write(&path, json)
            .map_err(|err| DocketError::Storage(format!("write {}: {err}", path.display())))?;
        util::restrict_permissions(&path).map_err(|err| DocketError::Storage(err.to_string()))?;
        Ok(())
    }

    pub fn load(&self, id: &str) -> Option<Value> {
        if !is_valid_aircraft_id(id) {
            return None;
        }
        let bytes = fs::read(self.config_path(id)).ok()?;
        let data: Value = serde_json::from_slice(&bytes).ok()?;
        data.is_object().then_some(data)
    }

    pub fn exists(&self, id: &str) -> bool {
        is_valid_aircraft_id(id) && self.config_path(id).is_file()
    }

    /// All configurations, sorted by their `name` field.
    pub fn list_all(&self) -> Vec<Value> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut aircraft: Vec<Value> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file() && path.extension().is_some_and(|ext| ext == "json")
            })
            .filter_map(|path| {
                let bytes = fs::read(&path).ok()?;
                let data: Value = serde_json::from_slice(&bytes).ok()?;
                data.is_object().then_some(data)
            })
            .collect();
        aircraft.sort_by(|a, b| {
            let name_a = a.get("name").and_then(Value::as_str).unwrap_or("");
            let name_b = b.get("name").and_then(Value::as_str).unwrap_or("");
            name_a.cmp(name_b)
        });
        aircraft
    }

    pub fn delete(&self, id: &str) -> bool {
        if !is_valid_aircraft_id(id) {
            return false;
        }
        let path = self.config_path(id);
        path.is_file() && fs::remove_file(&path).is_ok()
    }
}

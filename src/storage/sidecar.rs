//! Sidecar store for task tracker identifiers
//!
//! The tracker renumbers its tasks as others complete; the stable handle
//! is the task uuid. The sidecar keeps the `numeric id => uuid` mapping of
//! each project, one JSON file per project:
//!
//! ```json
//! {"ids": {"9": "6fa4...", "14": "a1b2..."}}
//! ```
//!
//! The store is read in full before an annotate pass and written in full
//! after it. A missing file is an empty mapping.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::project_file::write_atomic;

#[derive(Debug, Error)]
pub enum SidecarError {
    #[error("Failed to read id mapping {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("Failed to parse id mapping {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to write id mapping {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("Failed to serialize id mapping: {0}")]
    Serialize(serde_json::Error),
}

/// Numeric tracker id => uuid, for one project
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdMap {
    /// Keyed by the id as text, as JSON object keys are strings
    #[serde(default)]
    ids: BTreeMap<String, String>,

    /// Keys written by other tools, kept on save
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl IdMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Uuid recorded for a numeric id
    pub fn uuid(&self, id: u32) -> Option<&str> {
        self.ids.get(&id.to_string()).map(String::as_str)
    }

    /// Numeric id currently recorded for a uuid
    pub fn id_of(&self, uuid: &str) -> Option<u32> {
        self.iter().find(|(_, u)| *u == uuid).map(|(id, _)| id)
    }

    /// Records that `id` is `uuid`, dropping any older id of the same uuid
    ///
    /// Returns true if the mapping changed.
    pub fn assign(&mut self, id: u32, uuid: &str) -> bool {
        if self.uuid(id) == Some(uuid) && self.ids.values().filter(|u| *u == uuid).count() == 1 {
            return false;
        }
        self.ids.retain(|_, u| u != uuid);
        self.ids.insert(id.to_string(), uuid.to_string());
        true
    }

    /// Drops a uuid, returning true if it was mapped
    pub fn forget(&mut self, uuid: &str) -> bool {
        let before = self.ids.len();
        self.ids.retain(|_, u| u != uuid);
        self.ids.len() != before
    }

    /// Iterates over readable `(id, uuid)` rows
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.ids
            .iter()
            .filter_map(|(id, uuid)| Some((id.parse().ok()?, uuid.as_str())))
    }
}

/// Persistence of id mappings, keyed by project name
pub trait SidecarStore {
    fn load(&self, project: &str) -> Result<IdMap, SidecarError>;

    fn save(&self, project: &str, map: &IdMap) -> Result<(), SidecarError>;
}

/// Stores mappings as `project-<name>.json` files in a directory
#[derive(Debug, Clone)]
pub struct JsonSidecarStore {
    dir: PathBuf,
}

impl JsonSidecarStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a project's mapping file
    pub fn path_for(&self, project: &str) -> PathBuf {
        let name: String = project
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
            .collect();
        self.dir.join(format!("project-{}.json", name))
    }
}

impl SidecarStore for JsonSidecarStore {
    fn load(&self, project: &str) -> Result<IdMap, SidecarError> {
        let path = self.path_for(project);

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no id mapping yet");
                return Ok(IdMap::new());
            }
            Err(source) => return Err(SidecarError::Read { path, source }),
        };

        if content.trim().is_empty() {
            return Ok(IdMap::new());
        }

        serde_json::from_str(&content).map_err(|source| SidecarError::Parse { path, source })
    }

    fn save(&self, project: &str, map: &IdMap) -> Result<(), SidecarError> {
        let path = self.path_for(project);
        let mut content = serde_json::to_string_pretty(map).map_err(SidecarError::Serialize)?;
        content.push('\n');

        write_atomic(&path, content.as_bytes()).map_err(|source| SidecarError::Write { path, source })
    }
}

/// Keeps mappings in memory
#[derive(Debug, Default)]
pub struct MemorySidecarStore {
    maps: RefCell<HashMap<String, IdMap>>,
}

impl MemorySidecarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a project's mapping
    pub fn with(self, project: &str, map: IdMap) -> Self {
        self.maps.borrow_mut().insert(project.to_string(), map);
        self
    }

    /// Current mapping of a project
    pub fn get(&self, project: &str) -> IdMap {
        self.maps.borrow().get(project).cloned().unwrap_or_default()
    }
}

impl SidecarStore for MemorySidecarStore {
    fn load(&self, project: &str) -> Result<IdMap, SidecarError> {
        Ok(self.get(project))
    }

    fn save(&self, project: &str, map: &IdMap) -> Result<(), SidecarError> {
        self.maps.borrow_mut().insert(project.to_string(), map.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn assign_moves_uuid_to_new_id() {
        let mut map = IdMap::new();
        assert!(map.assign(14, "U1"));
        assert!(!map.assign(14, "U1"));

        assert!(map.assign(9, "U1"));
        assert_eq!(map.len(), 1);
        assert_eq!(map.uuid(9), Some("U1"));
        assert_eq!(map.uuid(14), None);
        assert_eq!(map.id_of("U1"), Some(9));
    }

    #[test]
    fn assign_replaces_reused_id() {
        let mut map = IdMap::new();
        map.assign(3, "U1");
        map.assign(3, "U2");
        assert_eq!(map.uuid(3), Some("U2"));
        assert_eq!(map.id_of("U1"), None);
    }

    #[test]
    fn json_round_trip_keeps_unknown_keys() {
        let dir = TempDir::new().unwrap();
        let store = JsonSidecarStore::new(dir.path());
        fs::write(
            store.path_for("site"),
            r#"{"ids": {"14": "U1"}, "old_uuids": ["U0"]}"#,
        )
        .unwrap();

        let mut map = store.load("site").unwrap();
        assert_eq!(map.uuid(14), Some("U1"));

        map.assign(9, "U1");
        store.save("site", &map).unwrap();

        let saved: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path_for("site")).unwrap()).unwrap();
        assert_eq!(saved["ids"]["9"], "U1");
        assert!(saved["ids"].get("14").is_none());
        assert_eq!(saved["old_uuids"][0], "U0");
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonSidecarStore::new(dir.path().join("not-yet"));
        assert!(store.load("site").unwrap().is_empty());

        store.save("site", &IdMap::new()).unwrap();
        assert!(store.path_for("site").exists());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = JsonSidecarStore::new(dir.path());
        fs::write(store.path_for("site"), "{not json").unwrap();
        assert!(matches!(store.load("site"), Err(SidecarError::Parse { .. })));
    }

    #[test]
    fn project_names_stay_in_dir() {
        let store = JsonSidecarStore::new("/data");
        assert_eq!(store.path_for("a/b"), PathBuf::from("/data/project-a_b.json"));
    }

    #[test]
    fn memory_store() {
        let store = MemorySidecarStore::new();
        let mut map = IdMap::new();
        map.assign(1, "U");
        store.save("p", &map).unwrap();
        assert_eq!(store.load("p").unwrap(), map);
        assert!(store.load("other").unwrap().is_empty());
    }
}

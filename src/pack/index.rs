//! The committed record of installed mods (`mods/mod-index.json`).
//!
//! A JSON object keyed by project id, written with sorted keys and stable
//! formatting so diffs stay reviewable in version control.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::registry::{ProjectId, VersionId};
use crate::runtime::Runtime;

fn default_false() -> bool {
    false
}

/// One installed mod, as recorded in the index.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InstalledMod {
    /// Human-readable project title.
    pub name: String,

    pub project_id: ProjectId,

    /// Human-readable version number.
    pub version: String,

    pub version_id: VersionId,

    /// Hex digest of the cached jar, recorded at download time.
    pub checksum: String,

    /// Whether this mod was added explicitly rather than pulled in as a
    /// dependency.
    pub selected: bool,

    /// Pinned mods are skipped by bulk updates.
    #[serde(default = "default_false")]
    pub pinned: bool,
}

/// In-memory view of the index file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModIndex {
    mods: BTreeMap<ProjectId, InstalledMod>,
}

impl ModIndex {
    /// Loads the index from `<pack>/mods/mod-index.json`. A missing file is
    /// an empty index, not an error; a corrupt file is an error.
    pub fn load(runtime: &dyn Runtime, pack_dir: &Path) -> Result<Self> {
        let path = Self::index_path(pack_dir);
        if !runtime.exists(&path) {
            return Ok(Self::default());
        }

        let raw = runtime
            .read_to_string(&path)
            .with_context(|| format!("Failed to read mod index at {}", path.display()))?;
        let mods = serde_json::from_str(&raw)
            .with_context(|| format!("Malformed mod index at {}", path.display()))?;

        Ok(Self { mods })
    }

    /// Writes the index back under the pack directory.
    pub fn save(&self, runtime: &dyn Runtime, pack_dir: &Path) -> Result<()> {
        let path = Self::index_path(pack_dir);
        if let Some(parent) = path.parent() {
            runtime.create_dir_all(parent)?;
        }

        let serialized =
            serde_json::to_string_pretty(&self.mods).context("Failed to serialize mod index")?;
        runtime
            .write(&path, serialized.as_bytes())
            .with_context(|| format!("Failed to write mod index at {}", path.display()))
    }

    pub fn index_path(pack_dir: &Path) -> PathBuf {
        pack_dir.join("mods").join("mod-index.json")
    }

    pub fn get(&self, id: &ProjectId) -> Option<&InstalledMod> {
        self.mods.get(id)
    }

    pub fn insert(&mut self, entry: InstalledMod) {
        self.mods.insert(entry.project_id.clone(), entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstalledMod> {
        self.mods.values()
    }

    pub fn len(&self) -> usize {
        self.mods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mods.is_empty()
    }

    pub fn project_ids(&self) -> Vec<ProjectId> {
        self.mods.keys().cloned().collect()
    }

    /// Finds a mod by exact project id, falling back to a case-insensitive
    /// title match.
    pub fn find_mut(&mut self, needle: &str) -> Option<&mut InstalledMod> {
        if self.mods.contains_key(&ProjectId::new(needle)) {
            return self.mods.get_mut(&ProjectId::new(needle));
        }

        self.mods
            .values_mut()
            .find(|m| m.name.eq_ignore_ascii_case(needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RealRuntime;
    use tempfile::tempdir;

    fn entry(id: &str, name: &str, version_id: &str) -> InstalledMod {
        InstalledMod {
            name: name.into(),
            project_id: ProjectId::new(id),
            version: "1.0.0".into(),
            version_id: VersionId::new(version_id),
            checksum: "abc123".into(),
            selected: true,
            pinned: false,
        }
    }

    #[test]
    fn test_missing_index_loads_empty() {
        let dir = tempdir().unwrap();
        let index = ModIndex::load(&RealRuntime, dir.path()).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let dir = tempdir().unwrap();
        let rt = RealRuntime;

        let mut index = ModIndex::default();
        index.insert(entry("bbb", "Beta Mod", "v2"));
        index.insert(entry("aaa", "Alpha Mod", "v1"));
        index.save(&rt, dir.path()).unwrap();

        let reloaded = ModIndex::load(&rt, dir.path()).unwrap();
        assert_eq!(reloaded, index);
    }

    #[test]
    fn test_serialized_keys_are_sorted() {
        let dir = tempdir().unwrap();
        let rt = RealRuntime;

        let mut index = ModIndex::default();
        index.insert(entry("zzz", "Last", "v1"));
        index.insert(entry("aaa", "First", "v2"));
        index.save(&rt, dir.path()).unwrap();

        let raw = rt
            .read_to_string(&ModIndex::index_path(dir.path()))
            .unwrap();
        let first = raw.find("\"aaa\"").unwrap();
        let last = raw.find("\"zzz\"").unwrap();
        assert!(first < last);
    }

    #[test]
    fn test_malformed_index_is_an_error() {
        let dir = tempdir().unwrap();
        let rt = RealRuntime;

        let path = ModIndex::index_path(dir.path());
        rt.create_dir_all(path.parent().unwrap()).unwrap();
        rt.write(&path, b"not json").unwrap();

        assert!(ModIndex::load(&rt, dir.path()).is_err());
    }

    #[test]
    fn test_pinned_defaults_to_false_when_absent() {
        let raw = r#"{
            "m1": {
                "name": "Some Mod",
                "project_id": "m1",
                "version": "1.0",
                "version_id": "v1",
                "checksum": "ff",
                "selected": true
            }
        }"#;

        let mods: BTreeMap<ProjectId, InstalledMod> = serde_json::from_str(raw).unwrap();
        assert!(!mods[&ProjectId::new("m1")].pinned);
    }

    #[test]
    fn test_find_mut_by_id_and_by_name() {
        let mut index = ModIndex::default();
        index.insert(entry("m1", "Sodium", "v1"));

        assert!(index.find_mut("m1").is_some());
        assert!(index.find_mut("sodium").is_some());
        assert!(index.find_mut("SODIUM").is_some());
        assert!(index.find_mut("lithium").is_none());
    }

    #[test]
    fn test_insert_replaces_existing_entry() {
        let mut index = ModIndex::default();
        index.insert(entry("m1", "Sodium", "v1"));
        index.insert(entry("m1", "Sodium", "v2"));

        assert_eq!(index.len(), 1);
        assert_eq!(index.get(&ProjectId::new("m1")).unwrap().version_id, VersionId::new("v2"));
    }
}

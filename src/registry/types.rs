//! Normalized registry data model.
//!
//! The registry's JSON payloads name the same concepts differently between
//! endpoints (`project_id` vs `id`, `versions` meaning game versions in
//! search results but release ids elsewhere). Everything is translated into
//! the fixed shapes below at the client boundary; nothing past
//! `registry::client` ever sees a raw payload field name.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Opaque registry-assigned project identifier.
///
/// Identifiers compare byte-for-byte; no normalization is applied.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ProjectId(pub String);

impl ProjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque registry-assigned identifier for one published release of a project.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct VersionId(pub String);

impl VersionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Project metadata, immutable once fetched.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProjectInfo {
    pub id: ProjectId,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Game versions this project has any release for.
    #[serde(default)]
    pub game_versions: Vec<String>,
}

/// Stability classification of a published version.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Stability {
    Release,
    Beta,
    Alpha,
}

impl Stability {
    pub fn is_release(self) -> bool {
        self == Stability::Release
    }
}

/// The kind of relationship a version declares towards another project.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Required,
    Optional,
    Incompatible,
    Embedded,
}

/// A single declared dependency relationship.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DependencyRelation {
    pub project_id: ProjectId,
    #[serde(default)]
    pub version_id: Option<VersionId>,
    #[serde(rename = "dependency_type")]
    pub kind: DependencyKind,
}

/// A downloadable file attached to a version.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FileRef {
    pub url: String,
    pub filename: String,
    #[serde(default)]
    pub primary: bool,
    pub size: u64,
    /// Content hashes, algorithm name to hex digest.
    #[serde(default)]
    pub hashes: HashMap<String, String>,
}

impl FileRef {
    /// The registry-declared sha512 digest, if present.
    pub fn sha512(&self) -> Option<&str> {
        self.hashes.get("sha512").map(String::as_str)
    }
}

/// One immutable published release of a project.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VersionCandidate {
    pub id: VersionId,
    pub project_id: ProjectId,
    pub name: String,
    pub version_number: String,
    pub game_versions: Vec<String>,
    pub loaders: Vec<String>,
    #[serde(rename = "version_type")]
    pub stability: Stability,
    #[serde(rename = "date_published")]
    pub published_at: DateTime<Utc>,
    #[serde(rename = "dependencies", default)]
    pub relationships: Vec<DependencyRelation>,
    pub files: Vec<FileRef>,
}

impl VersionCandidate {
    /// The main artifact of this version.
    ///
    /// If a version has exactly one file it is primary by definition,
    /// regardless of the stored flag.
    pub fn primary_file(&self) -> Result<&FileRef> {
        if self.files.len() == 1 {
            return Ok(&self.files[0]);
        }

        self.files.iter().find(|f| f.primary).ok_or_else(|| {
            anyhow!(
                "version {} of {} has no primary file",
                self.version_number,
                self.project_id
            )
        })
    }

    /// Ids of projects this version declares as `required`.
    pub fn required_dependencies(&self) -> impl Iterator<Item = &ProjectId> {
        self.relationships
            .iter()
            .filter(|rel| rel.kind == DependencyKind::Required)
            .map(|rel| &rel.project_id)
    }

    pub fn supports_loader(&self, loader: &str) -> bool {
        self.loaders.iter().any(|l| l == loader)
    }

    pub fn supports_game_version(&self, game_version: &str) -> bool {
        self.game_versions.iter().any(|v| v == game_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn file(filename: &str, primary: bool) -> FileRef {
        FileRef {
            url: format!("https://cdn.example/{}", filename),
            filename: filename.to_string(),
            primary,
            size: 1024,
            hashes: HashMap::new(),
        }
    }

    fn candidate(files: Vec<FileRef>) -> VersionCandidate {
        VersionCandidate {
            id: VersionId::new("ver1"),
            project_id: ProjectId::new("proj1"),
            name: "Some Mod 1.0".into(),
            version_number: "1.0".into(),
            game_versions: vec!["1.20.1".into()],
            loaders: vec!["fabric".into()],
            stability: Stability::Release,
            published_at: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
            relationships: vec![],
            files,
        }
    }

    #[test]
    fn test_single_file_is_primary_regardless_of_flag() {
        let version = candidate(vec![file("mod.jar", false)]);
        assert_eq!(version.primary_file().unwrap().filename, "mod.jar");
    }

    #[test]
    fn test_primary_file_picks_flagged_file() {
        let version = candidate(vec![file("mod-sources.jar", false), file("mod.jar", true)]);
        assert_eq!(version.primary_file().unwrap().filename, "mod.jar");
    }

    #[test]
    fn test_primary_file_missing_is_an_error() {
        let version = candidate(vec![file("a.jar", false), file("b.jar", false)]);
        assert!(version.primary_file().is_err());
    }

    #[test]
    fn test_required_dependencies_filters_kinds() {
        let mut version = candidate(vec![file("mod.jar", true)]);
        version.relationships = vec![
            DependencyRelation {
                project_id: ProjectId::new("dep-required"),
                version_id: None,
                kind: DependencyKind::Required,
            },
            DependencyRelation {
                project_id: ProjectId::new("dep-optional"),
                version_id: None,
                kind: DependencyKind::Optional,
            },
            DependencyRelation {
                project_id: ProjectId::new("dep-incompatible"),
                version_id: None,
                kind: DependencyKind::Incompatible,
            },
        ];

        let required: Vec<_> = version.required_dependencies().collect();
        assert_eq!(required, vec![&ProjectId::new("dep-required")]);
    }

    #[test]
    fn test_version_candidate_deserializes_registry_payload() {
        // Field names as the registry sends them: version_type, date_published,
        // dependencies.
        let raw = r#"{
            "id": "abcd1234",
            "project_id": "P7dR8mSH",
            "name": "Fabric API 0.92.0",
            "version_number": "0.92.0+1.20.1",
            "game_versions": ["1.20.1"],
            "loaders": ["fabric"],
            "version_type": "release",
            "date_published": "2024-05-01T12:00:00Z",
            "dependencies": [
                {"project_id": "other", "version_id": null, "dependency_type": "required"}
            ],
            "files": [
                {
                    "url": "https://cdn.example/fabric-api.jar",
                    "filename": "fabric-api.jar",
                    "primary": true,
                    "size": 2048,
                    "hashes": {"sha512": "deadbeef"}
                }
            ]
        }"#;

        let version: VersionCandidate = serde_json::from_str(raw).unwrap();
        assert_eq!(version.stability, Stability::Release);
        assert_eq!(version.relationships.len(), 1);
        assert_eq!(version.relationships[0].kind, DependencyKind::Required);
        assert_eq!(version.primary_file().unwrap().sha512(), Some("deadbeef"));
    }

    #[test]
    fn test_stability_ordering_helpers() {
        assert!(Stability::Release.is_release());
        assert!(!Stability::Beta.is_release());
        assert!(!Stability::Alpha.is_release());
    }

    #[test]
    fn test_project_ids_compare_byte_identical() {
        assert_eq!(ProjectId::new("AAAA"), ProjectId::new("AAAA"));
        assert_ne!(ProjectId::new("AAAA"), ProjectId::new("aaaa"));
    }
}

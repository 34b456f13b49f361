//! Shared on-disk cache of downloaded mod jars.
//!
//! Layout: `<cache>/<project-id>/<version-id>.jar` next to a per-project
//! `metadata.json` mapping version ids to the artifact's real filename and
//! sha512 digest. The version-id filename keeps cache entries immutable;
//! the real filename is restored at deploy time through the metadata.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};

use crate::registry::{ProjectId, VersionId};
use crate::runtime::Runtime;

/// Metadata for one cached artifact.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CachedFileMeta {
    /// The filename the registry published the artifact under.
    pub real_file_name: String,

    /// Hex sha512 digest of the artifact, computed when it was stored.
    pub sha512_hexdigest: String,
}

pub struct ModCache<'a> {
    runtime: &'a dyn Runtime,
    path: PathBuf,
}

impl<'a> ModCache<'a> {
    pub fn new(runtime: &'a dyn Runtime, cache_dir: PathBuf) -> Result<Self> {
        runtime
            .create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache directory {}", cache_dir.display()))?;

        Ok(Self {
            runtime,
            path: cache_dir,
        })
    }

    /// The canonical jar path for a mod version. May not exist yet.
    pub fn mod_path(&self, project_id: &ProjectId, version_id: &VersionId) -> PathBuf {
        self.path
            .join(project_id.as_str())
            .join(format!("{}.jar", version_id))
    }

    pub fn contains(&self, project_id: &ProjectId, version_id: &VersionId) -> bool {
        self.runtime.exists(&self.mod_path(project_id, version_id))
            && self
                .metadata_entry(project_id, version_id)
                .ok()
                .flatten()
                .is_some()
    }

    /// The registry filename of a cached artifact, or None when unknown.
    pub fn real_filename(
        &self,
        project_id: &ProjectId,
        version_id: &VersionId,
    ) -> Result<Option<String>> {
        Ok(self
            .metadata_entry(project_id, version_id)?
            .map(|meta| meta.real_file_name))
    }

    /// The recorded digest of a cached artifact, or None when unknown.
    pub fn file_checksum(
        &self,
        project_id: &ProjectId,
        version_id: &VersionId,
    ) -> Result<Option<String>> {
        Ok(self
            .metadata_entry(project_id, version_id)?
            .map(|meta| meta.sha512_hexdigest))
    }

    /// Stores one downloaded artifact and records its metadata.
    ///
    /// When the registry declared a sha512 for the file, the downloaded
    /// bytes are verified against it before anything is written.
    #[tracing::instrument(skip(self, contents, expected_sha512))]
    pub fn save_mod(
        &self,
        project_id: &ProjectId,
        version_id: &VersionId,
        real_file_name: &str,
        contents: &[u8],
        expected_sha512: Option<&str>,
    ) -> Result<String> {
        let digest = hex_sha512(contents);

        if let Some(expected) = expected_sha512 {
            if !expected.eq_ignore_ascii_case(&digest) {
                bail!(
                    "Downloaded file {} does not match its published checksum",
                    real_file_name
                );
            }
        }

        let jar_path = self.mod_path(project_id, version_id);
        if let Some(parent) = jar_path.parent() {
            self.runtime.create_dir_all(parent)?;
        }

        self.runtime
            .write(&jar_path, contents)
            .with_context(|| format!("Failed to store {}", jar_path.display()))?;

        let mut metadata = self.project_metadata(project_id)?;
        metadata.insert(
            version_id.clone(),
            CachedFileMeta {
                real_file_name: real_file_name.to_string(),
                sha512_hexdigest: digest.clone(),
            },
        );
        self.write_project_metadata(project_id, &metadata)?;

        info!("cached {} as {}", real_file_name, jar_path.display());
        Ok(digest)
    }

    fn metadata_path(&self, project_id: &ProjectId) -> PathBuf {
        self.path.join(project_id.as_str()).join("metadata.json")
    }

    fn metadata_entry(
        &self,
        project_id: &ProjectId,
        version_id: &VersionId,
    ) -> Result<Option<CachedFileMeta>> {
        Ok(self.project_metadata(project_id)?.remove(version_id))
    }

    fn project_metadata(
        &self,
        project_id: &ProjectId,
    ) -> Result<BTreeMap<VersionId, CachedFileMeta>> {
        let path = self.metadata_path(project_id);
        if !self.runtime.exists(&path) {
            debug!("no cache metadata for {}", project_id);
            return Ok(BTreeMap::new());
        }

        let raw = self.runtime.read_to_string(&path)?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Malformed cache metadata at {}", path.display()))
    }

    fn write_project_metadata(
        &self,
        project_id: &ProjectId,
        metadata: &BTreeMap<VersionId, CachedFileMeta>,
    ) -> Result<()> {
        let path = self.metadata_path(project_id);
        let serialized =
            serde_json::to_string(metadata).context("Failed to serialize cache metadata")?;
        self.runtime.write(&path, serialized.as_bytes())
    }
}

fn hex_sha512(contents: &[u8]) -> String {
    let mut hasher = Sha512::new();
    hasher.update(contents);
    let digest = hasher.finalize();

    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

//! Local modpack state: configuration, index, and mutations on both.

pub mod index;
pub mod meta;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use log::{info, warn};

use crate::cache::ModCache;
use crate::pack::index::{InstalledMod, ModIndex};
use crate::pack::meta::{LocalMetadata, PackMetadata};
use crate::registry::{ProjectId, ProjectInfo, Registry, VersionCandidate};
use crate::runtime::Runtime;

pub const PACK_FILE: &str = "pack.toml";
pub const LOCAL_PACK_FILE: &str = "localpack.toml";

/// A modpack checked out on disk.
pub struct LocalPack {
    pub directory: PathBuf,
    pub metadata: PackMetadata,
    pub index: ModIndex,
}

impl LocalPack {
    /// Loads a pack from `directory`: `pack.toml` is required, the mod index
    /// starts empty when absent.
    pub fn load(runtime: &dyn Runtime, directory: &Path) -> Result<Self> {
        let meta_path = directory.join(PACK_FILE);
        let raw = runtime
            .read_to_string(&meta_path)
            .with_context(|| format!("Failed to read {}", meta_path.display()))?;
        let metadata: PackMetadata = toml::from_str(&raw)
            .with_context(|| format!("Malformed pack file at {}", meta_path.display()))?;

        let index = ModIndex::load(runtime, directory)?;

        Ok(Self {
            directory: directory.to_path_buf(),
            metadata,
            index,
        })
    }

    /// Loads the per-machine settings file, if present.
    pub fn local_metadata(&self, runtime: &dyn Runtime) -> Result<Option<LocalMetadata>> {
        let path = self.directory.join(LOCAL_PACK_FILE);
        if !runtime.exists(&path) {
            return Ok(None);
        }

        let raw = runtime.read_to_string(&path)?;
        let local = toml::from_str(&raw)
            .with_context(|| format!("Malformed local pack file at {}", path.display()))?;
        Ok(Some(local))
    }

    /// Downloads resolved versions into the cache and records them in the
    /// index.
    ///
    /// `selected_mod` marks which project the user asked for by name; all
    /// other entries are recorded as dependency-installed unless a previous
    /// index entry already marked them selected. Pinned mods keep their
    /// existing index entry untouched.
    #[tracing::instrument(skip(self, runtime, registry, cache, versions))]
    pub async fn download_and_add_mods(
        &mut self,
        runtime: &dyn Runtime,
        registry: &dyn Registry,
        cache: &ModCache<'_>,
        versions: &[(ProjectInfo, VersionCandidate)],
        selected_mod: Option<&ProjectId>,
    ) -> Result<()> {
        for (project, version) in versions {
            let file = version.primary_file()?;

            if cache.contains(&version.project_id, &version.id) {
                info!("skipping {} download, already cached", project.title);
            } else {
                info!("downloading {} {}", project.title, version.version_number);
                let contents = registry
                    .download(&file.url)
                    .await
                    .with_context(|| format!("Failed to download {}", project.title))?;

                cache.save_mod(
                    &version.project_id,
                    &version.id,
                    &file.filename,
                    &contents,
                    file.sha512(),
                )?;
            }

            let new_checksum = cache
                .file_checksum(&version.project_id, &version.id)?
                .with_context(|| format!("Cache lost track of {}", project.title))?;

            let mut selected = selected_mod == Some(&version.project_id);

            if let Some(previous) = self.index.get(&project.id) {
                // A differing checksum for the *same* version means the cache
                // no longer holds the bytes the index was built from.
                if previous.version_id == version.id && previous.checksum != new_checksum {
                    bail!(
                        "Invalid saved checksum for {} -> {}",
                        project.title,
                        version.version_number
                    );
                }

                if previous.pinned {
                    warn!("not updating {} metadata, it is pinned", project.title);
                    continue;
                }

                selected = selected || previous.selected;
            }

            self.index.insert(InstalledMod {
                name: project.title.clone(),
                project_id: version.project_id.clone(),
                version: version.version_number.clone(),
                version_id: version.id.clone(),
                checksum: new_checksum,
                selected,
                pinned: false,
            });
        }

        self.index.save(runtime, &self.directory)
    }

    /// Checks that every indexed mod has its jar in the cache. Reports all
    /// missing entries, not just the first.
    pub fn validate_downloaded_mods(&self, runtime: &dyn Runtime, cache: &ModCache<'_>) -> bool {
        let mut ok = true;

        for entry in self.index.iter() {
            let path = cache.mod_path(&entry.project_id, &entry.version_id);
            if !runtime.exists(&path) {
                warn!("missing mod: {} ({})", entry.name, entry.version);
                ok = false;
            }
        }

        ok
    }

    /// Pins a mod, addressed by project id or (case-insensitively) by title,
    /// to its currently installed version.
    pub fn pin(&mut self, runtime: &dyn Runtime, needle: &str) -> Result<()> {
        let (name, version) = match self.index.find_mut(needle) {
            Some(entry) => {
                entry.pinned = true;
                (entry.name.clone(), entry.version.clone())
            }
            None => bail!("Unknown mod: {}", needle),
        };

        self.index.save(runtime, &self.directory)?;
        info!("pinned mod {} to version {}", name, version);
        Ok(())
    }
}

//! Deploys a pack into a game directory as symlinks.
//!
//! Nothing is copied: config directories and mod jars are linked from the
//! pack checkout and the shared cache, so redeploying after an update is
//! just relinking. Every link created is recorded in a `modshelf.json`
//! index inside the target directory; the next deploy removes exactly those
//! links and nothing else.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use log::{info, warn};

use crate::cache::ModCache;
use crate::launcher;
use crate::pack::LocalPack;
use crate::pack::meta::LocalMetadata;
use crate::runtime::Runtime;

const SYMLINK_INDEX_FILE: &str = "modshelf.json";

/// Deploys the pack into `deploy_path`.
#[tracing::instrument(skip(runtime, pack, cache, localmeta))]
pub fn deploy_to_directory(
    runtime: &dyn Runtime,
    pack: &LocalPack,
    cache: &ModCache<'_>,
    deploy_path: &Path,
    localmeta: Option<&LocalMetadata>,
) -> Result<()> {
    if !pack.validate_downloaded_mods(runtime, cache) {
        bail!("Unable to validate downloaded mods; try 'modshelf download' first");
    }

    runtime.create_dir_all(deploy_path)?;
    let index_path = deploy_path.join(SYMLINK_INDEX_FILE);

    // Step 1: no stale symlinks. Without an index we assume a never-managed
    // instance and wipe the directories we are about to own.
    if !runtime.exists(&index_path) {
        info!("no symlink index found, cleaning up instance files");
        setup_instance_firsttime(runtime, pack, deploy_path)?;
    } else {
        info!("cleaning up symlinks from index");
        cleanup_from_index(runtime, &index_path)?;
    }

    let deployed_mods_dir = deploy_path.join("mods");
    runtime.create_dir_all(&deployed_mods_dir)?;

    let mut symlink_index: Vec<String> = Vec::new();
    let mut link = |original: &Path, link_path: &Path| -> Result<()> {
        runtime.symlink(original, link_path)?;
        symlink_index.push(link_path.display().to_string());
        Ok(())
    };

    // Step 2: included directories, config first.
    let mut include_directories = vec!["config".to_string()];
    include_directories.extend(pack.metadata.include_directories.iter().cloned());

    for directory in &include_directories {
        let source_dir = pack.directory.join(directory);
        if !runtime.exists(&source_dir) {
            warn!("skipping dir {} (not found)", source_dir.display());
            continue;
        }

        let target = deploy_path.join(directory);
        if runtime.exists(&target) {
            warn!("removing old, non-symlink dir {}", target.display());
            runtime.remove_dir_all(&target)?;
        }

        link(&source_dir, &target)?;
        info!("linked included dir {}", target.display());
    }

    // Step 3: loose jars kept directly in the pack's mods directory.
    let local_mods_dir = pack.directory.join("mods");
    if runtime.exists(&local_mods_dir) {
        for file in runtime.read_dir(&local_mods_dir)? {
            if file.extension().and_then(|e| e.to_str()) != Some("jar") {
                continue;
            }

            let file_name = file
                .file_name()
                .context("Local mod file has no name")?
                .to_owned();
            let target = deployed_mods_dir.join(&file_name);
            if is_disabled(runtime, &target) {
                warn!("skipping deploying {}", target.display());
                continue;
            }

            link(&file, &target)?;
            info!("linked local mod {}", target.display());
        }
    }

    // Step 4: managed mods from the cache, under their real filenames.
    for entry in pack.index.iter() {
        let jar_path = cache.mod_path(&entry.project_id, &entry.version_id);
        let real_name = cache
            .real_filename(&entry.project_id, &entry.version_id)?
            .with_context(|| format!("Cache has no filename recorded for {}", entry.name))?;

        let target = deployed_mods_dir.join(&real_name);
        if is_disabled(runtime, &target) {
            warn!("skipping deploying {}", target.display());
            continue;
        }

        link(&jar_path, &target)?;
        info!("linked managed mod {}", target.display());
    }

    // Step 5: per-machine extra directories.
    if let Some(localmeta) = localmeta {
        for extra_dir in &localmeta.extra_symlinked_dirs {
            let source_dir = pack.directory.join(extra_dir);
            if !runtime.exists(&source_dir) {
                continue;
            }

            let target = deploy_path.join(extra_dir);
            link(&source_dir, &target)?;
            info!("linked extra dir {}", source_dir.display());
        }
    }

    let serialized =
        serde_json::to_string(&symlink_index).context("Failed to serialize symlink index")?;
    runtime
        .write(&index_path, serialized.as_bytes())
        .context("Failed to write symlink index")
}

/// Deploys the pack into a named Prism Launcher instance.
pub fn deploy_to_instance(
    runtime: &dyn Runtime,
    pack: &LocalPack,
    cache: &ModCache<'_>,
    instance_name: &str,
    localmeta: Option<&LocalMetadata>,
) -> Result<()> {
    let instances_dir = launcher::prism_instances_directory(runtime)?;
    let game_dir = launcher::find_minecraft_dir(runtime, &instances_dir, instance_name)?;

    deploy_to_directory(runtime, pack, cache, &game_dir, localmeta)
}

/// Removes symlinks recorded in a previous deploy's index. Entries that no
/// longer exist, or that are not symlinks, are left alone.
pub fn cleanup_from_index(runtime: &dyn Runtime, index_path: &Path) -> Result<()> {
    let raw = runtime
        .read_to_string(index_path)
        .with_context(|| format!("Failed to read symlink index at {}", index_path.display()))?;
    let index: Vec<String> = serde_json::from_str(&raw)
        .with_context(|| format!("Malformed symlink index at {}", index_path.display()))?;

    for entry in index {
        let path = PathBuf::from(entry);

        if !runtime.is_symlink(&path) {
            continue;
        }

        runtime.remove_symlink(&path)?;
    }

    Ok(())
}

/// Wipes the directories this tool will manage in a fresh instance.
fn setup_instance_firsttime(
    runtime: &dyn Runtime,
    pack: &LocalPack,
    instance_path: &Path,
) -> Result<()> {
    let mods_dir = instance_path.join("mods");
    if runtime.exists(&mods_dir) {
        runtime.remove_dir_all(&mods_dir)?;
    }
    runtime.create_dir_all(&mods_dir)?;

    let config_dir = instance_path.join("config");
    if runtime.exists(&config_dir) {
        runtime.remove_dir_all(&config_dir)?;
    }

    for dir in &pack.metadata.include_directories {
        let included = instance_path.join(dir);
        if runtime.exists(&included) {
            runtime.remove_dir_all(&included)?;
        }
    }

    Ok(())
}

fn is_disabled(runtime: &dyn Runtime, target: &Path) -> bool {
    runtime.exists(&target.with_extension("jar.disabled"))
}

//! `modshelf download`: fetches the exact versions the index records.
//!
//! Unlike `update`, nothing is re-resolved; this reproduces the indexed
//! state on a fresh machine or an emptied cache.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};

use super::open_cache;
use crate::pack::LocalPack;
use crate::registry::{ProjectId, Registry, VersionId};
use crate::runtime::Runtime;

#[tracing::instrument(skip(runtime, registry))]
pub async fn download(
    runtime: &dyn Runtime,
    registry: &dyn Registry,
    pack_dir: &Path,
    cache_dir: &Path,
) -> Result<()> {
    let mut pack = LocalPack::load(runtime, pack_dir)?;
    let cache = open_cache(runtime, cache_dir)?;

    if pack.index.is_empty() {
        println!("No mods installed.");
        return Ok(());
    }

    let project_ids = pack.index.project_ids();
    let version_ids: Vec<VersionId> = pack
        .index
        .iter()
        .map(|entry| entry.version_id.clone())
        .collect();

    let projects = registry
        .get_multiple_projects(&project_ids)
        .await
        .context("Failed to fetch installed mod metadata")?;
    let versions = registry
        .get_multiple_versions(&version_ids)
        .await
        .context("Failed to fetch installed mod versions")?;

    // Batch responses carry no order guarantee; pair project and version by
    // project id and fail if anything the index names is missing.
    let mut projects: HashMap<ProjectId, _> = projects
        .into_iter()
        .map(|info| (info.id.clone(), info))
        .collect();
    let mut versions: HashMap<ProjectId, _> = versions
        .into_iter()
        .map(|version| (version.project_id.clone(), version))
        .collect();

    let mut all_versions = Vec::with_capacity(project_ids.len());
    for project_id in &project_ids {
        let info = projects
            .remove(project_id)
            .with_context(|| format!("Registry returned no metadata for {}", project_id))?;
        let version = versions
            .remove(project_id)
            .with_context(|| format!("Registry returned no version for {}", info.title))?;
        all_versions.push((info, version));
    }

    pack.download_and_add_mods(runtime, registry, &cache, &all_versions, None)
        .await?;

    println!("downloaded {} mods", all_versions.len());
    Ok(())
}

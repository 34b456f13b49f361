//! `modshelf add`: installs a mod and its required dependencies.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result, bail};
use log::info;

use super::open_cache;
use crate::pack::LocalPack;
use crate::registry::{ProjectId, ProjectInfo, Registry, VersionId};
use crate::resolve::swaps::FABRIC_API;
use crate::resolve::{ProjectRef, Resolver};
use crate::runtime::Runtime;

const SEARCH_LIMIT: u32 = 10;

/// How the user identified the mod to add.
#[derive(Debug, Clone)]
pub enum AddTarget {
    /// Full-text search; `select` picks an entry from an ambiguous result
    /// list by position.
    Search { query: String, select: Option<usize> },
    Project(ProjectId),
    Version(VersionId),
}

#[tracing::instrument(skip(runtime, registry))]
pub async fn add(
    runtime: &dyn Runtime,
    registry: &dyn Registry,
    pack_dir: &Path,
    cache_dir: &Path,
    target: AddTarget,
) -> Result<()> {
    let mut pack = LocalPack::load(runtime, pack_dir)?;
    let cache = open_cache(runtime, cache_dir)?;

    match target {
        AddTarget::Project(project_id) => {
            let info = registry
                .get_project_info(&project_id)
                .await
                .context("No such project found")?;
            add_project(runtime, registry, &mut pack, &cache, info).await
        }
        AddTarget::Search { query, select } => {
            let info = search_for_project(registry, &pack, &query, select).await?;
            add_project(runtime, registry, &mut pack, &cache, info).await
        }
        AddTarget::Version(version_id) => {
            add_exact_version(runtime, registry, &mut pack, &cache, version_id).await
        }
    }
}

/// Resolves the project's latest version plus its dependency closure and
/// installs everything.
async fn add_project(
    runtime: &dyn Runtime,
    registry: &dyn Registry,
    pack: &mut LocalPack,
    cache: &crate::cache::ModCache<'_>,
    info: ProjectInfo,
) -> Result<()> {
    refuse_mismatched_loader_api(pack, &info.id)?;

    let metadata = pack.metadata.clone();
    let resolver = Resolver::new(registry, &metadata);

    let mut seen = HashSet::new();
    let versions = resolver
        .resolve_dependency_closure(ProjectRef::Info(&info), false, &mut seen)
        .await?;

    pack.download_and_add_mods(runtime, registry, cache, &versions, Some(&info.id))
        .await?;

    println!("added {} and {} dependencies", info.title, versions.len() - 1);
    Ok(())
}

/// Installs one exact version, bypassing latest-version resolution for the
/// root but still resolving its dependencies.
async fn add_exact_version(
    runtime: &dyn Runtime,
    registry: &dyn Registry,
    pack: &mut LocalPack,
    cache: &crate::cache::ModCache<'_>,
    version_id: VersionId,
) -> Result<()> {
    let version = registry
        .get_version(&version_id)
        .await
        .context("No such version found")?;
    let info = registry.get_project_info(&version.project_id).await?;

    refuse_mismatched_loader_api(pack, &info.id)?;

    if !version.supports_game_version(&pack.metadata.game_version) {
        bail!(
            "{} {} does not support {}",
            info.title,
            version.name,
            pack.metadata.game_version
        );
    }

    let available_loaders = pack.metadata.available_loaders();
    if !available_loaders
        .iter()
        .any(|loader| version.supports_loader(loader))
    {
        bail!(
            "{} {} does not support any of {:?}",
            info.title,
            version.name,
            available_loaders
        );
    }

    let metadata = pack.metadata.clone();
    let resolver = Resolver::new(registry, &metadata);

    let mut seen = HashSet::from([info.id.clone()]);
    let mut versions = vec![(info.clone(), version.clone())];
    for dep in resolver.required_dependencies(&version) {
        versions.extend(
            resolver
                .resolve_dependency_closure(ProjectRef::Id(&dep), false, &mut seen)
                .await?,
        );
    }

    pack.download_and_add_mods(runtime, registry, cache, &versions, Some(&info.id))
        .await?;

    println!("added {} {}", info.title, version.version_number);
    Ok(())
}

/// Searches the registry and picks a project.
///
/// Auto-matches on a single hit or an exact (case-insensitive) title match;
/// otherwise the options are listed and the caller must rerun with
/// `--select`.
async fn search_for_project(
    registry: &dyn Registry,
    pack: &LocalPack,
    query: &str,
    select: Option<usize>,
) -> Result<ProjectInfo> {
    let facets = vec![
        vec!["project_type:mod".to_string()],
        vec![format!("game_versions:{}", pack.metadata.game_version)],
        pack.metadata.loader_facets(),
    ];

    let mut results = registry.search_projects(query, &facets, SEARCH_LIMIT).await?;
    if results.is_empty() {
        bail!("No results found for '{}'", query);
    }

    if let Some(index) = select {
        if index >= results.len() {
            bail!("--select {} is out of range ({} results)", index, results.len());
        }
        return Ok(results.swap_remove(index));
    }

    let auto_match =
        results.len() == 1 || results[0].title.eq_ignore_ascii_case(query);

    if !auto_match {
        println!("No exact match found, possible options:");
        for (idx, option) in results.iter().enumerate() {
            println!("[{}] - {}", idx, option.title);
        }
        bail!("Ambiguous search for '{}'; rerun with --select N", query);
    }

    let matched = results.swap_remove(0);
    info!("successful match: {} / {}", matched.title, matched.id);
    Ok(matched)
}

/// Fabric API on a forge-family pack never works, Sinytra shim or not; the
/// Forgified fork is what the swap table installs instead.
fn refuse_mismatched_loader_api(pack: &LocalPack, project_id: &ProjectId) -> Result<()> {
    if pack.metadata.loader.kind.is_forge_family() && project_id.as_str() == FABRIC_API {
        bail!("Cowardly refusing to install Fabric API on a forge instance");
    }

    Ok(())
}

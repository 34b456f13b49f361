//! `modshelf update`: re-resolves every indexed mod to its latest version.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use super::open_cache;
use crate::pack::LocalPack;
use crate::registry::Registry;
use crate::resolve::{ProjectRef, Resolver};
use crate::runtime::Runtime;

/// Updates all mods and their dependencies. One `seen` set is shared across
/// every root, so a project reachable from several mods is resolved and
/// downloaded once. Pinned mods are re-resolved but their index entries are
/// left untouched.
#[tracing::instrument(skip(runtime, registry))]
pub async fn update(
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
    let projects = registry
        .get_multiple_projects(&project_ids)
        .await
        .context("Failed to fetch installed mod metadata")?;

    let metadata = pack.metadata.clone();
    let resolver = Resolver::new(registry, &metadata);

    let mut seen = HashSet::new();
    let mut all_versions = Vec::new();

    for project in &projects {
        info!("updating {}", project.title);
        all_versions.extend(
            resolver
                .resolve_dependency_closure(ProjectRef::Info(project), false, &mut seen)
                .await?,
        );
    }

    pack.download_and_add_mods(runtime, registry, &cache, &all_versions, None)
        .await?;

    println!("updated {} mods", all_versions.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pack::index::InstalledMod;
    use crate::registry::{MockRegistry, ProjectId, Stability, VersionId};
    use crate::resolve::test_support::{candidate, project, published, requires};
    use crate::runtime::RealRuntime;
    use tempfile::tempdir;

    const PACK_TOML: &str = r#"
        name = "Test Pack"
        version = "1.0"
        game_version = "1.20.1"

        [loader]
        type = "quilt"
    "#;

    fn seeded_pack(rt: &RealRuntime, dir: &Path, ids: &[&str]) {
        rt.write(&dir.join("pack.toml"), PACK_TOML.as_bytes())
            .unwrap();

        let mut pack = LocalPack::load(rt, dir).unwrap();
        for id in ids {
            pack.index.insert(InstalledMod {
                name: format!("Mod {}", id),
                project_id: ProjectId::new(*id),
                version: "0.9".into(),
                version_id: VersionId::new("old"),
                checksum: "ff".into(),
                selected: true,
                pinned: false,
            });
        }
        pack.index.save(rt, dir).unwrap();
    }

    #[tokio::test]
    async fn test_update_empty_index_is_a_no_op() {
        let rt = RealRuntime;
        let pack_dir = tempdir().unwrap();
        let cache_dir = tempdir().unwrap();
        rt.write(&pack_dir.path().join("pack.toml"), PACK_TOML.as_bytes())
            .unwrap();

        let registry = MockRegistry::new();
        update(&rt, &registry, pack_dir.path(), cache_dir.path())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_resolves_latest_for_each_mod() {
        let rt = RealRuntime;
        let pack_dir = tempdir().unwrap();
        let cache_dir = tempdir().unwrap();
        seeded_pack(&rt, pack_dir.path(), &["a", "b"]);

        let mut registry = MockRegistry::new();
        registry.expect_get_multiple_projects().returning(|ids| {
            Ok(ids
                .iter()
                .map(|id| project(id.as_str(), &format!("Mod {}", id)))
                .collect())
        });
        registry
            .expect_get_project_versions()
            .returning(|id, _, _| {
                Ok(vec![candidate(
                    &format!("{}-new", id),
                    id.as_str(),
                    &["quilt"],
                    Stability::Release,
                    published(2024, 6, 1),
                )])
            });
        registry
            .expect_download()
            .returning(|_| Ok(b"jar".to_vec()));

        update(&rt, &registry, pack_dir.path(), cache_dir.path())
            .await
            .unwrap();

        let pack = LocalPack::load(&rt, pack_dir.path()).unwrap();
        assert_eq!(
            pack.index.get(&ProjectId::new("a")).unwrap().version_id,
            VersionId::new("a-new")
        );
        assert_eq!(
            pack.index.get(&ProjectId::new("b")).unwrap().version_id,
            VersionId::new("b-new")
        );
    }

    #[tokio::test]
    async fn test_update_deduplicates_shared_dependencies() {
        // Both indexed mods depend on "shared"; it must be resolved once.
        let rt = RealRuntime;
        let pack_dir = tempdir().unwrap();
        let cache_dir = tempdir().unwrap();
        seeded_pack(&rt, pack_dir.path(), &["a", "b"]);

        let mut registry = MockRegistry::new();
        registry.expect_get_multiple_projects().returning(|ids| {
            Ok(ids
                .iter()
                .map(|id| project(id.as_str(), &format!("Mod {}", id)))
                .collect())
        });
        registry
            .expect_get_project_versions()
            .times(3)
            .returning(|id, _, _| {
                let version = candidate(
                    &format!("{}-new", id),
                    id.as_str(),
                    &["quilt"],
                    Stability::Release,
                    published(2024, 6, 1),
                );
                Ok(vec![if id.as_str() == "shared" {
                    version
                } else {
                    requires(version, &["shared"])
                }])
            });
        registry
            .expect_download()
            .returning(|_| Ok(b"jar".to_vec()));

        update(&rt, &registry, pack_dir.path(), cache_dir.path())
            .await
            .unwrap();

        let pack = LocalPack::load(&rt, pack_dir.path()).unwrap();
        assert_eq!(pack.index.len(), 3);
    }

    #[tokio::test]
    async fn test_update_keeps_pinned_entry() {
        let rt = RealRuntime;
        let pack_dir = tempdir().unwrap();
        let cache_dir = tempdir().unwrap();
        seeded_pack(&rt, pack_dir.path(), &["a"]);

        let mut pack = LocalPack::load(&rt, pack_dir.path()).unwrap();
        pack.pin(&rt, "a").unwrap();

        let mut registry = MockRegistry::new();
        registry.expect_get_multiple_projects().returning(|ids| {
            Ok(ids
                .iter()
                .map(|id| project(id.as_str(), &format!("Mod {}", id)))
                .collect())
        });
        registry
            .expect_get_project_versions()
            .returning(|id, _, _| {
                Ok(vec![candidate(
                    &format!("{}-new", id),
                    id.as_str(),
                    &["quilt"],
                    Stability::Release,
                    published(2024, 6, 1),
                )])
            });
        registry
            .expect_download()
            .returning(|_| Ok(b"jar".to_vec()));

        update(&rt, &registry, pack_dir.path(), cache_dir.path())
            .await
            .unwrap();

        let pack = LocalPack::load(&rt, pack_dir.path()).unwrap();
        let entry = pack.index.get(&ProjectId::new("a")).unwrap();
        assert_eq!(entry.version_id, VersionId::new("old"));
        assert!(entry.pinned);
    }
}

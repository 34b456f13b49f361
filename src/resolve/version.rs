//! Picks the single best-matching version of a project.
//!
//! Dual-loader packs (e.g. Quilt with Fabric fallback) commonly have most
//! versions published under the secondary loader's tag, with the native
//! version sitting at an arbitrary position in the time-sorted list. The
//! scan below never lets an older secondary-loader match pre-empt a newer
//! primary-loader match, but also never blocks waiting for a primary match
//! that does not exist.

use anyhow::Result;
use log::{debug, info, warn};

use super::{NoCompatibleVersion, ProjectRef, Resolver};
use crate::registry::{ProjectId, ProjectInfo, Registry, VersionCandidate};
use crate::resolve::swaps;

impl<'a, R: Registry + ?Sized> Resolver<'a, R> {
    /// Resolves the latest matching version for the given project.
    ///
    /// With `allow_unstable` false, the most recent *release* version on the
    /// primary loader wins; alpha and beta versions are only used when
    /// nothing better exists. With `allow_unstable` true, the newest
    /// primary-loader version wins regardless of stability.
    ///
    /// Fails with [`NoCompatibleVersion`] when no candidate is acceptable.
    #[tracing::instrument(skip(self, project))]
    pub async fn resolve_version(
        &self,
        project: ProjectRef<'_>,
        allow_unstable: bool,
    ) -> Result<VersionCandidate> {
        let fetched;
        let info: &ProjectInfo = match project {
            ProjectRef::Info(info) => info,
            ProjectRef::Id(id) => {
                fetched = self.registry().get_project_info(id).await?;
                &fetched
            }
        };

        let pack = self.pack();
        let available_loaders = pack.available_loaders();

        let mut candidates = self
            .registry()
            .get_project_versions(&info.id, &available_loaders, &pack.game_version)
            .await?;

        // Newest first. The sort is stable, so candidates published at the
        // same instant keep the registry's order.
        candidates.sort_by(|a, b| b.published_at.cmp(&a.published_at));

        let (primary_loader, secondary_loader) = self.loader_preference(&info.id);

        let mut selected: Option<VersionCandidate> = None;
        let mut fallback_secondary: Option<VersionCandidate> = None;

        for version in candidates {
            if version.supports_loader(&primary_loader) {
                if version.stability.is_release() || allow_unstable {
                    info!(
                        "selected version {} for {}",
                        version.version_number, info.title
                    );
                    return Ok(version);
                }

                // Keep the newest non-release primary candidate as a
                // tentative pick, but keep scanning: an older release on the
                // primary loader still beats it.
                if selected.is_none() {
                    debug!(
                        "saving tentative unstable version {} ({:?}) for {}",
                        version.version_number, version.loaders, info.title
                    );
                    selected = Some(version);
                }
                continue;
            }

            let secondary_match = secondary_loader
                .as_deref()
                .is_some_and(|loader| version.supports_loader(loader))
                && fallback_secondary.is_none();

            if secondary_match
                && (version.stability.is_release()
                    || allow_unstable
                    || self.allows_unstable_fallback())
            {
                debug!(
                    "saving fallback version {} ({:?}) for {}",
                    version.version_number, version.loaders, info.title
                );
                // Never stop here; a primary-loader version may come later
                // in the list.
                fallback_secondary = Some(version);
            } else {
                debug!(
                    "rejected version {} for {}",
                    version.version_number, info.title
                );
            }
        }

        // Nothing firm was found on the primary loader. A secondary match
        // outranks a tentative non-release primary pick.
        if let Some(version) = fallback_secondary {
            info!(
                "selected secondary version {} for {}",
                version.version_number, info.title
            );
            return Ok(version);
        }

        if let Some(version) = selected {
            info!(
                "selected unstable version {} for {} (no better match)",
                version.version_number, info.title
            );
            return Ok(version);
        }

        Err(NoCompatibleVersion {
            title: info.title.clone(),
            game_version: pack.game_version.clone(),
            loaders: available_loaders,
        }
        .into())
    }

    /// Primary and optional secondary loader for one resolution, in the
    /// pack's preference order.
    ///
    /// GeckoLib quirk: in Sinytra compatibility mode with the GeckoLib
    /// preference flag set, the Fabric build of GeckoLib is forced even on
    /// forge-family packs (the Fabric artifact is the reliable one under the
    /// shim).
    fn loader_preference(&self, project_id: &ProjectId) -> (String, Option<String>) {
        let loader = &self.pack().loader;
        if project_id.as_str() == swaps::GECKOLIB
            && loader.sinytra_compat
            && loader.prefer_fabric_geckolib
        {
            warn!("forcing geckolib onto fabric");
            return ("fabric".to_string(), None);
        }

        let mut loaders = self.pack().available_loaders().into_iter();
        let primary = loaders.next().unwrap_or_else(|| "fabric".to_string());
        (primary, loaders.next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pack::meta::PackLoader;
    use crate::registry::{MockRegistry, Stability};
    use crate::resolve::test_support::{candidate, pack, project, published};

    fn registry_with_versions(versions: Vec<VersionCandidate>) -> MockRegistry {
        let mut registry = MockRegistry::new();
        registry
            .expect_get_project_versions()
            .returning(move |_, _, _| Ok(versions.clone()));
        registry
    }

    #[tokio::test]
    async fn test_newest_release_on_primary_wins() {
        // Two releases on the primary loader: the later publish date wins.
        let registry = registry_with_versions(vec![
            candidate("old", "m", &["quilt"], Stability::Release, published(2024, 1, 1)),
            candidate("new", "m", &["quilt"], Stability::Release, published(2024, 3, 1)),
        ]);
        let pack = pack(PackLoader::Quilt, false);
        let resolver = Resolver::new(&registry, &pack);

        let info = project("m", "Some Mod");
        let version = resolver
            .resolve_version(ProjectRef::Info(&info), false)
            .await
            .unwrap();
        assert_eq!(version.version_number, "new");
    }

    #[tokio::test]
    async fn test_deterministic_for_fixed_candidates() {
        // Same candidate list, same constraints: same answer on every call.
        let versions = vec![
            candidate("a", "m", &["fabric"], Stability::Release, published(2024, 2, 1)),
            candidate("b", "m", &["fabric"], Stability::Release, published(2024, 1, 1)),
        ];
        let registry = registry_with_versions(versions);
        let pack = pack(PackLoader::Fabric, false);
        let resolver = Resolver::new(&registry, &pack);
        let info = project("m", "Some Mod");

        for _ in 0..3 {
            let version = resolver
                .resolve_version(ProjectRef::Info(&info), false)
                .await
                .unwrap();
            assert_eq!(version.version_number, "a");
        }
    }

    #[tokio::test]
    async fn test_primary_loader_precedence_over_newer_secondary() {
        // An older release on the primary loader must beat a newer release
        // on the secondary loader.
        let registry = registry_with_versions(vec![
            candidate("sec", "m", &["fabric"], Stability::Release, published(2024, 6, 1)),
            candidate("pri", "m", &["quilt"], Stability::Release, published(2024, 2, 1)),
        ]);
        let pack = pack(PackLoader::Quilt, false);
        let resolver = Resolver::new(&registry, &pack);

        let info = project("m", "Some Mod");
        let version = resolver
            .resolve_version(ProjectRef::Info(&info), false)
            .await
            .unwrap();
        assert_eq!(version.version_number, "pri");
    }

    #[tokio::test]
    async fn test_secondary_release_beats_tentative_unstable_primary() {
        // Primary loader only has a beta; a secondary release exists. The
        // beta is held only tentatively and loses to the fallback.
        let registry = registry_with_versions(vec![
            candidate("beta", "m", &["neoforge"], Stability::Beta, published(2024, 5, 1)),
            candidate("rel", "m", &["fabric"], Stability::Release, published(2024, 4, 1)),
        ]);
        let pack = pack(PackLoader::NeoForge, true);
        let resolver = Resolver::new(&registry, &pack);

        let info = project("m", "Some Mod");
        let version = resolver
            .resolve_version(ProjectRef::Info(&info), false)
            .await
            .unwrap();
        assert_eq!(version.version_number, "rel");
    }

    #[tokio::test]
    async fn test_unstable_primary_used_when_nothing_else_matches() {
        let registry = registry_with_versions(vec![candidate(
            "beta",
            "m",
            &["quilt"],
            Stability::Beta,
            published(2024, 5, 1),
        )]);
        let pack = pack(PackLoader::Quilt, false);
        let resolver = Resolver::new(&registry, &pack);

        let info = project("m", "Some Mod");
        let version = resolver
            .resolve_version(ProjectRef::Info(&info), false)
            .await
            .unwrap();
        assert_eq!(version.version_number, "beta");
    }

    #[tokio::test]
    async fn test_allow_unstable_short_circuits_on_newest_primary() {
        let registry = registry_with_versions(vec![
            candidate("beta", "m", &["quilt"], Stability::Beta, published(2024, 5, 1)),
            candidate("rel", "m", &["quilt"], Stability::Release, published(2024, 4, 1)),
        ]);
        let pack = pack(PackLoader::Quilt, false);
        let resolver = Resolver::new(&registry, &pack);

        let info = project("m", "Some Mod");
        let version = resolver
            .resolve_version(ProjectRef::Info(&info), true)
            .await
            .unwrap();
        assert_eq!(version.version_number, "beta");
    }

    #[tokio::test]
    async fn test_secondary_fallback_keeps_newest() {
        // Only secondary-loader versions exist; the newest one is kept and
        // never overwritten by an older one.
        let registry = registry_with_versions(vec![
            candidate("new", "m", &["fabric"], Stability::Release, published(2024, 5, 1)),
            candidate("old", "m", &["fabric"], Stability::Release, published(2024, 1, 1)),
        ]);
        let pack = pack(PackLoader::Quilt, false);
        let resolver = Resolver::new(&registry, &pack);

        let info = project("m", "Some Mod");
        let version = resolver
            .resolve_version(ProjectRef::Info(&info), false)
            .await
            .unwrap();
        assert_eq!(version.version_number, "new");
    }

    #[tokio::test]
    async fn test_empty_candidate_list_fails_with_diagnostics() {
        let registry = registry_with_versions(vec![]);
        let pack = pack(PackLoader::Quilt, false);
        let resolver = Resolver::new(&registry, &pack);

        let info = project("m", "Some Mod");
        let err = resolver
            .resolve_version(ProjectRef::Info(&info), false)
            .await
            .unwrap_err();

        let failure = err.downcast_ref::<NoCompatibleVersion>().unwrap();
        assert_eq!(failure.title, "Some Mod");
        assert_eq!(failure.game_version, "1.20.1");
        assert_eq!(failure.loaders, vec!["quilt", "fabric"]);
    }

    #[tokio::test]
    async fn test_wrong_loader_only_fails() {
        // Candidates exist but none matches either configured loader.
        let registry = registry_with_versions(vec![candidate(
            "v",
            "m",
            &["forge"],
            Stability::Release,
            published(2024, 5, 1),
        )]);
        let pack = pack(PackLoader::Fabric, false);
        let resolver = Resolver::new(&registry, &pack);

        let info = project("m", "Some Mod");
        let err = resolver
            .resolve_version(ProjectRef::Info(&info), false)
            .await
            .unwrap_err();
        assert!(err.downcast_ref::<NoCompatibleVersion>().is_some());
    }

    #[tokio::test]
    async fn test_bare_project_id_fetches_info_first() {
        let mut registry = MockRegistry::new();
        registry
            .expect_get_project_info()
            .returning(|id| Ok(project(id.as_str(), "Fetched Mod")));
        registry
            .expect_get_project_versions()
            .returning(|_, _, _| {
                Ok(vec![candidate(
                    "v1",
                    "m",
                    &["quilt"],
                    Stability::Release,
                    published(2024, 5, 1),
                )])
            });

        let pack = pack(PackLoader::Quilt, false);
        let resolver = Resolver::new(&registry, &pack);

        let id = ProjectId::new("m");
        let version = resolver
            .resolve_version(ProjectRef::Id(&id), false)
            .await
            .unwrap();
        assert_eq!(version.version_number, "v1");
    }

    #[tokio::test]
    async fn test_geckolib_quirk_forces_fabric() {
        // In compat mode with the preference flag set, only the Fabric build
        // of GeckoLib is acceptable, even though neoforge is primary.
        let registry = registry_with_versions(vec![
            candidate("nf", swaps::GECKOLIB, &["neoforge"], Stability::Release, published(2024, 5, 1)),
            candidate("fab", swaps::GECKOLIB, &["fabric"], Stability::Release, published(2024, 4, 1)),
        ]);
        let pack = pack(PackLoader::NeoForge, true);
        let resolver = Resolver::new(&registry, &pack);

        let info = project(swaps::GECKOLIB, "GeckoLib");
        let version = resolver
            .resolve_version(ProjectRef::Info(&info), false)
            .await
            .unwrap();
        assert_eq!(version.version_number, "fab");
    }

    #[tokio::test]
    async fn test_geckolib_quirk_inactive_without_compat_mode() {
        let registry = registry_with_versions(vec![
            candidate("nf", swaps::GECKOLIB, &["neoforge"], Stability::Release, published(2024, 5, 1)),
            candidate("fab", swaps::GECKOLIB, &["fabric"], Stability::Release, published(2024, 4, 1)),
        ]);
        let pack = pack(PackLoader::NeoForge, false);
        let resolver = Resolver::new(&registry, &pack);

        let info = project(swaps::GECKOLIB, "GeckoLib");
        let version = resolver
            .resolve_version(ProjectRef::Info(&info), false)
            .await
            .unwrap();
        assert_eq!(version.version_number, "nf");
    }

    #[tokio::test]
    async fn test_strict_fallback_policy_rejects_unstable_secondary() {
        // With the strict policy, an alpha on the secondary loader is not an
        // acceptable fallback; the tentative unstable primary wins instead.
        let registry = registry_with_versions(vec![
            candidate("pri-beta", "m", &["quilt"], Stability::Beta, published(2024, 5, 1)),
            candidate("sec-alpha", "m", &["fabric"], Stability::Alpha, published(2024, 4, 1)),
        ]);
        let pack = pack(PackLoader::Quilt, false);
        let resolver = Resolver::new(&registry, &pack).with_unstable_fallback(false);

        let info = project("m", "Some Mod");
        let version = resolver
            .resolve_version(ProjectRef::Info(&info), false)
            .await
            .unwrap();
        assert_eq!(version.version_number, "pri-beta");
    }

    #[tokio::test]
    async fn test_default_policy_accepts_unstable_secondary() {
        let registry = registry_with_versions(vec![candidate(
            "sec-alpha",
            "m",
            &["fabric"],
            Stability::Alpha,
            published(2024, 4, 1),
        )]);
        let pack = pack(PackLoader::Quilt, false);
        let resolver = Resolver::new(&registry, &pack);

        let info = project("m", "Some Mod");
        let version = resolver
            .resolve_version(ProjectRef::Info(&info), false)
            .await
            .unwrap();
        assert_eq!(version.version_number, "sec-alpha");
    }

    #[tokio::test]
    async fn test_equal_timestamps_keep_registry_order() {
        // Stable sort: with identical publish instants, the first-listed
        // candidate is scanned first and wins.
        let when = published(2024, 5, 1);
        let registry = registry_with_versions(vec![
            candidate("first", "m", &["quilt"], Stability::Release, when),
            candidate("second", "m", &["quilt"], Stability::Release, when),
        ]);
        let pack = pack(PackLoader::Quilt, false);
        let resolver = Resolver::new(&registry, &pack);

        let info = project("m", "Some Mod");
        let version = resolver
            .resolve_version(ProjectRef::Info(&info), false)
            .await
            .unwrap();
        assert_eq!(version.version_number, "first");
    }
}

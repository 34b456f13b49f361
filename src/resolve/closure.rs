//! Transitive dependency resolution.
//!
//! Expands one root project into the full set of required mods: the root
//! plus every transitively required dependency, each resolved to a concrete
//! version. Breadth-first over a worklist; the caller owns the `seen` set so
//! multiple roots (an `update` over a whole pack) share one de-duplication
//! domain.

use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result, bail};
use log::{debug, info};

use super::{ProjectRef, Resolver};
use crate::registry::{ProjectId, ProjectInfo, Registry, VersionCandidate};

impl<'a, R: Registry + ?Sized> Resolver<'a, R> {
    /// Resolves `root` and its full required-dependency closure.
    ///
    /// Returns `(project, version)` pairs in discovery order, root first.
    /// Projects already in `seen` are skipped (and the root itself yields an
    /// empty result if pre-seeded); every newly resolved project is added.
    ///
    /// Fails as a whole if any dependency in the closure cannot be resolved.
    /// No partial result is returned.
    #[tracing::instrument(skip(self, root, seen))]
    pub async fn resolve_dependency_closure(
        &self,
        root: ProjectRef<'_>,
        allow_unstable: bool,
        seen: &mut HashSet<ProjectId>,
    ) -> Result<Vec<(ProjectInfo, VersionCandidate)>> {
        let root_info = match root {
            ProjectRef::Info(info) => info.clone(),
            ProjectRef::Id(id) => self.registry().get_project_info(id).await?,
        };

        let mut resolved: Vec<(ProjectInfo, VersionCandidate)> = Vec::new();

        if !seen.insert(root_info.id.clone()) {
            debug!("{} already resolved, skipping", root_info.title);
            return Ok(resolved);
        }

        let root_version = self
            .resolve_version(ProjectRef::Info(&root_info), allow_unstable)
            .await
            .with_context(|| format!("Failed to resolve {}", root_info.title))?;

        let mut pending = self.pending_dependencies(&root_version, seen);
        resolved.push((root_info, root_version));

        while !pending.is_empty() {
            let batch: Vec<ProjectId> = std::mem::take(&mut pending);
            let mut infos = self.fetch_project_batch(&batch).await?;

            for dep_id in batch {
                let info = match infos.remove(&dep_id) {
                    Some(info) => info,
                    None => bail!("Registry returned no metadata for dependency {}", dep_id),
                };

                info!("resolving dependency {}", info.title);
                let version = self
                    .resolve_version(ProjectRef::Info(&info), allow_unstable)
                    .await
                    .with_context(|| format!("Failed to resolve dependency {}", info.title))?;

                pending.extend(self.pending_dependencies(&version, seen));
                resolved.push((info, version));
            }
        }

        Ok(resolved)
    }

    /// Required dependencies of `version` not yet seen, swap-transformed,
    /// marked seen as a side effect.
    fn pending_dependencies(
        &self,
        version: &VersionCandidate,
        seen: &mut HashSet<ProjectId>,
    ) -> Vec<ProjectId> {
        self.required_dependencies(version)
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect()
    }

    /// Fetches metadata for a batch of projects, keyed by id. The registry
    /// does not promise response order, so correspondence goes through the
    /// map rather than positions.
    async fn fetch_project_batch(
        &self,
        ids: &[ProjectId],
    ) -> Result<HashMap<ProjectId, ProjectInfo>> {
        let infos = self
            .registry()
            .get_multiple_projects(ids)
            .await
            .context("Failed to fetch dependency metadata")?;

        Ok(infos.into_iter().map(|info| (info.id.clone(), info)).collect())
    }
}

//! Version and dependency resolution.
//!
//! The resolver answers one question: given the pack's game version and
//! loader configuration, which concrete version of a project should be
//! installed? The closure walker extends that over all transitively required
//! dependencies.

pub mod closure;
pub mod swaps;
pub mod version;

pub use swaps::SwapTable;

use crate::pack::meta::PackMetadata;
use crate::registry::{ProjectId, ProjectInfo, Registry, VersionCandidate};

/// A project to resolve: either full metadata, or a bare id that costs one
/// extra registry round-trip.
#[derive(Debug, Clone, Copy)]
pub enum ProjectRef<'a> {
    Id(&'a ProjectId),
    Info(&'a ProjectInfo),
}

impl<'a> From<&'a ProjectId> for ProjectRef<'a> {
    fn from(id: &'a ProjectId) -> Self {
        ProjectRef::Id(id)
    }
}

impl<'a> From<&'a ProjectInfo> for ProjectRef<'a> {
    fn from(info: &'a ProjectInfo) -> Self {
        ProjectRef::Info(info)
    }
}

/// Resolution produced no acceptable candidate under the given constraints.
///
/// Carries everything a human needs to diagnose why nothing matched.
#[derive(Debug)]
pub struct NoCompatibleVersion {
    pub title: String,
    pub game_version: String,
    pub loaders: Vec<String>,
}

impl std::fmt::Display for NoCompatibleVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "couldn't find an appropriate version for {}; no valid versions found for {:?} on {}",
            self.title, self.loaders, self.game_version
        )
    }
}

impl std::error::Error for NoCompatibleVersion {}

/// Resolves project versions against a pack's constraints.
///
/// Stateless between calls: resolution of a given (project, constraints)
/// pair is a pure function of the candidate list the registry returns at
/// that moment. The only state shared across calls is the caller-owned
/// `seen` set threaded through [`Resolver::resolve_dependency_closure`].
pub struct Resolver<'a, R: Registry + ?Sized> {
    registry: &'a R,
    pack: &'a PackMetadata,
    swaps: SwapTable,
    /// Whether a non-release secondary-loader candidate may be used as the
    /// fallback. Defaults to true, matching the historical behavior of
    /// accepting any secondary match regardless of stability.
    allow_unstable_fallback: bool,
}

impl<'a, R: Registry + ?Sized> Resolver<'a, R> {
    pub fn new(registry: &'a R, pack: &'a PackMetadata) -> Self {
        Self {
            registry,
            pack,
            swaps: SwapTable::sinytra(),
            allow_unstable_fallback: true,
        }
    }

    /// Replaces the dependency swap table.
    pub fn with_swap_table(mut self, swaps: SwapTable) -> Self {
        self.swaps = swaps;
        self
    }

    /// Controls whether non-release secondary-loader candidates are accepted
    /// as fallbacks when unstable versions are otherwise disallowed.
    pub fn with_unstable_fallback(mut self, allowed: bool) -> Self {
        self.allow_unstable_fallback = allowed;
        self
    }

    pub(crate) fn registry(&self) -> &'a R {
        self.registry
    }

    pub(crate) fn pack(&self) -> &'a PackMetadata {
        self.pack
    }

    pub(crate) fn allows_unstable_fallback(&self) -> bool {
        self.allow_unstable_fallback
    }

    /// Required dependencies of `version`, swap-transformed when
    /// loader-compatibility mode is active.
    pub(crate) fn required_dependencies(&self, version: &VersionCandidate) -> Vec<ProjectId> {
        version
            .required_dependencies()
            .map(|id| {
                if self.pack.loader.sinytra_compat {
                    self.swaps.apply(id)
                } else {
                    id.clone()
                }
            })
            .collect()
    }
}

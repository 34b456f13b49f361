//! Dependency swap table for loader-compatibility mode.
//!
//! When a forge-family pack runs Fabric mods through the Sinytra shim,
//! dependency references to Fabric-ecosystem projects must be redirected to
//! their forge-compatible forks. The table is injected into the resolver so
//! alternate tables can be substituted in tests.

use std::collections::HashMap;

use crate::registry::ProjectId;

/// Fabric API.
pub const FABRIC_API: &str = "P7dR8mSH";
/// Forgified Fabric API, the Sinytra fork of Fabric API.
pub const FORGIFIED_FABRIC_API: &str = "Aqlf1Shp";
/// Mod Menu.
pub const MOD_MENU: &str = "mOgUt4GM";
/// Connector Extras, which covers several Fabric-only APIs under Sinytra.
pub const CONNECTOR_EXTRAS: &str = "FYpiwiBR";
/// Forge Config API Port.
pub const FORGE_CONFIG_API_PORT: &str = "ohNO6lps";
/// GeckoLib; subject to a loader-forcing quirk in the resolver.
pub const GECKOLIB: &str = "8BmcQJ2H";

/// A pure `ProjectId -> ProjectId` substitution map.
///
/// Applied exactly one level deep: a swap target that itself has an entry is
/// not re-swapped. Ids outside the table pass through unchanged.
#[derive(Debug, Clone, Default)]
pub struct SwapTable {
    swaps: HashMap<ProjectId, ProjectId>,
}

impl SwapTable {
    pub fn new(swaps: HashMap<ProjectId, ProjectId>) -> Self {
        Self { swaps }
    }

    pub fn empty() -> Self {
        Self {
            swaps: HashMap::new(),
        }
    }

    /// The standard table for Sinytra compatibility mode.
    pub fn sinytra() -> Self {
        let swaps = [
            (FABRIC_API, FORGIFIED_FABRIC_API),
            (MOD_MENU, CONNECTOR_EXTRAS),
            (FORGE_CONFIG_API_PORT, CONNECTOR_EXTRAS),
        ]
        .into_iter()
        .map(|(from, to)| (ProjectId::new(from), ProjectId::new(to)))
        .collect();

        Self { swaps }
    }

    /// Substitutes `id`, or returns it unchanged when it has no entry.
    pub fn apply(&self, id: &ProjectId) -> ProjectId {
        self.swaps.get(id).cloned().unwrap_or_else(|| id.clone())
    }
}

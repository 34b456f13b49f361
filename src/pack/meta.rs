//! Pack configuration: `pack.toml` and the per-machine `localpack.toml`.

use serde::{Deserialize, Serialize};

/// Supported mod loaders.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PackLoader {
    LegacyForge,
    Fabric,
    Quilt,
    NeoForge,
}

impl PackLoader {
    pub fn is_forge_family(self) -> bool {
        matches!(self, PackLoader::LegacyForge | PackLoader::NeoForge)
    }
}

fn default_true() -> bool {
    true
}

/// Loader section of `pack.toml`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LoaderConfig {
    #[serde(rename = "type")]
    pub kind: PackLoader,

    /// Loader version, if pinned.
    #[serde(default)]
    pub version: Option<String>,

    /// For forge-family loaders: allow Fabric mods through the Sinytra
    /// compatibility shim, and swap shim-specific dependencies in.
    #[serde(default)]
    pub sinytra_compat: bool,

    /// Workaround for GeckoLib being unreliable on forge-family loaders in
    /// compatibility mode.
    #[serde(default = "default_true")]
    pub prefer_fabric_geckolib: bool,
}

/// The committed pack definition (`pack.toml`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PackMetadata {
    /// Human-friendly pack name.
    pub name: String,

    /// Human-friendly pack version.
    pub version: String,

    /// The Minecraft version this pack targets.
    pub game_version: String,

    /// Extra directories deployed alongside `config`.
    #[serde(default)]
    pub include_directories: Vec<String>,

    pub loader: LoaderConfig,
}

impl PackMetadata {
    /// The loaders acceptable for this pack, in preference order.
    ///
    /// One or two entries; the second is the fallback loader for dual-loader
    /// setups (Quilt packs tolerate Fabric versions, forge-family packs
    /// tolerate Fabric when the compatibility shim is active).
    pub fn available_loaders(&self) -> Vec<String> {
        let loaders: &[&str] = match (self.loader.kind, self.loader.sinytra_compat) {
            (PackLoader::Fabric, _) => &["fabric"],
            (PackLoader::Quilt, _) => &["quilt", "fabric"],
            (PackLoader::LegacyForge, true) => &["forge", "fabric"],
            (PackLoader::LegacyForge, false) => &["forge"],
            (PackLoader::NeoForge, true) => &["neoforge", "fabric"],
            (PackLoader::NeoForge, false) => &["neoforge"],
        };

        loaders.iter().map(|s| s.to_string()).collect()
    }

    /// Search facet group for the loader configuration, an OR group of
    /// `categories:` filters.
    pub fn loader_facets(&self) -> Vec<String> {
        match self.loader.kind {
            PackLoader::Fabric => vec!["categories:fabric".to_string()],
            PackLoader::Quilt => vec!["categories:quilt".to_string()],
            PackLoader::LegacyForge | PackLoader::NeoForge => {
                let mut facets = Vec::new();
                if self.loader.sinytra_compat {
                    facets.push("categories:fabric".to_string());
                }
                let native = if self.loader.kind == PackLoader::LegacyForge {
                    "categories:forge"
                } else {
                    "categories:neoforge"
                };
                facets.push(native.to_string());
                facets
            }
        }
    }
}

/// Per-machine settings (`localpack.toml`), not meant to be committed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LocalMetadata {
    /// The launcher instance to deploy to when none is given explicitly.
    pub instance_name: String,

    /// Extra directories to symlink into the instance.
    #[serde(default)]
    pub extra_symlinked_dirs: Vec<String>,
}

//! `modshelf init`: creates a fresh pack checkout.

use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::pack::meta::{LoaderConfig, PackLoader, PackMetadata};
use crate::pack::{LOCAL_PACK_FILE, PACK_FILE};
use crate::runtime::Runtime;

#[derive(Debug, Clone)]
pub struct InitOptions {
    pub name: String,
    pub game_version: String,
    pub loader: PackLoader,
    pub loader_version: Option<String>,
    pub sinytra_compat: bool,
}

/// Writes a new `pack.toml`, an empty mods directory, and a `.gitignore`
/// covering the per-machine files. Refuses to touch an existing pack.
#[tracing::instrument(skip(runtime, options))]
pub fn init(runtime: &dyn Runtime, pack_dir: &Path, options: InitOptions) -> Result<()> {
    let meta_path = pack_dir.join(PACK_FILE);
    if runtime.exists(&meta_path) {
        bail!("{} already exists, refusing to overwrite", meta_path.display());
    }

    let metadata = PackMetadata {
        name: options.name,
        version: "0.1.0".to_string(),
        game_version: options.game_version,
        include_directories: vec![],
        loader: LoaderConfig {
            kind: options.loader,
            version: options.loader_version,
            sinytra_compat: options.sinytra_compat,
            prefer_fabric_geckolib: true,
        },
    };

    runtime.create_dir_all(pack_dir)?;

    let serialized = toml::to_string_pretty(&metadata).context("Failed to serialize pack file")?;
    runtime.write(&meta_path, serialized.as_bytes())?;

    runtime.create_dir_all(&pack_dir.join("mods"))?;
    runtime.write(
        &pack_dir.join(".gitignore"),
        format!("{}\n", LOCAL_PACK_FILE).as_bytes(),
    )?;

    println!("initialised pack {} in {}", metadata.name, pack_dir.display());
    Ok(())
}

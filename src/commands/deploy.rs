//! `modshelf deploy`: links the pack into a game directory or a Prism
//! Launcher instance.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

use super::open_cache;
use crate::deploy::{deploy_to_directory, deploy_to_instance};
use crate::pack::LocalPack;
use crate::runtime::Runtime;

/// Deploys to an explicit directory, a named instance, or the instance
/// recorded in `localpack.toml`, in that order of precedence.
#[tracing::instrument(skip(runtime))]
pub fn deploy(
    runtime: &dyn Runtime,
    pack_dir: &Path,
    cache_dir: &Path,
    instance: Option<String>,
    directory: Option<PathBuf>,
) -> Result<()> {
    let pack = LocalPack::load(runtime, pack_dir)?;
    let cache = open_cache(runtime, cache_dir)?;
    let localmeta = pack.local_metadata(runtime)?;

    if let Some(directory) = directory {
        deploy_to_directory(runtime, &pack, &cache, &directory, localmeta.as_ref())?;
        println!("deployed {} to {}", pack.metadata.name, directory.display());
        return Ok(());
    }

    let instance_name = match instance.or_else(|| {
        localmeta
            .as_ref()
            .map(|meta| meta.instance_name.clone())
    }) {
        Some(name) => name,
        None => bail!(
            "Expected either a directory, an instance name, or an instance name in localpack.toml"
        ),
    };

    deploy_to_instance(runtime, &pack, &cache, &instance_name, localmeta.as_ref())?;
    println!("deployed {} to instance {}", pack.metadata.name, instance_name);
    Ok(())
}

//! `modshelf pin`: pins a mod to its installed version.

use std::path::Path;

use anyhow::Result;

use crate::pack::LocalPack;
use crate::runtime::Runtime;

#[tracing::instrument(skip(runtime))]
pub fn pin(runtime: &dyn Runtime, pack_dir: &Path, mod_name: &str) -> Result<()> {
    let mut pack = LocalPack::load(runtime, pack_dir)?;
    pack.pin(runtime, mod_name)?;

    println!("pinned {}", mod_name);
    Ok(())
}

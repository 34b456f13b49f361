//! CLI subcommand implementations.
//!
//! Each command is a plain function over the runtime, the registry, and the
//! pack/cache directories, so tests can drive them with mocks end to end.

mod add;
mod deploy;
mod download;
mod init;
mod list;
mod pin;
mod update;

pub use add::{AddTarget, add};
pub use deploy::deploy;
pub use download::download;
pub use init::{InitOptions, init};
pub use list::list;
pub use pin::pin;
pub use update::update;

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};

use crate::cache::ModCache;
use crate::runtime::Runtime;

/// The cache directory to use: the explicit flag, or a `modshelf`
/// subdirectory of the platform cache directory.
pub fn resolve_cache_dir(runtime: &dyn Runtime, cache_dir: Option<PathBuf>) -> Result<PathBuf> {
    match cache_dir {
        Some(dir) => Ok(dir),
        None => runtime
            .cache_dir()
            .map(|dir| dir.join("modshelf"))
            .ok_or_else(|| anyhow!("Could not determine the user cache directory")),
    }
}

fn open_cache<'a>(runtime: &'a dyn Runtime, cache_dir: &Path) -> Result<ModCache<'a>> {
    ModCache::new(runtime, cache_dir.to_path_buf())
}

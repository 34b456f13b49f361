//! Prism Launcher discovery.
//!
//! Locates the instances directory from `prismlauncher.cfg` and the game
//! directory inside a named instance, so a pack can be deployed without the
//! user spelling out absolute paths.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use log::debug;

use crate::runtime::Runtime;

const PRISM_CONFIG_FILE: &str = "prismlauncher.cfg";
const DEFAULT_INSTANCES_DIR: &str = "instances";

/// Extracts a directory setting from Prism's ini-style config text.
///
/// Relative values (including the default) resolve against `base_dir`.
fn prism_subdir(base_dir: &Path, config_text: &str, key: &str, default_name: &str) -> PathBuf {
    let prefix = format!("{}=", key);
    let value = config_text
        .lines()
        .find_map(|line| line.strip_prefix(&prefix))
        .unwrap_or(default_name);

    let dir = PathBuf::from(value);
    if dir.is_absolute() {
        dir
    } else {
        base_dir.join(dir)
    }
}

/// The Prism Launcher instances directory on this machine.
pub fn prism_instances_directory(runtime: &dyn Runtime) -> Result<PathBuf> {
    let base_dir = runtime
        .data_dir()
        .map(|dir| dir.join("PrismLauncher"))
        .ok_or_else(|| anyhow!("Could not determine the user data directory"))?;

    let config_path = base_dir.join(PRISM_CONFIG_FILE);
    let config_text = runtime.read_to_string(&config_path).with_context(|| {
        format!(
            "Failed to read Prism Launcher config at {}",
            config_path.display()
        )
    })?;

    Ok(prism_subdir(
        &base_dir,
        &config_text,
        "InstanceDir",
        DEFAULT_INSTANCES_DIR,
    ))
}

/// The game directory of a named instance: `<instances>/<name>/.minecraft`,
/// tolerating the undotted `minecraft` spelling some setups use.
pub fn find_minecraft_dir(
    runtime: &dyn Runtime,
    instances_dir: &Path,
    instance: &str,
) -> Result<PathBuf> {
    let instance_path = instances_dir.join(instance);

    for name in [".minecraft", "minecraft"] {
        let candidate = instance_path.join(name);
        if runtime.exists(&candidate) {
            debug!("found game directory {}", candidate.display());
            return Ok(candidate);
        }
    }

    bail!(
        "Can't find the .minecraft directory for instance {}",
        instance_path.display()
    )
}

//! `modshelf list`: prints indexed mods.

use std::path::Path;

use anyhow::Result;

use crate::pack::LocalPack;
use crate::pack::index::InstalledMod;
use crate::runtime::Runtime;

#[tracing::instrument(skip(runtime))]
pub fn list(runtime: &dyn Runtime, pack_dir: &Path) -> Result<()> {
    let pack = LocalPack::load(runtime, pack_dir)?;

    if pack.index.is_empty() {
        println!("No mods installed.");
        return Ok(());
    }

    let (selected, dependencies): (Vec<&InstalledMod>, Vec<&InstalledMod>) =
        pack.index.iter().partition(|entry| entry.selected);

    println!("Selected mods:");
    for entry in &selected {
        print_entry(entry);
    }

    if !dependencies.is_empty() {
        println!();
        println!("Dependency mods (not explicitly selected):");
        for entry in &dependencies {
            print_entry(entry);
        }
    }

    Ok(())
}

fn print_entry(entry: &InstalledMod) {
    let pinned = if entry.pinned { " (pinned)" } else { "" };
    println!("  {} {}{}", entry.name, entry.version, pinned);
}

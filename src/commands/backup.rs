// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Backup command - takes or lists catalog backups

use super::{print_json, Ctx};
use anyhow::{bail, Result};

/// Run the backup command
pub fn run(ctx: &Ctx, list: bool) -> Result<()> {
    let settings = ctx.settings();
    let catalog = ctx.catalog(&settings);

    if list {
        let backups = catalog.backups();
        if ctx.json {
            return print_json(&backups);
        }
        if backups.is_empty() {
            println!("No backups in {}", ctx.project.backups_dir().display());
        }
        for b in backups.iter().rev() {
            println!("{}", b.display());
        }
        return Ok(());
    }

    if !catalog.path().exists() {
        bail!("No catalog at {} to back up", catalog.path().display());
    }
    let path = catalog.create_backup()?;
    println!("Backed up catalog to {}", path.display());
    Ok(())
}

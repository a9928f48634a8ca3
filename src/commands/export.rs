// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Export command - writes the catalog to a standalone JSON file

use super::Ctx;
use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

/// Run the export command. `-` writes to stdout; no output path writes a
/// timestamped file in the project's `exports/` folder.
pub fn run(ctx: &Ctx, output: Option<PathBuf>) -> Result<()> {
    let settings = ctx.settings();
    let catalog = ctx.catalog(&settings);
    let content = catalog.to_json()?;

    if output.as_deref().is_some_and(|p| p.as_os_str() == "-") {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{content}").context("Failed to write to stdout")?;
        return Ok(());
    }

    let path = match output {
        Some(path) => path,
        None => {
            let dir = ctx.project.exports_dir();
            fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
            dir.join(format!("wreaths_export_{}.json", Local::now().format("%Y%m%d_%H%M%S")))
        }
    };

    fs::write(&path, format!("{content}\n")).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Exported {} wreaths", catalog.len());
    println!("Exported {} wreaths to {}", catalog.len(), path.display());
    Ok(())
}

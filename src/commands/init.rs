// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Init command - creates the project folder layout

use super::Ctx;
use wreathkeeper::config::{self, Settings};
use anyhow::{Context, Result};
use std::fs;
use tracing::info;

/// Run the init command
pub fn run(ctx: &Ctx, remember: bool) -> Result<()> {
    let project = &ctx.project;
    project.ensure_structure()?;

    let catalog = project.catalog_file();
    if catalog.exists() {
        println!("Catalog already present at {}", catalog.display());
    } else {
        fs::write(&catalog, "[]\n").with_context(|| format!("Failed to create {}", catalog.display()))?;
        info!("Created {}", catalog.display());
        println!("Created empty catalog at {}", catalog.display());
    }

    if !project.settings_file().exists() {
        config::save(project, &Settings::default())?;
        println!("Wrote default settings to {}", project.settings_file().display());
    }

    if remember {
        let location = project.remember()?;
        println!("Remembered project folder in {}", location.display());
    }

    Ok(())
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Project command - shows or switches the remembered project folder

use super::{print_json, Ctx};
use wreathkeeper::project::Project;
use anyhow::{bail, Result};
use serde_json::json;
use std::path::PathBuf;

/// Run the project command
pub fn run(ctx: &Ctx, path: Option<PathBuf>) -> Result<()> {
    let Some(path) = path else {
        return show(ctx);
    };

    if path.exists() && !path.is_dir() {
        bail!("{} is not a directory", path.display());
    }
    let project = Project::new(path);
    project.ensure_structure()?;
    project.remember()?;
    println!("Project folder set to {}", project.root().display());
    Ok(())
}

fn show(ctx: &Ctx) -> Result<()> {
    let settings = ctx.settings();
    let catalog = ctx.catalog(&settings);
    let stats = catalog.stats();

    if ctx.json {
        return print_json(&json!({
            "project": ctx.project.root(),
            "catalog": catalog.path(),
            "exists": catalog.path().exists(),
            "total": stats.total,
            "available": stats.available,
            "featured": stats.featured,
        }));
    }

    println!("Project folder: {}", ctx.project.root().display());
    if catalog.path().exists() {
        println!(
            "Catalog: {} wreaths ({} available, {} featured)",
            stats.total, stats.available, stats.featured
        );
    } else {
        println!("No catalog yet. Run 'wreathkeeper init' to create one.");
    }
    Ok(())
}

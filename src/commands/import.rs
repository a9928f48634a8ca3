// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Import command - appends records from JSON files

use super::{print_json, save, Ctx};
use wreathkeeper::import;
use anyhow::{bail, Result};
use serde_json::json;
use std::path::PathBuf;

/// Run the import command. With no paths, every `*.json` in the project's
/// `imports/` folder is used.
pub fn run(ctx: &Ctx, paths: Vec<PathBuf>) -> Result<()> {
    let paths = if paths.is_empty() {
        let dir = ctx.project.imports_dir();
        let found = import::scan_dir(&dir);
        if found.is_empty() {
            bail!("No files given and no .json files in {}", dir.display());
        }
        found
    } else {
        paths
    };

    let settings = ctx.settings();
    let mut catalog = ctx.catalog_for_update(&settings)?;
    let quarantine = ctx.project.quarantine_dir();

    let report = import::import_files(&paths, &mut catalog, Some(&quarantine));
    if report.imported > 0 {
        save(&mut catalog)?;
    }

    if ctx.json {
        print_json(&json!({
            "files": report.files,
            "imported": report.imported,
            "imports": report.imports.iter().map(|f| json!({
                "path": f.path,
                "encoding": f.encoding,
                "count": f.count,
            })).collect::<Vec<_>>(),
            "errors": report.errors.iter().map(|e| json!({
                "path": e.path,
                "message": e.message,
            })).collect::<Vec<_>>(),
            "quarantined": report.quarantined,
        }))?;
    } else {
        println!("{}", report.summary());
        for copy in &report.quarantined {
            println!("Copied unreadable file to {}", copy.display());
        }
    }

    if report.is_failure() {
        bail!("Nothing was imported");
    }
    Ok(())
}

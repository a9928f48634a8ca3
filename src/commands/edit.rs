// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Edit command - updates fields of an existing record

use super::{print_json, save, Ctx, WreathFields};
use anyhow::{bail, Context, Result};

/// Run the edit command
pub fn run(ctx: &Ctx, id: &str, fields: WreathFields) -> Result<()> {
    if fields.is_empty() {
        bail!("Nothing to change; pass at least one field such as --title or --price");
    }

    let settings = ctx.settings();
    let mut catalog = ctx.catalog_for_update(&settings)?;
    let id = catalog.resolve(id)?;

    let mut updated = catalog.get(&id).cloned().context("Wreath disappeared while editing")?;
    fields.apply(&mut updated)?;
    catalog.update(&id, updated)?;
    save(&mut catalog)?;

    if ctx.json {
        return print_json(&catalog.get(&id));
    }
    println!("Updated wreath {id}");
    Ok(())
}

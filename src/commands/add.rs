// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Add command - appends a new record

use super::{print_json, save, Ctx, WreathFields};
use wreathkeeper::types::Wreath;
use anyhow::{bail, Result};
use chrono::Local;
use serde_json::json;

/// Run the add command
pub fn run(ctx: &Ctx, fields: WreathFields) -> Result<()> {
    if fields.title.as_deref().map_or(true, |t| t.trim().is_empty()) {
        bail!("A title is required (--title)");
    }

    let settings = ctx.settings();
    let mut catalog = ctx.catalog_for_update(&settings)?;

    let mut wreath = Wreath::new("");
    wreath.date_added = Some(Local::now().format("%Y-%m-%d").to_string());
    fields.apply(&mut wreath)?;

    let id = catalog.add(wreath);
    save(&mut catalog)?;

    if ctx.json {
        return print_json(&json!({ "id": id }));
    }
    println!("Added wreath {id}");
    Ok(())
}

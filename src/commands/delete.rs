// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Delete command - removes a record

use super::{save, Ctx};
use anyhow::Result;

/// Run the delete command
pub fn run(ctx: &Ctx, id: &str) -> Result<()> {
    let settings = ctx.settings();
    let mut catalog = ctx.catalog_for_update(&settings)?;
    let id = catalog.resolve(id)?;

    let removed = catalog.delete(&id)?;
    save(&mut catalog)?;

    println!("Deleted \"{}\" ({})", removed.title, removed.id);
    Ok(())
}

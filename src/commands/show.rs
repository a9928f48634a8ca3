// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Show command - prints one record in full

use super::{format_price, print_json, Ctx};
use wreathkeeper::types::Wreath;
use anyhow::{Context, Result};

/// Run the show command
pub fn run(ctx: &Ctx, id: &str) -> Result<()> {
    let settings = ctx.settings();
    let catalog = ctx.catalog(&settings);
    let id = catalog.resolve(id)?;
    let w = catalog.get(&id).context("Wreath disappeared while reading")?;

    if ctx.json {
        return print_json(w);
    }
    print_wreath(ctx, w);
    Ok(())
}

/// Human-readable record
pub fn print_wreath(ctx: &Ctx, w: &Wreath) {
    println!("{}  {}", w.title, ctx.markers(w));
    println!("  id:          {}", w.id);
    println!("  price:       {}", format_price(w.price));
    if let Some(local) = w.local_price {
        println!("  local price: {}", format_price(local));
    }
    if let Some(category) = &w.category {
        println!("  category:    {category}");
    }
    if let Some(date) = &w.date_created {
        println!("  created:     {date}");
    }
    if let Some(date) = &w.date_added {
        println!("  added:       {date}");
    }
    if !w.hashtags.is_empty() {
        let tags: Vec<String> = w.hashtags.iter().map(|t| format!("#{t}")).collect();
        println!("  hashtags:    {}", tags.join(" "));
    }
    if !w.description.is_empty() {
        println!("  description: {}", w.description);
    }
    for (i, url) in w.images.iter().enumerate() {
        let label = if i == 0 { " (thumbnail)" } else { "" };
        println!("  image {}:     {url}{label}", i + 1);
    }
    for (name, url) in &w.platforms {
        println!("  {name}: {}", url.as_str().unwrap_or_default());
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Images command - manages a record's image list
//!
//! Positions are 1-based; position 1 is the thumbnail.

use super::{print_json, save, Ctx, Style};
use wreathkeeper::images::{HttpImageSource, ImageFetcher};
use anyhow::{bail, Context, Result};
use clap::Subcommand;
use serde_json::json;
use std::sync::Arc;

/// Image actions
#[derive(Debug, Clone, Subcommand)]
pub enum ImagesAction {
    /// List image URLs
    List {
        /// Wreath id (or unique prefix)
        id: String,
    },
    /// Add an image URL
    Add {
        /// Wreath id (or unique prefix)
        id: String,
        /// Image URL
        url: String,
        /// Insert at this position instead of appending
        #[arg(long)]
        at: Option<usize>,
    },
    /// Remove the image at a position
    Remove {
        /// Wreath id (or unique prefix)
        id: String,
        /// Position to remove
        position: usize,
    },
    /// Move an image to another position
    Move {
        /// Wreath id (or unique prefix)
        id: String,
        /// Current position
        from: usize,
        /// New position
        to: usize,
    },
    /// Download images and report which ones are broken
    Check {
        /// Only this wreath
        id: Option<String>,
    },
}

/// Run the images command
pub fn run(ctx: &Ctx, action: ImagesAction) -> Result<()> {
    match action {
        ImagesAction::List { id } => list(ctx, &id),
        ImagesAction::Add { id, url, at } => {
            let url = url.trim().to_string();
            if url.is_empty() {
                bail!("Image URL cannot be empty");
            }
            change(ctx, &id, |w| {
                w.insert_image(url.clone(), at.map(|p| p.saturating_sub(1)));
                Ok(format!("Added image to \"{}\"", w.title))
            })
        }
        ImagesAction::Remove { id, position } => change(ctx, &id, |w| {
            let removed = position
                .checked_sub(1)
                .and_then(|i| w.remove_image(i))
                .with_context(|| format!("No image at position {position}"))?;
            Ok(format!("Removed {removed}"))
        }),
        ImagesAction::Move { id, from, to } => change(ctx, &id, |w| {
            let moved = match (from.checked_sub(1), to.checked_sub(1)) {
                (Some(f), Some(t)) => w.move_image(f, t),
                _ => false,
            };
            if !moved {
                bail!("Positions must be between 1 and {}", w.images.len());
            }
            Ok(format!("Moved image {from} to position {to}"))
        }),
        ImagesAction::Check { id } => check(ctx, id.as_deref()),
    }
}

fn list(ctx: &Ctx, id: &str) -> Result<()> {
    let settings = ctx.settings();
    let catalog = ctx.catalog(&settings);
    let id = catalog.resolve(id)?;
    let w = catalog.get(&id).context("Wreath disappeared while reading")?;

    if ctx.json {
        return print_json(&w.images);
    }
    if w.images.is_empty() {
        println!("\"{}\" has no images", w.title);
    }
    for (i, url) in w.images.iter().enumerate() {
        let label = if i == 0 { ctx.paint(" (thumbnail)", Style::Dim) } else { String::new() };
        println!("{}. {url}{label}", i + 1);
    }
    Ok(())
}

fn change(
    ctx: &Ctx,
    id: &str,
    edit: impl FnOnce(&mut wreathkeeper::types::Wreath) -> Result<String>,
) -> Result<()> {
    let settings = ctx.settings();
    let mut catalog = ctx.catalog_for_update(&settings)?;
    let id = catalog.resolve(id)?;

    let mut updated = catalog.get(&id).cloned().context("Wreath disappeared while editing")?;
    let message = edit(&mut updated)?;
    catalog.update(&id, updated)?;
    super::save(&mut catalog)?;

    println!("{message}");
    Ok(())
}

fn check(ctx: &Ctx, id: Option<&str>) -> Result<()> {
    let settings = ctx.settings();
    let catalog = ctx.catalog(&settings);

    let urls: Vec<String> = match id {
        Some(id) => {
            let id = catalog.resolve(id)?;
            catalog.get(&id).map(|w| w.images.clone()).unwrap_or_default()
        }
        None => {
            let mut all: Vec<String> = catalog.wreaths().iter().flat_map(|w| w.images.iter().cloned()).collect();
            all.sort();
            all.dedup();
            all
        }
    };
    if urls.is_empty() {
        println!("No images to check.");
        return Ok(());
    }

    let source = HttpImageSource::new()?;
    let mut fetcher = ImageFetcher::new(Arc::new(source)).with_cache(ctx.project.image_cache_dir());
    let results = fetcher.fetch_all(&urls);
    let broken = results.iter().filter(|(_, r)| r.is_err()).count();

    if ctx.json {
        let rows: Vec<_> = results
            .iter()
            .map(|(url, r)| match r {
                Ok(img) => json!({ "url": url, "ok": true, "kind": img.kind.to_string() }),
                Err(e) => json!({ "url": url, "ok": false, "error": e.to_string() }),
            })
            .collect();
        print_json(&rows)?;
    } else {
        for (url, result) in &results {
            match result {
                Ok(img) => println!("{} {url} ({})", ctx.paint("ok", Style::Ok), img.kind),
                Err(e) => println!("{} {e}", ctx.paint("broken", Style::Sold)),
            }
        }
        println!();
        println!("{} of {} images loaded", urls.len() - broken, urls.len());
    }

    if broken > 0 {
        bail!("{broken} image(s) could not be loaded");
    }
    Ok(())
}

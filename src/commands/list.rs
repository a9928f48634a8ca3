// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! List command - filtered, sorted view of the catalog

use super::{format_price, print_json, Ctx, Style};
use wreathkeeper::catalog::{Availability, FeaturedFilter, Filter, SortOrder};
use anyhow::Result;

/// Listing options
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ListArgs {
    /// Match title, description or hashtags (case-insensitive)
    #[arg(short, long)]
    pub search: Option<String>,

    /// Only wreaths still for sale
    #[arg(long, conflicts_with = "sold")]
    pub available: bool,

    /// Only sold wreaths
    #[arg(long)]
    pub sold: bool,

    /// Only featured wreaths
    #[arg(long, conflicts_with = "not_featured")]
    pub featured: bool,

    /// Hide featured wreaths
    #[arg(long)]
    pub not_featured: bool,

    /// Sort order
    #[arg(long, value_enum, default_value_t = SortOrder::Default)]
    pub sort: SortOrder,
}

impl ListArgs {
    /// The catalog filter these options describe
    #[must_use]
    pub fn filter(&self) -> Filter {
        Filter {
            search: self.search.clone(),
            availability: if self.available {
                Availability::Available
            } else if self.sold {
                Availability::Sold
            } else {
                Availability::All
            },
            featured: if self.featured {
                FeaturedFilter::Only
            } else if self.not_featured {
                FeaturedFilter::Exclude
            } else {
                FeaturedFilter::All
            },
        }
    }
}

/// Run the list command
pub fn run(ctx: &Ctx, args: &ListArgs) -> Result<()> {
    let settings = ctx.settings();
    let catalog = ctx.catalog(&settings);
    let items = catalog.list(&args.filter(), args.sort);

    if ctx.json {
        return print_json(&items);
    }

    if items.is_empty() {
        println!("No wreaths found.");
    }
    for w in &items {
        let short_id: String = w.id.chars().take(8).collect();
        let title = if w.title.is_empty() { "(untitled)" } else { w.title.as_str() };
        println!(
            "{}  {:<40} {:>9}  {}",
            ctx.paint(&short_id, Style::Dim),
            title,
            format_price(w.effective_price()),
            ctx.markers(w)
        );
    }

    let stats = catalog.stats();
    println!();
    println!(
        "Showing {} of {} wreaths ({} available, {} featured)",
        items.len(),
        stats.total,
        stats.available,
        stats.featured
    );
    Ok(())
}

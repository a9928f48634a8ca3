// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Command implementations

pub mod add;
pub mod backup;
pub mod completions;
pub mod delete;
pub mod deploy;
pub mod edit;
pub mod export;
pub mod images;
pub mod import;
pub mod init;
pub mod list;
pub mod project;
pub mod settings;
pub mod show;

use wreathkeeper::catalog::{Catalog, SaveReport};
use wreathkeeper::config::{self, Settings};
use wreathkeeper::hashtags;
use wreathkeeper::project::Project;
use wreathkeeper::types::{parse_date, Wreath};
use anyhow::{bail, Context, Result};
use owo_colors::OwoColorize;
use serde::Serialize;

/// What every command needs to know about the invocation
#[derive(Debug, Clone)]
pub struct Ctx {
    /// Resolved project folder
    pub project: Project,
    /// Print machine-readable JSON instead of text
    pub json: bool,
    /// Colored output allowed
    pub color: bool,
}

impl Ctx {
    /// Effective settings (file plus environment); warnings go to stderr
    #[must_use]
    pub fn settings(&self) -> Settings {
        let (settings, warning) = config::load(&self.project);
        if let Some(w) = warning {
            eprintln!("Warning: {w}");
        }
        settings
    }

    /// Load the catalog for reading. A file that failed to load is
    /// reported and shown as empty.
    #[must_use]
    pub fn catalog(&self, settings: &Settings) -> Catalog {
        let (catalog, report) = Catalog::open(&self.project, settings.backup_policy());
        if let Some(e) = report.error {
            eprintln!("Warning: {}: {}", catalog.path().display(), e);
        }
        catalog
    }

    /// Load the catalog for changing. Refuses when the file exists but
    /// could not be loaded, so it is never saved over.
    pub fn catalog_for_update(&self, settings: &Settings) -> Result<Catalog> {
        let (catalog, report) = Catalog::open(&self.project, settings.backup_policy());
        if let Some(e) = report.error {
            bail!(
                "{} could not be loaded ({e}); fix or restore it from backups/ before making changes",
                catalog.path().display()
            );
        }
        if report.backfilled_ids > 0 {
            tracing::info!("Assigned ids to {} wreaths", report.backfilled_ids);
        }
        Ok(catalog)
    }

    /// Paint `text` when color is on
    #[must_use]
    pub fn paint(&self, text: &str, style: Style) -> String {
        if !self.color {
            return text.to_string();
        }
        match style {
            Style::Sold => text.red().to_string(),
            Style::Featured => text.yellow().bold().to_string(),
            Style::Dim => text.dimmed().to_string(),
            Style::Ok => text.green().to_string(),
            Style::Warn => text.yellow().to_string(),
        }
    }

    /// Sold/featured markers for one record
    #[must_use]
    pub fn markers(&self, w: &Wreath) -> String {
        let mut out = Vec::new();
        if w.featured {
            out.push(self.paint("★ featured", Style::Featured));
        }
        if w.sold {
            out.push(self.paint("SOLD", Style::Sold));
        }
        out.join(" ")
    }
}

/// Output styles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// Sold marker
    Sold,
    /// Featured marker
    Featured,
    /// Secondary text
    Dim,
    /// Success
    Ok,
    /// Finished without an error but needs attention
    Warn,
}

/// Save and surface a backup problem without failing
pub fn save(catalog: &mut Catalog) -> Result<SaveReport> {
    let report = catalog
        .save()
        .with_context(|| format!("Failed to save {}", catalog.path().display()))?;
    if let Some(w) = &report.backup_warning {
        eprintln!("Warning: {w}");
    }
    Ok(report)
}

/// Pretty-print a value as JSON on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("Failed to encode output")?);
    Ok(())
}

/// Price as shown in listings
#[must_use]
pub fn format_price(price: f64) -> String {
    format!("${price:.2}")
}

/// Editable record fields shared by `add` and `edit`
#[derive(Debug, Clone, Default, clap::Args)]
pub struct WreathFields {
    /// Title
    #[arg(long)]
    pub title: Option<String>,

    /// Price
    #[arg(long)]
    pub price: Option<f64>,

    /// Website price (overrides price when non-zero)
    #[arg(long)]
    pub local_price: Option<f64>,

    /// Description; #tags in it become hashtags
    #[arg(long)]
    pub description: Option<String>,

    /// Hashtag (repeatable); replaces the list on edit
    #[arg(long = "hashtag")]
    pub hashtags: Vec<String>,

    /// Image URL (repeatable); replaces the list on edit
    #[arg(long = "image")]
    pub images: Vec<String>,

    /// Creation date (YYYY-MM-DD or MM/DD/YYYY)
    #[arg(long)]
    pub date: Option<String>,

    /// Category
    #[arg(long)]
    pub category: Option<String>,

    /// Featured (`--featured` or `--featured false`)
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub featured: Option<bool>,

    /// Sold (`--sold` or `--sold false`)
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub sold: Option<bool>,
}

impl WreathFields {
    /// No field given
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.price.is_none()
            && self.local_price.is_none()
            && self.description.is_none()
            && self.hashtags.is_empty()
            && self.images.is_empty()
            && self.date.is_none()
            && self.category.is_none()
            && self.featured.is_none()
            && self.sold.is_none()
    }

    /// Write the given fields into `w`
    pub fn apply(self, w: &mut Wreath) -> Result<()> {
        if let Some(title) = self.title {
            let title = title.trim().to_string();
            if title.is_empty() {
                bail!("Title cannot be empty");
            }
            w.title = title;
        }
        if let Some(price) = self.price {
            w.price = check_price(price)?;
        }
        if let Some(price) = self.local_price {
            w.local_price = Some(check_price(price)?);
        }
        if let Some(description) = self.description {
            w.description = description;
        }
        if !self.hashtags.is_empty() {
            w.hashtags = hashtags::merge(&[], &self.hashtags);
        }
        if !self.images.is_empty() {
            w.images = self.images.into_iter().map(|u| u.trim().to_string()).collect();
        }
        if let Some(date) = self.date {
            let parsed = parse_date(&date).with_context(|| format!("Unrecognised date: {date}"))?;
            w.date_created = Some(parsed.format("%Y-%m-%d").to_string());
        }
        if let Some(category) = self.category {
            w.category = Some(category).filter(|c| !c.trim().is_empty());
        }
        if let Some(featured) = self.featured {
            w.featured = featured;
        }
        if let Some(sold) = self.sold {
            w.sold = sold;
        }
        Ok(())
    }
}

fn check_price(price: f64) -> Result<f64> {
    if !price.is_finite() || price < 0.0 {
        bail!("Price must be a non-negative number, got {price}");
    }
    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_apply() {
        let mut w = Wreath::new("Old");
        let fields = WreathFields {
            title: Some("  New ".into()),
            hashtags: vec!["#Fall".into(), "fall".into()],
            date: Some("10/31/2024".into()),
            featured: Some(true),
            ..WreathFields::default()
        };

        fields.apply(&mut w).unwrap();

        assert_eq!(w.title, "New");
        assert_eq!(w.hashtags, vec!["fall"]);
        assert_eq!(w.date_created.as_deref(), Some("2024-10-31"));
        assert!(w.featured);
    }

    #[test]
    fn test_fields_reject_bad_values() {
        let mut w = Wreath::new("A");
        assert!(WreathFields { price: Some(-1.0), ..WreathFields::default() }.apply(&mut w).is_err());
        assert!(WreathFields { date: Some("soon".into()), ..WreathFields::default() }.apply(&mut w).is_err());
        assert!(WreathFields { title: Some(" ".into()), ..WreathFields::default() }.apply(&mut w).is_err());
        assert_eq!(w.title, "A");
    }

    #[test]
    fn test_markers_plain() {
        let ctx = Ctx {
            project: Project::new("."),
            json: false,
            color: false,
        };
        let w = Wreath { sold: true, featured: true, ..Wreath::new("A") };
        assert_eq!(ctx.markers(&w), "★ featured SOLD");
    }
}

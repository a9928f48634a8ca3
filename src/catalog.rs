// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Catalog store: the in-memory record list and its JSON file
//!
//! The catalog is loaded once and written back whole. Every save can be
//! preceded by a timestamped copy of the previous file in `backups/`, with
//! the oldest copies pruned beyond the configured count.

use crate::encoding::{self, ReadError};
use crate::hashtags;
use crate::project::Project;
use crate::types::Wreath;
use chrono::{Local, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

static TITLE_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("valid title pattern"));

const BACKUP_STAMP: &str = "%Y%m%d_%H%M%S";

/// Catalog failures
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Catalog file could not be read or parsed
    #[error(transparent)]
    Read(#[from] ReadError),
    /// Catalog file holds something other than a list
    #[error("catalog file holds a JSON {0}, expected a list of records")]
    NotAList(&'static str),
    /// One element of the list is not a usable record
    #[error("record #{} is malformed: {source}", index + 1)]
    Record {
        /// Zero-based position in the file
        index: usize,
        /// Why it did not fit
        #[source]
        source: serde_json::Error,
    },
    /// No record with that id
    #[error("no wreath with id {0}")]
    NotFound(String),
    /// Id prefix matches more than one record
    #[error("id prefix {0} matches {1} wreaths; use more characters")]
    Ambiguous(String, usize),
    /// Writing the catalog failed
    #[error("could not write {}: {source}", path.display())]
    Write {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// Copying or pruning a backup failed
    #[error("backup failed for {}: {source}", path.display())]
    Backup {
        /// File path involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// Records could not be encoded
    #[error("could not encode catalog: {0}")]
    Encode(#[from] serde_json::Error),
}

/// When and how many backups to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackupPolicy {
    /// Back up before each save
    pub auto_backup: bool,
    /// Number of backups retained
    pub keep: usize,
}

impl Default for BackupPolicy {
    fn default() -> Self {
        Self { auto_backup: true, keep: 10 }
    }
}

/// What happened while loading
#[derive(Debug, Default)]
pub struct LoadReport {
    /// The catalog file existed
    pub existed: bool,
    /// Encoding that decoded the file
    pub encoding: Option<String>,
    /// Records that received a fresh id
    pub backfilled_ids: usize,
    /// Why the catalog started empty, if it did
    pub error: Option<CatalogError>,
}

/// What happened while saving
#[derive(Debug, Default)]
pub struct SaveReport {
    /// Backup written before the save
    pub backup: Option<PathBuf>,
    /// Backup problem that did not stop the save
    pub backup_warning: Option<String>,
    /// Records written
    pub written: usize,
}

/// Counts shown in the status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogStats {
    /// All records
    pub total: usize,
    /// Not sold
    pub available: usize,
    /// Featured
    pub featured: usize,
}

// =============================================================================
// Filtering and sorting
// =============================================================================

/// Sort orders for listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum SortOrder {
    /// Featured first, then by title
    #[default]
    Default,
    /// Title A-Z, ignoring case and punctuation
    Title,
    /// Title Z-A
    TitleDesc,
    /// Cheapest first; unpriced items lead
    Price,
    /// Most expensive first; unpriced items trail
    PriceDesc,
    /// Oldest first; undated items lead
    Date,
    /// Newest first; undated items trail
    DateDesc,
}

/// Sold-state filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Availability {
    /// Everything
    #[default]
    All,
    /// Not sold
    Available,
    /// Sold only
    Sold,
}

/// Featured-flag filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FeaturedFilter {
    /// Everything
    #[default]
    All,
    /// Featured only
    Only,
    /// Not featured
    Exclude,
}

/// Listing filter
#[derive(Debug, Clone, Default)]
pub struct Filter {
    /// Case-insensitive text matched against title, description and tags
    pub search: Option<String>,
    /// Sold-state filter
    pub availability: Availability,
    /// Featured filter
    pub featured: FeaturedFilter,
}

impl Filter {
    /// Whether `w` passes the filter
    #[must_use]
    pub fn matches(&self, w: &Wreath) -> bool {
        let availability_ok = match self.availability {
            Availability::All => true,
            Availability::Available => !w.sold,
            Availability::Sold => w.sold,
        };
        let featured_ok = match self.featured {
            FeaturedFilter::All => true,
            FeaturedFilter::Only => w.featured,
            FeaturedFilter::Exclude => !w.featured,
        };
        let search_ok = match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                w.title.to_lowercase().contains(&needle)
                    || w.description.to_lowercase().contains(&needle)
                    || w.hashtags.join(" ").contains(&needle)
            }
        };
        availability_ok && featured_ok && search_ok
    }
}

/// Sort key for titles: punctuation stripped, lowercase
#[must_use]
pub fn title_key(title: &str) -> String {
    TITLE_PUNCT.replace_all(title, "").to_lowercase()
}

fn by_price(a: &Wreath, b: &Wreath) -> Ordering {
    a.effective_price().total_cmp(&b.effective_price())
}

/// Sort records in place (stable)
pub fn sort(items: &mut [&Wreath], order: SortOrder) {
    match order {
        SortOrder::Default => items.sort_by_cached_key(|w| (!w.featured, title_key(&w.title))),
        SortOrder::Title => items.sort_by_cached_key(|w| title_key(&w.title)),
        SortOrder::TitleDesc => {
            items.sort_by_cached_key(|w| std::cmp::Reverse(title_key(&w.title)));
        }
        SortOrder::Price => items.sort_by(|a, b| by_price(a, b)),
        SortOrder::PriceDesc => items.sort_by(|a, b| by_price(b, a)),
        SortOrder::Date => items.sort_by_key(|w| w.created_on()),
        SortOrder::DateDesc => items.sort_by_key(|w| std::cmp::Reverse(w.created_on())),
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// The record list and the file it lives in
#[derive(Debug)]
pub struct Catalog {
    path: PathBuf,
    backup_dir: PathBuf,
    policy: BackupPolicy,
    wreaths: Vec<Wreath>,
    dirty: bool,
}

impl Catalog {
    /// Empty catalog bound to `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>, policy: BackupPolicy) -> Self {
        Self {
            path: path.into(),
            backup_dir: backup_dir.into(),
            policy,
            wreaths: Vec::new(),
            dirty: false,
        }
    }

    /// Load the catalog of a project folder
    #[must_use]
    pub fn open(project: &Project, policy: BackupPolicy) -> (Self, LoadReport) {
        Self::load(project.catalog_file(), project.backups_dir(), policy)
    }

    /// Load a catalog file. Never fails: problems leave the catalog empty
    /// and are returned in the report.
    #[must_use]
    pub fn load(path: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>, policy: BackupPolicy) -> (Self, LoadReport) {
        let mut catalog = Self::new(path, backup_dir, policy);
        let mut report = LoadReport::default();

        if !catalog.path.exists() {
            debug!("No catalog at {}; starting empty", catalog.path.display());
            return (catalog, report);
        }
        report.existed = true;

        let doc = match encoding::read_json(&catalog.path) {
            Ok(doc) => doc,
            Err(e) => {
                warn!("Could not load {}: {}", catalog.path.display(), e);
                report.error = Some(e.into());
                return (catalog, report);
            }
        };
        report.encoding = Some(doc.encoding.label().into_owned());

        match records_from(doc.value) {
            Ok(mut wreaths) => {
                for w in &mut wreaths {
                    if w.id.trim().is_empty() {
                        w.id = Wreath::generate_id();
                        report.backfilled_ids += 1;
                    }
                    hashtags::process(w);
                }
                info!(
                    "Loaded {} wreaths from {} ({})",
                    wreaths.len(),
                    catalog.path.display(),
                    doc.encoding
                );
                catalog.dirty = report.backfilled_ids > 0;
                catalog.wreaths = wreaths;
            }
            Err(e) => {
                warn!("Could not load {}: {}", catalog.path.display(), e);
                report.error = Some(e);
            }
        }

        (catalog, report)
    }

    /// Catalog file path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records, in stored order
    #[must_use]
    pub fn wreaths(&self) -> &[Wreath] {
        &self.wreaths
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.wreaths.len()
    }

    /// No records
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.wreaths.is_empty()
    }

    /// Unsaved changes exist
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Append a record. Assigns an id when it has none (or a clashing one)
    /// and folds description hashtags in. Returns the id.
    pub fn add(&mut self, mut wreath: Wreath) -> String {
        if wreath.id.trim().is_empty() || self.get(&wreath.id).is_some() {
            wreath.id = Wreath::generate_id();
        }
        hashtags::process(&mut wreath);
        let id = wreath.id.clone();
        self.wreaths.push(wreath);
        self.dirty = true;
        id
    }

    /// Replace the record with `id`, keeping its id
    pub fn update(&mut self, id: &str, mut wreath: Wreath) -> Result<(), CatalogError> {
        let slot = self
            .wreaths
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))?;
        wreath.id = id.to_string();
        hashtags::process(&mut wreath);
        *slot = wreath;
        self.dirty = true;
        Ok(())
    }

    /// Remove the record with `id`
    pub fn delete(&mut self, id: &str) -> Result<Wreath, CatalogError> {
        let pos = self
            .wreaths
            .iter()
            .position(|w| w.id == id)
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))?;
        self.dirty = true;
        Ok(self.wreaths.remove(pos))
    }

    /// Record by exact id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Wreath> {
        self.wreaths.iter().find(|w| w.id == id)
    }

    /// Mutable record by exact id; marks the catalog changed
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Wreath> {
        let found = self.wreaths.iter_mut().find(|w| w.id == id);
        if found.is_some() {
            self.dirty = true;
        }
        found
    }

    /// Resolve an exact id or a unique id prefix to the full id
    pub fn resolve(&self, query: &str) -> Result<String, CatalogError> {
        let query = query.trim();
        if let Some(w) = self.get(query) {
            return Ok(w.id.clone());
        }
        let matches: Vec<&Wreath> = if query.is_empty() {
            Vec::new()
        } else {
            self.wreaths.iter().filter(|w| w.id.starts_with(query)).collect()
        };
        match matches.as_slice() {
            [one] => Ok(one.id.clone()),
            [] => Err(CatalogError::NotFound(query.to_string())),
            many => Err(CatalogError::Ambiguous(query.to_string(), many.len())),
        }
    }

    /// Filtered, sorted view
    #[must_use]
    pub fn list(&self, filter: &Filter, order: SortOrder) -> Vec<&Wreath> {
        let mut items: Vec<&Wreath> = self.wreaths.iter().filter(|w| filter.matches(w)).collect();
        sort(&mut items, order);
        items
    }

    /// Status counts
    #[must_use]
    pub fn stats(&self) -> CatalogStats {
        CatalogStats {
            total: self.wreaths.len(),
            available: self.wreaths.iter().filter(|w| !w.sold).count(),
            featured: self.wreaths.iter().filter(|w| w.featured).count(),
        }
    }

    /// Pretty JSON of the whole list
    pub fn to_json(&self) -> Result<String, CatalogError> {
        Ok(serde_json::to_string_pretty(&self.wreaths)?)
    }

    /// Write the whole list, backing up the previous file first when the
    /// policy asks for it
    pub fn save(&mut self) -> Result<SaveReport, CatalogError> {
        let mut report = SaveReport::default();

        if self.policy.auto_backup && self.path.exists() {
            match self.create_backup() {
                Ok(path) => report.backup = Some(path),
                Err(e) => {
                    warn!("{}", e);
                    report.backup_warning = Some(e.to_string());
                }
            }
        }

        let mut json = self.to_json()?;
        json.push('\n');
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| CatalogError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&self.path, json).map_err(|source| CatalogError::Write {
            path: self.path.clone(),
            source,
        })?;

        info!("Saved {} wreaths to {}", self.wreaths.len(), self.path.display());
        self.dirty = false;
        report.written = self.wreaths.len();
        Ok(report)
    }

    /// Copy the current file into the backup folder and prune old copies
    pub fn create_backup(&self) -> Result<PathBuf, CatalogError> {
        fs::create_dir_all(&self.backup_dir).map_err(|source| CatalogError::Backup {
            path: self.backup_dir.clone(),
            source,
        })?;

        let stem = self.stem();
        let stamp = Local::now().format(BACKUP_STAMP).to_string();
        let mut target = self.backup_dir.join(format!("{stem}_{stamp}.json"));
        let mut n = 1;
        while target.exists() {
            target = self.backup_dir.join(format!("{stem}_{stamp}_{n}.json"));
            n += 1;
        }

        fs::copy(&self.path, &target).map_err(|source| CatalogError::Backup {
            path: target.clone(),
            source,
        })?;
        info!("Backed up catalog to {}", target.display());

        for removed in self.prune_backups() {
            debug!("Removed old backup {}", removed.display());
        }
        Ok(target)
    }

    /// Recognised backup files, oldest first
    #[must_use]
    pub fn backups(&self) -> Vec<PathBuf> {
        let stem = self.stem();
        let mut found: Vec<(BackupKey, PathBuf)> = WalkDir::new(&self.backup_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let key = e.file_name().to_str().and_then(|n| backup_key(n, &stem))?;
                Some((key, e.into_path()))
            })
            .collect();
        found.sort();
        found.into_iter().map(|(_, path)| path).collect()
    }

    /// Delete the oldest backups beyond the retention count
    pub fn prune_backups(&self) -> Vec<PathBuf> {
        let backups = self.backups();
        let keep = self.policy.keep.max(1);
        let excess = backups.len().saturating_sub(keep);

        let mut removed = Vec::with_capacity(excess);
        for old in backups.into_iter().take(excess) {
            match fs::remove_file(&old) {
                Ok(()) => removed.push(old),
                Err(e) => warn!("Could not remove old backup {}: {}", old.display(), e),
            }
        }
        removed
    }

    fn stem(&self) -> String {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("wreaths")
            .to_string()
    }
}

fn records_from(value: Value) -> Result<Vec<Wreath>, CatalogError> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(_) => return Err(CatalogError::NotAList("object")),
        Value::String(_) => return Err(CatalogError::NotAList("string")),
        Value::Number(_) => return Err(CatalogError::NotAList("number")),
        Value::Bool(_) => return Err(CatalogError::NotAList("boolean")),
        Value::Null => return Err(CatalogError::NotAList("null")),
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, v)| serde_json::from_value(v).map_err(|source| CatalogError::Record { index, source }))
        .collect()
}

/// Creation order of a backup: its timestamp, then its same-second counter
type BackupKey = (NaiveDateTime, u64);

/// `<stem>_<YYYYMMDD_HHMMSS>.json`, optionally with a `_N` same-second suffix
fn backup_key(name: &str, stem: &str) -> Option<BackupKey> {
    let rest = name
        .strip_prefix(stem)
        .and_then(|r| r.strip_prefix('_'))
        .and_then(|r| r.strip_suffix(".json"))?;
    let (stamp, suffix) = (rest.get(..15)?, rest.get(15..)?);
    let when = NaiveDateTime::parse_from_str(stamp, BACKUP_STAMP).ok()?;
    if suffix.is_empty() {
        return Some((when, 0));
    }
    let n = suffix.strip_prefix('_')?;
    if n.is_empty() || !n.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((when, n.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn catalog_in(dir: &TempDir, keep: usize) -> Catalog {
        Catalog::new(
            dir.path().join("wreaths.json"),
            dir.path().join("backups"),
            BackupPolicy { auto_backup: true, keep },
        )
    }

    fn priced(title: &str, price: f64) -> Wreath {
        Wreath { price, ..Wreath::new(title) }
    }

    #[test]
    fn test_missing_file_is_empty_without_error() {
        let dir = TempDir::new().unwrap();
        let (catalog, report) = Catalog::load(dir.path().join("wreaths.json"), dir.path().join("b"), BackupPolicy::default());
        assert!(catalog.is_empty());
        assert!(!report.existed);
        assert!(report.error.is_none());
    }

    #[test]
    fn test_load_backfills_and_extracts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wreaths.json");
        fs::write(&path, r#"[{"title": "Door wreath", "description": "Bright #Summer look"}]"#).unwrap();

        let (catalog, report) = Catalog::load(&path, dir.path().join("backups"), BackupPolicy::default());

        assert!(report.error.is_none());
        assert_eq!(report.backfilled_ids, 1);
        assert!(catalog.is_dirty());
        let w = &catalog.wreaths()[0];
        assert!(!w.id.is_empty());
        assert!(!w.featured);
        assert_eq!(w.hashtags, vec!["summer"]);
    }

    #[test]
    fn test_null_fields_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wreaths.json");
        fs::write(
            &path,
            r#"[{"id": "w1", "title": "Kept"}, {"id": null, "title": "Holly", "images": null, "platforms": null, "dateAdded": null}]"#,
        )
        .unwrap();

        let (catalog, report) = Catalog::load(&path, dir.path().join("backups"), BackupPolicy::default());

        assert!(report.error.is_none());
        assert_eq!(catalog.len(), 2);
        assert_eq!(report.backfilled_ids, 1);
        let holly = &catalog.wreaths()[1];
        assert!(!holly.id.is_empty());
        assert!(holly.images.is_empty());
        assert!(holly.platforms.is_empty());
        assert!(holly.date_added.is_none());
    }

    #[test]
    fn test_non_list_payload_reports_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wreaths.json");
        fs::write(&path, r#"{"wreaths": []}"#).unwrap();

        let (catalog, report) = Catalog::load(&path, dir.path().join("backups"), BackupPolicy::default());

        assert!(catalog.is_empty());
        assert!(matches!(report.error, Some(CatalogError::NotAList("object"))));
    }

    #[test]
    fn test_malformed_record_reports_position() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wreaths.json");
        fs::write(&path, r#"[{"title": "ok"}, {"title": "bad", "images": 5}]"#).unwrap();

        let (catalog, report) = Catalog::load(&path, dir.path().join("backups"), BackupPolicy::default());

        assert!(catalog.is_empty());
        assert!(matches!(report.error, Some(CatalogError::Record { index: 1, .. })));
    }

    #[test]
    fn test_crud() {
        let dir = TempDir::new().unwrap();
        let mut catalog = catalog_in(&dir, 3);

        let id = catalog.add(Wreath { description: "#Rustic".into(), ..Wreath::default() });
        assert_eq!(catalog.get(&id).unwrap().hashtags, vec!["rustic"]);

        catalog.update(&id, Wreath { id: "ignored".into(), ..Wreath::new("Renamed") }).unwrap();
        assert_eq!(catalog.get(&id).unwrap().title, "Renamed");

        let removed = catalog.delete(&id).unwrap();
        assert_eq!(removed.title, "Renamed");
        assert!(matches!(catalog.delete(&id), Err(CatalogError::NotFound(_))));
    }

    #[test]
    fn test_add_replaces_clashing_id() {
        let dir = TempDir::new().unwrap();
        let mut catalog = catalog_in(&dir, 3);
        let first = Wreath { id: "same".into(), ..Wreath::new("A") };
        let second = Wreath { id: "same".into(), ..Wreath::new("B") };

        let a = catalog.add(first);
        let b = catalog.add(second);

        assert_eq!(a, "same");
        assert_ne!(b, "same");
    }

    #[test]
    fn test_resolve_prefix() {
        let dir = TempDir::new().unwrap();
        let mut catalog = catalog_in(&dir, 3);
        catalog.add(Wreath { id: "abc123".into(), ..Wreath::new("A") });
        catalog.add(Wreath { id: "abd456".into(), ..Wreath::new("B") });

        assert_eq!(catalog.resolve("abc").unwrap(), "abc123");
        assert!(matches!(catalog.resolve("ab"), Err(CatalogError::Ambiguous(_, 2))));
        assert!(matches!(catalog.resolve("zz"), Err(CatalogError::NotFound(_))));
    }

    #[test]
    fn test_price_sort_pins_zero() {
        let items = [priced("Free", 0.0), priced("Cheap", 0.01), priced("Dear", 80.0)];
        let mut refs: Vec<&Wreath> = items.iter().collect();

        sort(&mut refs, SortOrder::Price);
        assert_eq!(refs[0].title, "Free");
        assert_eq!(refs[1].title, "Cheap");

        sort(&mut refs, SortOrder::PriceDesc);
        assert_eq!(refs.last().unwrap().title, "Free");
        assert_eq!(refs[0].title, "Dear");
    }

    #[test]
    fn test_local_price_wins() {
        let w = Wreath { local_price: Some(45.0), ..priced("A", 30.0) };
        assert!((w.effective_price() - 45.0).abs() < f64::EPSILON);
        let w = Wreath { local_price: Some(0.0), ..priced("A", 30.0) };
        assert!((w.effective_price() - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_title_sort_ignores_case_and_punctuation() {
        let items = [Wreath::new("\"Zinnia\""), Wreath::new("apple"), Wreath::new("Birch!")];
        let mut refs: Vec<&Wreath> = items.iter().collect();
        sort(&mut refs, SortOrder::Title);
        let titles: Vec<&str> = refs.iter().map(|w| w.title.as_str()).collect();
        assert_eq!(titles, vec!["apple", "Birch!", "\"Zinnia\""]);
    }

    #[test]
    fn test_date_sort_sentinel() {
        let dated = Wreath { date_created: Some("2024-10-01".into()), ..Wreath::new("Dated") };
        let garbage = Wreath { date_created: Some("someday".into()), ..Wreath::new("Garbage") };
        let added = Wreath { date_added: Some("2023-05-05".into()), ..Wreath::new("Added") };
        let items = [dated, garbage, added];
        let mut refs: Vec<&Wreath> = items.iter().collect();

        sort(&mut refs, SortOrder::Date);
        let titles: Vec<&str> = refs.iter().map(|w| w.title.as_str()).collect();
        assert_eq!(titles, vec!["Garbage", "Added", "Dated"]);

        sort(&mut refs, SortOrder::DateDesc);
        assert_eq!(refs.last().unwrap().title, "Garbage");
    }

    #[test]
    fn test_default_sort_featured_first() {
        let items = [Wreath::new("Alpha"), Wreath { featured: true, ..Wreath::new("Zulu") }, Wreath::new("beta")];
        let mut refs: Vec<&Wreath> = items.iter().collect();
        sort(&mut refs, SortOrder::Default);
        let titles: Vec<&str> = refs.iter().map(|w| w.title.as_str()).collect();
        assert_eq!(titles, vec!["Zulu", "Alpha", "beta"]);
    }

    #[test]
    fn test_filter() {
        let dir = TempDir::new().unwrap();
        let mut catalog = catalog_in(&dir, 3);
        catalog.add(Wreath { sold: true, ..Wreath::new("Sold pumpkin") });
        catalog.add(Wreath { featured: true, hashtags: vec!["pumpkin".into()], ..Wreath::new("Harvest") });
        catalog.add(Wreath::new("Snowflake"));

        let search = Filter { search: Some("PUMPKIN".into()), ..Filter::default() };
        assert_eq!(catalog.list(&search, SortOrder::Title).len(), 2);

        let available = Filter { availability: Availability::Available, ..search.clone() };
        assert_eq!(catalog.list(&available, SortOrder::Title)[0].title, "Harvest");

        let not_featured = Filter { featured: FeaturedFilter::Exclude, ..Filter::default() };
        assert_eq!(catalog.list(&not_featured, SortOrder::Title).len(), 2);

        assert_eq!(catalog.stats(), CatalogStats { total: 3, available: 2, featured: 1 });
    }

    #[test]
    fn test_save_writes_pretty_json_and_backs_up() {
        let dir = TempDir::new().unwrap();
        let mut catalog = catalog_in(&dir, 3);
        catalog.add(Wreath::new("First"));

        let report = catalog.save().unwrap();
        assert!(report.backup.is_none(), "nothing to back up on first save");

        catalog.add(Wreath::new("Second"));
        let report = catalog.save().unwrap();
        let backup = report.backup.unwrap();
        assert!(backup.exists());

        let backed_up = fs::read_to_string(backup).unwrap();
        assert!(backed_up.contains("First") && !backed_up.contains("Second"));
        let current = fs::read_to_string(catalog.path()).unwrap();
        assert!(current.contains("\n  {\n    \"id\""));
        assert!(!catalog.is_dirty());
    }

    #[test]
    fn test_backup_retention() {
        let dir = TempDir::new().unwrap();
        let mut catalog = catalog_in(&dir, 3);
        catalog.add(Wreath::new("A"));
        catalog.save().unwrap();

        let backups = dir.path().join("backups");
        fs::create_dir_all(&backups).unwrap();
        for stamp in ["20240101_000000", "20240102_000000", "20240103_000000", "20240104_000000"] {
            fs::write(backups.join(format!("wreaths_{stamp}.json")), "[]").unwrap();
        }
        fs::write(backups.join("notes.txt"), "keep me").unwrap();

        let newest = catalog.create_backup().unwrap();

        let remaining = catalog.backups();
        assert_eq!(remaining.len(), 3);
        assert!(remaining[0].ends_with("wreaths_20240103_000000.json"));
        assert!(remaining[1].ends_with("wreaths_20240104_000000.json"));
        assert_eq!(remaining[2], newest);
        assert!(backups.join("notes.txt").exists());
    }

    #[test]
    fn test_same_second_backups_get_suffix() {
        let dir = TempDir::new().unwrap();
        let mut catalog = catalog_in(&dir, 10);
        catalog.add(Wreath::new("A"));
        catalog.save().unwrap();

        let first = catalog.create_backup().unwrap();
        let second = catalog.create_backup().unwrap();

        assert_ne!(first, second);
        assert_eq!(catalog.backups().len(), 2);
    }

    #[test]
    fn test_backup_name_pattern() {
        assert!(backup_key("wreaths_20250101_120000.json", "wreaths").is_some());
        assert!(backup_key("wreaths_20250101_120000_02.json", "wreaths").is_some());
        assert!(backup_key("wreaths_backup.json", "wreaths").is_none());
        assert!(backup_key("wreaths_20250101_120000_x.json", "wreaths").is_none());
        assert!(backup_key("other_20250101_120000.json", "wreaths").is_none());
    }

    #[test]
    fn test_same_second_suffix_orders_numerically() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog_in(&dir, 200);
        let backups = dir.path().join("backups");
        fs::create_dir_all(&backups).unwrap();
        for name in [
            "wreaths_20250101_120000_100.json",
            "wreaths_20250101_120000_99.json",
            "wreaths_20250101_120000.json",
            "wreaths_20250101_120000_02.json",
            "wreaths_20250101_115959_500.json",
        ] {
            fs::write(backups.join(name), "[]").unwrap();
        }

        let names: Vec<String> = catalog
            .backups()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(
            names,
            vec![
                "wreaths_20250101_115959_500.json",
                "wreaths_20250101_120000.json",
                "wreaths_20250101_120000_02.json",
                "wreaths_20250101_120000_99.json",
                "wreaths_20250101_120000_100.json",
            ]
        );
    }
}

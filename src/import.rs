// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Import pipeline - appends records from externally supplied JSON files
//!
//! Accepted shapes: a list of records, a single record object, or an object
//! wrapping the list as `{"wreaths": [...]}`. A record needs at least a
//! `title` key; anything else is dropped without complaint.

use crate::catalog::Catalog;
use crate::encoding;
use crate::types::Wreath;
use chrono::Local;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// A file that could not be imported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileError {
    /// File path
    pub path: PathBuf,
    /// Reader message
    pub message: String,
}

/// Records taken from one readable file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileImport {
    /// File path
    pub path: PathBuf,
    /// Encoding that decoded it
    pub encoding: String,
    /// Records imported from it
    pub count: usize,
}

/// Outcome of one import run
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    /// Files supplied
    pub files: usize,
    /// Records appended to the catalog
    pub imported: usize,
    /// Per-file successes
    pub imports: Vec<FileImport>,
    /// Per-file failures
    pub errors: Vec<FileError>,
    /// Quarantine copies made of unreadable files
    pub quarantined: Vec<PathBuf>,
}

impl ImportReport {
    /// Files were supplied but nothing was imported
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.files > 0 && self.imported == 0
    }

    /// User-facing summary
    #[must_use]
    pub fn summary(&self) -> String {
        let error_lines = || {
            self.errors
                .iter()
                .map(|e| format!("{}: {}", display_name(&e.path), e.message))
                .collect::<Vec<_>>()
                .join("\n")
        };

        if self.imported > 0 {
            let mut msg = format!("Successfully imported {} wreath(s).", self.imported);
            if !self.errors.is_empty() {
                msg.push_str(&format!("\n\nErrors with {} file(s):\n{}", self.errors.len(), error_lines()));
            }
            msg
        } else if !self.errors.is_empty() {
            format!("Could not import any files:\n\n{}", error_lines())
        } else {
            "No valid wreaths found to import.".to_string()
        }
    }
}

/// Turn a parsed document into import candidates
#[must_use]
pub fn candidates(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            if map.contains_key("title") {
                vec![Value::Object(map)]
            } else {
                match map.remove("wreaths") {
                    Some(Value::Array(items)) => items,
                    _ => Vec::new(),
                }
            }
        }
        _ => Vec::new(),
    }
}

/// A candidate is a record iff it is an object with a `title` key
#[must_use]
pub fn is_valid(candidate: &Value) -> bool {
    candidate.as_object().is_some_and(|o| o.contains_key("title"))
}

/// Valid candidates converted to records; unusable ones are dropped
#[must_use]
pub fn records(value: Value) -> Vec<Wreath> {
    candidates(value)
        .into_iter()
        .filter(is_valid)
        .filter_map(|c| match serde_json::from_value::<Wreath>(c) {
            Ok(w) => Some(w),
            Err(e) => {
                debug!("Dropping import candidate: {}", e);
                None
            }
        })
        .collect()
}

/// Import every file in `paths` into `catalog`.
///
/// Unreadable files are reported and, when `quarantine` is given, copied
/// there for inspection; the remaining files are still processed.
pub fn import_files(paths: &[PathBuf], catalog: &mut Catalog, quarantine: Option<&Path>) -> ImportReport {
    let mut report = ImportReport {
        files: paths.len(),
        ..ImportReport::default()
    };

    for path in paths {
        let doc = match encoding::read_json(path) {
            Ok(doc) => doc,
            Err(e) => {
                warn!("Could not import {}: {}", path.display(), e);
                if let Some(dir) = quarantine {
                    if let Some(copy) = quarantine_copy(path, dir) {
                        report.quarantined.push(copy);
                    }
                }
                report.errors.push(FileError {
                    path: path.clone(),
                    message: e.to_string(),
                });
                continue;
            }
        };

        let found = records(doc.value);
        let count = found.len();
        for wreath in found {
            catalog.add(wreath);
        }
        info!("Imported {} wreaths from {} ({})", count, path.display(), doc.encoding);

        report.imported += count;
        report.imports.push(FileImport {
            path: path.clone(),
            encoding: doc.encoding.label().into_owned(),
            count,
        });
    }

    report
}

/// `*.json` files directly inside `dir`, sorted by name
#[must_use]
pub fn scan_dir(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|p| p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")))
        .collect();
    files.sort();
    files
}

fn quarantine_copy(path: &Path, dir: &Path) -> Option<PathBuf> {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let target = dir.join(format!("failed_import_{stamp}_{}", display_name(path)));
    let copied = fs::create_dir_all(dir).and_then(|()| fs::copy(path, &target));
    match copied {
        Ok(_) => Some(target),
        Err(e) => {
            debug!("Could not quarantine {}: {}", path.display(), e);
            None
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::BackupPolicy;
    use serde_json::json;
    use tempfile::TempDir;

    fn empty_catalog(dir: &TempDir) -> Catalog {
        Catalog::new(dir.path().join("wreaths.json"), dir.path().join("backups"), BackupPolicy::default())
    }

    fn write(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_candidate_shapes() {
        assert_eq!(candidates(json!([{"title": "a"}, 3])).len(), 2);
        assert_eq!(candidates(json!({"title": "single"})).len(), 1);
        assert_eq!(candidates(json!({"wreaths": [{"title": "x"}, {"title": "y"}]})).len(), 2);
        assert!(candidates(json!({"wreaths": "nope"})).is_empty());
        assert!(candidates(json!("text")).is_empty());
    }

    #[test]
    fn test_title_presence_is_the_only_check() {
        assert!(is_valid(&json!({"title": ""})));
        assert!(is_valid(&json!({"title": null})));
        assert!(!is_valid(&json!({"name": "x"})));
        assert!(!is_valid(&json!(["title"])));
    }

    #[test]
    fn test_mixed_list_imports_titled_records() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "mixed.json", br#"[{"title": "A"}, {"notitle": "B"}, {"title": "C"}]"#);
        let mut catalog = empty_catalog(&dir);

        let report = import_files(&[path], &mut catalog, None);

        assert_eq!(report.imported, 2);
        let titles: Vec<&str> = catalog.wreaths().iter().map(|w| w.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "C"]);
        assert!(catalog.wreaths().iter().all(|w| !w.id.is_empty() && !w.featured));
        assert_eq!(report.summary(), "Successfully imported 2 wreath(s).");
    }

    #[test]
    fn test_wrapped_list() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "wrapped.json", br##"{"wreaths": [{"title": "X", "description": "#Wreath"}]}"##);
        let mut catalog = empty_catalog(&dir);

        let report = import_files(&[path], &mut catalog, None);

        assert_eq!(report.imported, 1);
        assert_eq!(catalog.wreaths()[0].hashtags, vec!["wreath"]);
        assert_eq!(report.imports[0].encoding, "utf-8");
    }

    #[test]
    fn test_existing_id_kept() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "one.json", br#"{"title": "Kept", "id": "w-1", "featured": true}"#);
        let mut catalog = empty_catalog(&dir);

        import_files(&[path], &mut catalog, None);

        let w = catalog.get("w-1").unwrap();
        assert!(w.featured);
    }

    #[test]
    fn test_null_fields_do_not_drop_titled_records() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "nulls.json",
            br#"[
                {"title": "A", "images": null, "platforms": null, "id": null},
                {"title": "B", "id": 42, "dateCreated": 20240101, "category": null, "images": ["x.jpg", null, 3]}
            ]"#,
        );
        let mut catalog = empty_catalog(&dir);

        let report = import_files(&[path], &mut catalog, None);

        assert_eq!(report.imported, 2);
        let a = &catalog.wreaths()[0];
        assert!(a.images.is_empty());
        assert!(a.platforms.is_empty());
        assert!(!a.id.is_empty());
        let b = catalog.get("42").unwrap();
        assert_eq!(b.images, vec!["x.jpg"]);
        assert_eq!(b.date_created.as_deref(), Some("20240101"));
        assert!(b.category.is_none());
    }

    #[test]
    fn test_bad_file_does_not_stop_others() {
        let dir = TempDir::new().unwrap();
        let bad = write(&dir, "bad.json", b"{oops");
        let good = write(&dir, "good.json", br#"[{"title": "Fine"}]"#);
        let quarantine = dir.path().join("encoding_backups");
        let mut catalog = empty_catalog(&dir);

        let report = import_files(&[bad.clone(), good], &mut catalog, Some(&quarantine));

        assert_eq!(report.imported, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].path, bad);
        assert_eq!(report.quarantined.len(), 1);
        assert!(report.quarantined[0].exists());
        assert!(!report.is_failure());
        assert!(report.summary().contains("Errors with 1 file(s):\nbad.json: JSON parsing error"));
    }

    #[test]
    fn test_nothing_imported_is_failure() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "empty.json", br#"[{"name": "untitled"}]"#);
        let mut catalog = empty_catalog(&dir);

        let report = import_files(&[path], &mut catalog, None);

        assert!(report.is_failure());
        assert_eq!(report.summary(), "No valid wreaths found to import.");
        assert!(!import_files(&[], &mut catalog, None).is_failure());
    }

    #[test]
    fn test_scan_dir_only_json() {
        let dir = TempDir::new().unwrap();
        write(&dir, "b.json", b"[]");
        write(&dir, "a.JSON", b"[]");
        write(&dir, "notes.txt", b"");

        let names: Vec<String> = scan_dir(dir.path())
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.JSON", "b.json"]);
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Hashtag extraction from item descriptions
//!
//! Tags are stored lowercase, without the `#`, in first-seen order. The
//! description text itself is left untouched.

use crate::types::Wreath;
use once_cell::sync::Lazy;
use regex::Regex;

static HASHTAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"#(\w+)").expect("valid hashtag pattern"));

/// Normalize a tag for storage: trimmed, no leading `#`, lowercase
#[must_use]
pub fn normalize(tag: &str) -> Option<String> {
    let tag = tag.trim().trim_start_matches('#').trim();
    (!tag.is_empty()).then(|| tag.to_lowercase())
}

/// Extract the distinct tags in `text`, lowercased, in first-seen order
#[must_use]
pub fn extract(text: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for cap in HASHTAG.captures_iter(text) {
        let tag = cap[1].to_lowercase();
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

/// Union of `existing` and `new`: existing order first, no duplicates
#[must_use]
pub fn merge(existing: &[String], new: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(existing.len() + new.len());
    for tag in existing.iter().chain(new) {
        if let Some(tag) = normalize(tag) {
            if !merged.contains(&tag) {
                merged.push(tag);
            }
        }
    }
    merged
}

/// Fold the description's tags into the record's tag list.
/// Returns how many tags were added.
pub fn process(wreath: &mut Wreath) -> usize {
    let found = extract(&wreath.description);
    let before = merge(&wreath.hashtags, &[]);
    let merged = merge(&before, &found);
    let added = merged.len() - before.len();
    wreath.hashtags = merged;
    added
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_lowercases_and_dedupes() {
        let tags = extract("Fall #Autumn wreath with #PUMPKINS and #autumn leaves #fall2024");
        assert_eq!(tags, vec!["autumn", "pumpkins", "fall2024"]);
    }

    #[test]
    fn test_extract_unicode_word() {
        assert_eq!(extract("#Noël #décor"), vec!["noël", "décor"]);
    }

    #[test]
    fn test_lone_hash_ignored() {
        assert!(extract("Price # 5 and ## nothing").is_empty());
    }

    #[test]
    fn test_process_merges_after_existing() {
        let mut w = Wreath::new("Harvest");
        w.hashtags = vec!["Door".into(), "fall".into()];
        w.description = "Warm #Fall colors #harvest".into();

        let added = process(&mut w);

        assert_eq!(added, 1);
        assert_eq!(w.hashtags, vec!["door", "fall", "harvest"]);
        assert_eq!(w.description, "Warm #Fall colors #harvest");
    }

    #[test]
    fn test_process_is_idempotent() {
        let mut w = Wreath::new("Spring");
        w.description = "#tulips #spring".into();
        process(&mut w);
        assert_eq!(process(&mut w), 0);
        assert_eq!(w.hashtags.len(), 2);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(" #Wreath "), Some("wreath".into()));
        assert_eq!(normalize("#"), None);
    }
}

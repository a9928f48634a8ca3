// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Wreathkeeper library - inventory catalog for a handmade wreath shop
//!
//! This crate provides the catalog store, the import and deploy pipelines,
//! and the helpers they share (encoding-tolerant JSON reading, hashtag
//! extraction, image fetching).

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod config;
pub mod deploy;
pub mod encoding;
pub mod hashtags;
pub mod images;
pub mod import;
pub mod project;

/// Core data types for catalog records
pub mod types {
    use chrono::NaiveDate;
    use serde::{Deserialize, Serialize};
    use serde_json::{Map, Value};

    /// Date used for records whose creation date is missing or unparseable.
    /// Sorts before every real date.
    pub const SENTINEL_DATE: (i32, u32, u32) = (1900, 1, 1);

    // =========================================================================
    // Wreath (catalog record)
    // =========================================================================

    /// One catalog item
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Wreath {
        /// Opaque unique identifier, assigned once and never changed
        #[serde(default, deserialize_with = "lenient::string")]
        pub id: String,
        /// Display name
        #[serde(default, deserialize_with = "lenient::string")]
        pub title: String,
        /// Listed price
        #[serde(default, deserialize_with = "lenient::price")]
        pub price: f64,
        /// Price shown on the website; wins over `price` when non-zero
        #[serde(
            default,
            skip_serializing_if = "Option::is_none",
            deserialize_with = "lenient::optional_price"
        )]
        pub local_price: Option<f64>,
        /// No longer available
        #[serde(default, deserialize_with = "lenient::flag")]
        pub sold: bool,
        /// Promoted in the default ordering
        #[serde(default, deserialize_with = "lenient::flag")]
        pub featured: bool,
        /// Lowercase tags without the leading `#`
        #[serde(default, deserialize_with = "lenient::hashtags")]
        pub hashtags: Vec<String>,
        /// Free text; may contain `#tag` tokens
        #[serde(default, deserialize_with = "lenient::string")]
        pub description: String,
        /// Image URLs; the first one is the thumbnail
        #[serde(default, deserialize_with = "lenient::url_list")]
        pub images: Vec<String>,
        /// Creation date (`YYYY-MM-DD`)
        #[serde(
            default,
            skip_serializing_if = "Option::is_none",
            deserialize_with = "lenient::optional_string"
        )]
        pub date_created: Option<String>,
        /// Date the item was listed (`YYYY-MM-DD`)
        #[serde(
            default,
            skip_serializing_if = "Option::is_none",
            deserialize_with = "lenient::optional_string"
        )]
        pub date_added: Option<String>,
        /// Free-form category (holiday, everyday, ...)
        #[serde(
            default,
            skip_serializing_if = "Option::is_none",
            deserialize_with = "lenient::optional_string"
        )]
        pub category: Option<String>,
        /// Marketplace name to listing URL
        #[serde(
            default,
            skip_serializing_if = "Map::is_empty",
            deserialize_with = "lenient::object"
        )]
        pub platforms: Map<String, Value>,
        /// Fields this tool does not know about, kept verbatim
        #[serde(flatten)]
        pub extra: Map<String, Value>,
    }

    impl Default for Wreath {
        fn default() -> Self {
            Self {
                id: String::new(),
                title: String::new(),
                price: 0.0,
                local_price: None,
                sold: false,
                featured: false,
                hashtags: Vec::new(),
                description: String::new(),
                images: Vec::new(),
                date_created: None,
                date_added: None,
                category: None,
                platforms: Map::new(),
                extra: Map::new(),
            }
        }
    }

    impl Wreath {
        /// Create a record with a fresh id
        #[must_use]
        pub fn new(title: impl Into<String>) -> Self {
            Self {
                id: Self::generate_id(),
                title: title.into(),
                ..Self::default()
            }
        }

        /// Generate a fresh record id
        #[must_use]
        pub fn generate_id() -> String {
            uuid::Uuid::new_v4().to_string()
        }

        /// The image shown wherever a single picture is needed
        #[must_use]
        pub fn thumbnail(&self) -> Option<&str> {
            self.images.first().map(String::as_str)
        }

        /// Price used for display and sorting
        #[must_use]
        pub fn effective_price(&self) -> f64 {
            match self.local_price {
                Some(p) if p > 0.0 => p,
                _ => self.price,
            }
        }

        /// Creation date, falling back to the listing date, then to 1900-01-01
        #[must_use]
        pub fn created_on(&self) -> NaiveDate {
            self.date_created
                .as_deref()
                .and_then(parse_date)
                .or_else(|| self.date_added.as_deref().and_then(parse_date))
                .unwrap_or_else(sentinel_date)
        }

        /// Move an image to a new position; the item at `to` shifts over
        pub fn move_image(&mut self, from: usize, to: usize) -> bool {
            if from >= self.images.len() || to >= self.images.len() {
                return false;
            }
            let url = self.images.remove(from);
            self.images.insert(to, url);
            true
        }

        /// Insert an image at `at`, or append when `at` is `None` or past the end
        pub fn insert_image(&mut self, url: impl Into<String>, at: Option<usize>) {
            let url = url.into();
            match at {
                Some(i) if i < self.images.len() => self.images.insert(i, url),
                _ => self.images.push(url),
            }
        }

        /// Remove the image at `index`
        pub fn remove_image(&mut self, index: usize) -> Option<String> {
            (index < self.images.len()).then(|| self.images.remove(index))
        }
    }

    /// Parse the date formats the catalog has used over time
    #[must_use]
    pub fn parse_date(s: &str) -> Option<NaiveDate> {
        let s = s.trim();
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%Y"))
            .ok()
    }

    /// 1900-01-01
    #[must_use]
    pub fn sentinel_date() -> NaiveDate {
        let (y, m, d) = SENTINEL_DATE;
        NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN)
    }

    /// Deserializers that accept the loose shapes found in hand-edited files
    mod lenient {
        use serde::de::{Deserializer, Error};
        use serde::Deserialize;
        use serde_json::{Map, Value};

        pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
            match Value::deserialize(d)? {
                Value::Null => Ok(String::new()),
                Value::String(s) => Ok(s),
                Value::Number(n) => Ok(n.to_string()),
                Value::Bool(b) => Ok(b.to_string()),
                other => Err(D::Error::custom(format!("expected text, found {other}"))),
            }
        }

        pub fn optional_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
            match Value::deserialize(d)? {
                Value::Null => Ok(None),
                Value::String(s) => Ok(Some(s)),
                Value::Number(n) => Ok(Some(n.to_string())),
                other => Err(D::Error::custom(format!("expected text, found {other}"))),
            }
        }

        pub fn url_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
            match Value::deserialize(d)? {
                Value::Null => Ok(Vec::new()),
                Value::String(s) if s.trim().is_empty() => Ok(Vec::new()),
                Value::String(s) => Ok(vec![s]),
                Value::Array(items) => Ok(items
                    .into_iter()
                    .filter_map(|v| match v {
                        Value::String(s) if !s.trim().is_empty() => Some(s),
                        _ => None,
                    })
                    .collect()),
                other => Err(D::Error::custom(format!("expected a list of URLs, found {other}"))),
            }
        }

        pub fn object<'de, D: Deserializer<'de>>(d: D) -> Result<Map<String, Value>, D::Error> {
            match Value::deserialize(d)? {
                Value::Null => Ok(Map::new()),
                Value::Object(map) => Ok(map),
                other => Err(D::Error::custom(format!("expected an object, found {other}"))),
            }
        }

        fn price_value<E: Error>(v: &Value) -> Result<Option<f64>, E> {
            let p = match v {
                Value::Null => return Ok(None),
                Value::Number(n) => n.as_f64(),
                Value::String(s) if s.trim().is_empty() => return Ok(None),
                Value::String(s) => s.trim().trim_start_matches('$').replace(',', "").parse().ok(),
                _ => None,
            };
            match p {
                Some(p) if p.is_finite() && p >= 0.0 => Ok(Some(p)),
                _ => Err(E::custom(format!("invalid price: {v}"))),
            }
        }

        pub fn price<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
            let v = Value::deserialize(d)?;
            Ok(price_value::<D::Error>(&v)?.unwrap_or(0.0))
        }

        pub fn optional_price<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
            let v = Value::deserialize(d)?;
            price_value::<D::Error>(&v)
        }

        pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
            match Value::deserialize(d)? {
                Value::Null => Ok(false),
                Value::Bool(b) => Ok(b),
                Value::Number(n) => Ok(n.as_f64().is_some_and(|n| n != 0.0)),
                Value::String(s) => match s.trim().to_lowercase().as_str() {
                    "true" | "yes" | "1" => Ok(true),
                    "false" | "no" | "0" | "" => Ok(false),
                    _ => Err(D::Error::custom(format!("expected true/false, found {s:?}"))),
                },
                other => Err(D::Error::custom(format!("expected true/false, found {other}"))),
            }
        }

        pub fn hashtags<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
            let raw: Vec<String> = match Value::deserialize(d)? {
                Value::Null => Vec::new(),
                Value::String(s) => s.split(',').map(str::to_string).collect(),
                Value::Array(items) => items
                    .into_iter()
                    .filter_map(|v| match v {
                        Value::String(s) => Some(s),
                        _ => None,
                    })
                    .collect(),
                other => return Err(D::Error::custom(format!("expected tag list, found {other}"))),
            };
            Ok(crate::hashtags::merge(&raw, &[]))
        }
    }
}

/// Prelude for common imports
pub mod prelude {
    pub use crate::types::*;
    pub use anyhow::{Context, Result};
}

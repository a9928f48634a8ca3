// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Image fetching for record thumbnails
//!
//! Downloads are checked for a known image signature and cached on disk
//! under the SHA-256 of their URL. URLs that failed once are remembered by
//! the fetcher and not requested again until the set is cleared.

use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Image fetch failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    /// URL failed before and is not retried
    #[error("skipping previously failed image {0}")]
    KnownBad(String),
    /// Not an http(s) URL
    #[error("not a web URL: {0}")]
    InvalidUrl(String),
    /// Server answered with an error status
    #[error("{url} returned HTTP {status}")]
    Http {
        /// Requested URL
        url: String,
        /// HTTP status
        status: u16,
    },
    /// Request failed or timed out
    #[error("could not download {url}: {message}")]
    Transport {
        /// Requested URL
        url: String,
        /// Client message
        message: String,
    },
    /// Payload has no recognised image signature
    #[error("{0} is not an image")]
    NotAnImage(String),
}

/// Recognised image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// PNG
    Png,
    /// JPEG
    Jpeg,
    /// GIF
    Gif,
    /// WebP
    WebP,
    /// BMP
    Bmp,
}

impl ImageKind {
    /// Identify an image from its leading bytes
    #[must_use]
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(Self::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(Self::Gif)
        } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(Self::WebP)
        } else if bytes.starts_with(b"BM") && bytes.len() > 14 {
            Some(Self::Bmp)
        } else {
            None
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Gif => "gif",
            Self::WebP => "webp",
            Self::Bmp => "bmp",
        })
    }
}

/// Where image bytes come from
pub trait ImageSource: Send + Sync {
    /// Raw bytes at `url`
    fn fetch(&self, url: &str) -> Result<Vec<u8>, ImageError>;
}

/// Downloads over HTTP
pub struct HttpImageSource {
    client: reqwest::blocking::Client,
}

impl HttpImageSource {
    /// Client with a 10 second timeout
    pub fn new() -> Result<Self, ImageError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("wreathkeeper/", env!("CARGO_PKG_VERSION")))
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| ImageError::Transport {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

impl ImageSource for HttpImageSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, ImageError> {
        let transport = |e: reqwest::Error| ImageError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };
        let response = self.client.get(url).send().map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ImageError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.bytes().map_err(transport)?.to_vec())
    }
}

/// URLs that failed to load
#[derive(Debug, Clone, Default)]
pub struct FailedUrls {
    urls: HashSet<String>,
}

impl FailedUrls {
    /// Empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `url` failed before
    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Remember a failure
    pub fn record(&mut self, url: impl Into<String>) {
        self.urls.insert(url.into());
    }

    /// Forget all failures
    pub fn clear(&mut self) {
        self.urls.clear();
    }

    /// Number of failed URLs
    #[must_use]
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// No failures recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// A verified image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    /// Source URL
    pub url: String,
    /// Detected format
    pub kind: ImageKind,
    /// Image bytes
    pub bytes: Vec<u8>,
    /// Served from the disk cache
    pub cached: bool,
}

/// Fetches images, remembering failures and caching successes
pub struct ImageFetcher {
    source: Arc<dyn ImageSource>,
    failed: FailedUrls,
    cache_dir: Option<PathBuf>,
}

impl ImageFetcher {
    /// Fetcher over `source`, without a disk cache
    #[must_use]
    pub fn new(source: Arc<dyn ImageSource>) -> Self {
        Self {
            source,
            failed: FailedUrls::new(),
            cache_dir: None,
        }
    }

    /// Cache downloads in `dir`
    #[must_use]
    pub fn with_cache(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Failed URLs so far
    #[must_use]
    pub fn failed(&self) -> &FailedUrls {
        &self.failed
    }

    /// Allow failed URLs to be tried again
    pub fn forget_failures(&mut self) {
        self.failed.clear();
    }

    /// Fetch one image
    pub fn fetch(&mut self, url: &str) -> Result<FetchedImage, ImageError> {
        if self.failed.contains(url) {
            return Err(ImageError::KnownBad(url.to_string()));
        }
        let result = load(self.source.as_ref(), self.cache_dir.as_deref(), url);
        if result.is_err() {
            self.failed.record(url);
        }
        result
    }

    /// Fetch many images concurrently, one worker per URL. Results come
    /// back in input order.
    pub fn fetch_all(&mut self, urls: &[String]) -> Vec<(String, Result<FetchedImage, ImageError>)> {
        let mut results: Vec<Option<Result<FetchedImage, ImageError>>> = vec![None; urls.len()];
        let (tx, rx) = mpsc::channel();

        for (index, url) in urls.iter().enumerate() {
            if self.failed.contains(url) {
                results[index] = Some(Err(ImageError::KnownBad(url.clone())));
                continue;
            }
            let tx = tx.clone();
            let source = Arc::clone(&self.source);
            let cache_dir = self.cache_dir.clone();
            let url = url.clone();
            thread::spawn(move || {
                let result = load(source.as_ref(), cache_dir.as_deref(), &url);
                let _ = tx.send((index, result));
            });
        }
        drop(tx);

        for (index, result) in rx {
            if result.is_err() {
                self.failed.record(urls[index].clone());
            }
            results[index] = Some(result);
        }

        urls.iter()
            .cloned()
            .zip(results)
            .map(|(url, result)| {
                let result = result.unwrap_or_else(|| {
                    Err(ImageError::Transport {
                        url: url.clone(),
                        message: "worker stopped unexpectedly".into(),
                    })
                });
                (url, result)
            })
            .collect()
    }
}

/// Cache file name for `url`
#[must_use]
pub fn cache_name(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}

fn load(source: &dyn ImageSource, cache_dir: Option<&Path>, url: &str) -> Result<FetchedImage, ImageError> {
    let trimmed = url.trim();
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ImageError::InvalidUrl(url.to_string()));
    }

    let cache_file = cache_dir.map(|d| d.join(cache_name(trimmed)));
    if let Some(path) = &cache_file {
        if let Ok(bytes) = fs::read(path) {
            if let Some(kind) = ImageKind::sniff(&bytes) {
                debug!("Image cache hit for {}", url);
                return Ok(FetchedImage {
                    url: url.to_string(),
                    kind,
                    bytes,
                    cached: true,
                });
            }
        }
    }

    let bytes = source.fetch(trimmed)?;
    let kind = ImageKind::sniff(&bytes).ok_or_else(|| ImageError::NotAnImage(url.to_string()))?;

    if let Some(path) = &cache_file {
        let written = path
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|()| fs::write(path, &bytes));
        if let Err(e) = written {
            warn!("Could not cache {}: {}", url, e);
        }
    }

    Ok(FetchedImage {
        url: url.to_string(),
        kind,
        bytes,
        cached: false,
    })
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Encoding-tolerant JSON file reading
//!
//! Older catalog and import files were written by tools that did not always
//! use UTF-8. Each candidate encoding is tried in turn; the first one that
//! decodes the bytes wins, and a JSON syntax error after a clean decode is
//! final.

use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Candidate text encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// Strict UTF-8 without a byte-order mark
    Utf8,
    /// UTF-8 with an optional leading byte-order mark
    Utf8Sig,
    /// Windows-1252
    Cp1252,
    /// ISO-8859-1; maps every byte
    Latin1,
    /// 7-bit ASCII
    Ascii,
    /// Encoding guessed from the file contents
    Detected(&'static encoding_rs::Encoding),
}

/// Fixed fallback list, tried after any detected encoding
pub const FALLBACK_ENCODINGS: [TextEncoding; 5] = [
    TextEncoding::Utf8,
    TextEncoding::Utf8Sig,
    TextEncoding::Cp1252,
    TextEncoding::Latin1,
    TextEncoding::Ascii,
];

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Bytes Windows-1252 leaves unassigned
const CP1252_UNDEFINED: [u8; 5] = [0x81, 0x8D, 0x8F, 0x90, 0x9D];

impl TextEncoding {
    /// Label reported to the user
    #[must_use]
    pub fn label(&self) -> Cow<'static, str> {
        match self {
            Self::Utf8 => "utf-8".into(),
            Self::Utf8Sig => "utf-8-sig".into(),
            Self::Cp1252 => "cp1252".into(),
            Self::Latin1 => "iso-8859-1".into(),
            Self::Ascii => "ascii".into(),
            Self::Detected(enc) => enc.name().to_lowercase().into(),
        }
    }

    /// Decode `bytes`, or explain why they are not valid in this encoding
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Result<Cow<'a, str>, String> {
        match self {
            Self::Utf8 => {
                if bytes.starts_with(UTF8_BOM) {
                    return Err("unexpected byte-order mark".into());
                }
                std::str::from_utf8(bytes).map(Cow::Borrowed).map_err(|e| e.to_string())
            }
            Self::Utf8Sig => {
                let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                std::str::from_utf8(body).map(Cow::Borrowed).map_err(|e| e.to_string())
            }
            Self::Cp1252 => {
                if let Some(pos) = bytes.iter().position(|b| CP1252_UNDEFINED.contains(b)) {
                    return Err(format!("undefined byte 0x{:02x} at position {pos}", bytes[pos]));
                }
                Ok(encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes).0)
            }
            Self::Latin1 => Ok(Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect())),
            Self::Ascii => match bytes.iter().position(|b| !b.is_ascii()) {
                Some(pos) => Err(format!("non-ASCII byte 0x{:02x} at position {pos}", bytes[pos])),
                None => std::str::from_utf8(bytes).map(Cow::Borrowed).map_err(|e| e.to_string()),
            },
            Self::Detected(enc) => enc
                .decode_without_bom_handling_and_without_replacement(bytes)
                .ok_or_else(|| format!("malformed {} sequence", enc.name())),
        }
    }

    fn covers(&self, enc: &'static encoding_rs::Encoding) -> bool {
        match self {
            Self::Utf8 | Self::Utf8Sig => enc == encoding_rs::UTF_8,
            Self::Cp1252 | Self::Latin1 | Self::Ascii => enc == encoding_rs::WINDOWS_1252,
            Self::Detected(other) => *other == enc,
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// A parsed document and the encoding that decoded it
#[derive(Debug, Clone)]
pub struct JsonDocument {
    /// Parsed JSON
    pub value: Value,
    /// Encoding that worked
    pub encoding: TextEncoding,
}

/// Failure to read a JSON file
#[derive(Debug, Error)]
pub enum ReadError {
    /// File could not be read at all
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// Text decoded but is not valid JSON
    #[error("JSON parsing error with {encoding}: {source}")]
    Json {
        /// Encoding that decoded the text
        encoding: TextEncoding,
        /// Parser error
        #[source]
        source: serde_json::Error,
    },
    /// No candidate encoding could decode the bytes
    #[error("could not decode file with any of: {} (last error: {last})", tried.join(", "))]
    Undecodable {
        /// Labels of the encodings tried, in order
        tried: Vec<String>,
        /// Message from the last attempt
        last: String,
    },
}

/// Guess the encoding of `bytes`
#[must_use]
pub fn detect(bytes: &[u8]) -> &'static encoding_rs::Encoding {
    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, true)
}

/// Candidate list for `bytes`: the detected encoding when the fixed list
/// does not already cover it, then the fixed list
#[must_use]
pub fn candidates_for(bytes: &[u8]) -> Vec<TextEncoding> {
    let guessed = detect(bytes);
    let mut list = Vec::with_capacity(FALLBACK_ENCODINGS.len() + 1);
    if !FALLBACK_ENCODINGS.iter().any(|c| c.covers(guessed)) {
        list.push(TextEncoding::Detected(guessed));
    }
    list.extend(FALLBACK_ENCODINGS);
    list
}

/// Read and parse a JSON file, trying the detected and fallback encodings
pub fn read_json(path: &Path) -> Result<JsonDocument, ReadError> {
    let bytes = read_bytes(path)?;
    parse_bytes(&bytes, &candidates_for(&bytes))
}

/// Read and parse a JSON file with an explicit candidate list
pub fn read_json_with(path: &Path, candidates: &[TextEncoding]) -> Result<JsonDocument, ReadError> {
    let bytes = read_bytes(path)?;
    parse_bytes(&bytes, candidates)
}

/// Decode and parse in-memory bytes
pub fn parse_bytes(bytes: &[u8], candidates: &[TextEncoding]) -> Result<JsonDocument, ReadError> {
    let mut last = String::from("no encodings to try");

    for &encoding in candidates {
        let text = match encoding.decode(bytes) {
            Ok(text) => text,
            Err(e) => {
                debug!("Decode with {} failed: {}", encoding, e);
                last = format!("{encoding}: {e}");
                continue;
            }
        };

        return serde_json::from_str(&text)
            .map(|value| JsonDocument { value, encoding })
            .map_err(|source| ReadError::Json { encoding, source });
    }

    Err(ReadError::Undecodable {
        tried: candidates.iter().map(|c| c.label().into_owned()).collect(),
        last,
    })
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, ReadError> {
    fs::read(path).map_err(|source| ReadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_plain_utf8() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.json", "[{\"title\": \"Café\"}]".as_bytes());

        let doc = read_json_with(&path, &FALLBACK_ENCODINGS).unwrap();
        assert_eq!(doc.encoding, TextEncoding::Utf8);
        assert_eq!(doc.value[0]["title"], "Café");
    }

    #[test]
    fn test_bom_falls_through_to_utf8_sig() {
        let dir = TempDir::new().unwrap();
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"{\"title\": \"Bow\"}");
        let path = write(&dir, "bom.json", &bytes);

        let doc = read_json_with(&path, &FALLBACK_ENCODINGS).unwrap();
        assert_eq!(doc.encoding, TextEncoding::Utf8Sig);
        assert_eq!(doc.value["title"], "Bow");
    }

    #[test]
    fn test_cp1252_bytes() {
        let dir = TempDir::new().unwrap();
        // 0x93/0x94 are curly quotes in cp1252 and invalid as UTF-8
        let path = write(&dir, "legacy.json", b"[{\"title\": \"\x93Fall\x94 wreath\"}]");

        let doc = read_json_with(&path, &FALLBACK_ENCODINGS).unwrap();
        assert_eq!(doc.encoding.label(), "cp1252");
        assert_eq!(doc.value[0]["title"], "\u{201c}Fall\u{201d} wreath");
    }

    #[test]
    fn test_undefined_cp1252_byte_uses_latin1() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "odd.json", b"{\"title\": \"a\x81b\"}");

        let doc = read_json_with(&path, &FALLBACK_ENCODINGS).unwrap();
        assert_eq!(doc.encoding, TextEncoding::Latin1);
    }

    #[test]
    fn test_json_error_is_final() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "bad.json", b"[{\"title\": ");

        let err = read_json(&path).unwrap_err();
        assert!(matches!(err, ReadError::Json { encoding: TextEncoding::Utf8, .. }));
        assert!(err.to_string().contains("JSON parsing error with utf-8"));
    }

    #[test]
    fn test_undecodable_lists_encodings() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "bin.json", b"[\xff]");

        let err = read_json_with(&path, &[TextEncoding::Utf8, TextEncoding::Ascii]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("utf-8, ascii"), "{msg}");
    }

    #[test]
    fn test_missing_file() {
        let err = read_json(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, ReadError::Io { .. }));
    }

    #[test]
    fn test_detected_candidate_not_duplicated() {
        let list = candidates_for(b"[{\"title\": \"plain ascii\"}]");
        assert_eq!(&list[list.len() - 5..], &FALLBACK_ENCODINGS);
        assert!(list.len() <= 6);
    }
}

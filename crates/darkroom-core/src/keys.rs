//! Object key codec.
//!
//! Every artifact belonging to one uploaded image is addressed by the same
//! `{directory}/{slug}{ext}` triple:
//!
//! ```text
//! staging/{slug}.{ext}               uploaded source
//! {YYYY}/{slug}.{ext}                published source
//! {dir}/{slug}_tile_w{width}.{ext}   tile derivative
//! {dir}/{slug}_blur.{ext}            blur placeholder
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Extensions accepted for uploaded images (compared case-insensitively).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "tif", "tiff"];

/// Reasons an object key is unusable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("key is empty")]
    Empty,

    #[error("key has no file component")]
    NoFileName,

    #[error("file name has no extension")]
    NoExtension,

    #[error("unsupported extension {0:?}")]
    UnsupportedExtension(String),

    #[error("base name {0:?} is not a valid slug")]
    InvalidSlug(String),

    #[error("key is not under the {0:?} prefix")]
    OutsidePrefix(String),
}

/// The decoded parts of an object key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectKeyParts {
    /// Directory without leading/trailing slashes; empty for root-level keys
    pub directory: String,
    /// File name including extension, e.g. `"{slug}.jpg"`
    pub file_name: String,
    /// Extension with its leading dot, as written in the key (e.g. `".jpg"`)
    pub extension: String,
    /// Content-identifying slug, the join key with the image record
    pub slug: String,
}

impl ObjectKeyParts {
    /// Parse an object key, optionally stripping a leading bucket segment.
    pub fn parse(key: &str, bucket: Option<&str>) -> Result<Self, KeyError> {
        let mut path = key.trim_start_matches('/');
        if let Some(bucket) = bucket.filter(|b| !b.is_empty()) {
            if let Some(rest) = path
                .strip_prefix(bucket)
                .and_then(|rest| rest.strip_prefix('/'))
            {
                path = rest;
            }
        }
        if path.is_empty() {
            return Err(KeyError::Empty);
        }

        let (directory, file_name) = match path.rsplit_once('/') {
            Some((dir, file)) => (dir.trim_end_matches('/'), file),
            None => ("", path),
        };
        if file_name.is_empty() {
            return Err(KeyError::NoFileName);
        }

        let (base, ext) = match file_name.rsplit_once('.') {
            Some((base, ext)) if !ext.is_empty() => (base, ext),
            _ => return Err(KeyError::NoExtension),
        };
        if !is_supported_extension(ext) {
            return Err(KeyError::UnsupportedExtension(ext.to_string()));
        }
        if !is_valid_slug(base) {
            return Err(KeyError::InvalidSlug(base.to_string()));
        }

        Ok(Self {
            directory: directory.to_string(),
            file_name: file_name.to_string(),
            extension: format!(".{ext}"),
            slug: base.to_string(),
        })
    }

    /// Reconstruct `{directory}/{slug}{ext}`.
    pub fn object_key(&self) -> String {
        join_key(&self.directory, &format!("{}{}", self.slug, self.extension))
    }

    /// Key of a tile derivative of the given width inside `directory`.
    pub fn tile_key(&self, directory: &str, width: u32) -> String {
        join_key(
            directory,
            &format!("{}_tile_w{}{}", self.slug, width, self.extension),
        )
    }

    /// Key of the blur placeholder inside `directory`.
    pub fn blur_key(&self, directory: &str) -> String {
        join_key(directory, &format!("{}_blur{}", self.slug, self.extension))
    }

    /// Date-partitioned directory a source is published into.
    pub fn published_directory(year: i32) -> String {
        format!("{year:04}")
    }

    /// Key of the published source for the given year.
    pub fn published_key(&self, year: i32) -> String {
        join_key(
            &Self::published_directory(year),
            &format!("{}{}", self.slug, self.extension),
        )
    }

    /// Whether this key lives under the given prefix directory.
    pub fn is_under(&self, prefix: &str) -> bool {
        let prefix = prefix.trim_matches('/');
        self.directory == prefix || self.directory.starts_with(&format!("{prefix}/"))
    }
}

/// Check an extension (without dot) against the allow-list.
pub fn is_supported_extension(ext: &str) -> bool {
    SUPPORTED_EXTENSIONS
        .iter()
        .any(|supported| supported.eq_ignore_ascii_case(ext))
}

/// A slug is a UUID in its 36-character hyphenated form.
pub fn is_valid_slug(s: &str) -> bool {
    s.len() == 36 && Uuid::try_parse(s).is_ok()
}

fn join_key(directory: &str, name: &str) -> String {
    if directory.is_empty() {
        name.to_string()
    } else {
        format!("{directory}/{name}")
    }
}

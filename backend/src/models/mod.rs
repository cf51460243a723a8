//! Domain models for the NFM mint pipeline.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`Category`] - Music genre attached to a mint
//! - [`MediaFile`] - A binary file selected by the user
//! - [`DraftMint`] - Form state submitted for minting
//! - [`AuthorIdentity`] - Wallet identity of the current user
//! - [`AssetUri`] - Content-addressed URI returned by the media store
//! - [`FeedPost`] / [`RecordedPost`] - Social feed entries
//! - [`TxReceipt`] - Result of a successful contract call

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::ValidationError;

// =============================================================================
// Category
// =============================================================================

/// Genre of a minted track.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Category {
    Country,
    Electronic,
    Funk,
    #[serde(rename = "Hip Hop")]
    HipHop,
    Jazz,
    Latin,
    Pop,
    Punk,
    Reggae,
    Rock,
    Metal,
    #[serde(rename = "R&B")]
    RnB,
    Soul,
    Rap,
}

impl Category {
    /// All genres, in menu order.
    pub const ALL: [Category; 14] = [
        Self::Country,
        Self::Electronic,
        Self::Funk,
        Self::HipHop,
        Self::Jazz,
        Self::Latin,
        Self::Pop,
        Self::Punk,
        Self::Reggae,
        Self::Rock,
        Self::Metal,
        Self::RnB,
        Self::Soul,
        Self::Rap,
    ];

    /// Display label, also the serialized form.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Country => "Country",
            Self::Electronic => "Electronic",
            Self::Funk => "Funk",
            Self::HipHop => "Hip Hop",
            Self::Jazz => "Jazz",
            Self::Latin => "Latin",
            Self::Pop => "Pop",
            Self::Punk => "Punk",
            Self::Reggae => "Reggae",
            Self::Rock => "Rock",
            Self::Metal => "Metal",
            Self::RnB => "R&B",
            Self::Soul => "Soul",
            Self::Rap => "Rap",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ValidationError::UnknownCategory(wanted.to_string()))
    }
}

// =============================================================================
// Media
// =============================================================================

/// Which of the three uploads an asset belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    Audio,
    Metadata,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Metadata => "metadata",
        })
    }
}

/// A file selected for upload.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl MediaFile {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, guessing its content type from the extension.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("upload")
            .to_string();
        let content_type = guess_content_type(&file_name).to_string();
        Ok(Self {
            file_name,
            content_type,
            bytes,
        })
    }

    /// An empty file counts as not selected.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for MediaFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Content type from a file extension, `application/octet-stream` otherwise.
pub fn guess_content_type(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, e)| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "m4a" => "audio/mp4",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}

/// Content-addressed URI returned by the media store. Never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct AssetUri(String);

impl AssetUri {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Draft & Identity
// =============================================================================

/// Form state submitted for minting.
///
/// The category is kept as raw text so that an empty or unknown choice can be
/// reported by validation instead of failing at deserialization.
#[derive(Debug, Clone, Default)]
pub struct DraftMint {
    pub title: String,
    pub category: String,
    pub image: Option<MediaFile>,
    pub audio: Option<MediaFile>,
}

/// Wallet identity of the user submitting the mint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthorIdentity {
    pub username: String,
    pub eth_address: String,
    #[serde(default)]
    pub pfp: Option<String>,
}

impl AuthorIdentity {
    /// `0x7d...8686` form used in feed headers.
    pub fn short_address(&self) -> String {
        short_address(&self.eth_address)
    }
}

/// Abbreviate an address to its first four and last four characters.
pub fn short_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 8 {
        return address.to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

// =============================================================================
// Feed
// =============================================================================

/// A feed entry for a minted track.
///
/// Field names follow the `Posts` class of the feed backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedPost {
    #[serde(rename = "postImg")]
    pub image: Option<AssetUri>,
    #[serde(rename = "postAudio")]
    pub audio: AssetUri,
    #[serde(rename = "postTitle")]
    pub title: String,
    #[serde(rename = "postCategory")]
    pub category: Category,
    #[serde(rename = "postPfp", default)]
    pub author_pfp: Option<String>,
    #[serde(rename = "postAcc")]
    pub author_address: String,
    #[serde(rename = "postUsername")]
    pub author_username: String,
    /// Assigned by the backend on creation.
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A feed post as stored by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordedPost {
    #[serde(rename = "objectId")]
    pub object_id: String,
    #[serde(flatten)]
    pub post: FeedPost,
}

// =============================================================================
// Transaction
// =============================================================================

/// Receipt of a submitted contract call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub tx_hash: String,
}

// =============================================================================
// Tests
// =============================================================================

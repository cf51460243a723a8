//! Token metadata assembly.
//!
//! The metadata document is what the minted token points to:
//!
//! ```json
//! {"name":"Midnight","image":"ipfs://img1","audio":"ipfs://aud1","attributes":[{"category":"Jazz"}]}
//! ```
//!
//! Assembly is pure: the same title, URIs and category always produce the
//! same bytes. Keys are emitted in declaration order with no whitespace.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{AssetUri, Category};

/// Content type used when uploading the document.
pub const METADATA_CONTENT_TYPE: &str = "application/json";

/// One entry of the `attributes` array.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetadataAttribute {
    pub category: Category,
}

/// Off-chain metadata referenced by a minted token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MintMetadata {
    pub name: String,
    /// `null` when the image upload failed and the pipeline kept going.
    pub image: Option<AssetUri>,
    pub audio: Option<AssetUri>,
    pub attributes: Vec<MetadataAttribute>,
}

impl MintMetadata {
    /// Build the document from the form fields and the uploaded URIs.
    pub fn assemble(
        title: &str,
        image: Option<&AssetUri>,
        audio: Option<&AssetUri>,
        category: Category,
    ) -> Self {
        Self {
            name: title.to_string(),
            image: image.cloned(),
            audio: audio.cloned(),
            attributes: vec![MetadataAttribute { category }],
        }
    }

    /// Compact JSON bytes, as uploaded.
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Store file name: the title with all whitespace removed, plus `.json`.
    pub fn file_name(&self) -> String {
        let stem: String = self.name.chars().filter(|c| !c.is_whitespace()).collect();
        format!("{}.json", stem)
    }
}

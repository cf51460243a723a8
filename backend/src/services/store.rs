//! Content-addressed media store.
//!
//! [`IpfsStore`] talks to an IPFS HTTP API node: files are posted as multipart
//! to `/api/v0/add` and the returned CID is turned into a gateway URI.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::error::{UploadError, UploadResult};
use crate::models::{AssetKind, AssetUri, MediaFile};

/// Storage for uploaded media and metadata documents.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store `file` under the logical `name` and return its content URI.
    async fn save(&self, name: &str, file: &MediaFile, asset: AssetKind) -> UploadResult<AssetUri>;
}

/// IPFS `add` response.
#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

/// IPFS error response.
#[derive(Debug, Deserialize)]
struct IpfsErrorBody {
    #[serde(rename = "Message")]
    message: String,
}

/// IPFS HTTP API client.
#[derive(Clone)]
pub struct IpfsStore {
    client: reqwest::Client,
    api_url: String,
    gateway: String,
}

impl IpfsStore {
    pub fn new(api_url: impl Into<String>, gateway: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            gateway: gateway.into().trim_end_matches('/').to_string(),
        }
    }

    /// Gateway URI for a content identifier.
    pub fn gateway_uri(&self, cid: &str) -> AssetUri {
        AssetUri::new(format!("{}/ipfs/{}", self.gateway, cid))
    }
}

#[async_trait]
impl MediaStore for IpfsStore {
    async fn save(&self, name: &str, file: &MediaFile, asset: AssetKind) -> UploadResult<AssetUri> {
        log::debug!("uploading {} '{}' ({} bytes)", asset, name, file.bytes.len());

        let part = Part::bytes(file.bytes.clone())
            .file_name(name.to_string())
            .mime_str(&file.content_type)
            .map_err(|e| UploadError::Http {
                asset,
                message: format!("invalid content type '{}': {}", file.content_type, e),
            })?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(format!("{}/api/v0/add", self.api_url))
            .query(&[("pin", "true"), ("cid-version", "1")])
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Http {
                asset,
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| UploadError::Http {
            asset,
            message: e.to_string(),
        })?;

        if !status.is_success() {
            let message = serde_json::from_str::<IpfsErrorBody>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(UploadError::Rejected {
                asset,
                status: status.as_u16(),
                message,
            });
        }

        let cid = parse_add_response(&body, asset)?;
        let uri = self.gateway_uri(&cid);
        log::info!("{} stored at {}", asset, uri);
        Ok(uri)
    }
}

/// Extract the CID from an `add` response body.
///
/// The node may stream one JSON object per line (e.g. when wrapping in a
/// directory); the last object is the root.
fn parse_add_response(body: &str, asset: AssetKind) -> UploadResult<String> {
    let last = body
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| UploadError::InvalidResponse {
            asset,
            message: "empty body".to_string(),
        })?;

    let parsed: AddResponse = serde_json::from_str(last).map_err(|e| UploadError::InvalidResponse {
        asset,
        message: e.to_string(),
    })?;

    if parsed.hash.is_empty() {
        return Err(UploadError::InvalidResponse {
            asset,
            message: "missing Hash".to_string(),
        });
    }
    Ok(parsed.hash)
}

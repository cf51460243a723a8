//! REST API types for frontend integration.
//!
//! Feed posts are returned with the backend's field names (`postImg`,
//! `postAudio`, ...) so the frontend can render them unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::mint::MintOutcome;
use crate::models::{Category, RecordedPost};

/// Response sent to the frontend after a successful mint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintResponse {
    /// Unique job identifier
    pub job_id: String,

    /// "minted", or "warning" when no feed post was recorded
    pub status: String,

    pub title: String,
    pub category: Category,
    pub image_uri: Option<String>,
    pub audio_uri: Option<String>,
    pub metadata_uri: String,
    pub tx_hash: String,

    /// Feed post created for this mint
    pub post: Option<RecordedPost>,
}

impl From<MintOutcome> for MintResponse {
    fn from(outcome: MintOutcome) -> Self {
        MintResponse {
            job_id: Uuid::new_v4().to_string(),
            status: if outcome.post.is_some() { "minted" } else { "warning" }.to_string(),
            title: outcome.title,
            category: outcome.category,
            image_uri: outcome.image_uri.map(|u| u.to_string()),
            audio_uri: outcome.audio_uri.map(|u| u.to_string()),
            metadata_uri: outcome.metadata_uri.to_string(),
            tx_hash: outcome.tx_hash,
            post: outcome.post,
        }
    }
}

/// Feed listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostsResponse {
    pub total: usize,
    pub posts: Vec<RecordedPost>,
}

impl From<Vec<RecordedPost>> for PostsResponse {
    fn from(posts: Vec<RecordedPost>) -> Self {
        Self {
            total: posts.len(),
            posts,
        }
    }
}

/// Query string of `GET /api/posts`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostsQuery {
    pub account: Option<String>,
}

/// Create an error response
pub fn error_response(kind: &str, error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "kind": kind,
        "error": error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AssetUri;

    fn outcome() -> MintOutcome {
        MintOutcome {
            title: "Midnight".into(),
            category: Category::Jazz,
            image_uri: Some(AssetUri::new("ipfs://img1")),
            audio_uri: None,
            metadata_uri: AssetUri::new("ipfs://meta1"),
            tx_hash: "0xfeed".into(),
            post: None,
        }
    }

    #[test]
    fn test_mint_response_without_post_is_warning() {
        let response = MintResponse::from(outcome());
        assert_eq!(response.status, "warning");
        assert_eq!(response.metadata_uri, "ipfs://meta1");

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["txHash"], "0xfeed");
        assert_eq!(json["category"], "Jazz");
        assert!(json["audioUri"].is_null());
    }

    #[test]
    fn test_error_response_shape() {
        let body = error_response("validation", "Missing required fields: title");
        assert_eq!(body["status"], "error");
        assert_eq!(body["kind"], "validation");
        assert!(body["jobId"].as_str().is_some());
    }
}

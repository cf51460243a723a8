//! Feed post persistence.
//!
//! [`ParsePostRecorder`] stores posts in the `Posts` class of a
//! Parse-compatible REST backend and queries them back for the feed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::error::{RecordError, RecordResult};
use crate::models::{FeedPost, RecordedPost};

const POSTS_CLASS: &str = "Posts";

/// Persistence for feed posts.
#[async_trait]
pub trait PostRecorder: Send + Sync {
    /// Create a post; returns it with the backend-assigned id.
    async fn save(&self, post: &FeedPost) -> RecordResult<RecordedPost>;

    /// Posts newest first, optionally only those by `account`.
    async fn list(&self, account: Option<&str>) -> RecordResult<Vec<RecordedPost>>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedObject {
    object_id: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct QueryResults {
    results: Vec<RecordedPost>,
}

#[derive(Debug, Deserialize)]
struct ParseErrorBody {
    #[serde(default)]
    code: Option<i64>,
    error: String,
}

/// Parse Server REST client.
#[derive(Clone)]
pub struct ParsePostRecorder {
    client: reqwest::Client,
    server_url: String,
    app_id: String,
    master_key: Option<String>,
}

impl ParsePostRecorder {
    pub fn new(server_url: impl Into<String>, app_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            server_url: server_url.into().trim_end_matches('/').to_string(),
            app_id: app_id.into(),
            master_key: None,
        }
    }

    pub fn with_master_key(mut self, key: Option<String>) -> Self {
        self.master_key = key;
        self
    }

    fn class_url(&self) -> String {
        format!("{}/classes/{}", self.server_url, POSTS_CLASS)
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.header("X-Parse-Application-Id", &self.app_id);
        match &self.master_key {
            Some(key) => builder.header("X-Parse-Master-Key", key),
            None => builder,
        }
    }

    async fn read_body(response: reqwest::Response) -> RecordResult<String> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RecordError::Http(e.to_string()))?;

        if !status.is_success() {
            let message = match serde_json::from_str::<ParseErrorBody>(&body) {
                Ok(ParseErrorBody { code: Some(code), error }) => format!("{} (code {})", error, code),
                Ok(ParseErrorBody { error, .. }) => error,
                Err(_) => body,
            };
            return Err(RecordError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl PostRecorder for ParsePostRecorder {
    async fn save(&self, post: &FeedPost) -> RecordResult<RecordedPost> {
        let response = self
            .request(self.client.post(self.class_url()))
            .json(post)
            .send()
            .await
            .map_err(|e| RecordError::Http(e.to_string()))?;

        let body = Self::read_body(response).await?;
        let created: CreatedObject =
            serde_json::from_str(&body).map_err(|e| RecordError::InvalidResponse(e.to_string()))?;

        log::info!("feed post {} recorded", created.object_id);
        Ok(RecordedPost {
            object_id: created.object_id,
            post: FeedPost {
                created_at: created.created_at,
                ..post.clone()
            },
        })
    }

    async fn list(&self, account: Option<&str>) -> RecordResult<Vec<RecordedPost>> {
        let mut query = vec![("order", "-createdAt".to_string())];
        if let Some(account) = account {
            query.push(("where", json!({ "postAcc": account }).to_string()));
        }

        let response = self
            .request(self.client.get(self.class_url()))
            .query(&query)
            .send()
            .await
            .map_err(|e| RecordError::Http(e.to_string()))?;

        let body = Self::read_body(response).await?;
        let parsed: QueryResults =
            serde_json::from_str(&body).map_err(|e| RecordError::InvalidResponse(e.to_string()))?;
        Ok(parsed.results)
    }
}

//! HTTP Server for the NFM mint API.
//!
//! Provides REST endpoints for minting and browsing the feed.
//!
//! # API Endpoints
//!
//! | Method | Path                 | Description                          |
//! |--------|----------------------|--------------------------------------|
//! | GET    | `/health`            | Health check                         |
//! | GET    | `/api/categories`    | Available genres                     |
//! | POST   | `/api/mint`          | Upload media and mint (multipart)    |
//! | GET    | `/api/posts`         | Feed posts, `?account=` to filter    |
//! | GET    | `/api/notifications` | SSE stream of user notifications     |

use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::types::{error_response, MintResponse, PostsQuery, PostsResponse};
use crate::error::{MintError, ServerError};
use crate::mint::MintOrchestrator;
use crate::models::{guess_content_type, AuthorIdentity, Category, DraftMint, MediaFile};

/// Largest accepted multipart body.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

type ApiError = (StatusCode, Json<Value>);

/// Start the HTTP server
pub async fn start_server(
    port: u16,
    orchestrator: Arc<MintOrchestrator>,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(orchestrator);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 NFM mint server running on http://localhost:{}", port);
    println!("   POST /api/mint          - Mint a track");
    println!("   GET  /api/posts         - Feed posts");
    println!("   GET  /api/categories    - Genres");
    println!("   GET  /api/notifications - SSE notification stream");
    println!("   GET  /health            - Health check");
    println!();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the application router.
pub fn router(orchestrator: Arc<MintOrchestrator>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/categories", get(categories))
        .route("/api/mint", post(mint))
        .route("/api/posts", get(list_posts))
        .route("/api/notifications", get(sse_notifications))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(orchestrator)
}

/// Health check endpoint
async fn health(State(orchestrator): State<Arc<MintOrchestrator>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "nfm",
        "version": env!("CARGO_PKG_VERSION"),
        "mintInProgress": orchestrator.is_busy(),
        "stage": orchestrator.stage(),
        "endpoints": {
            "mint": "POST /api/mint",
            "posts": "GET /api/posts",
            "notifications": "GET /api/notifications (SSE)"
        }
    }))
}

async fn categories() -> Json<Vec<&'static str>> {
    Json(Category::ALL.iter().map(|c| c.label()).collect())
}

/// SSE endpoint for real-time notifications
async fn sse_notifications(
    State(orchestrator): State<Arc<MintOrchestrator>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = orchestrator.notifier().subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(notification) => {
            let json = serde_json::to_string(&notification).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Mint endpoint
async fn mint(
    State(orchestrator): State<Arc<MintOrchestrator>>,
    mut multipart: Multipart,
) -> Result<Json<MintResponse>, ApiError> {
    let mut draft = DraftMint::default();
    let mut username = String::new();
    let mut eth_address = String::new();
    let mut pfp: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| to_api_error(ServerError::BadRequest(format!("Multipart error: {}", e))))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "image" | "audio" => {
                let file_name = field.file_name().unwrap_or(&name).to_string();
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| guess_content_type(&file_name).to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| to_api_error(ServerError::BadRequest(format!("Read error: {}", e))))?
                    .to_vec();
                let file = Some(MediaFile::new(file_name, content_type, bytes));
                if name == "image" {
                    draft.image = file;
                } else {
                    draft.audio = file;
                }
            }
            "title" | "category" | "username" | "ethAddress" | "pfp" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| to_api_error(ServerError::BadRequest(format!("Read error: {}", e))))?;
                match name.as_str() {
                    "title" => draft.title = text,
                    "category" => draft.category = text,
                    "username" => username = text,
                    "ethAddress" => eth_address = text,
                    _ => pfp = Some(text).filter(|p| !p.trim().is_empty()),
                }
            }
            other => log::debug!("ignoring multipart field '{}'", other),
        }
    }

    let identity = identity_from_fields(username, eth_address, pfp);

    log::info!(
        "mint request '{}' ({}) from {}",
        draft.title,
        draft.category,
        identity
            .as_ref()
            .map(|i| i.short_address())
            .unwrap_or_else(|| "anonymous".to_string())
    );

    let outcome = orchestrator
        .submit(&draft, identity.as_ref())
        .await
        .map_err(|e| to_api_error(ServerError::Mint(e)))?;

    Ok(Json(MintResponse::from(outcome)))
}

/// Feed endpoint
async fn list_posts(
    State(orchestrator): State<Arc<MintOrchestrator>>,
    Query(query): Query<PostsQuery>,
) -> Result<Json<PostsResponse>, ApiError> {
    let account = query.account.as_deref().filter(|a| !a.is_empty());
    let posts = orchestrator
        .posts()
        .list(account)
        .await
        .map_err(|e| to_api_error(ServerError::Record(e)))?;
    Ok(Json(PostsResponse::from(posts)))
}

/// A wallet address is what makes a request authenticated; the username
/// falls back to the address.
fn identity_from_fields(
    username: String,
    eth_address: String,
    pfp: Option<String>,
) -> Option<AuthorIdentity> {
    let eth_address = eth_address.trim().to_string();
    if eth_address.is_empty() {
        return None;
    }
    let username = match username.trim() {
        "" => eth_address.clone(),
        name => name.to_string(),
    };
    Some(AuthorIdentity {
        username,
        eth_address,
        pfp,
    })
}

/// HTTP status and error kind for a server error.
fn classify(err: &ServerError) -> (StatusCode, &'static str) {
    match err {
        ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, "badRequest"),
        ServerError::Record(_) => (StatusCode::BAD_GATEWAY, "feed"),
        ServerError::Mint(e) => match e {
            MintError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
            MintError::NotAuthenticated => (StatusCode::UNAUTHORIZED, "notAuthenticated"),
            MintError::Busy => (StatusCode::CONFLICT, "busy"),
            MintError::TransactionRejected(_) => (StatusCode::CONFLICT, "transactionRejected"),
            MintError::Upload(_) => (StatusCode::BAD_GATEWAY, "upload"),
            MintError::Transaction(_) => (StatusCode::BAD_GATEWAY, "transaction"),
            MintError::PostNotRecorded { .. } => (StatusCode::BAD_GATEWAY, "postNotRecorded"),
        },
    }
}

fn to_api_error(err: ServerError) -> ApiError {
    let (status, kind) = classify(&err);
    if status.is_server_error() {
        eprintln!("❌ {}", err);
    }
    (status, Json(error_response(kind, &err.to_string())))
}

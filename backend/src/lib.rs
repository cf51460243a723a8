//! # NFM - Non-Fungible Music minting
//!
//! Mints a music track as an NFT and publishes it to the Block News Media
//! feed: the cover image and the audio file go to IPFS, a metadata document
//! referencing both is uploaded next, the contract's `createItem` is called
//! with the mint price, and a feed post is recorded once the transaction
//! succeeded.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Draft mint  │────▶│   Uploads   │────▶│  createItem │────▶│  Feed post  │
//! │ (validated) │     │ img/aud/json│     │ (paid call) │     │  (Posts)    │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use nfm::{MintConfig, MintOrchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = MintConfig::from_env()?;
//!     let orchestrator = Arc::new(MintOrchestrator::from_config(&config));
//!     nfm::server::start_server(3000, orchestrator).await
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`config`] - Environment configuration
//! - [`models`] - Domain models (Category, DraftMint, FeedPost)
//! - [`validation`] - Draft and metadata validation
//! - [`metadata`] - Token metadata assembly
//! - [`services`] - Media store, contract and feed clients
//! - [`mint`] - Mint orchestration
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Validation
pub mod validation;

// Metadata
pub mod metadata;

// External collaborators
pub mod services;

// Orchestration
pub mod mint;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, ContractError, MintError, RecordError, ServerError, UploadError, ValidationError,
    USER_REJECTED_CODE,
};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::MintConfig;

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    AssetKind, AssetUri, AuthorIdentity, Category, DraftMint, FeedPost, MediaFile, RecordedPost,
    TxReceipt,
};

// =============================================================================
// Re-exports - Validation & Metadata
// =============================================================================

pub use metadata::{MetadataAttribute, MintMetadata};
pub use validation::{is_valid_metadata, validate_draft, validate_metadata, ValidDraft};

// =============================================================================
// Re-exports - Services
// =============================================================================

pub use services::{
    create_item_call, ContractCall, ContractInvoker, IpfsStore, MediaStore, ParsePostRecorder,
    PostRecorder, WalletBridge,
};

// =============================================================================
// Re-exports - Orchestration
// =============================================================================

pub use mint::{MintOrchestrator, MintOutcome, MintSettings, MintStage, UploadFailurePolicy};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::{MintResponse, Notification, NotificationHub, NotificationLevel, PostsResponse};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server};
}

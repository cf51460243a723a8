//! Error types for the NFM mint pipeline.
//!
//! This module defines a hierarchy of error types, one per collaborator:
//!
//! - [`ValidationError`] - Draft rejected before any side effect
//! - [`UploadError`] - Media store failures (image, audio, metadata)
//! - [`ContractError`] - Contract invoker failures, including wallet rejection
//! - [`RecordError`] - Feed post persistence failures
//! - [`ConfigError`] - Environment configuration errors
//! - [`MintError`] - Top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

use crate::models::AssetKind;

/// JSON-RPC / EIP-1193 code reported when the user declines in the wallet.
pub const USER_REJECTED_CODE: i64 = 4001;

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors raised while checking a draft before submission.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// One or more required fields are empty.
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    /// Category is not one of the known genres.
    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    /// Assembled metadata does not match the metadata schema.
    #[error("Invalid metadata document: {errors:?}")]
    InvalidMetadata { errors: Vec<String> },
}

// =============================================================================
// Media Store Errors
// =============================================================================

/// Errors from the content-addressed media store.
#[derive(Debug, Error)]
pub enum UploadError {
    /// HTTP request failed before a response was received.
    #[error("{asset} upload failed: {message}")]
    Http { asset: AssetKind, message: String },

    /// Store answered with an error status.
    #[error("{asset} upload rejected ({status}): {message}")]
    Rejected {
        asset: AssetKind,
        status: u16,
        message: String,
    },

    /// Store answered but the body had no content identifier.
    #[error("Invalid store response for {asset}: {message}")]
    InvalidResponse { asset: AssetKind, message: String },

    /// Upload did not finish in time.
    #[error("{asset} upload timed out after {secs}s")]
    Timeout { asset: AssetKind, secs: u64 },

    /// Local file could not be read.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    /// Which asset the failed upload was for, if known.
    pub fn asset(&self) -> Option<AssetKind> {
        match self {
            Self::Http { asset, .. }
            | Self::Rejected { asset, .. }
            | Self::InvalidResponse { asset, .. }
            | Self::Timeout { asset, .. } => Some(*asset),
            Self::Io(_) => None,
        }
    }
}

// =============================================================================
// Contract Errors
// =============================================================================

/// Error reported by the contract invoker.
///
/// Mirrors the `{code, message}` shape wallets use; `message` is shown to the
/// user verbatim for anything that is not a rejection.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ContractError {
    pub code: Option<i64>,
    pub message: String,
}

impl ContractError {
    pub fn new(code: Option<i64>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Error without a provider code (transport failures, timeouts).
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }

    /// True when the user declined the transaction in the wallet.
    pub fn is_user_rejection(&self) -> bool {
        self.code == Some(USER_REJECTED_CODE)
    }
}

// =============================================================================
// Post Recorder Errors
// =============================================================================

/// Errors from the feed post backend.
#[derive(Debug, Error)]
pub enum RecordError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Backend answered with an error.
    #[error("Backend error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Response could not be decoded.
    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),

    /// Request did not finish in time.
    #[error("Request timed out after {0}s")]
    Timeout(u64),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while loading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required variable is not set.
    #[error("Missing {0} environment variable")]
    Missing(&'static str),

    /// Variable is set but cannot be parsed.
    #[error("Invalid value for {var}: {message}")]
    Invalid { var: &'static str, message: String },
}

// =============================================================================
// Mint Errors (top-level)
// =============================================================================

/// Top-level mint orchestration errors.
///
/// This is the error type returned by [`crate::mint::MintOrchestrator::submit`].
/// Every variant leaves the orchestrator idle and ready for a new submission.
#[derive(Debug, Error)]
pub enum MintError {
    /// Draft failed validation, nothing was uploaded.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// No wallet identity attached to the request.
    #[error("Wallet not connected")]
    NotAuthenticated,

    /// Another mint is already in flight.
    #[error("A mint is already in progress")]
    Busy,

    /// A media store call failed.
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// User declined the transaction in the wallet.
    #[error("Transaction rejected: {0}")]
    TransactionRejected(ContractError),

    /// Any other contract failure.
    #[error("Transaction error: {0}")]
    Transaction(ContractError),

    /// Token minted but the feed post could not be saved.
    #[error("Minted in {tx_hash} but feed post was not recorded: {source}")]
    PostNotRecorded {
        tx_hash: String,
        #[source]
        source: RecordError,
    },
}

impl From<ContractError> for MintError {
    fn from(err: ContractError) -> Self {
        if err.is_user_rejection() {
            Self::TransactionRejected(err)
        } else {
            Self::Transaction(err)
        }
    }
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Mint pipeline error.
    #[error("Mint error: {0}")]
    Mint(#[from] MintError),

    /// Feed query error.
    #[error("Feed error: {0}")]
    Record(#[from] RecordError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Result type for media store operations.
pub type UploadResult<T> = Result<T, UploadError>;

/// Result type for contract operations.
pub type ContractResult<T> = Result<T, ContractError>;

/// Result type for post recorder operations.
pub type RecordResult<T> = Result<T, RecordError>;

/// Result type for mint operations.
pub type MintResult<T> = Result<T, MintError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_error_conversion() {
        let rejected: MintError = ContractError::new(Some(4001), "User denied").into();
        assert!(matches!(rejected, MintError::TransactionRejected(_)));

        let failed: MintError = ContractError::new(Some(-32000), "insufficient funds").into();
        assert!(matches!(failed, MintError::Transaction(_)));

        let transport: MintError = ContractError::transport("connection refused").into();
        assert!(matches!(transport, MintError::Transaction(_)));
    }

    #[test]
    fn test_missing_fields_format() {
        let err = ValidationError::MissingFields(vec!["title", "audio"]);
        assert_eq!(err.to_string(), "Missing required fields: title, audio");
    }

    #[test]
    fn test_upload_error_keeps_asset() {
        let err = UploadError::Timeout {
            asset: AssetKind::Audio,
            secs: 5,
        };
        assert_eq!(err.asset(), Some(AssetKind::Audio));
        assert!(err.to_string().contains("audio"));
    }
}

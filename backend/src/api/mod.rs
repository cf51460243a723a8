//! HTTP API module.
//!
//! This module provides the HTTP server, the API types and the notification
//! stream for the mint service.

pub mod notifications;
pub mod server;
pub mod types;

pub use notifications::{Notification, NotificationHub, NotificationLevel};
pub use server::{router, start_server};
pub use types::*;

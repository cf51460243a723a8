//! User notifications streamed via Server-Sent Events (SSE).
//!
//! The mint pipeline reports progress and outcomes through a
//! [`NotificationHub`]. Every notification is echoed to stdout and broadcast
//! to connected SSE clients.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Capacity of the broadcast buffer; slow subscribers skip older entries.
const CHANNEL_CAPACITY: usize = 100;

/// Notification level for frontend display
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A single user-facing notification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub level: NotificationLevel,
    /// Headline
    pub message: String,
    /// Body text
    pub description: String,
    /// Image shown with the notification (minted cover art)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

impl Notification {
    fn new(level: NotificationLevel, message: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            description: description.into(),
            preview: None,
        }
    }

    pub fn info(message: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, message, description)
    }

    pub fn success(message: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, message, description)
    }

    pub fn warning(message: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Warning, message, description)
    }

    pub fn error(message: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, message, description)
    }

    pub fn with_preview(mut self, preview: impl Into<String>) -> Self {
        self.preview = Some(preview.into());
        self
    }
}

/// Broadcasts notifications to all connected SSE clients
#[derive(Debug, Clone)]
pub struct NotificationHub {
    sender: broadcast::Sender<Notification>,
}

impl NotificationHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Send a notification to all subscribers
    pub fn notify(&self, notification: Notification) {
        let prefix = match notification.level {
            NotificationLevel::Info => "   ",
            NotificationLevel::Success => "   ✓",
            NotificationLevel::Warning => "   ⚠️",
            NotificationLevel::Error => "   ❌",
        };
        println!("{} {}: {}", prefix, notification.message, notification.description);

        // No receivers is fine
        let _ = self.sender.send(notification);
    }

    /// Get a receiver for SSE streaming
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_notifications() {
        let hub = NotificationHub::new();
        let mut rx = hub.subscribe();

        hub.notify(Notification::info("Minting in progress", "Your minting is in progress"));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.level, NotificationLevel::Info);
        assert_eq!(received.message, "Minting in progress");
    }

    #[test]
    fn test_notify_without_subscribers() {
        let hub = NotificationHub::new();
        hub.notify(Notification::error("NFT Mint Error", "boom"));
    }

    #[test]
    fn test_wire_format() {
        let n = Notification::success("Congrats!", "done").with_preview("ipfs://img1");
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["level"], "success");
        assert_eq!(json["preview"], "ipfs://img1");

        let plain = serde_json::to_value(Notification::warning("a", "b")).unwrap();
        assert!(plain.get("preview").is_none());
    }
}

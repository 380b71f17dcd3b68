//! Error types for the notification middlewares.

use thiserror::Error;

/// Errors raised while posting a Slack notification.
#[derive(Debug, Error)]
pub enum SlackError {
    /// The message could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The webhook could not be reached.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The webhook answered with a non-success status.
    #[error("unexpected status {status} from webhook")]
    Status { status: u16 },
}

//! Error types for outbound notification delivery.

use thiserror::Error;

/// Errors surfaced while configuring or using the Slack notifier.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotifyError {
    /// No Slack bot token was supplied.
    #[error("Slack bot token is required")]
    MissingToken,

    /// No destination channel was supplied.
    #[error("Slack channel id is required")]
    MissingChannel,

    /// The configured Slack API base URL could not be parsed.
    #[error("Slack API base URL is invalid: {0}")]
    InvalidApiBase(String),

    /// The HTTP request could not be delivered.
    #[error("network error talking to Slack: {message}")]
    Network {
        /// Transport-level error detail.
        message: String,
    },

    /// Slack answered with a non-success HTTP status.
    #[error("Slack returned HTTP {status}: {message}")]
    Http {
        /// HTTP status code of the response.
        status: u16,
        /// Response body, when one was readable.
        message: String,
    },

    /// Slack accepted the request but rejected the message.
    #[error("Slack rejected the message: {reason}")]
    Rejected {
        /// Slack error code (e.g. `channel_not_found`).
        reason: String,
    },

    /// The response arrived but did not have the expected shape.
    #[error("malformed Slack response: {message}")]
    MalformedResponse {
        /// Description of the parsing failure.
        message: String,
    },
}

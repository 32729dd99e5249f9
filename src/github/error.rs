//! Error types exposed by the pull request source layer.

use thiserror::Error;

/// Errors surfaced while validating input or fetching pull requests.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// No organization name was supplied.
    #[error("organization name is required")]
    MissingOrganization,

    /// The authentication token was missing or blank.
    #[error("personal access token is required")]
    MissingToken,

    /// The configured API base URL could not be parsed.
    #[error("API base URL is invalid: {0}")]
    InvalidApiBase(String),

    /// The token was rejected by GitHub.
    #[error("GitHub rejected the token: {message}")]
    Authentication {
        /// GitHub error message returned with the 401/403 response.
        message: String,
    },

    /// GitHub reported that the request was rate limited.
    #[error("GitHub API rate limit exceeded: {message}")]
    RateLimited {
        /// Error message from GitHub.
        message: String,
    },

    /// GitHub returned a non-authentication API error.
    #[error("GitHub API error: {message}")]
    Api {
        /// Response body from GitHub describing the failure.
        message: String,
    },

    /// Networking failed while calling GitHub.
    #[error("network error talking to GitHub: {message}")]
    Network {
        /// Transport-level error detail.
        message: String,
    },

    /// Invalid pagination parameters.
    #[error("invalid pagination: {message}")]
    InvalidPagination {
        /// Description of the invalid parameter.
        message: String,
    },

    /// The response arrived but did not have the expected shape.
    #[error("malformed search response: {message}")]
    MalformedResponse {
        /// Description of the missing or unexpected payload element.
        message: String,
    },
}

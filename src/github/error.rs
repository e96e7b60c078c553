//! Error types exposed by the GitHub project layer.

use thiserror::Error;

/// Errors surfaced while configuring a run or communicating with GitHub.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpvoteError {
    /// The authentication token was missing.
    #[error("personal access token is required")]
    MissingToken,

    /// Configuration could not be loaded or is incomplete.
    #[error("configuration error: {message}")]
    Configuration {
        /// Details about the configuration failure.
        message: String,
    },

    /// The provided API base URL could not be parsed.
    #[error("API base URL is invalid: {0}")]
    InvalidUrl(String),

    /// The authentication token was rejected by GitHub.
    #[error("GitHub rejected the token: {message}")]
    Authentication {
        /// GitHub error message returned with the 401/403 response.
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

    /// The GraphQL endpoint answered with one or more errors.
    #[error("GraphQL {operation} failed: {}", messages.join("; "))]
    GraphQl {
        /// Name of the query or mutation that failed.
        operation: String,
        /// Error messages reported in the response body.
        messages: Vec<String>,
    },

    /// GitHub refused the request because the rate limit is exhausted.
    #[error("GitHub API rate limit exceeded: {message}")]
    RateLimitExceeded {
        /// Error message from GitHub.
        message: String,
    },

    /// The response did not match the expected shape.
    #[error("unexpected response to {operation}: {message}")]
    MalformedResponse {
        /// Name of the query or mutation that was executed.
        operation: String,
        /// What was missing or invalid.
        message: String,
    },

    /// A project item's content could not be matched to its type tag.
    #[error("project item {item_id} of type {item_type} has no matching Issue or PullRequest content")]
    UnresolvableContent {
        /// Identifier of the offending project item.
        item_id: String,
        /// The item type reported by GitHub.
        item_type: String,
    },

    /// A concurrent scoring task died before reporting its result.
    #[error("scoring task failed: {message}")]
    Task {
        /// Join or channel failure detail.
        message: String,
    },

    /// Local I/O operation failed.
    #[error("I/O error: {message}")]
    Io {
        /// Error detail from the underlying I/O operation.
        message: String,
    },
}

//! Error mapping helpers for the Octocrab GraphQL gateway.

use http::StatusCode;
use serde::Deserialize;

use crate::github::error::UpvoteError;

/// GraphQL error `type` GitHub reports when the point budget is spent.
const RATE_LIMITED: &str = "RATE_LIMITED";

/// Checks if a GitHub error status indicates an authentication failure.
pub(super) const fn is_auth_failure(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

/// Checks if an octocrab error represents a network/transport issue.
pub(super) const fn is_network_error(error: &octocrab::Error) -> bool {
    matches!(
        error,
        octocrab::Error::Http { .. }
            | octocrab::Error::Hyper { .. }
            | octocrab::Error::Service { .. }
    )
}

/// Checks whether the GitHub error represents a rate limit error based on the
/// HTTP status and message / documentation URL content.
pub(super) fn is_rate_limit_error(source: &octocrab::GitHubError) -> bool {
    let is_rate_limit_status = matches!(
        source.status_code,
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
    );

    let message_indicates_rate_limit = source.message.to_lowercase().contains("rate limit")
        || source
            .documentation_url
            .as_deref()
            .is_some_and(|url| url.contains("rate-limit"));

    is_rate_limit_status && message_indicates_rate_limit
}

pub(super) fn map_octocrab_error(operation: &str, error: &octocrab::Error) -> UpvoteError {
    if let octocrab::Error::GitHub { source, .. } = error {
        let status = source.status_code;
        let message = &source.message;
        if is_rate_limit_error(source) {
            return UpvoteError::RateLimitExceeded {
                message: format!("{operation}: {message}"),
            };
        }
        return if is_auth_failure(status) {
            UpvoteError::Authentication {
                message: format!("{operation} failed: GitHub returned {status} {message}"),
            }
        } else {
            UpvoteError::Api {
                message: format!("{operation} failed with status {status}: {message}"),
            }
        };
    }

    if is_network_error(error) {
        return UpvoteError::Network {
            message: format!("{operation} failed: {error}"),
        };
    }

    if matches!(
        error,
        octocrab::Error::Serde { .. } | octocrab::Error::Json { .. }
    ) {
        return UpvoteError::MalformedResponse {
            operation: operation.to_owned(),
            message: error.to_string(),
        };
    }

    UpvoteError::Api {
        message: format!("{operation} failed: {error}"),
    }
}

/// A single entry of a GraphQL `errors` array.
#[derive(Debug, Deserialize)]
pub(super) struct GraphQlErrorEntry {
    message: String,
    #[serde(rename = "type", default)]
    error_type: Option<String>,
}

/// Standard GraphQL response body: data, errors, or both.
#[derive(Debug, Deserialize)]
pub(super) struct GraphQlEnvelope<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlErrorEntry>,
}

impl<T> GraphQlEnvelope<T> {
    /// Unwraps the payload, treating any reported error as fatal.
    ///
    /// Partial data alongside errors is discarded; scoring from a partially
    /// resolved item would under-count.
    pub(super) fn into_data(self, operation: &str) -> Result<T, UpvoteError> {
        if !self.errors.is_empty() {
            return Err(map_graphql_errors(operation, self.errors));
        }
        self.data.ok_or_else(|| UpvoteError::MalformedResponse {
            operation: operation.to_owned(),
            message: "response carried neither data nor errors".to_owned(),
        })
    }
}

fn map_graphql_errors(operation: &str, errors: Vec<GraphQlErrorEntry>) -> UpvoteError {
    let rate_limited = errors
        .iter()
        .any(|entry| entry.error_type.as_deref() == Some(RATE_LIMITED));
    let messages: Vec<String> = errors.into_iter().map(|entry| entry.message).collect();

    if rate_limited {
        UpvoteError::RateLimitExceeded {
            message: format!("{operation}: {}", messages.join("; ")),
        }
    } else {
        UpvoteError::GraphQl {
            operation: operation.to_owned(),
            messages,
        }
    }
}

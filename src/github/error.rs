//! GitHub API error types.
//!
//! This module defines an error type that tells the transaction logic *what kind*
//! of failure the hosting service reported, so callers branch on the kind rather
//! than on message text:
//!
//! - **NotFound** (404): the organization, branch, or file does not exist.
//! - **Conflict** (409, 422): the write collides with existing state, e.g. a
//!   create-only content write to a path that already has content, or a ref
//!   that already exists.
//! - **Transient**: 5xx, rate limits and network failures; safe to retry.
//! - **Permanent**: everything else (authentication, validation, ...).

use std::fmt;
use thiserror::Error;

/// The kind of GitHub API error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitHubErrorKind {
    /// The requested resource does not exist (HTTP 404).
    NotFound,

    /// The request conflicts with the current state of the resource.
    ///
    /// GitHub reports these as HTTP 409 or as HTTP 422 validation failures
    /// ("Reference already exists", "\"sha\" wasn't supplied").
    Conflict,

    /// Transient error - safe to retry with backoff.
    ///
    /// Examples:
    /// - HTTP 5xx (server errors)
    /// - HTTP 429 (rate limited)
    /// - HTTP 403 with rate limit message
    /// - Network timeouts
    Transient,

    /// Permanent error - requires human intervention.
    Permanent,
}

impl GitHubErrorKind {
    /// Returns true if this error is retriable.
    pub fn is_retriable(&self) -> bool {
        matches!(self, GitHubErrorKind::Transient)
    }
}

impl fmt::Display for GitHubErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GitHubErrorKind::NotFound => "not found",
            GitHubErrorKind::Conflict => "conflict",
            GitHubErrorKind::Transient => "transient",
            GitHubErrorKind::Permanent => "permanent",
        };
        f.write_str(s)
    }
}

/// A GitHub API error with its categorized kind.
#[derive(Debug, Error)]
pub struct GitHubApiError {
    /// The kind of error.
    pub kind: GitHubErrorKind,

    /// The HTTP status code, if available.
    pub status_code: Option<u16>,

    /// A human-readable description of the error.
    pub message: String,

    /// The underlying octocrab error, if available.
    #[source]
    pub source: Option<octocrab::Error>,
}

impl fmt::Display for GitHubApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "GitHub API error (HTTP {}): {}", code, self.message),
            None => write!(f, "GitHub API error: {}", self.message),
        }
    }
}

impl GitHubApiError {
    /// Creates an error of the given kind without an octocrab source.
    pub fn new(kind: GitHubErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::Conflict, message)
    }

    pub fn transient_without_source(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::Transient, message)
    }

    pub fn permanent_without_source(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::Permanent, message)
    }

    /// Returns true if the hosting service reported the resource as absent.
    pub fn is_not_found(&self) -> bool {
        self.kind == GitHubErrorKind::NotFound
    }

    /// Returns true if the hosting service reported a state conflict.
    pub fn is_conflict(&self) -> bool {
        self.kind == GitHubErrorKind::Conflict
    }

    /// Categorizes an octocrab error.
    pub fn from_octocrab(err: octocrab::Error) -> Self {
        let status_code = extract_status_code(&err);
        let message = match &err {
            octocrab::Error::GitHub { source, .. } => source.message.clone(),
            other => other.to_string(),
        };
        let kind = classify(status_code, &message);

        Self {
            kind,
            status_code,
            message,
            source: Some(err),
        }
    }
}

/// Maps an HTTP status and message onto an error kind.
///
/// This is a pure function extracted for testability.
pub fn classify(status_code: Option<u16>, message: &str) -> GitHubErrorKind {
    match status_code {
        Some(404) => GitHubErrorKind::NotFound,
        Some(409) | Some(422) => GitHubErrorKind::Conflict,
        Some(429) => GitHubErrorKind::Transient,
        Some(403) if is_rate_limit_error(message) => GitHubErrorKind::Transient,
        Some(code) if (500..600).contains(&code) => GitHubErrorKind::Transient,
        Some(_) => GitHubErrorKind::Permanent,
        None if is_network_error(message) => GitHubErrorKind::Transient,
        None => GitHubErrorKind::Permanent,
    }
}

/// Extracts the HTTP status code from an octocrab error, if present.
///
/// API errors carry the status directly. Other variants (transport, parse)
/// only mention it in their text, if at all.
fn extract_status_code(err: &octocrab::Error) -> Option<u16> {
    if let octocrab::Error::GitHub { source, .. } = err {
        return Some(source.status_code.as_u16());
    }

    let err_str = err.to_string();
    let idx = err_str.find("status: ")?;
    let rest = &err_str[idx + 8..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}

/// Checks if an error message indicates a rate limit.
fn is_rate_limit_error(message: &str) -> bool {
    let message_lower = message.to_lowercase();
    message_lower.contains("rate limit")
        || message_lower.contains("api rate")
        || message_lower.contains("secondary rate")
        || message_lower.contains("abuse detection")
}

/// Checks if an error message indicates a network-level error.
fn is_network_error(message: &str) -> bool {
    let message_lower = message.to_lowercase();
    message_lower.contains("timeout")
        || message_lower.contains("connection")
        || message_lower.contains("network")
        || message_lower.contains("dns")
        || message_lower.contains("timed out")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_kinds() {
        assert_eq!(classify(Some(404), "Not Found"), GitHubErrorKind::NotFound);
        assert_eq!(classify(Some(409), "Conflict"), GitHubErrorKind::Conflict);
        assert_eq!(
            classify(Some(422), "Invalid request. \"sha\" wasn't supplied."),
            GitHubErrorKind::Conflict
        );
        assert_eq!(
            classify(Some(422), "Reference already exists"),
            GitHubErrorKind::Conflict
        );
        assert_eq!(classify(Some(429), ""), GitHubErrorKind::Transient);
        assert_eq!(classify(Some(502), "Bad Gateway"), GitHubErrorKind::Transient);
        assert_eq!(classify(Some(401), "Bad credentials"), GitHubErrorKind::Permanent);
    }

    #[test]
    fn forbidden_is_transient_only_when_rate_limited() {
        assert_eq!(
            classify(Some(403), "API rate limit exceeded for user"),
            GitHubErrorKind::Transient
        );
        assert_eq!(
            classify(Some(403), "Resource not accessible by integration"),
            GitHubErrorKind::Permanent
        );
    }

    #[test]
    fn missing_status_uses_message() {
        assert_eq!(classify(None, "connection reset"), GitHubErrorKind::Transient);
        assert_eq!(classify(None, "request timed out"), GitHubErrorKind::Transient);
        assert_eq!(classify(None, "invalid JSON"), GitHubErrorKind::Permanent);
    }

    #[test]
    fn rate_limit_detection() {
        assert!(is_rate_limit_error("API rate limit exceeded"));
        assert!(is_rate_limit_error("secondary rate limit"));
        assert!(is_rate_limit_error("abuse detection mechanism"));
        assert!(!is_rate_limit_error("Permission denied"));
    }

    #[test]
    fn error_kind_retriable() {
        assert!(GitHubErrorKind::Transient.is_retriable());
        assert!(!GitHubErrorKind::Permanent.is_retriable());
        assert!(!GitHubErrorKind::NotFound.is_retriable());
        assert!(!GitHubErrorKind::Conflict.is_retriable());
    }

    #[test]
    fn display_includes_status_when_known() {
        let mut err = GitHubApiError::conflict("Reference already exists");
        assert_eq!(err.to_string(), "GitHub API error: Reference already exists");
        err.status_code = Some(422);
        assert_eq!(
            err.to_string(),
            "GitHub API error (HTTP 422): Reference already exists"
        );
    }
}

//! GitHub API client and effect interpreters.
//!
//! This module executes the effects defined in `crate::effects` via the
//! octocrab library.
//!
//! Key features:
//! - Errors classified as NotFound / Conflict / Transient / Permanent
//! - Exponential backoff retry for transient failures of idempotent reads
//! - One shared octocrab instance per run, viewed through org- and repo-scoped
//!   wrappers

mod client;
mod error;
mod interpreter;
mod retry;

pub use client::{OctocrabClient, OrgClient, build_octocrab};
pub use error::{GitHubApiError, GitHubErrorKind, classify};
pub use interpreter::encode_path;
pub use retry::{RetryConfig, RetryPolicy, RetryResult, retry_with_backoff};

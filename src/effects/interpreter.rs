//! Effect interpreter traits.
//!
//! These traits define how effects are executed. The octocrab-backed
//! implementations live in `crate::github`; `crate::test_utils` provides an
//! in-memory implementation for tests.

use std::future::Future;

use super::github::{GitHubEffect, GitHubResponse};
use super::org::{OrgEffect, OrgResponse};
use crate::github::GitHubApiError;

/// Interprets repository-scoped GitHub effects.
///
/// Implementations are constructed with a `RepoId`, so all effects executed
/// through a single interpreter instance are scoped to that repository. A
/// branch transaction only ever sees its own repository's interpreter.
pub trait GitHubInterpreter {
    /// Execute a GitHub effect and return its response.
    fn interpret(
        &self,
        effect: GitHubEffect,
    ) -> impl Future<Output = Result<GitHubResponse, GitHubApiError>> + Send;
}

/// Interprets organization-scoped GitHub effects.
pub trait OrgInterpreter {
    /// The organization this interpreter targets.
    fn organization(&self) -> &str;

    /// Execute an organization effect and return its response.
    fn interpret(
        &self,
        effect: OrgEffect,
    ) -> impl Future<Output = Result<OrgResponse, GitHubApiError>> + Send;
}

//! Octocrab client wrappers scoped to an organization or a repository.
//!
//! The underlying `Octocrab` instance is built once per run and shared by
//! reference-counted clone; every wrapper is a cheap view that fixes the
//! owner (and repository) its effects target.

use octocrab::Octocrab;

use super::retry::RetryPolicy;
use crate::types::RepoId;

/// Builds the shared octocrab instance for a run.
///
/// `api_url` overrides the API base URI for GitHub Enterprise hosts.
pub fn build_octocrab(token: impl Into<String>, api_url: Option<&str>) -> octocrab::Result<Octocrab> {
    let mut builder = Octocrab::builder().personal_token(token.into());
    if let Some(url) = api_url {
        builder = builder.base_uri(url)?;
    }
    builder.build()
}

/// A GitHub API client scoped to an organization.
#[derive(Clone)]
pub struct OrgClient {
    client: Octocrab,
    org: String,
    retry_policy: RetryPolicy,
}

impl OrgClient {
    pub fn new(client: Octocrab, org: impl Into<String>) -> Self {
        Self {
            client,
            org: org.into(),
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn inner(&self) -> &Octocrab {
        &self.client
    }

    pub fn org(&self) -> &str {
        &self.org
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    /// Returns a client scoped to one of this organization's repositories.
    pub fn repo(&self, name: impl Into<String>) -> OctocrabClient {
        OctocrabClient::new(self.client.clone(), RepoId::new(self.org.clone(), name))
            .with_retry_policy(self.retry_policy)
    }
}

impl std::fmt::Debug for OrgClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrgClient")
            .field("org", &self.org)
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

/// A GitHub API client scoped to a specific repository.
///
/// All operations performed through this client target the same repository,
/// matching the design where `GitHubEffect` variants don't include repo info.
#[derive(Clone)]
pub struct OctocrabClient {
    client: Octocrab,
    repo: RepoId,
    retry_policy: RetryPolicy,
}

impl OctocrabClient {
    pub fn new(client: Octocrab, repo: RepoId) -> Self {
        Self {
            client,
            repo,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn inner(&self) -> &Octocrab {
        &self.client
    }

    pub fn repo(&self) -> &RepoId {
        &self.repo
    }

    pub fn owner(&self) -> &str {
        &self.repo.owner
    }

    pub fn repo_name(&self) -> &str {
        &self.repo.repo
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }
}

impl std::fmt::Debug for OctocrabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OctocrabClient")
            .field("repo", &self.repo)
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

//! GitHub effect interpreters using octocrab.
//!
//! Key implementation details:
//! - Refs and contents go through the REST routes directly so responses
//!   deserialize into the few fields we need
//! - A 404 on a content lookup is the normal "no file here" answer, not an error
//! - Only idempotent effects are retried on transient errors

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use octocrab::params::repos::Reference;
use serde::{Deserialize, Serialize};

use crate::effects::{
    GitHubEffect, GitHubInterpreter, GitHubResponse, OrgEffect, OrgInterpreter, OrgResponse,
};
use crate::types::{BlobId, PrNumber, RepositoryTarget, Sha};

use super::client::{OctocrabClient, OrgClient};
use super::error::GitHubApiError;
use super::retry::{RetryConfig, RetryPolicy, retry_with_backoff};

/// Page size for paginated listings (GitHub's maximum).
const PAGE_SIZE: usize = 100;

// ─── Interpreter Implementations ──────────────────────────────────────────────

impl GitHubInterpreter for OctocrabClient {
    async fn interpret(&self, effect: GitHubEffect) -> Result<GitHubResponse, GitHubApiError> {
        let policy = if effect.is_idempotent() {
            self.retry_policy()
        } else {
            RetryPolicy::NoRetry
        };
        tracing::debug!(repo = %self.repo(), effect = effect.name(), "Executing GitHub effect");

        retry_with_backoff(RetryConfig::DEFAULT, policy, || {
            execute_effect(self, effect.clone())
        })
        .await
        .into_result()
    }
}

impl OrgInterpreter for OrgClient {
    fn organization(&self) -> &str {
        self.org()
    }

    async fn interpret(&self, effect: OrgEffect) -> Result<OrgResponse, GitHubApiError> {
        tracing::debug!(org = self.org(), ?effect, "Executing organization effect");

        retry_with_backoff(RetryConfig::DEFAULT, self.retry_policy(), || {
            execute_org_effect(self, effect.clone())
        })
        .await
        .into_result()
    }
}

/// Executes a single repository effect without retry logic.
async fn execute_effect(
    client: &OctocrabClient,
    effect: GitHubEffect,
) -> Result<GitHubResponse, GitHubApiError> {
    match effect {
        GitHubEffect::GetDefaultBranch => get_default_branch(client).await,
        GitHubEffect::GetBranchHead { branch } => get_branch_head(client, &branch).await,
        GitHubEffect::GetFileBlobId { path, branch } => {
            get_file_blob_id(client, &path, &branch).await
        }
        GitHubEffect::CreateRef { branch, sha } => create_ref(client, &branch, &sha).await,
        GitHubEffect::DeleteRef { branch } => delete_ref(client, branch).await,
        GitHubEffect::WriteFile {
            path,
            branch,
            content,
            message,
            existing_blob,
        } => write_file(client, &path, &branch, &content, &message, existing_blob).await,
        GitHubEffect::CreatePullRequest {
            title,
            head,
            base,
            body,
        } => create_pull_request(client, title, head, base, body).await,
    }
}

/// Executes a single organization effect without retry logic.
async fn execute_org_effect(
    client: &OrgClient,
    effect: OrgEffect,
) -> Result<OrgResponse, GitHubApiError> {
    match effect {
        OrgEffect::GetOrganization => get_organization(client).await,
        OrgEffect::ListRepositories => list_repositories(client).await,
    }
}

/// Percent-encodes each segment of a slash-separated path, keeping the slashes.
///
/// This is a pure function extracted for testability.
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn parse_sha(raw: &str, what: &str) -> Result<Sha, GitHubApiError> {
    Sha::parse(raw).map_err(|e| {
        GitHubApiError::permanent_without_source(format!("Invalid {} in response: {}", what, e))
    })
}

// ─── Branches and Refs ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RefResponse {
    #[serde(rename = "ref")]
    ref_name: String,
    object: RefObject,
}

#[derive(Debug, Deserialize)]
struct RefObject {
    sha: String,
}

async fn get_default_branch(client: &OctocrabClient) -> Result<GitHubResponse, GitHubApiError> {
    let repo = client
        .inner()
        .repos(client.owner(), client.repo_name())
        .get()
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    match repo.default_branch {
        Some(branch) if !branch.is_empty() => Ok(GitHubResponse::DefaultBranch(branch)),
        _ => Err(GitHubApiError::not_found(format!(
            "{} has no default branch",
            client.repo()
        ))),
    }
}

async fn get_branch_head(
    client: &OctocrabClient,
    branch: &str,
) -> Result<GitHubResponse, GitHubApiError> {
    let url = format!(
        "/repos/{}/{}/git/ref/heads/{}",
        client.owner(),
        client.repo_name(),
        encode_path(branch)
    );

    let response: RefResponse = client
        .inner()
        .get(&url, None::<&()>)
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    Ok(GitHubResponse::BranchHead(parse_sha(
        &response.object.sha,
        "branch head SHA",
    )?))
}

async fn create_ref(
    client: &OctocrabClient,
    branch: &str,
    sha: &Sha,
) -> Result<GitHubResponse, GitHubApiError> {
    let url = format!("/repos/{}/{}/git/refs", client.owner(), client.repo_name());

    #[derive(Serialize)]
    struct CreateRefRequest<'a> {
        #[serde(rename = "ref")]
        ref_name: String,
        sha: &'a str,
    }

    let request = CreateRefRequest {
        ref_name: format!("refs/heads/{}", branch),
        sha: sha.as_str(),
    };

    let response: RefResponse = client
        .inner()
        .post(&url, Some(&request))
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    Ok(GitHubResponse::RefCreated {
        ref_name: response.ref_name,
    })
}

async fn delete_ref(
    client: &OctocrabClient,
    branch: String,
) -> Result<GitHubResponse, GitHubApiError> {
    client
        .inner()
        .repos(client.owner(), client.repo_name())
        .delete_ref(&Reference::Branch(branch))
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    Ok(GitHubResponse::RefDeleted)
}

// ─── Contents ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ContentResponse {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    content: ContentResponse,
    commit: RefObject,
}

async fn get_file_blob_id(
    client: &OctocrabClient,
    path: &str,
    branch: &str,
) -> Result<GitHubResponse, GitHubApiError> {
    let url = format!(
        "/repos/{}/{}/contents/{}",
        client.owner(),
        client.repo_name(),
        encode_path(path)
    );

    #[derive(Serialize)]
    struct ContentQuery {
        #[serde(rename = "ref")]
        ref_name: String,
    }

    let query = ContentQuery {
        ref_name: format!("refs/heads/{}", branch),
    };

    let result: Result<ContentResponse, _> = client.inner().get(&url, Some(&query)).await;

    match result {
        Ok(content) => Ok(GitHubResponse::FileBlobId(Some(BlobId::new(content.sha)))),
        Err(e) => {
            let err = GitHubApiError::from_octocrab(e);
            if err.is_not_found() {
                Ok(GitHubResponse::FileBlobId(None))
            } else {
                Err(err)
            }
        }
    }
}

async fn write_file(
    client: &OctocrabClient,
    path: &str,
    branch: &str,
    content: &[u8],
    message: &str,
    existing_blob: Option<BlobId>,
) -> Result<GitHubResponse, GitHubApiError> {
    let url = format!(
        "/repos/{}/{}/contents/{}",
        client.owner(),
        client.repo_name(),
        encode_path(path)
    );

    #[derive(Serialize)]
    struct WriteRequest<'a> {
        message: &'a str,
        content: String,
        branch: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        sha: Option<String>,
    }

    let request = WriteRequest {
        message,
        content: BASE64.encode(content),
        branch,
        sha: existing_blob.map(|b| b.0),
    };

    let response: WriteResponse = client
        .inner()
        .put(&url, Some(&request))
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    Ok(GitHubResponse::FileWritten {
        blob: BlobId::new(response.content.sha),
        commit: parse_sha(&response.commit.sha, "commit SHA")?,
    })
}

// ─── Pull Requests ────────────────────────────────────────────────────────────

async fn create_pull_request(
    client: &OctocrabClient,
    title: String,
    head: String,
    base: String,
    body: String,
) -> Result<GitHubResponse, GitHubApiError> {
    let pull = client
        .inner()
        .pulls(client.owner(), client.repo_name())
        .create(title, head, base)
        .body(body)
        .send()
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    Ok(GitHubResponse::PullRequestOpened {
        number: PrNumber(pull.number),
        url: pull.html_url.map(|u| u.to_string()),
    })
}

// ─── Organization ─────────────────────────────────────────────────────────────

async fn get_organization(client: &OrgClient) -> Result<OrgResponse, GitHubApiError> {
    let org = client
        .inner()
        .orgs(client.org())
        .get()
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    Ok(OrgResponse::Organization { login: org.login })
}

async fn list_repositories(client: &OrgClient) -> Result<OrgResponse, GitHubApiError> {
    let url = format!("/orgs/{}/repos", urlencoding::encode(client.org()));

    #[derive(Serialize)]
    struct ListQuery {
        #[serde(rename = "type")]
        kind: &'static str,
        per_page: usize,
        page: u32,
    }

    let mut page = 1u32;
    let mut all_repos = Vec::new();

    loop {
        let query = ListQuery {
            kind: "all",
            per_page: PAGE_SIZE,
            page,
        };
        let items: Vec<RepositoryTarget> = client
            .inner()
            .get(&url, Some(&query))
            .await
            .map_err(GitHubApiError::from_octocrab)?;

        let is_last_page = items.len() < PAGE_SIZE;
        all_repos.extend(items);

        if is_last_page {
            break;
        }
        page += 1;
    }

    Ok(OrgResponse::Repositories(all_repos))
}

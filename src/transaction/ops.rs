//! Typed wrappers over repository effects.
//!
//! Each wrapper interprets one effect and unpacks the matching response
//! variant. A mismatched variant means the interpreter is broken and is
//! reported as a permanent error.

use crate::effects::{GitHubEffect, GitHubInterpreter, GitHubResponse};
use crate::github::GitHubApiError;
use crate::types::{BlobId, PrNumber, Sha};

fn unexpected(effect: &'static str, response: GitHubResponse) -> GitHubApiError {
    GitHubApiError::permanent_without_source(format!(
        "unexpected response to {}: {:?}",
        effect, response
    ))
}

async fn interpret<I: GitHubInterpreter>(
    interpreter: &I,
    effect: GitHubEffect,
) -> Result<(&'static str, GitHubResponse), GitHubApiError> {
    let name = effect.name();
    let response = interpreter.interpret(effect).await?;
    Ok((name, response))
}

pub async fn default_branch<I: GitHubInterpreter>(interpreter: &I) -> Result<String, GitHubApiError> {
    match interpret(interpreter, GitHubEffect::GetDefaultBranch).await? {
        (_, GitHubResponse::DefaultBranch(branch)) => Ok(branch),
        (effect, other) => Err(unexpected(effect, other)),
    }
}

pub async fn branch_head<I: GitHubInterpreter>(
    interpreter: &I,
    branch: &str,
) -> Result<Sha, GitHubApiError> {
    let effect = GitHubEffect::GetBranchHead {
        branch: branch.to_string(),
    };
    match interpret(interpreter, effect).await? {
        (_, GitHubResponse::BranchHead(sha)) => Ok(sha),
        (effect, other) => Err(unexpected(effect, other)),
    }
}

pub async fn create_ref<I: GitHubInterpreter>(
    interpreter: &I,
    branch: &str,
    sha: &Sha,
) -> Result<String, GitHubApiError> {
    let effect = GitHubEffect::CreateRef {
        branch: branch.to_string(),
        sha: sha.clone(),
    };
    match interpret(interpreter, effect).await? {
        (_, GitHubResponse::RefCreated { ref_name }) => Ok(ref_name),
        (effect, other) => Err(unexpected(effect, other)),
    }
}

pub async fn delete_ref<I: GitHubInterpreter>(
    interpreter: &I,
    branch: &str,
) -> Result<(), GitHubApiError> {
    let effect = GitHubEffect::DeleteRef {
        branch: branch.to_string(),
    };
    match interpret(interpreter, effect).await? {
        (_, GitHubResponse::RefDeleted) => Ok(()),
        (effect, other) => Err(unexpected(effect, other)),
    }
}

pub async fn file_blob_id<I: GitHubInterpreter>(
    interpreter: &I,
    path: &str,
    branch: &str,
) -> Result<Option<BlobId>, GitHubApiError> {
    let effect = GitHubEffect::GetFileBlobId {
        path: path.to_string(),
        branch: branch.to_string(),
    };
    match interpret(interpreter, effect).await? {
        (_, GitHubResponse::FileBlobId(blob)) => Ok(blob),
        (effect, other) => Err(unexpected(effect, other)),
    }
}

pub async fn write_file<I: GitHubInterpreter>(
    interpreter: &I,
    path: &str,
    branch: &str,
    content: &[u8],
    existing_blob: Option<BlobId>,
) -> Result<(BlobId, Sha), GitHubApiError> {
    let effect = GitHubEffect::WriteFile {
        path: path.to_string(),
        branch: branch.to_string(),
        content: content.to_vec(),
        message: format!("Add {}", path),
        existing_blob,
    };
    match interpret(interpreter, effect).await? {
        (_, GitHubResponse::FileWritten { blob, commit }) => Ok((blob, commit)),
        (effect, other) => Err(unexpected(effect, other)),
    }
}

pub async fn create_pull_request<I: GitHubInterpreter>(
    interpreter: &I,
    title: &str,
    head: &str,
    base: &str,
    body: &str,
) -> Result<(PrNumber, Option<String>), GitHubApiError> {
    let effect = GitHubEffect::CreatePullRequest {
        title: title.to_string(),
        head: head.to_string(),
        base: base.to_string(),
        body: body.to_string(),
    };
    match interpret(interpreter, effect).await? {
        (_, GitHubResponse::PullRequestOpened { number, url }) => Ok((number, url)),
        (effect, other) => Err(unexpected(effect, other)),
    }
}

//! Repository-scoped GitHub API effect types.
//!
//! These types describe hosting-service operations as data, without executing
//! them. The interpreter in `crate::github` executes them against the real API;
//! tests execute them against an in-memory repository model.

use serde::{Deserialize, Serialize};

use crate::types::{BlobId, PrNumber, Sha};

/// A GitHub API effect against a single repository.
///
/// Effects are repo-scoped: the interpreter is constructed with a `RepoId`, so
/// effects don't include it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GitHubEffect {
    // ─── Reads ────────────────────────────────────────────────────────────────
    /// Fetch the repository's default branch name.
    GetDefaultBranch,

    /// Fetch the commit SHA at the head of a branch.
    GetBranchHead { branch: String },

    /// Look up the blob id of the file at `path` on `branch`.
    ///
    /// Absence of the file is a normal outcome, not an error.
    GetFileBlobId { path: String, branch: String },

    // ─── Mutations ────────────────────────────────────────────────────────────
    /// Create `refs/heads/{branch}` pointing at `sha`.
    CreateRef { branch: String, sha: Sha },

    /// Delete `refs/heads/{branch}`.
    DeleteRef { branch: String },

    /// Write a file to a branch as a single commit.
    ///
    /// When `existing_blob` is set the write updates that blob; otherwise it is
    /// a create and is rejected if content already exists at `path`.
    WriteFile {
        path: String,
        branch: String,
        content: Vec<u8>,
        message: String,
        existing_blob: Option<BlobId>,
    },

    /// Open a pull request from `head` into `base`.
    CreatePullRequest {
        title: String,
        head: String,
        base: String,
        body: String,
    },
}

impl GitHubEffect {
    /// Returns true if executing this effect twice has the same observable
    /// result as executing it once.
    ///
    /// Only idempotent effects are retried on transient failures: a retried
    /// create whose first response was lost would otherwise report a
    /// spurious conflict.
    pub fn is_idempotent(&self) -> bool {
        matches!(
            self,
            GitHubEffect::GetDefaultBranch
                | GitHubEffect::GetBranchHead { .. }
                | GitHubEffect::GetFileBlobId { .. }
        )
    }

    /// Returns a short, stable name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            GitHubEffect::GetDefaultBranch => "get_default_branch",
            GitHubEffect::GetBranchHead { .. } => "get_branch_head",
            GitHubEffect::GetFileBlobId { .. } => "get_file_blob_id",
            GitHubEffect::CreateRef { .. } => "create_ref",
            GitHubEffect::DeleteRef { .. } => "delete_ref",
            GitHubEffect::WriteFile { .. } => "write_file",
            GitHubEffect::CreatePullRequest { .. } => "create_pull_request",
        }
    }
}

// ─── Response Types ───────────────────────────────────────────────────────────

/// Response from a GitHub effect.
///
/// Each variant corresponds to the response from a particular effect type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum GitHubResponse {
    /// Response to `GetDefaultBranch`.
    DefaultBranch(String),

    /// Response to `GetBranchHead`.
    BranchHead(Sha),

    /// Response to `GetFileBlobId`; `None` when no file exists at the path.
    FileBlobId(Option<BlobId>),

    /// Response to `CreateRef`.
    RefCreated {
        /// The fully qualified ref name, e.g. `refs/heads/topic`.
        ref_name: String,
    },

    /// Response to `DeleteRef`.
    RefDeleted,

    /// Response to `WriteFile`.
    FileWritten {
        /// The blob id of the newly written content.
        blob: BlobId,
        /// The commit created by the write.
        commit: Sha,
    },

    /// Response to `CreatePullRequest`.
    PullRequestOpened {
        number: PrNumber,
        /// The browser URL of the pull request, when the API reports one.
        url: Option<String>,
    },
}

//! Branch transaction states, errors and reports.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::github::GitHubApiError;
use crate::types::{BlobId, PrNumber, Sha};

/// The state of a branch transaction.
///
/// ```text
/// Idle → BranchCreated → Committing(0..n) → ProposalOpened
///   │          │               │
///   │          └───────┬───────┘
///   │                  ▼
///   │             RollingBack
///   │                  │
///   └──────────────► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "item", rename_all = "snake_case")]
pub enum TransactionState {
    /// Nothing has been written to the repository.
    Idle,

    /// The topic branch exists; no content has been written yet.
    BranchCreated,

    /// Writing the content item at this index.
    Committing(usize),

    /// The pull request is open. Terminal.
    ProposalOpened,

    /// Deleting the topic branch after a failure.
    RollingBack,

    /// The transaction failed. Terminal.
    Failed,
}

impl TransactionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionState::ProposalOpened | TransactionState::Failed
        )
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionState::Idle => f.write_str("idle"),
            TransactionState::BranchCreated => f.write_str("branch created"),
            TransactionState::Committing(i) => write!(f, "committing item {}", i),
            TransactionState::ProposalOpened => f.write_str("proposal opened"),
            TransactionState::RollingBack => f.write_str("rolling back"),
            TransactionState::Failed => f.write_str("failed"),
        }
    }
}

/// The step of a transaction that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    ResolveBase,
    CreateBranch,
    CommitContent,
    OpenProposal,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::ResolveBase => "resolve_base",
            Step::CreateBranch => "create_branch",
            Step::CommitContent => "commit_content",
            Step::OpenProposal => "open_proposal",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a branch transaction failed.
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("base branch {branch:?} not found")]
    BaseNotFound {
        branch: String,
        #[source]
        source: GitHubApiError,
    },

    #[error("failed to resolve base branch: {source}")]
    BaseResolution {
        #[source]
        source: GitHubApiError,
    },

    #[error(
        "topic branch {branch:?} already exists; delete it or choose another topic branch name: {source}"
    )]
    BranchExists {
        branch: String,
        #[source]
        source: GitHubApiError,
    },

    #[error("failed to create topic branch {branch:?}: {source}")]
    BranchCreation {
        branch: String,
        #[source]
        source: GitHubApiError,
    },

    #[error(
        "repository {repo} already has content with path {path} in branch {branch}; the --update-existing option must be used to update content"
    )]
    ContentConflict {
        repo: String,
        path: String,
        branch: String,
        #[source]
        source: GitHubApiError,
    },

    #[error("failed to write {path}: {source}")]
    WriteFailure {
        path: String,
        #[source]
        source: GitHubApiError,
    },

    #[error("failed to open pull request: {source}")]
    ProposalFailure {
        #[source]
        source: GitHubApiError,
    },

    #[error("cancelled before {step}")]
    Cancelled { step: Step },
}

impl TransactionError {
    /// The step at which the transaction failed.
    pub fn step(&self) -> Step {
        match self {
            TransactionError::BaseNotFound { .. } | TransactionError::BaseResolution { .. } => {
                Step::ResolveBase
            }
            TransactionError::BranchExists { .. } | TransactionError::BranchCreation { .. } => {
                Step::CreateBranch
            }
            TransactionError::ContentConflict { .. } | TransactionError::WriteFailure { .. } => {
                Step::CommitContent
            }
            TransactionError::ProposalFailure { .. } => Step::OpenProposal,
            TransactionError::Cancelled { step } => *step,
        }
    }
}

/// Whether a content write created a new file or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteAction {
    Created,
    Updated,
}

/// A successfully committed content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemOutcome {
    pub path: String,
    pub action: WriteAction,
    pub blob: BlobId,
    pub commit: Sha,
}

/// An opened pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Proposal {
    pub number: PrNumber,
    pub url: Option<String>,
}

/// What happened to the topic branch after a failure.
#[derive(Debug)]
pub enum Rollback {
    /// No rollback was needed: the branch was never created, or nothing failed.
    NotNeeded,

    /// The topic branch was deleted.
    Deleted,

    /// Deleting the topic branch failed; the branch may be orphaned.
    Failed(GitHubApiError),
}

/// The result of one repository's branch transaction.
#[derive(Debug)]
pub struct TransactionReport {
    /// The repository name.
    pub repo: String,

    /// The terminal state: `ProposalOpened` or `Failed`.
    pub state: TransactionState,

    /// The resolved base branch, if resolution got that far.
    pub base_branch: Option<String>,

    /// The base commit the topic branch was created from.
    pub base_sha: Option<Sha>,

    /// The created topic ref (e.g. `refs/heads/git-file-adder`), if any.
    pub topic_ref: Option<String>,

    /// Items committed before completion or failure, in commit order.
    pub items: Vec<ItemOutcome>,

    pub outcome: Result<Proposal, TransactionError>,

    pub rollback: Rollback,
}

impl TransactionReport {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }
}

//! The batch orchestrator.
//!
//! A run looks up the organization, lists and selects its repositories, and
//! then drives one branch transaction per selected repository, in order. Each
//! transaction report is folded into a `BatchResult`; per-repository failures
//! never abort the batch. Only failures before the batch starts do.

use std::fmt;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{ConfigError, FileAdditionRequest};
use crate::effects::{GitHubInterpreter, OrgEffect, OrgInterpreter, OrgResponse};
use crate::github::GitHubApiError;
use crate::selector::select;
use crate::staging::StagedContent;
use crate::transaction::{
    Proposal, Rollback, TransactionError, TransactionReport, run_transaction,
};
use crate::types::RepositoryTarget;

/// Failures that abort a run before any repository is touched.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("organization not found: {organization}")]
    OrganizationNotFound {
        organization: String,
        #[source]
        source: GitHubApiError,
    },

    #[error("failed to look up organization {organization}: {source}")]
    Organization {
        organization: String,
        #[source]
        source: GitHubApiError,
    },

    #[error("failed to list repositories of {organization}: {source}")]
    Listing {
        organization: String,
        #[source]
        source: GitHubApiError,
    },
}

// ─── Batch Result ───

/// A repository whose transaction failed.
#[derive(Debug)]
pub struct RepoFailure {
    pub repo: String,
    pub error: TransactionError,
}

/// The tally of a batch.
///
/// `succeeded + failed == total` once every selected repository has been
/// recorded.
#[derive(Debug, Default)]
pub struct BatchResult {
    /// Number of repositories that passed selection.
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Failed repositories with their reasons, in processing order.
    pub failures: Vec<RepoFailure>,
    /// Opened pull requests by repository name, in processing order.
    pub proposals: Vec<(String, Proposal)>,
    /// Repositories whose topic branch could not be deleted after a failure.
    pub orphaned: Vec<String>,
}

/// How a finished batch is classified for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every selected repository got a pull request (vacuously true for none).
    Success,
    /// No selected repository got a pull request.
    TotalFailure,
    /// Some repositories failed.
    PartialSuccess { failed: usize },
}

impl BatchResult {
    pub fn new(total: usize) -> Self {
        BatchResult {
            total,
            ..BatchResult::default()
        }
    }

    /// Folds one transaction report into the tally.
    pub fn record(mut self, report: TransactionReport) -> Self {
        if matches!(report.rollback, Rollback::Failed(_)) {
            self.orphaned.push(report.repo.clone());
        }
        match report.outcome {
            Ok(proposal) => {
                self.succeeded += 1;
                self.proposals.push((report.repo, proposal));
            }
            Err(error) => {
                self.failed += 1;
                self.failures.push(RepoFailure {
                    repo: report.repo,
                    error,
                });
            }
        }
        self
    }

    pub fn outcome(&self) -> BatchOutcome {
        if self.succeeded == self.total {
            BatchOutcome::Success
        } else if self.succeeded == 0 {
            BatchOutcome::TotalFailure
        } else {
            BatchOutcome::PartialSuccess {
                failed: self.failed,
            }
        }
    }

    /// Renders the one-line summary for `organization`.
    pub fn summary<'a>(&'a self, organization: &'a str) -> Summary<'a> {
        Summary {
            result: self,
            organization,
        }
    }
}

/// The terminal summary line of a batch.
pub struct Summary<'a> {
    result: &'a BatchResult,
    organization: &'a str,
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let succeeded = self.result.succeeded;
        match self.result.outcome() {
            BatchOutcome::Success => write!(
                f,
                "{} pull requests adding files were opened for {}",
                succeeded, self.organization
            ),
            BatchOutcome::TotalFailure => {
                write!(f, "Failed to add files to any repository of {}", self.organization)
            }
            BatchOutcome::PartialSuccess { failed } => write!(
                f,
                "{} pull requests adding files were opened for {}; {} repositories failed",
                succeeded, self.organization, failed
            ),
        }
    }
}

/// Logs the summary at a level matching the outcome.
pub fn log_summary(result: &BatchResult, organization: &str) {
    for failure in &result.failures {
        warn!(repo = %failure.repo, step = %failure.error.step(), error = %failure.error, "Repository failed");
    }
    for repo in &result.orphaned {
        error!(%repo, "Topic branch was left behind and must be deleted by hand");
    }

    let summary = result.summary(organization);
    match result.outcome() {
        BatchOutcome::Success => info!(total = result.total, "{}", summary),
        BatchOutcome::PartialSuccess { .. } => warn!(total = result.total, "{}", summary),
        BatchOutcome::TotalFailure => error!(total = result.total, "{}", summary),
    }
}

// ─── Orchestration ───

/// Runs one branch transaction per repository, sequentially.
///
/// `interpreter_for` yields the repository-scoped interpreter for each
/// target. Once `cancel` fires, remaining repositories are recorded as
/// cancelled without any hosting-service calls.
pub async fn run_batch<I, F>(
    repos: &[RepositoryTarget],
    request: &FileAdditionRequest,
    content: &StagedContent,
    cancel: &CancellationToken,
    mut interpreter_for: F,
) -> BatchResult
where
    I: GitHubInterpreter,
    F: FnMut(&RepositoryTarget) -> I,
{
    let mut result = BatchResult::new(repos.len());
    for repo in repos {
        let interpreter = interpreter_for(repo);
        let report = run_transaction(&interpreter, repo, request, content, cancel).await;
        result = result.record(report);
    }
    result
}

/// Performs a whole run against one organization.
///
/// Validates the request, confirms the organization exists, lists and selects
/// repositories, then runs the batch and logs its summary. Nothing is written
/// when this returns an error.
pub async fn run<O, I, F>(
    org: &O,
    request: &FileAdditionRequest,
    content: &StagedContent,
    cancel: &CancellationToken,
    interpreter_for: F,
) -> Result<BatchResult, RunError>
where
    O: OrgInterpreter,
    I: GitHubInterpreter,
    F: FnMut(&RepositoryTarget) -> I,
{
    request.validate()?;
    let organization = org.organization().to_string();

    let login = match org.interpret(OrgEffect::GetOrganization).await {
        Ok(OrgResponse::Organization { login }) => login,
        Ok(other) => {
            return Err(RunError::Organization {
                source: GitHubApiError::permanent_without_source(format!(
                    "unexpected response: {:?}",
                    other
                )),
                organization,
            });
        }
        Err(source) if source.is_not_found() => {
            error!(org = %organization, "Organization not found");
            return Err(RunError::OrganizationNotFound {
                organization,
                source,
            });
        }
        Err(source) => {
            return Err(RunError::Organization {
                organization,
                source,
            });
        }
    };
    info!(org = %login, "Preparing to add files to organization");
    info!(org = %login, selector = %request.selector, "Fetching repositories");

    let listing = match org.interpret(OrgEffect::ListRepositories).await {
        Ok(OrgResponse::Repositories(repos)) => repos,
        Ok(other) => {
            return Err(RunError::Listing {
                source: GitHubApiError::permanent_without_source(format!(
                    "unexpected response: {:?}",
                    other
                )),
                organization,
            });
        }
        Err(source) => {
            return Err(RunError::Listing {
                organization,
                source,
            });
        }
    };
    info!(count = listing.len(), "Found candidate repositories");

    let selected = select(&listing, &request.selector);
    info!(count = selected.len(), "Found matching repositories");

    let result = run_batch(&selected, request, content, cancel, interpreter_for).await;
    log_summary(&result, &login);
    Ok(result)
}

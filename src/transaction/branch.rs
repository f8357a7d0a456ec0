//! The per-repository branch transaction.
//!
//! A transaction resolves the base branch, creates the topic branch, commits
//! each staged item in order, and opens a pull request. If anything fails after
//! the topic branch exists, the branch is deleted exactly once. A failed
//! rollback is logged and reported but never replaces the original error.

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{FileAdditionRequest, PROPOSAL_BODY};
use crate::effects::GitHubInterpreter;
use crate::github::GitHubApiError;
use crate::staging::{ContentItem, StagedContent};
use crate::types::{RepositoryTarget, Sha};

use super::ops;
use super::state::{
    ItemOutcome, Proposal, Rollback, Step, TransactionError, TransactionReport, TransactionState,
    WriteAction,
};

/// A branch transaction against a single repository.
pub struct BranchTransaction<'a, I> {
    interpreter: &'a I,
    repo: &'a RepositoryTarget,
    request: &'a FileAdditionRequest,
    content: &'a StagedContent,
    cancel: &'a CancellationToken,

    state: TransactionState,
    base_branch: Option<String>,
    base_sha: Option<Sha>,
    topic_ref: Option<String>,
    items: Vec<ItemOutcome>,
}

impl<'a, I: GitHubInterpreter> BranchTransaction<'a, I> {
    pub fn new(
        interpreter: &'a I,
        repo: &'a RepositoryTarget,
        request: &'a FileAdditionRequest,
        content: &'a StagedContent,
        cancel: &'a CancellationToken,
    ) -> Self {
        BranchTransaction {
            interpreter,
            repo,
            request,
            content,
            cancel,
            state: TransactionState::Idle,
            base_branch: None,
            base_sha: None,
            topic_ref: None,
            items: Vec::with_capacity(content.len()),
        }
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    fn transition(&mut self, next: TransactionState) {
        debug!(repo = %self.repo.name, from = %self.state, to = %next, "Transaction state change");
        self.state = next;
    }

    /// Runs the transaction to a terminal state.
    pub async fn run(mut self) -> TransactionReport {
        info!(repo = %self.repo.name, "Adding files");

        let outcome = self.execute().await;
        let rollback = match &outcome {
            Ok(proposal) => {
                self.transition(TransactionState::ProposalOpened);
                info!(
                    repo = %self.repo.name,
                    pr = %proposal.number,
                    url = proposal.url.as_deref().unwrap_or(""),
                    "Created pull request"
                );
                Rollback::NotNeeded
            }
            Err(e) => {
                error!(
                    repo = %self.repo.name,
                    step = %e.step(),
                    state = %self.state,
                    error = %e,
                    "Failed adding files to repository"
                );
                let rollback = self.rollback().await;
                self.transition(TransactionState::Failed);
                rollback
            }
        };

        TransactionReport {
            repo: self.repo.name.clone(),
            state: self.state,
            base_branch: self.base_branch,
            base_sha: self.base_sha,
            topic_ref: self.topic_ref,
            items: self.items,
            outcome,
            rollback,
        }
    }

    fn check_cancelled(&self, step: Step) -> Result<(), TransactionError> {
        if self.cancel.is_cancelled() {
            warn!(repo = %self.repo.name, %step, "Cancellation observed");
            return Err(TransactionError::Cancelled { step });
        }
        Ok(())
    }

    async fn execute(&mut self) -> Result<Proposal, TransactionError> {
        self.check_cancelled(Step::ResolveBase)?;
        let (base_branch, base_sha) = self.resolve_base().await?;

        self.check_cancelled(Step::CreateBranch)?;
        self.create_branch(&base_sha).await?;

        let (request, content) = (self.request, self.content);
        let topic = request.topic_branch.as_str();
        for (index, item) in content.items().iter().enumerate() {
            self.check_cancelled(Step::CommitContent)?;
            self.transition(TransactionState::Committing(index));
            let outcome = self.commit_item(item, topic).await?;
            debug!(
                repo = %self.repo.name,
                path = %outcome.path,
                action = ?outcome.action,
                commit = outcome.commit.short(),
                "Committed content"
            );
            self.items.push(outcome);
        }

        self.check_cancelled(Step::OpenProposal)?;
        self.open_proposal(&base_branch).await
    }

    /// Step 1: the base branch is the override, else the repository default.
    async fn resolve_base(&mut self) -> Result<(String, Sha), TransactionError> {
        let branch = match &self.request.base_branch {
            Some(branch) => branch.clone(),
            None if !self.repo.default_branch.is_empty() => self.repo.default_branch.clone(),
            None => ops::default_branch(self.interpreter)
                .await
                .map_err(|source| TransactionError::BaseResolution { source })?,
        };
        self.base_branch = Some(branch.clone());

        let sha = ops::branch_head(self.interpreter, &branch)
            .await
            .map_err(|source| {
                if source.is_not_found() {
                    TransactionError::BaseNotFound {
                        branch: branch.clone(),
                        source,
                    }
                } else {
                    TransactionError::BaseResolution { source }
                }
            })?;
        debug!(repo = %self.repo.name, base = %branch, sha = sha.short(), "Resolved base");
        self.base_sha = Some(sha.clone());

        Ok((branch, sha))
    }

    /// Step 2: an existing topic branch is fatal; the run is not idempotent.
    async fn create_branch(&mut self, base_sha: &Sha) -> Result<(), TransactionError> {
        let request = self.request;
        let branch = request.topic_branch.as_str();
        let source = match ops::create_ref(self.interpreter, branch, base_sha).await {
            Ok(ref_name) => {
                self.topic_ref = Some(ref_name);
                self.transition(TransactionState::BranchCreated);
                return Ok(());
            }
            Err(source) => source,
        };

        // A conflict also covers invalid ref names, so check the branch is there.
        let exists = source.is_conflict()
            && match ops::branch_head(self.interpreter, branch).await {
                Ok(_) => true,
                Err(lookup) => {
                    debug!(repo = %self.repo.name, %branch, error = %lookup, "Topic branch lookup failed");
                    false
                }
            };
        let branch = branch.to_string();
        Err(if exists {
            TransactionError::BranchExists { branch, source }
        } else {
            TransactionError::BranchCreation { branch, source }
        })
    }

    /// Step 3, for one item, under the configured conflict policy.
    async fn commit_item(
        &self,
        item: &ContentItem,
        topic: &str,
    ) -> Result<ItemOutcome, TransactionError> {
        let write_failure = |source: GitHubApiError| TransactionError::WriteFailure {
            path: item.path.clone(),
            source,
        };

        if self.request.update_existing {
            let existing = ops::file_blob_id(self.interpreter, &item.path, topic)
                .await
                .map_err(write_failure)?;
            let action = match existing {
                Some(_) => WriteAction::Updated,
                None => WriteAction::Created,
            };
            let (blob, commit) =
                ops::write_file(self.interpreter, &item.path, topic, &item.content, existing)
                    .await
                    .map_err(write_failure)?;
            return Ok(ItemOutcome {
                path: item.path.clone(),
                action,
                blob,
                commit,
            });
        }

        match ops::write_file(self.interpreter, &item.path, topic, &item.content, None).await {
            Ok((blob, commit)) => Ok(ItemOutcome {
                path: item.path.clone(),
                action: WriteAction::Created,
                blob,
                commit,
            }),
            Err(source) if source.is_conflict() => {
                // The lookup only sharpens the error message.
                match ops::file_blob_id(self.interpreter, &item.path, topic).await {
                    Ok(Some(_)) => Err(TransactionError::ContentConflict {
                        repo: self.repo.name.clone(),
                        path: item.path.clone(),
                        branch: topic.to_string(),
                        source,
                    }),
                    Ok(None) => Err(write_failure(source)),
                    Err(lookup) => {
                        debug!(repo = %self.repo.name, path = %item.path, error = %lookup, "Conflict lookup failed");
                        Err(write_failure(source))
                    }
                }
            }
            Err(source) => Err(write_failure(source)),
        }
    }

    /// Step 4.
    async fn open_proposal(&self, base_branch: &str) -> Result<Proposal, TransactionError> {
        let title = self.request.proposal_title(self.content.file_names());
        let (number, url) = ops::create_pull_request(
            self.interpreter,
            &title,
            &self.request.topic_branch,
            base_branch,
            PROPOSAL_BODY,
        )
        .await
        .map_err(|source| TransactionError::ProposalFailure { source })?;

        Ok(Proposal { number, url })
    }

    /// Step 5: runs even when cancelled, so no topic branch is left behind.
    async fn rollback(&mut self) -> Rollback {
        if self.topic_ref.is_none() {
            return Rollback::NotNeeded;
        }
        self.transition(TransactionState::RollingBack);

        let branch = &self.request.topic_branch;
        match ops::delete_ref(self.interpreter, branch).await {
            Ok(()) => {
                info!(repo = %self.repo.name, %branch, "Cleaned up by deleting topic branch");
                Rollback::Deleted
            }
            Err(e) => {
                error!(
                    repo = %self.repo.name,
                    %branch,
                    error = %e,
                    "Failed to clean up by deleting topic branch"
                );
                Rollback::Failed(e)
            }
        }
    }
}

/// Runs a branch transaction for one repository.
pub async fn run_transaction<I: GitHubInterpreter>(
    interpreter: &I,
    repo: &RepositoryTarget,
    request: &FileAdditionRequest,
    content: &StagedContent,
    cancel: &CancellationToken,
) -> TransactionReport {
    BranchTransaction::new(interpreter, repo, request, content, cancel)
        .run()
        .await
}

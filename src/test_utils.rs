//! Shared test utilities: in-memory hosting-service models and generators.
//!
//! `MockRepo` models a single remote repository (branches, files, pull
//! requests) closely enough to exercise the branch transaction, and records
//! every effect it is asked to interpret. Failures can be injected per effect.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use proptest::prelude::*;

use crate::effects::{
    GitHubEffect, GitHubInterpreter, GitHubResponse, OrgEffect, OrgInterpreter, OrgResponse,
};
use crate::github::{GitHubApiError, GitHubErrorKind};
use crate::types::{BlobId, PrNumber, RepositoryTarget, Sha};

type EffectMatcher = Box<dyn Fn(&GitHubEffect) -> bool + Send + Sync>;

struct InjectedFailure {
    matches: EffectMatcher,
    kind: GitHubErrorKind,
    message: String,
}

#[derive(Debug, Clone)]
struct MockBranch {
    head: Sha,
    files: BTreeMap<String, (BlobId, Vec<u8>)>,
}

/// A pull request opened against a `MockRepo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockPull {
    pub number: PrNumber,
    pub title: String,
    pub head: String,
    pub base: String,
    pub body: String,
}

#[derive(Default)]
struct MockState {
    default_branch: String,
    branches: HashMap<String, MockBranch>,
    pulls: Vec<MockPull>,
    calls: Vec<GitHubEffect>,
    failures: Vec<InjectedFailure>,
    counter: u64,
}

impl MockState {
    fn next_hex(&mut self) -> String {
        self.counter += 1;
        format!("{:040x}", self.counter)
    }
}

/// An in-memory repository implementing `GitHubInterpreter`.
///
/// Clones share state, so a test can hand a clone to the code under test and
/// inspect the original afterwards.
#[derive(Clone)]
pub struct MockRepo {
    state: Arc<Mutex<MockState>>,
}

impl MockRepo {
    /// Creates a repository with a single default branch and no files.
    pub fn new(default_branch: &str) -> Self {
        let mut state = MockState {
            default_branch: default_branch.to_string(),
            ..MockState::default()
        };
        let head = Sha::parse(state.next_hex()).unwrap();
        state.branches.insert(
            default_branch.to_string(),
            MockBranch {
                head,
                files: BTreeMap::new(),
            },
        );
        MockRepo {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Adds a branch forked from `from`.
    pub fn with_branch(self, name: &str, from: &str) -> Self {
        {
            let mut state = self.lock();
            let branch = state.branches[from].clone();
            state.branches.insert(name.to_string(), branch);
        }
        self
    }

    /// Adds a file to an existing branch without recording an effect.
    pub fn with_file(self, branch: &str, path: &str, content: &[u8]) -> Self {
        {
            let mut state = self.lock();
            let blob = BlobId::new(state.next_hex());
            state
                .branches
                .get_mut(branch)
                .unwrap()
                .files
                .insert(path.to_string(), (blob, content.to_vec()));
        }
        self
    }

    /// Fails every effect matching `matches` with an error of `kind`.
    pub fn fail_when(
        self,
        matches: impl Fn(&GitHubEffect) -> bool + Send + Sync + 'static,
        kind: GitHubErrorKind,
        message: &str,
    ) -> Self {
        self.lock().failures.push(InjectedFailure {
            matches: Box::new(matches),
            kind,
            message: message.to_string(),
        });
        self
    }

    /// Fails content writes to `path`.
    pub fn fail_write_to(self, path: &str, kind: GitHubErrorKind) -> Self {
        let path = path.to_string();
        self.fail_when(
            move |e| matches!(e, GitHubEffect::WriteFile { path: p, .. } if *p == path),
            kind,
            "write rejected",
        )
    }

    /// Fails effects with the given `GitHubEffect::name`.
    pub fn fail_effect(self, name: &'static str, kind: GitHubErrorKind) -> Self {
        self.fail_when(move |e| e.name() == name, kind, "injected failure")
    }

    /// Every effect interpreted so far, in order.
    pub fn calls(&self) -> Vec<GitHubEffect> {
        self.lock().calls.clone()
    }

    /// Names of the effects interpreted so far, in order.
    pub fn call_names(&self) -> Vec<&'static str> {
        self.lock().calls.iter().map(GitHubEffect::name).collect()
    }

    /// Paths passed to `WriteFile`, in order.
    pub fn write_paths(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|e| match e {
                GitHubEffect::WriteFile { path, .. } => Some(path.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of interpreted effects with the given name.
    pub fn count(&self, name: &str) -> usize {
        self.lock().calls.iter().filter(|e| e.name() == name).count()
    }

    pub fn has_branch(&self, name: &str) -> bool {
        self.lock().branches.contains_key(name)
    }

    pub fn head(&self, branch: &str) -> Option<Sha> {
        self.lock().branches.get(branch).map(|b| b.head.clone())
    }

    pub fn file(&self, branch: &str, path: &str) -> Option<Vec<u8>> {
        self.lock()
            .branches
            .get(branch)
            .and_then(|b| b.files.get(path))
            .map(|(_, content)| content.clone())
    }

    pub fn pulls(&self) -> Vec<MockPull> {
        self.lock().pulls.clone()
    }

    fn apply(&self, effect: &GitHubEffect) -> Result<GitHubResponse, GitHubApiError> {
        let mut state = self.lock();
        state.calls.push(effect.clone());

        if let Some(failure) = state.failures.iter().find(|f| (f.matches)(effect)) {
            return Err(GitHubApiError::new(failure.kind, failure.message.clone()));
        }

        match effect {
            GitHubEffect::GetDefaultBranch => {
                Ok(GitHubResponse::DefaultBranch(state.default_branch.clone()))
            }
            GitHubEffect::GetBranchHead { branch } => state
                .branches
                .get(branch)
                .map(|b| GitHubResponse::BranchHead(b.head.clone()))
                .ok_or_else(|| GitHubApiError::not_found(format!("branch {branch}"))),
            GitHubEffect::GetFileBlobId { path, branch } => {
                let b = state
                    .branches
                    .get(branch)
                    .ok_or_else(|| GitHubApiError::not_found(format!("branch {branch}")))?;
                Ok(GitHubResponse::FileBlobId(
                    b.files.get(path).map(|(blob, _)| blob.clone()),
                ))
            }
            GitHubEffect::CreateRef { branch, sha } => {
                if state.branches.contains_key(branch) {
                    return Err(GitHubApiError::conflict("Reference already exists"));
                }
                let source = state
                    .branches
                    .values()
                    .find(|b| &b.head == sha)
                    .cloned()
                    .ok_or_else(|| GitHubApiError::conflict("Object does not exist"))?;
                state.branches.insert(branch.clone(), source);
                Ok(GitHubResponse::RefCreated {
                    ref_name: format!("refs/heads/{branch}"),
                })
            }
            GitHubEffect::DeleteRef { branch } => state
                .branches
                .remove(branch)
                .map(|_| GitHubResponse::RefDeleted)
                .ok_or_else(|| GitHubApiError::not_found("Reference does not exist")),
            GitHubEffect::WriteFile {
                path,
                branch,
                content,
                existing_blob,
                ..
            } => {
                let blob = BlobId::new(state.next_hex());
                let commit = Sha::parse(state.next_hex()).unwrap();
                let b = state
                    .branches
                    .get_mut(branch)
                    .ok_or_else(|| GitHubApiError::not_found(format!("branch {branch}")))?;
                let current = b.files.get(path).map(|(id, _)| id.clone());
                match (existing_blob, current) {
                    (None, Some(_)) => {
                        return Err(GitHubApiError::conflict(
                            "Invalid request. \"sha\" wasn't supplied.",
                        ));
                    }
                    (Some(expected), Some(actual)) if *expected != actual => {
                        return Err(GitHubApiError::conflict(format!(
                            "{path} does not match {expected}"
                        )));
                    }
                    (Some(_), None) => {
                        return Err(GitHubApiError::conflict(format!(
                            "{path} does not exist"
                        )));
                    }
                    _ => {}
                }
                b.files
                    .insert(path.clone(), (blob.clone(), content.clone()));
                b.head = commit.clone();
                Ok(GitHubResponse::FileWritten { blob, commit })
            }
            GitHubEffect::CreatePullRequest {
                title,
                head,
                base,
                body,
            } => {
                if !state.branches.contains_key(head) || !state.branches.contains_key(base) {
                    return Err(GitHubApiError::conflict("Validation Failed"));
                }
                let number = PrNumber(state.pulls.len() as u64 + 1);
                state.pulls.push(MockPull {
                    number,
                    title: title.clone(),
                    head: head.clone(),
                    base: base.clone(),
                    body: body.clone(),
                });
                Ok(GitHubResponse::PullRequestOpened {
                    number,
                    url: Some(format!("https://github.test/pull/{}", number.0)),
                })
            }
        }
    }
}

impl GitHubInterpreter for MockRepo {
    async fn interpret(&self, effect: GitHubEffect) -> Result<GitHubResponse, GitHubApiError> {
        self.apply(&effect)
    }
}

/// An in-memory organization implementing `OrgInterpreter`.
#[derive(Clone)]
pub struct MockOrg {
    org: String,
    repos: Option<Vec<RepositoryTarget>>,
    failures: Vec<(OrgEffect, GitHubErrorKind)>,
    calls: Arc<Mutex<Vec<OrgEffect>>>,
}

impl MockOrg {
    pub fn new(org: &str, repos: Vec<RepositoryTarget>) -> Self {
        MockOrg {
            org: org.to_string(),
            repos: Some(repos),
            failures: Vec::new(),
            calls: Arc::default(),
        }
    }

    /// An organization that does not exist.
    pub fn missing(org: &str) -> Self {
        MockOrg {
            repos: None,
            ..MockOrg::new(org, Vec::new())
        }
    }

    /// Fails `effect` with an error of `kind`.
    pub fn fail_effect(mut self, effect: OrgEffect, kind: GitHubErrorKind) -> Self {
        self.failures.push((effect, kind));
        self
    }

    pub fn calls(&self) -> Vec<OrgEffect> {
        self.calls.lock().unwrap().clone()
    }
}

impl OrgInterpreter for MockOrg {
    fn organization(&self) -> &str {
        &self.org
    }

    async fn interpret(&self, effect: OrgEffect) -> Result<OrgResponse, GitHubApiError> {
        self.calls.lock().unwrap().push(effect.clone());
        if let Some((_, kind)) = self.failures.iter().find(|(e, _)| *e == effect) {
            return Err(GitHubApiError::new(*kind, "injected failure"));
        }
        let repos = self
            .repos
            .as_ref()
            .ok_or_else(|| GitHubApiError::not_found(format!("organization {}", self.org)))?;
        Ok(match effect {
            OrgEffect::GetOrganization => OrgResponse::Organization {
                login: self.org.clone(),
            },
            OrgEffect::ListRepositories => OrgResponse::Repositories(repos.clone()),
        })
    }
}

// ─── Arbitrary Generators ─────────────────────────────────────────────────────

pub fn arb_repo_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,15}".prop_map(String::from)
}

pub fn arb_repository_target() -> impl Strategy<Value = RepositoryTarget> {
    (arb_repo_name(), any::<bool>())
        .prop_map(|(name, archived)| RepositoryTarget::new(name, "main").archived(archived))
}

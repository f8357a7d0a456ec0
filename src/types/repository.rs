//! Repository snapshot types.

use serde::{Deserialize, Serialize};

/// A repository as listed for an organization.
///
/// This is a read-only snapshot taken once per run; branch transactions never
/// mutate it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryTarget {
    /// The repository name, without the owner.
    pub name: String,

    /// Whether the repository is archived (read-only on the hosting service).
    #[serde(default)]
    pub archived: bool,

    /// The repository's default branch.
    ///
    /// Empty when the listing did not report one; base resolution then asks
    /// the repository directly.
    #[serde(default)]
    pub default_branch: String,
}

impl RepositoryTarget {
    pub fn new(name: impl Into<String>, default_branch: impl Into<String>) -> Self {
        RepositoryTarget {
            name: name.into(),
            archived: false,
            default_branch: default_branch.into(),
        }
    }

    pub fn archived(mut self, archived: bool) -> Self {
        self.archived = archived;
        self
    }
}

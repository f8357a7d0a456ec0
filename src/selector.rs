//! Repository selection.
//!
//! Pure filtering of an organization's repository listing down to the set a
//! run will touch. Archived repositories are never selected.

use tracing::debug;

use crate::config::RepoSelector;
use crate::types::RepositoryTarget;

/// Returns the non-archived repositories selected by `selector`, in listing order.
///
/// Names in an explicit list that are absent from the listing are ignored.
pub fn select(repos: &[RepositoryTarget], selector: &RepoSelector) -> Vec<RepositoryTarget> {
    repos
        .iter()
        .filter(|repo| {
            if repo.archived {
                if selector.matches(&repo.name) {
                    debug!(repo = %repo.name, "Skipping archived repository");
                }
                return false;
            }
            selector.matches(&repo.name)
        })
        .cloned()
        .collect()
}

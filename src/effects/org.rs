//! Organization-scoped GitHub API effect types.

use serde::{Deserialize, Serialize};

use crate::types::RepositoryTarget;

/// A GitHub API effect against the organization as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrgEffect {
    /// Fetch the organization, failing with NotFound if it does not exist.
    GetOrganization,

    /// List every repository owned by the organization.
    ListRepositories,
}

/// Response from an organization effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum OrgResponse {
    /// Response to `GetOrganization`.
    Organization {
        /// The canonical login of the organization.
        login: String,
    },

    /// Response to `ListRepositories`, in listing order.
    Repositories(Vec<RepositoryTarget>),
}

//! Core domain types shared across the selector, transaction and batch modules.

pub mod ids;
pub mod repository;

pub use ids::{BlobId, InvalidSha, PrNumber, RepoId, Sha};
pub use repository::RepositoryTarget;

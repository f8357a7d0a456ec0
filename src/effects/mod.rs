//! Effects-as-data for hosting-service operations.
//!
//! Branch transactions and the batch runner describe every remote call as an
//! effect value and hand it to an interpreter. This keeps the transaction
//! logic independent of the HTTP client and lets tests observe exactly which
//! calls were made, in which order.

pub mod github;
pub mod interpreter;
pub mod org;

pub use github::{GitHubEffect, GitHubResponse};
pub use interpreter::{GitHubInterpreter, OrgInterpreter};
pub use org::{OrgEffect, OrgResponse};

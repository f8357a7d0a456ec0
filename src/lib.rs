//! Org File Adder - adds files to many repositories of a GitHub organization.
//!
//! For every selected repository a topic branch is created from the base
//! branch, the staged files are committed to it one by one, and a pull request
//! is opened. A repository whose transaction fails has its topic branch
//! deleted again; the batch carries on with the next repository.

pub mod batch;
pub mod config;
pub mod effects;
pub mod github;
pub mod selector;
pub mod staging;
pub mod transaction;
pub mod types;

#[cfg(test)]
mod test_utils;

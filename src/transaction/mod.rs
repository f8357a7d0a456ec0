//! Branch transactions: one isolated branch-and-pull-request per repository.
//!
//! See `branch` for the state machine, `state` for its vocabulary, and `ops`
//! for the typed effect wrappers it is built on.

mod branch;
mod ops;
mod state;


pub use branch::{BranchTransaction, run_transaction};
pub use state::{
    ItemOutcome, Proposal, Rollback, Step, TransactionError, TransactionReport, TransactionState,
    WriteAction,
};

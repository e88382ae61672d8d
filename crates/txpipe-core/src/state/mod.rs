//! Lifecycle tracking for in-flight transactions.
//!
//! Every unit of work the manager starts carries a small state machine that
//! records which stage it has reached and rejects out-of-order moves.

pub mod transaction;

pub use transaction::{TxState, TxStateError, TxStateMachine};

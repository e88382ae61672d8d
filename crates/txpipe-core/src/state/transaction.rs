//! Transaction state machine.
//!
//! A transaction moves Built -> Hashed -> AwaitingSignature -> Assembled ->
//! Submitted -> Resolved. Read-only calls leave the path after signing (or
//! straight after hashing when the caller supplied the signature) and end in
//! ReadOnlyResolved. Any non-terminal state may fail.

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use txpipe_types::{truncate_id, ContentHash};

/// Stage a transaction has reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxState {
	Built,
	Hashed,
	AwaitingSignature,
	Assembled,
	Submitted,
	Resolved,
	ReadOnlyResolved,
	Failed,
}

impl TxState {
	pub fn is_terminal(self) -> bool {
		matches!(
			self,
			TxState::Resolved | TxState::ReadOnlyResolved | TxState::Failed
		)
	}
}

/// Errors raised by the state machine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TxStateError {
	#[error("Invalid state transition from {from:?} to {to:?}")]
	InvalidTransition { from: TxState, to: TxState },
}

// Static transition table - each state maps to allowed next states
static TRANSITIONS: Lazy<HashMap<TxState, HashSet<TxState>>> = Lazy::new(|| {
	let mut m = HashMap::new();
	m.insert(
		TxState::Built,
		HashSet::from([TxState::Hashed, TxState::Failed]),
	);
	m.insert(
		TxState::Hashed,
		HashSet::from([
			TxState::AwaitingSignature,
			TxState::ReadOnlyResolved,
			TxState::Failed,
		]),
	);
	m.insert(
		TxState::AwaitingSignature,
		HashSet::from([
			TxState::Assembled,
			TxState::ReadOnlyResolved,
			TxState::Failed,
		]),
	);
	m.insert(
		TxState::Assembled,
		HashSet::from([TxState::Submitted, TxState::Failed]),
	);
	m.insert(
		TxState::Submitted,
		HashSet::from([TxState::Resolved, TxState::Failed]),
	);
	m.insert(TxState::Resolved, HashSet::new()); // terminal
	m.insert(TxState::ReadOnlyResolved, HashSet::new()); // terminal
	m.insert(TxState::Failed, HashSet::new()); // terminal
	m
});

/// Current stage of one transaction.
#[derive(Debug)]
pub struct TxStateMachine {
	state: TxState,
	hash: Option<ContentHash>,
}

impl Default for TxStateMachine {
	fn default() -> Self {
		Self::new()
	}
}

impl TxStateMachine {
	pub fn new() -> Self {
		Self {
			state: TxState::Built,
			hash: None,
		}
	}

	pub fn state(&self) -> TxState {
		self.state
	}

	/// Records the content hash and moves to `Hashed`.
	pub fn hashed(&mut self, hash: ContentHash) {
		self.hash = Some(hash);
		self.advance(TxState::Hashed);
	}

	/// Checks if a state transition is valid
	pub fn is_valid_transition(from: TxState, to: TxState) -> bool {
		TRANSITIONS
			.get(&from)
			.is_some_and(|set| set.contains(&to))
	}

	pub fn transition(&mut self, to: TxState) -> Result<(), TxStateError> {
		if !Self::is_valid_transition(self.state, to) {
			return Err(TxStateError::InvalidTransition {
				from: self.state,
				to,
			});
		}
		tracing::trace!(
			tx_hash = %self.hash.map(|h| truncate_id(&h.to_hex())).unwrap_or_default(),
			from = ?self.state,
			to = ?to,
			"State transition"
		);
		self.state = to;
		Ok(())
	}

	/// Moves to `to`, logging instead of failing when the move is illegal.
	///
	/// The pipeline only requests moves in table order.
	pub fn advance(&mut self, to: TxState) {
		if let Err(e) = self.transition(to) {
			tracing::error!(error = %e, "Transaction state error");
		}
	}
}

//! In-flight transaction registry.
//!
//! A [`PendingTransaction`] exists from the moment a content hash is handed to
//! the signer until its outcome is delivered. Entries are keyed by the content
//! hash together with the transaction attributes, which are not part of the
//! envelope. Submitting the same pair again while it is pending joins the
//! existing entry instead of signing twice.

use crate::TxError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use txpipe_transaction::TransactionAttributes;
use txpipe_types::{truncate_id, ContentHash, Receipt};

type Outcome = Result<Receipt, TxError>;
type PendingKey = (ContentHash, TransactionAttributes);

/// Callers waiting on one content hash.
pub struct PendingTransaction {
	waiters: Vec<oneshot::Sender<Outcome>>,
	created_at: Instant,
}

/// Concurrent map from content hash and attributes to the pending transaction.
#[derive(Default)]
pub struct PendingRegistry {
	pending: DashMap<PendingKey, PendingTransaction>,
}

impl PendingRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a waiter for `hash` submitted with `attributes`.
	///
	/// Returns the handle and `true` when this call created the entry, in which
	/// case the caller is responsible for driving the transaction and calling
	/// [`PendingRegistry::resolve`].
	pub fn join(
		&self,
		hash: ContentHash,
		attributes: TransactionAttributes,
	) -> (TransactionHandle, bool) {
		let (sender, receiver) = oneshot::channel();
		let created = match self.pending.entry((hash, attributes)) {
			Entry::Occupied(mut entry) => {
				entry.get_mut().waiters.push(sender);
				false
			},
			Entry::Vacant(entry) => {
				entry.insert(PendingTransaction {
					waiters: vec![sender],
					created_at: Instant::now(),
				});
				true
			},
		};
		(TransactionHandle { hash, receiver }, created)
	}

	/// Delivers `outcome` to every waiter of the entry and removes it.
	///
	/// Returns the number of waiters still listening.
	pub fn resolve(
		&self,
		hash: &ContentHash,
		attributes: TransactionAttributes,
		outcome: Outcome,
	) -> usize {
		let Some((_, pending)) = self.pending.remove(&(*hash, attributes)) else {
			tracing::warn!(tx_hash = %truncate_id(&hash.to_hex()), "Resolved a transaction that was not pending");
			return 0;
		};
		tracing::debug!(
			tx_hash = %truncate_id(&hash.to_hex()),
			waiters = pending.waiters.len(),
			elapsed_ms = pending.created_at.elapsed().as_millis() as u64,
			"Resolving pending transaction"
		);
		pending
			.waiters
			.into_iter()
			.map(|waiter| waiter.send(outcome.clone()).is_ok())
			.filter(|delivered| *delivered)
			.count()
	}

	/// Whether `hash` is pending under any attributes.
	pub fn is_pending(&self, hash: &ContentHash) -> bool {
		self.pending.iter().any(|entry| entry.key().0 == *hash)
	}

	pub fn len(&self) -> usize {
		self.pending.len()
	}

	pub fn is_empty(&self) -> bool {
		self.pending.is_empty()
	}
}

/// Caller-side handle to a submitted transaction.
#[derive(Debug)]
pub struct TransactionHandle {
	hash: ContentHash,
	receiver: oneshot::Receiver<Outcome>,
}

impl TransactionHandle {
	pub fn hash(&self) -> ContentHash {
		self.hash
	}

	/// Waits for the transaction's outcome.
	pub async fn wait(self) -> Result<Receipt, TxError> {
		self.receiver.await.unwrap_or_else(|_| {
			Err(TxError::Timeout(
				"transaction was dropped before it resolved".to_string(),
			))
		})
	}

	/// Waits at most `limit`. The transaction keeps running if the limit expires.
	pub async fn wait_timeout(self, limit: Duration) -> Result<Receipt, TxError> {
		let hash = self.hash;
		match tokio::time::timeout(limit, self.wait()).await {
			Ok(outcome) => outcome,
			Err(_) => {
				tracing::warn!(tx_hash = %truncate_id(&hash.to_hex()), "Stopped waiting for transaction");
				Err(TxError::Timeout(format!(
					"no outcome within {}ms",
					limit.as_millis()
				)))
			},
		}
	}
}

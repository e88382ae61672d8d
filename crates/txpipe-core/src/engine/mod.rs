//! Transaction manager that runs the sign-and-submit pipeline.
//!
//! A transaction is built and hashed on the caller's task, then handed to a
//! spawned task that waits for the signer, assembles the wire bytes, submits
//! them and resolves the pending entry. The awaiting, callback and blocking
//! entry points are adapters over that one task. Read-only calls follow the
//! same path up to signing and then go to the transport's call endpoint.
//!
//! Tasks are spawned on the runtime handle the manager was created with, so
//! the synchronous entry points also work from threads outside any runtime.

mod call;
mod send;

#[cfg(test)]
pub(crate) mod testing;

use crate::gas::{DefaultGasProvider, GasProvider};
use crate::pending::PendingRegistry;
use crate::session::ClientSession;
use crate::TxError;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use txpipe_config::OrchestratorConfig;
use txpipe_signer::SignerService;
use txpipe_transport::{SubmitOutcome, TransportService};
use txpipe_types::{
	truncate_id, CompletionReceiver, ContentHash, Receipt, SignatureResult,
};

/// Upper bounds on the two suspension points of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTimeouts {
	/// How long to wait for the signer's completion.
	pub sign: Duration,
	/// How long to wait for the transport's receipt or call result.
	pub submit: Duration,
}

impl Default for StageTimeouts {
	fn default() -> Self {
		Self::from_config(&OrchestratorConfig::default())
	}
}

impl StageTimeouts {
	pub fn from_config(config: &OrchestratorConfig) -> Self {
		Self {
			sign: Duration::from_secs(config.sign_timeout_seconds),
			submit: Duration::from_secs(config.submit_timeout_seconds),
		}
	}
}

/// Entry point for sending transactions and read-only calls.
///
/// Cloning is cheap; clones share the session, services and pending registry.
#[derive(Clone)]
pub struct TransactionManager {
	session: Arc<ClientSession>,
	signer: Arc<SignerService>,
	transport: Arc<TransportService>,
	gas: Arc<dyn GasProvider>,
	timeouts: StageTimeouts,
	pending: Arc<PendingRegistry>,
	runtime: Handle,
}

impl TransactionManager {
	/// Creates a manager with the default gas policy and stage timeouts.
	///
	/// Pipeline tasks run on `runtime`, which must be driven by worker threads
	/// (a multi-threaded runtime) for blocking sends from plain threads.
	pub fn new(
		session: ClientSession,
		signer: SignerService,
		transport: TransportService,
		runtime: Handle,
	) -> Self {
		Self {
			session: Arc::new(session),
			signer: Arc::new(signer),
			transport: Arc::new(transport),
			gas: Arc::new(DefaultGasProvider::default()),
			timeouts: StageTimeouts::default(),
			pending: Arc::new(PendingRegistry::new()),
			runtime,
		}
	}

	pub fn with_gas_provider(mut self, gas: Arc<dyn GasProvider>) -> Self {
		self.gas = gas;
		self
	}

	pub fn with_timeouts(mut self, timeouts: StageTimeouts) -> Self {
		self.timeouts = timeouts;
		self
	}

	pub fn session(&self) -> &ClientSession {
		&self.session
	}

	pub fn signer(&self) -> &SignerService {
		&self.signer
	}

	pub fn timeouts(&self) -> StageTimeouts {
		self.timeouts
	}

	/// Number of transactions waiting on the signer or transport.
	pub fn pending_count(&self) -> usize {
		self.pending.len()
	}

	/// Requests a signature over `hash` and waits for it within the sign limit.
	async fn await_signature(&self, hash: ContentHash) -> Result<Box<dyn SignatureResult>, TxError> {
		let receiver = self.signer.request_signature(hash);
		match tokio::time::timeout(self.timeouts.sign, receiver.recv()).await {
			Ok(Some(outcome)) => outcome.map_err(TxError::from),
			Ok(None) => Err(TxError::Timeout(
				"signer dropped the request without answering".to_string(),
			)),
			Err(_) => {
				tracing::warn!(
					tx_hash = %truncate_id(&hash.to_hex()),
					limit = ?self.timeouts.sign,
					"Signer did not answer in time"
				);
				Err(TxError::Timeout(format!(
					"no signature within {:?}",
					self.timeouts.sign
				)))
			},
		}
	}

	/// Waits for the transport's answer to a submission within the submit limit.
	async fn await_receipt(
		&self,
		hash: ContentHash,
		receiver: CompletionReceiver<SubmitOutcome>,
	) -> Result<Receipt, TxError> {
		match tokio::time::timeout(self.timeouts.submit, receiver.recv()).await {
			Ok(Some(outcome)) => outcome.map_err(TxError::from),
			Ok(None) => Err(TxError::Timeout(
				"transport dropped the submission without answering".to_string(),
			)),
			Err(_) => {
				tracing::warn!(
					tx_hash = %truncate_id(&hash.to_hex()),
					limit = ?self.timeouts.submit,
					"Transport did not answer in time"
				);
				Err(TxError::Timeout(format!(
					"no receipt within {:?}",
					self.timeouts.submit
				)))
			},
		}
	}
}

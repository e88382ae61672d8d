//! Node transport for the transaction pipeline.
//!
//! This module handles delivery of signed transactions and read-only calls to
//! a node. Submission is callback based like signing: the pipeline passes the
//! signed bytes together with a single-fire completion and the transport
//! resolves it once the node has produced a receipt.

use async_trait::async_trait;
use thiserror::Error;
use txpipe_types::{
	truncate_id, CallRequest, CallResult, Completion, CompletionReceiver, ConfigSchema,
	ImplementationRegistry, Receipt,
};

/// Re-export implementations
pub mod implementations {
	pub mod jsonrpc;
}

/// Errors that can occur while talking to the node.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
	/// Error that occurs during network communication.
	#[error("Network error: {0}")]
	Network(String),
	/// The node answered with an error.
	#[error("Node error {code}: {message}")]
	Node { code: i64, message: String },
	/// The node answered with something that could not be understood.
	#[error("Invalid response: {0}")]
	InvalidResponse(String),
	/// Error that occurs when interacting with the transport implementation.
	#[error("Implementation error: {0}")]
	Implementation(String),
}

/// Result a transport reports through its submit completion.
pub type SubmitOutcome = Result<Receipt, TransportError>;

/// Completion handed to a transport for one submitted transaction.
pub type SubmitCompletion = Completion<SubmitOutcome>;

/// Trait defining the interface for node transports.
#[async_trait]
pub trait TransportInterface: Send + Sync {
	/// Returns the configuration schema for this transport implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Sends signed transaction bytes and returns without waiting.
	///
	/// The completion must be resolved at most once, with the receipt or the
	/// failure that prevented one.
	fn submit(&self, signed: Vec<u8>, is_call: bool, completion: SubmitCompletion);

	/// Evaluates a read-only call, authenticated by `signature` over its payload.
	async fn call(
		&self,
		request: &CallRequest,
		signature: &[u8],
	) -> Result<CallResult, TransportError>;

	/// Latest block number known to the node.
	async fn block_number(&self) -> Result<u64, TransportError>;
}

/// Type alias for transport factory functions.
pub type TransportFactory = fn(&toml::Value) -> Result<Box<dyn TransportInterface>, TransportError>;

/// Registry trait for transport implementations.
pub trait TransportRegistry: ImplementationRegistry<Factory = TransportFactory> {}

/// Get all registered transport implementations.
pub fn get_all_implementations() -> Vec<(&'static str, TransportFactory)> {
	use implementations::jsonrpc;

	vec![(jsonrpc::Registry::NAME, jsonrpc::Registry::factory())]
}

/// Service that routes node traffic to the configured transport.
pub struct TransportService {
	implementation: Box<dyn TransportInterface>,
}

impl TransportService {
	pub fn new(implementation: Box<dyn TransportInterface>) -> Self {
		Self { implementation }
	}

	/// Submits signed bytes and returns the receiver for the node's answer.
	pub fn submit(&self, signed: Vec<u8>, is_call: bool) -> CompletionReceiver<SubmitOutcome> {
		let (completion, receiver) = Completion::channel();
		tracing::debug!(
			size = signed.len(),
			is_call,
			"Submitting signed transaction"
		);
		self.implementation.submit(signed, is_call, completion);
		receiver
	}

	pub async fn call(
		&self,
		request: &CallRequest,
		signature: &[u8],
	) -> Result<CallResult, TransportError> {
		let result = self.implementation.call(request, signature).await;
		if let Err(e) = &result {
			tracing::warn!(to = %truncate_id(&request.to), error = %e, "Call failed");
		}
		result
	}

	pub async fn block_number(&self) -> Result<u64, TransportError> {
		self.implementation.block_number().await
	}
}

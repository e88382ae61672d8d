//! Signer capability for the transaction pipeline.
//!
//! This module defines the interface a signing backend implements and the
//! service the pipeline talks to. Signing is callback based: the pipeline
//! hands the signer a content hash and a single-fire completion, and the
//! signer resolves that completion from whatever thread or task it likes.

use alloy_primitives::Address;
use async_trait::async_trait;
use thiserror::Error;
use txpipe_types::{
	Completion, CompletionReceiver, ConfigSchema, ContentHash, ImplementationRegistry,
	SignatureResult, StatusCode,
};

/// Re-export implementations
pub mod implementations {
	pub mod local;
}

/// Name of the signer used when the configuration does not pick one.
pub const DEFAULT_SIGNER: &str = "local";

/// Errors that can occur during signing.
#[derive(Debug, Clone, Error)]
pub enum SignerError {
	/// The backend refused or failed to produce a signature.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// Key material is missing or malformed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	/// Error that occurs when interacting with the signer implementation.
	#[error("Implementation error: {0}")]
	Implementation(String),
}

/// Result a signer reports through its completion.
pub type SignOutcome = Result<Box<dyn SignatureResult>, SignerError>;

/// Completion handed to a signer for one content hash.
pub type SignCompletion = Completion<SignOutcome>;

/// Trait defining the interface for signer implementations.
///
/// Implementations must resolve the completion passed to
/// [`SignerInterface::sign_async`] at most once. Dropping it unresolved is
/// reported to the waiting transaction as a timeout.
#[async_trait]
pub trait SignerInterface: Send + Sync {
	/// Returns the configuration schema for this signer implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Address that signatures from this signer recover to.
	async fn address(&self) -> Result<Address, SignerError>;

	/// Starts signing `hash` and returns without waiting for the result.
	fn sign_async(&self, hash: ContentHash, completion: SignCompletion);
}

/// Type alias for signer factory functions.
pub type SignerFactory = fn(&toml::Value) -> Result<Box<dyn SignerInterface>, SignerError>;

/// Registry trait for signer implementations.
pub trait SignerRegistry: ImplementationRegistry<Factory = SignerFactory> {}

/// Get all registered signer implementations.
pub fn get_all_implementations() -> Vec<(&'static str, SignerFactory)> {
	use implementations::local;

	vec![(local::Registry::NAME, local::Registry::factory())]
}

/// Service that routes signing requests to the configured implementation.
pub struct SignerService {
	implementation: Box<dyn SignerInterface>,
}

impl SignerService {
	pub fn new(implementation: Box<dyn SignerInterface>) -> Self {
		Self { implementation }
	}

	pub async fn get_address(&self) -> Result<Address, SignerError> {
		self.implementation.address().await
	}

	/// Asks the signer for a signature over `hash`.
	///
	/// The returned receiver yields `None` if the signer dropped its completion
	/// without resolving it.
	pub fn request_signature(&self, hash: ContentHash) -> CompletionReceiver<SignOutcome> {
		let (completion, receiver) = Completion::channel();
		tracing::debug!(hash = %hash, "Requesting signature");
		self.implementation.sign_async(hash, completion);
		receiver
	}

	/// Signs `hash` and waits for the signer to resolve.
	pub async fn sign(&self, hash: ContentHash) -> SignOutcome {
		self.request_signature(hash).recv().await.unwrap_or_else(|| {
			Err(SignerError::Implementation(
				"signer dropped the request without answering".to_string(),
			))
		})
	}
}

/// Resolves `completion` and logs when nobody was waiting.
pub fn complete(completion: SignCompletion, outcome: SignOutcome) -> StatusCode {
	let status = completion.complete(outcome);
	if status == StatusCode::Discarded {
		tracing::debug!("Signature arrived after the transaction stopped waiting");
	}
	status
}

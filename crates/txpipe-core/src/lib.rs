//! Transaction manager for the txpipe client.
//!
//! This crate drives a transaction from a high-level request to a node
//! receipt: it builds the canonical envelope, hashes it with the session's
//! engine, asks the signer for a signature, assembles the wire transaction and
//! hands it to the transport. Each transaction runs as its own task; callers
//! either await its outcome, receive it through a callback, or block the
//! current thread on it. All three share the same pipeline.

use thiserror::Error;
use txpipe_codec::CodecError;
use txpipe_signer::SignerError;
use txpipe_transaction::TransactionError;
use txpipe_transport::TransportError;

pub mod builder;
pub mod engine;
pub mod gas;
pub mod pending;
pub mod request;
pub mod session;
pub mod state;

pub use builder::{build_manager_from_config, BuilderError, ManagerBuilder, ManagerFactories};
pub use engine::{StageTimeouts, TransactionManager};
pub use gas::{DefaultGasProvider, GasProvider, StaticGasProvider};
pub use pending::{PendingRegistry, PendingTransaction, TransactionHandle};
pub use request::{CallCallback, TransactionCallback, TransactionRequest};
pub use session::ClientSession;
pub use state::{TxState, TxStateError, TxStateMachine};

/// Errors reported for a transaction or read-only call.
///
/// Each variant has a stable numeric [`TxError::code`] that callback-mode
/// callers receive in `on_error`.
#[derive(Debug, Clone, Error)]
pub enum TxError {
	/// Input bytes do not have the declared shape. Raised before signing.
	#[error("Malformed encoding: {0}")]
	MalformedEncoding(String),
	/// Fee fields are mixed or incomplete. Raised before signing.
	#[error("Invalid fee spec: {0}")]
	InvalidFeeSpec(String),
	/// The signature could not be placed into the wire transaction.
	#[error("Assembly error: {0}")]
	AssemblyError(String),
	/// The signer reported it could not sign.
	#[error("Signer failure: {0}")]
	SignerFailure(String),
	/// The transport reported it could not deliver.
	#[error("Transport failure: {0}")]
	TransportFailure(TransportError),
	/// No answer within the stage limit, or the collaborator dropped the
	/// request. The request may still be in flight.
	#[error("Timeout: {0}")]
	Timeout(String),
	/// The manager or session could not be constructed.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

impl TxError {
	pub const MALFORMED_ENCODING: i32 = 1001;
	pub const INVALID_FEE_SPEC: i32 = 1002;
	pub const ASSEMBLY_ERROR: i32 = 1003;
	pub const SIGNER_FAILURE: i32 = 2001;
	pub const TRANSPORT_FAILURE: i32 = 2002;
	pub const TIMEOUT: i32 = 3001;
	pub const CONFIGURATION: i32 = 4001;

	/// Stable code of this error.
	pub fn code(&self) -> i32 {
		match self {
			TxError::MalformedEncoding(_) => Self::MALFORMED_ENCODING,
			TxError::InvalidFeeSpec(_) => Self::INVALID_FEE_SPEC,
			TxError::AssemblyError(_) => Self::ASSEMBLY_ERROR,
			TxError::SignerFailure(_) => Self::SIGNER_FAILURE,
			TxError::TransportFailure(_) => Self::TRANSPORT_FAILURE,
			TxError::Timeout(_) => Self::TIMEOUT,
			TxError::Configuration(_) => Self::CONFIGURATION,
		}
	}
}

impl From<TransactionError> for TxError {
	fn from(err: TransactionError) -> Self {
		match err {
			TransactionError::MalformedEncoding(msg) => TxError::MalformedEncoding(msg),
			TransactionError::InvalidFeeSpec(msg) => TxError::InvalidFeeSpec(msg),
			TransactionError::AssemblyError(msg) => TxError::AssemblyError(msg),
		}
	}
}

impl From<CodecError> for TxError {
	fn from(err: CodecError) -> Self {
		TxError::MalformedEncoding(err.to_string())
	}
}

impl From<SignerError> for TxError {
	fn from(err: SignerError) -> Self {
		TxError::SignerFailure(err.to_string())
	}
}

impl From<TransportError> for TxError {
	fn from(err: TransportError) -> Self {
		TxError::TransportFailure(err)
	}
}

impl From<BuilderError> for TxError {
	fn from(err: BuilderError) -> Self {
		TxError::Configuration(err.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_codes_are_stable() {
		let cases = [
			(TxError::MalformedEncoding(String::new()), 1001),
			(TxError::InvalidFeeSpec(String::new()), 1002),
			(TxError::AssemblyError(String::new()), 1003),
			(TxError::SignerFailure(String::new()), 2001),
			(
				TxError::TransportFailure(TransportError::Network(String::new())),
				2002,
			),
			(TxError::Timeout(String::new()), 3001),
			(TxError::Configuration(String::new()), 4001),
		];
		for (err, code) in cases {
			assert_eq!(err.code(), code, "{}", err);
		}
	}

	#[test]
	fn test_conversions_keep_category() {
		let fee: TxError = TransactionError::InvalidFeeSpec("mixed".to_string()).into();
		assert_eq!(fee.code(), TxError::INVALID_FEE_SPEC);

		let codec: TxError = CodecError::InvalidValue("bad".to_string()).into();
		assert_eq!(codec.code(), TxError::MALFORMED_ENCODING);

		let signer: TxError = SignerError::SigningFailed("hsm offline".to_string()).into();
		assert_eq!(signer.code(), TxError::SIGNER_FAILURE);
		assert!(signer.to_string().contains("hsm offline"));
	}

	#[test]
	fn test_transport_detail_is_preserved() {
		let err: TxError = TransportError::Node {
			code: -32000,
			message: "nonce already used".to_string(),
		}
		.into();
		match err {
			TxError::TransportFailure(TransportError::Node { code, message }) => {
				assert_eq!(code, -32000);
				assert_eq!(message, "nonce already used");
			},
			other => panic!("unexpected error: {:?}", other),
		}
	}
}

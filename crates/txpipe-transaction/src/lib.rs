//! Transaction construction for the pipeline.
//!
//! This crate holds the pure, synchronous stages: validated transaction data,
//! the canonical envelope built from it, the hash engine that digests the
//! envelope, attribute derivation and the signed wire transaction. None of
//! these stages suspend or perform I/O.

/// Attribute flags attached to a signed transaction.
pub mod attributes;
/// Validated, immutable transaction data and its fee variants.
pub mod data;
/// Canonical envelope encoding.
pub mod envelope;
/// Session-wide hash function selection.
pub mod hash;
/// Signed wire transaction assembly.
pub mod signed;

pub use attributes::TransactionAttributes;
pub use data::{Eip1559Fee, FeeSpec, UnsignedTransactionData, UnsignedTransactionDataBuilder};
pub use envelope::{build_envelope, decode_envelope};
pub use hash::{call_payload, HashEngine};
pub use signed::{assemble, decode_signed, SignedTransaction};

use thiserror::Error;
use txpipe_codec::CodecError;

/// Errors raised while building or assembling a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
	/// Bytes do not match the layout they were declared with.
	#[error("Malformed encoding: {0}")]
	MalformedEncoding(String),
	/// Fee fields are mixed between variants or incomplete.
	#[error("Invalid fee spec: {0}")]
	InvalidFeeSpec(String),
	/// The signature cannot be placed into a signed transaction.
	#[error("Assembly error: {0}")]
	AssemblyError(String),
}

impl From<CodecError> for TransactionError {
	fn from(err: CodecError) -> Self {
		TransactionError::MalformedEncoding(err.to_string())
	}
}

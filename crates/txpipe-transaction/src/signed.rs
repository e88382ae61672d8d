//! Signed wire transactions.
//!
//! The wire form is the tuple encoding of
//! `(bytes envelope, bytes32 hash, bytes signature, uint32 attribute, string extra_data)`.

use crate::{TransactionAttributes, TransactionError};
use txpipe_codec::{decode_params, encode_params, AbiType, TypedValue};
use txpipe_types::{ContentHash, SignatureResult};

/// A decoded signed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
	pub envelope: Vec<u8>,
	pub hash: ContentHash,
	pub signature: Vec<u8>,
	pub attributes: TransactionAttributes,
	pub extra_data: String,
}

impl SignedTransaction {
	fn layout() -> [AbiType; 5] {
		[
			AbiType::Bytes,
			AbiType::FixedBytes(32),
			AbiType::Bytes,
			AbiType::Uint(32),
			AbiType::String,
		]
	}

	/// Wire bytes of this transaction.
	pub fn encode(&self) -> Result<Vec<u8>, TransactionError> {
		Ok(encode_params(&[
			TypedValue::bytes(self.envelope.as_slice()),
			TypedValue::FixedBytes {
				width: ContentHash::LEN,
				raw: self.hash.as_bytes().to_vec(),
			},
			TypedValue::bytes(self.signature.as_slice()),
			TypedValue::uint32(self.attributes.bits()),
			TypedValue::string(self.extra_data.as_str()),
		])?)
	}
}

/// Combines an envelope, its hash and a signature into wire bytes. Pure.
///
/// Fails only when the signature encodes to nothing or to a length other than
/// the one its own type declares.
pub fn assemble(
	envelope: &[u8],
	hash: &ContentHash,
	signature: &dyn SignatureResult,
	attributes: TransactionAttributes,
	extra_data: &str,
) -> Result<Vec<u8>, TransactionError> {
	let encoded = signature.encode();
	if encoded.is_empty() {
		return Err(TransactionError::AssemblyError(
			"signature encoding is empty".to_string(),
		));
	}
	if let Some(expected) = signature.encoded_len() {
		if encoded.len() != expected {
			return Err(TransactionError::AssemblyError(format!(
				"signature is {} bytes, expected {}",
				encoded.len(),
				expected
			)));
		}
	}

	let signed = SignedTransaction {
		envelope: envelope.to_vec(),
		hash: *hash,
		signature: encoded,
		attributes,
		extra_data: extra_data.to_string(),
	};
	signed.encode()
}

/// Decodes wire bytes produced by [`assemble`].
pub fn decode_signed(bytes: &[u8]) -> Result<SignedTransaction, TransactionError> {
	let mut fields = decode_params(bytes, &SignedTransaction::layout())?.into_iter();
	let mut next = || {
		fields.next().ok_or_else(|| {
			TransactionError::MalformedEncoding("signed transaction has too few fields".to_string())
		})
	};

	let envelope = next()?;
	let hash = next()?;
	let signature = next()?;
	let attribute = next()?;
	let extra_data = next()?;

	let malformed = |what: &str| TransactionError::MalformedEncoding(format!("bad {} field", what));
	Ok(SignedTransaction {
		envelope: envelope.as_bytes().ok_or_else(|| malformed("envelope"))?.to_vec(),
		hash: hash
			.as_bytes()
			.and_then(ContentHash::from_slice)
			.ok_or_else(|| malformed("hash"))?,
		signature: signature.as_bytes().ok_or_else(|| malformed("signature"))?.to_vec(),
		attributes: TransactionAttributes::from_bits(
			attribute.as_uint().ok_or_else(|| malformed("attribute"))?.to::<u32>(),
		),
		extra_data: extra_data.as_str().ok_or_else(|| malformed("extra data"))?.to_string(),
	})
}

//! Signature results produced by signer capabilities.
//!
//! The pipeline never inspects a signature's internals. It only asks for the
//! byte encoding and, when the signature type knows it, the length that
//! encoding must have.

use alloy_primitives::hex;
use std::fmt::Debug;

/// Opaque, byte-encodable output of a signer.
pub trait SignatureResult: Debug + Send + Sync {
	/// Serialises the signature in the form the chain expects.
	fn encode(&self) -> Vec<u8>;

	/// Length the encoding is required to have, if the scheme fixes one.
	fn encoded_len(&self) -> Option<usize> {
		None
	}

	/// Hex form of [`SignatureResult::encode`] with `0x` prefix.
	fn to_hex(&self) -> String {
		hex::encode_prefixed(self.encode())
	}
}

/// Recoverable secp256k1 signature, encoded as `r || s || v`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EcdsaSignature {
	pub r: [u8; 32],
	pub s: [u8; 32],
	/// Recovery id (0 or 1).
	pub v: u8,
}

impl EcdsaSignature {
	pub const ENCODED_LEN: usize = 65;

	/// Parses the 65-byte `r || s || v` form. Accepts `v` as 0/1 or 27/28.
	pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
		if bytes.len() != Self::ENCODED_LEN {
			return None;
		}
		let mut r = [0u8; 32];
		let mut s = [0u8; 32];
		r.copy_from_slice(&bytes[..32]);
		s.copy_from_slice(&bytes[32..64]);
		let v = match bytes[64] {
			v @ (0 | 1) => v,
			v @ (27 | 28) => v - 27,
			_ => return None,
		};
		Some(Self { r, s, v })
	}
}

impl SignatureResult for EcdsaSignature {
	fn encode(&self) -> Vec<u8> {
		let mut out = Vec::with_capacity(Self::ENCODED_LEN);
		out.extend_from_slice(&self.r);
		out.extend_from_slice(&self.s);
		out.push(self.v);
		out
	}

	fn encoded_len(&self) -> Option<usize> {
		Some(Self::ENCODED_LEN)
	}
}

/// Pre-encoded signature bytes, e.g. supplied by the caller or a remote signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSignature(pub Vec<u8>);

impl RawSignature {
	/// Parses a hex string with or without `0x` prefix.
	pub fn from_hex(value: &str) -> Result<Self, hex::FromHexError> {
		hex::decode(value).map(RawSignature)
	}
}

impl SignatureResult for RawSignature {
	fn encode(&self) -> Vec<u8> {
		self.0.clone()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_ecdsa_encode_layout() {
		let sig = EcdsaSignature {
			r: [1u8; 32],
			s: [2u8; 32],
			v: 1,
		};
		let encoded = sig.encode();
		assert_eq!(encoded.len(), 65);
		assert_eq!(&encoded[..32], &[1u8; 32]);
		assert_eq!(&encoded[32..64], &[2u8; 32]);
		assert_eq!(encoded[64], 1);
		assert_eq!(EcdsaSignature::from_bytes(&encoded), Some(sig));
	}

	#[test]
	fn test_ecdsa_from_bytes_normalises_v() {
		let mut bytes = vec![0u8; 65];
		bytes[64] = 28;
		assert_eq!(EcdsaSignature::from_bytes(&bytes).unwrap().v, 1);
		bytes[64] = 5;
		assert!(EcdsaSignature::from_bytes(&bytes).is_none());
		assert!(EcdsaSignature::from_bytes(&bytes[..64]).is_none());
	}

	#[test]
	fn test_raw_signature_hex() {
		let sig = RawSignature::from_hex("0xdeadbeef").unwrap();
		assert_eq!(sig.encode(), vec![0xde, 0xad, 0xbe, 0xef]);
		assert_eq!(sig.to_hex(), "0xdeadbeef");
		assert_eq!(sig.encoded_len(), None);
	}
}

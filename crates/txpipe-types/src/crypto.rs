//! Crypto type selection and content hashes.
//!
//! The crypto type is chosen once per client session. It decides which hash
//! function produces every [`ContentHash`] issued during that session.

use alloy_primitives::{hex, B256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Cryptographic suite of the chain a session talks to.
///
/// The numeric codes match the chain's own crypto type identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CryptoType {
	/// secp256k1 signatures over Keccak-256 hashes.
	Ecdsa,
	/// SM2 signatures over SM3 hashes.
	Sm,
	/// SM2/SM3 with keys held in a hardware security module.
	Hsm,
}

impl CryptoType {
	/// Returns the chain-defined numeric code.
	pub fn code(self) -> i32 {
		match self {
			CryptoType::Ecdsa => 0,
			CryptoType::Sm => 1,
			CryptoType::Hsm => 2,
		}
	}

	/// Resolves a chain-defined numeric code.
	pub fn from_code(code: i32) -> Option<Self> {
		match code {
			0 => Some(CryptoType::Ecdsa),
			1 => Some(CryptoType::Sm),
			2 => Some(CryptoType::Hsm),
			_ => None,
		}
	}

	/// Whether hashes for this crypto type are SM3 digests.
	pub fn uses_sm3(self) -> bool {
		!matches!(self, CryptoType::Ecdsa)
	}
}

impl FromStr for CryptoType {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"ecdsa" => Ok(CryptoType::Ecdsa),
			"sm" => Ok(CryptoType::Sm),
			"hsm" => Ok(CryptoType::Hsm),
			other => Err(format!("Unknown crypto type: {}", other)),
		}
	}
}

/// 32-byte digest of a transaction envelope or call payload.
///
/// This is the object a signer signs and the key a pending transaction is
/// tracked under.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHash(pub B256);

impl ContentHash {
	/// Width of every supported digest in bytes.
	pub const LEN: usize = 32;

	/// Builds a hash from a slice, returning `None` unless it is exactly 32 bytes.
	pub fn from_slice(bytes: &[u8]) -> Option<Self> {
		(bytes.len() == Self::LEN).then(|| ContentHash(B256::from_slice(bytes)))
	}

	pub fn as_bytes(&self) -> &[u8; 32] {
		&self.0 .0
	}

	/// Lowercase hex with `0x` prefix.
	pub fn to_hex(&self) -> String {
		hex::encode_prefixed(self.0)
	}
}

impl From<[u8; 32]> for ContentHash {
	fn from(bytes: [u8; 32]) -> Self {
		ContentHash(B256::from(bytes))
	}
}

impl fmt::Display for ContentHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.to_hex())
	}
}

impl fmt::Debug for ContentHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "ContentHash({})", self.to_hex())
	}
}

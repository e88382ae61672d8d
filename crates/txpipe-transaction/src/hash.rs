use sha3::Digest;
use txpipe_types::{without_0x_prefix, ContentHash, CryptoType};

/// Hash function used for every envelope and call payload of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashEngine {
	Keccak256,
	Sm3,
}

impl HashEngine {
	/// Engine matching the session's crypto type: SM3 for the SM suites,
	/// Keccak-256 otherwise.
	pub fn for_crypto_type(crypto_type: CryptoType) -> Self {
		if crypto_type.uses_sm3() {
			HashEngine::Sm3
		} else {
			HashEngine::Keccak256
		}
	}

	pub fn digest(&self, data: &[u8]) -> [u8; 32] {
		match self {
			HashEngine::Keccak256 => sha3::Keccak256::digest(data).into(),
			HashEngine::Sm3 => sm3::Sm3::digest(data).into(),
		}
	}

	pub fn hash(&self, data: &[u8]) -> ContentHash {
		ContentHash::from(self.digest(data))
	}
}

/// Bytes hashed and signed for a read-only call.
///
/// This is the UTF-8 text of the target address without its `0x` prefix
/// followed by the raw call data. The node recomputes the same bytes, so the
/// address must be passed exactly as the node will see it; a different case
/// or a missing prefix yields a different hash.
pub fn call_payload(to: &str, data: &[u8]) -> Vec<u8> {
	let address = without_0x_prefix(to).as_bytes();
	let mut payload = Vec::with_capacity(address.len() + data.len());
	payload.extend_from_slice(address);
	payload.extend_from_slice(data);
	payload
}

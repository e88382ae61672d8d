//! Per-client session parameters.
//!
//! A session fixes the chain coordinates, the VM flavour and the hash engine
//! for every transaction a manager builds. It is created once and shared
//! read-only; there are no setters.

use txpipe_config::SessionConfig;
use txpipe_transaction::HashEngine;
use txpipe_types::{ContentHash, CryptoType};

/// Offset added to the node's block number to bound a transaction's validity.
pub const DEFAULT_BLOCK_LIMIT_OFFSET: u64 = 500;

/// Immutable session shared by all transactions of a manager.
#[derive(Debug, Clone)]
pub struct ClientSession {
	group_id: String,
	chain_id: String,
	crypto_type: CryptoType,
	hash_engine: HashEngine,
	is_wasm: bool,
	extra_data: String,
	block_limit_offset: u64,
}

impl ClientSession {
	pub fn new(
		group_id: impl Into<String>,
		chain_id: impl Into<String>,
		crypto_type: CryptoType,
	) -> Self {
		Self {
			group_id: group_id.into(),
			chain_id: chain_id.into(),
			crypto_type,
			hash_engine: HashEngine::for_crypto_type(crypto_type),
			is_wasm: false,
			extra_data: String::new(),
			block_limit_offset: DEFAULT_BLOCK_LIMIT_OFFSET,
		}
	}

	/// Marks the session as targeting the script (WASM) VM.
	pub fn with_wasm(mut self, is_wasm: bool) -> Self {
		self.is_wasm = is_wasm;
		self
	}

	pub fn with_extra_data(mut self, extra_data: impl Into<String>) -> Self {
		self.extra_data = extra_data.into();
		self
	}

	pub fn with_block_limit_offset(mut self, offset: u64) -> Self {
		self.block_limit_offset = offset;
		self
	}

	pub fn from_config(config: &SessionConfig) -> Self {
		Self::new(&config.group_id, &config.chain_id, config.crypto_type)
			.with_wasm(config.is_wasm)
			.with_extra_data(&config.extra_data)
			.with_block_limit_offset(config.block_limit_offset)
	}

	pub fn group_id(&self) -> &str {
		&self.group_id
	}

	pub fn chain_id(&self) -> &str {
		&self.chain_id
	}

	pub fn crypto_type(&self) -> CryptoType {
		self.crypto_type
	}

	pub fn hash_engine(&self) -> HashEngine {
		self.hash_engine
	}

	pub fn is_wasm(&self) -> bool {
		self.is_wasm
	}

	pub fn extra_data(&self) -> &str {
		&self.extra_data
	}

	pub fn block_limit_offset(&self) -> u64 {
		self.block_limit_offset
	}

	/// Hashes `data` with the session's engine.
	pub fn hash(&self, data: &[u8]) -> ContentHash {
		self.hash_engine.hash(data)
	}
}

//! Caller-facing descriptions of work for the manager.

use alloy_primitives::U256;
use txpipe_transaction::Eip1559Fee;
use txpipe_types::{CallResult, Receipt};

/// High-level description of a state-changing transaction.
///
/// Fields left as `None` are filled in by [`crate::TransactionManager::prepare`]:
/// fees from the gas policy and the block limit from the node.
#[derive(Debug, Clone, Default)]
pub struct TransactionRequest {
	/// Recipient contract; `None` for a deployment.
	pub to: Option<String>,
	/// Call data, or the deployment payload when `constructor` is set.
	pub data: Vec<u8>,
	pub value: U256,
	/// ABI JSON stored alongside a deployment.
	pub abi: Option<String>,
	pub constructor: bool,
	pub gas_price: Option<U256>,
	pub gas_limit: Option<u64>,
	pub block_limit: Option<u64>,
	/// Explicit EIP-1559 fee. Cannot be combined with `gas_price`.
	pub eip1559: Option<Eip1559Fee>,
}

impl TransactionRequest {
	/// Call of an existing contract.
	pub fn call(to: impl Into<String>, data: Vec<u8>) -> Self {
		Self {
			to: Some(to.into()),
			data,
			..Self::default()
		}
	}

	/// Deployment of `bytecode`, optionally recording its ABI.
	pub fn deploy(bytecode: Vec<u8>, abi: Option<String>) -> Self {
		Self {
			data: bytecode,
			abi,
			constructor: true,
			..Self::default()
		}
	}

	pub fn with_value(mut self, value: U256) -> Self {
		self.value = value;
		self
	}

	pub fn with_gas(mut self, gas_price: U256, gas_limit: u64) -> Self {
		self.gas_price = Some(gas_price);
		self.gas_limit = Some(gas_limit);
		self
	}

	pub fn with_eip1559(mut self, fee: Eip1559Fee) -> Self {
		self.eip1559 = Some(fee);
		self
	}

	pub fn with_block_limit(mut self, block_limit: u64) -> Self {
		self.block_limit = Some(block_limit);
		self
	}
}

/// Receives the outcome of a transaction started in callback mode.
///
/// Exactly one of the two methods is invoked, exactly once.
pub trait TransactionCallback: Send + Sync {
	fn on_response(&self, receipt: Receipt);

	fn on_error(&self, code: i32, message: &str);
}

/// Receives the outcome of a read-only call started in callback mode.
pub trait CallCallback: Send + Sync {
	fn on_response(&self, result: CallResult);

	fn on_error(&self, code: i32, message: &str);
}

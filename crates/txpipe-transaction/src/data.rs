//! Unsigned transaction data.
//!
//! [`UnsignedTransactionData`] can only be obtained from
//! [`UnsignedTransactionDataBuilder::build`], which is where fee fields are
//! checked. Once built the data is read-only.

use crate::TransactionError;
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// EIP-1559 fee parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Eip1559Fee {
	pub gas_limit: u64,
	pub max_fee_per_gas: U256,
	pub max_priority_fee_per_gas: U256,
}

/// Fee fields of a transaction. Exactly one variant is ever present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FeeSpec {
	Legacy { gas_price: U256, gas_limit: u64 },
	Eip1559(Eip1559Fee),
}

impl FeeSpec {
	/// Envelope layout version selected by this fee variant.
	pub fn version(&self) -> u32 {
		match self {
			FeeSpec::Legacy { .. } => UnsignedTransactionData::LEGACY_VERSION,
			FeeSpec::Eip1559(_) => UnsignedTransactionData::EIP1559_VERSION,
		}
	}

	pub fn gas_limit(&self) -> u64 {
		match self {
			FeeSpec::Legacy { gas_limit, .. } => *gas_limit,
			FeeSpec::Eip1559(fee) => fee.gas_limit,
		}
	}
}

/// Everything needed to build a transaction envelope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnsignedTransactionData {
	group_id: String,
	chain_id: String,
	to: String,
	input: Vec<u8>,
	abi: String,
	block_limit: u64,
	nonce: String,
	value: U256,
	fee: FeeSpec,
}

impl UnsignedTransactionData {
	pub const LEGACY_VERSION: u32 = 1;
	pub const EIP1559_VERSION: u32 = 2;

	pub fn builder() -> UnsignedTransactionDataBuilder {
		UnsignedTransactionDataBuilder::default()
	}

	pub fn version(&self) -> u32 {
		self.fee.version()
	}

	pub fn group_id(&self) -> &str {
		&self.group_id
	}

	pub fn chain_id(&self) -> &str {
		&self.chain_id
	}

	/// Recipient address, empty for deployments.
	pub fn to(&self) -> &str {
		&self.to
	}

	/// Call data or deployment bytecode.
	pub fn input(&self) -> &[u8] {
		&self.input
	}

	/// Contract ABI JSON, empty unless deploying.
	pub fn abi(&self) -> &str {
		&self.abi
	}

	pub fn block_limit(&self) -> u64 {
		self.block_limit
	}

	pub fn nonce(&self) -> &str {
		&self.nonce
	}

	pub fn value(&self) -> U256 {
		self.value
	}

	pub fn fee(&self) -> &FeeSpec {
		&self.fee
	}

	pub fn is_deploy(&self) -> bool {
		self.to.is_empty()
	}
}

/// Collects transaction fields and validates them into
/// [`UnsignedTransactionData`].
///
/// Fee fields may be given either as a complete [`FeeSpec`] or field by field.
/// Mixing legacy and EIP-1559 fields, or leaving a variant incomplete, fails
/// with [`TransactionError::InvalidFeeSpec`].
#[derive(Debug, Clone, Default)]
pub struct UnsignedTransactionDataBuilder {
	group_id: String,
	chain_id: String,
	to: String,
	input: Vec<u8>,
	abi: String,
	block_limit: u64,
	nonce: String,
	value: U256,
	gas_price: Option<U256>,
	gas_limit: Option<u64>,
	max_fee_per_gas: Option<U256>,
	max_priority_fee_per_gas: Option<U256>,
}

impl UnsignedTransactionDataBuilder {
	pub fn group_id(mut self, group_id: impl Into<String>) -> Self {
		self.group_id = group_id.into();
		self
	}

	pub fn chain_id(mut self, chain_id: impl Into<String>) -> Self {
		self.chain_id = chain_id.into();
		self
	}

	pub fn to(mut self, to: impl Into<String>) -> Self {
		self.to = to.into();
		self
	}

	pub fn input(mut self, input: impl Into<Vec<u8>>) -> Self {
		self.input = input.into();
		self
	}

	pub fn abi(mut self, abi: impl Into<String>) -> Self {
		self.abi = abi.into();
		self
	}

	pub fn block_limit(mut self, block_limit: u64) -> Self {
		self.block_limit = block_limit;
		self
	}

	pub fn nonce(mut self, nonce: impl Into<String>) -> Self {
		self.nonce = nonce.into();
		self
	}

	pub fn value(mut self, value: U256) -> Self {
		self.value = value;
		self
	}

	pub fn gas_price(mut self, gas_price: U256) -> Self {
		self.gas_price = Some(gas_price);
		self
	}

	pub fn gas_limit(mut self, gas_limit: u64) -> Self {
		self.gas_limit = Some(gas_limit);
		self
	}

	pub fn max_fee_per_gas(mut self, max_fee: U256) -> Self {
		self.max_fee_per_gas = Some(max_fee);
		self
	}

	pub fn max_priority_fee_per_gas(mut self, max_priority_fee: U256) -> Self {
		self.max_priority_fee_per_gas = Some(max_priority_fee);
		self
	}

	/// Sets every fee field from a complete fee variant.
	pub fn fee(mut self, fee: FeeSpec) -> Self {
		match fee {
			FeeSpec::Legacy {
				gas_price,
				gas_limit,
			} => {
				self.gas_price = Some(gas_price);
				self.gas_limit = Some(gas_limit);
			},
			FeeSpec::Eip1559(fee) => {
				self.gas_limit = Some(fee.gas_limit);
				self.max_fee_per_gas = Some(fee.max_fee_per_gas);
				self.max_priority_fee_per_gas = Some(fee.max_priority_fee_per_gas);
			},
		}
		self
	}

	pub fn build(self) -> Result<UnsignedTransactionData, TransactionError> {
		let fee = self.fee_spec()?;
		Ok(UnsignedTransactionData {
			group_id: self.group_id,
			chain_id: self.chain_id,
			to: self.to,
			input: self.input,
			abi: self.abi,
			block_limit: self.block_limit,
			nonce: self.nonce,
			value: self.value,
			fee,
		})
	}

	fn fee_spec(&self) -> Result<FeeSpec, TransactionError> {
		let eip1559 = self.max_fee_per_gas.is_some() || self.max_priority_fee_per_gas.is_some();
		match (self.gas_price, eip1559) {
			(Some(_), true) => Err(TransactionError::InvalidFeeSpec(
				"gas price cannot be combined with EIP-1559 fee fields".to_string(),
			)),
			(Some(gas_price), false) => {
				let gas_limit = self.gas_limit.ok_or_else(|| {
					TransactionError::InvalidFeeSpec("gas price given without gas limit".to_string())
				})?;
				Ok(FeeSpec::Legacy {
					gas_price,
					gas_limit,
				})
			},
			(None, true) => match (
				self.gas_limit,
				self.max_fee_per_gas,
				self.max_priority_fee_per_gas,
			) {
				(Some(gas_limit), Some(max_fee_per_gas), Some(max_priority_fee_per_gas)) => {
					Ok(FeeSpec::Eip1559(Eip1559Fee {
						gas_limit,
						max_fee_per_gas,
						max_priority_fee_per_gas,
					}))
				},
				_ => Err(TransactionError::InvalidFeeSpec(
					"EIP-1559 fee requires gas limit, max fee and max priority fee".to_string(),
				)),
			},
			(None, false) => Err(TransactionError::InvalidFeeSpec(
				"no fee fields given".to_string(),
			)),
		}
	}
}

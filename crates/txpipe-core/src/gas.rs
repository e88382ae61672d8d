//! Gas policy for transactions built by the manager.
//!
//! The policy is consulted per call with the 4-byte method selector of the
//! call data, or `None` when the data is too short to carry one (deployments,
//! plain transfers).

use crate::TxError;
use alloy_primitives::U256;
use std::collections::HashMap;
use txpipe_codec::MethodSelector;
use txpipe_config::GasConfig;
use txpipe_transaction::Eip1559Fee;

/// Gas price used when nothing else is configured.
pub const DEFAULT_GAS_PRICE: u64 = 4_100_000_000;

/// Gas limit used when nothing else is configured.
pub const DEFAULT_GAS_LIMIT: u64 = 9_000_000;

/// Source of fee parameters for outgoing transactions.
pub trait GasProvider: Send + Sync {
	fn gas_price(&self, selector: Option<&MethodSelector>) -> U256;

	fn gas_limit(&self, selector: Option<&MethodSelector>) -> u64;

	/// EIP-1559 fee for the method, when the policy prices with it.
	fn eip1559_fee(&self, _selector: Option<&MethodSelector>) -> Option<Eip1559Fee> {
		None
	}
}

/// Fixed legacy pricing.
#[derive(Debug, Clone, Copy)]
pub struct DefaultGasProvider {
	gas_price: U256,
	gas_limit: u64,
}

impl DefaultGasProvider {
	pub fn new(gas_price: U256, gas_limit: u64) -> Self {
		Self {
			gas_price,
			gas_limit,
		}
	}
}

impl Default for DefaultGasProvider {
	fn default() -> Self {
		Self::new(U256::from(DEFAULT_GAS_PRICE), DEFAULT_GAS_LIMIT)
	}
}

impl GasProvider for DefaultGasProvider {
	fn gas_price(&self, _selector: Option<&MethodSelector>) -> U256 {
		self.gas_price
	}

	fn gas_limit(&self, _selector: Option<&MethodSelector>) -> u64 {
		self.gas_limit
	}
}

#[derive(Debug, Clone, Copy, Default)]
struct MethodGas {
	gas_price: Option<U256>,
	gas_limit: Option<u64>,
}

/// Pricing read from the `[gas]` configuration section.
///
/// Per-method entries override the base price and limit for calls whose
/// selector matches. When an EIP-1559 fee is configured every transaction is
/// priced with it; its gas limit falls back to the method's, then the base limit.
#[derive(Debug, Clone)]
pub struct StaticGasProvider {
	base: DefaultGasProvider,
	eip1559: Option<(U256, U256, Option<u64>)>,
	methods: HashMap<MethodSelector, MethodGas>,
}

impl StaticGasProvider {
	pub fn from_config(config: &GasConfig) -> Result<Self, TxError> {
		let mut methods = HashMap::new();
		for (key, entry) in &config.methods {
			let selector: MethodSelector = key.parse().map_err(|_| {
				TxError::Configuration(format!("Invalid method selector '{}' in gas config", key))
			})?;
			methods.insert(
				selector,
				MethodGas {
					gas_price: entry.gas_price.map(U256::from),
					gas_limit: entry.gas_limit,
				},
			);
		}

		Ok(Self {
			base: DefaultGasProvider::new(U256::from(config.gas_price), config.gas_limit),
			eip1559: config.eip1559.as_ref().map(|fee| {
				(
					U256::from(fee.max_fee_per_gas),
					U256::from(fee.max_priority_fee_per_gas),
					fee.gas_limit,
				)
			}),
			methods,
		})
	}

	fn method(&self, selector: Option<&MethodSelector>) -> MethodGas {
		selector
			.and_then(|s| self.methods.get(s))
			.copied()
			.unwrap_or_default()
	}
}

impl GasProvider for StaticGasProvider {
	fn gas_price(&self, selector: Option<&MethodSelector>) -> U256 {
		self.method(selector)
			.gas_price
			.unwrap_or(self.base.gas_price)
	}

	fn gas_limit(&self, selector: Option<&MethodSelector>) -> u64 {
		self.method(selector)
			.gas_limit
			.unwrap_or(self.base.gas_limit)
	}

	fn eip1559_fee(&self, selector: Option<&MethodSelector>) -> Option<Eip1559Fee> {
		let (max_fee_per_gas, max_priority_fee_per_gas, gas_limit) = self.eip1559?;
		Some(Eip1559Fee {
			gas_limit: gas_limit.unwrap_or_else(|| self.gas_limit(selector)),
			max_fee_per_gas,
			max_priority_fee_per_gas,
		})
	}
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bit flags describing how the node should interpret a transaction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TransactionAttributes(u32);

impl TransactionAttributes {
	/// Payload is ABI encoded for an EVM contract.
	pub const EVM_ABI_CODEC: u32 = 0x1;
	/// Payload is SCALE encoded for a WASM contract.
	pub const LIQUID_SCALE_CODEC: u32 = 0x2;
	/// Transaction deploys a contract.
	pub const LIQUID_CREATE: u32 = 0x8;

	/// Derives the attributes of a transaction.
	///
	/// The codec flag depends only on the target VM; the deploy flag is added
	/// for constructor calls on either VM.
	pub fn derive(is_script_vm: bool, is_constructor: bool) -> Self {
		let base = if is_script_vm {
			Self::LIQUID_SCALE_CODEC
		} else {
			Self::EVM_ABI_CODEC
		};
		let deploy = if is_constructor { Self::LIQUID_CREATE } else { 0 };
		Self(base | deploy)
	}

	pub fn from_bits(bits: u32) -> Self {
		Self(bits)
	}

	pub fn bits(self) -> u32 {
		self.0
	}

	pub fn contains(self, flag: u32) -> bool {
		self.0 & flag == flag
	}

	pub fn is_deploy(self) -> bool {
		self.contains(Self::LIQUID_CREATE)
	}
}

impl fmt::Debug for TransactionAttributes {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "TransactionAttributes({:#x})", self.0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_deploy_bit_follows_constructor_flag() {
		for is_script_vm in [false, true] {
			let deploy = TransactionAttributes::derive(is_script_vm, true);
			let call = TransactionAttributes::derive(is_script_vm, false);
			assert!(deploy.is_deploy());
			assert!(!call.is_deploy());
			// codec flag is untouched by the deploy bit
			assert_eq!(
				deploy.bits() & !TransactionAttributes::LIQUID_CREATE,
				call.bits()
			);
		}
	}

	#[test]
	fn test_codec_flag_by_vm() {
		assert_eq!(TransactionAttributes::derive(false, false).bits(), 0x1);
		assert_eq!(TransactionAttributes::derive(true, false).bits(), 0x2);
		assert_eq!(TransactionAttributes::derive(true, true).bits(), 0xa);
		assert_eq!(TransactionAttributes::derive(false, true).bits(), 0x9);
	}
}

//! Canonical transaction envelope.
//!
//! The envelope is the tuple encoding of
//!
//! ```text
//! (uint32 version, string group_id, string chain_id, string to, bytes input,
//!  string abi, uint64 block_limit, string nonce, uint256 value, <fee>)
//! ```
//!
//! where `<fee>` is `(uint256 gas_price, uint64 gas_limit)` for version 1 and
//! `(uint64 gas_limit, uint256 max_fee_per_gas, uint256
//! max_priority_fee_per_gas)` for version 2. Absent strings are encoded as
//! empty strings; no field is ever omitted.

use crate::{Eip1559Fee, FeeSpec, TransactionError, UnsignedTransactionData};
use alloy_primitives::U256;
use std::vec::IntoIter;
use txpipe_codec::{decode, decode_params, encode_params, AbiType, TypedValue, WORD};

fn common_layout() -> Vec<AbiType> {
	vec![
		AbiType::Uint(32),
		AbiType::String,
		AbiType::String,
		AbiType::String,
		AbiType::Bytes,
		AbiType::String,
		AbiType::Uint(64),
		AbiType::String,
		AbiType::Uint(256),
	]
}

fn layout(version: u32) -> Result<Vec<AbiType>, TransactionError> {
	let mut types = common_layout();
	match version {
		UnsignedTransactionData::LEGACY_VERSION => {
			types.extend([AbiType::Uint(256), AbiType::Uint(64)]);
		},
		UnsignedTransactionData::EIP1559_VERSION => {
			types.extend([AbiType::Uint(64), AbiType::Uint(256), AbiType::Uint(256)]);
		},
		other => {
			return Err(TransactionError::MalformedEncoding(format!(
				"unknown envelope version {}",
				other
			)))
		},
	}
	Ok(types)
}

fn fields(data: &UnsignedTransactionData) -> Vec<TypedValue> {
	let mut fields = vec![
		TypedValue::uint32(data.version()),
		TypedValue::string(data.group_id()),
		TypedValue::string(data.chain_id()),
		TypedValue::string(data.to()),
		TypedValue::bytes(data.input()),
		TypedValue::string(data.abi()),
		TypedValue::uint64(data.block_limit()),
		TypedValue::string(data.nonce()),
		TypedValue::uint256(data.value()),
	];
	match data.fee() {
		FeeSpec::Legacy {
			gas_price,
			gas_limit,
		} => {
			fields.push(TypedValue::uint256(*gas_price));
			fields.push(TypedValue::uint64(*gas_limit));
		},
		FeeSpec::Eip1559(fee) => {
			fields.push(TypedValue::uint64(fee.gas_limit));
			fields.push(TypedValue::uint256(fee.max_fee_per_gas));
			fields.push(TypedValue::uint256(fee.max_priority_fee_per_gas));
		},
	}
	fields
}

/// Builds the canonical envelope bytes. Pure and deterministic.
pub fn build_envelope(data: &UnsignedTransactionData) -> Result<Vec<u8>, TransactionError> {
	Ok(encode_params(&fields(data))?)
}

/// Decodes an envelope produced by [`build_envelope`].
pub fn decode_envelope(bytes: &[u8]) -> Result<UnsignedTransactionData, TransactionError> {
	let head = bytes.get(..WORD).ok_or_else(|| {
		TransactionError::MalformedEncoding("envelope is shorter than one word".to_string())
	})?;
	let version = decode(head, &AbiType::Uint(32))?
		.as_uint()
		.map(|v| v.to::<u32>())
		.unwrap_or_default();
	let mut fields = Fields(decode_params(bytes, &layout(version)?)?.into_iter());

	fields.uint()?;
	let builder = UnsignedTransactionData::builder()
		.group_id(fields.string()?)
		.chain_id(fields.string()?)
		.to(fields.string()?)
		.input(fields.bytes()?)
		.abi(fields.string()?)
		.block_limit(fields.uint()?.to::<u64>())
		.nonce(fields.string()?)
		.value(fields.uint()?);

	let fee = if version == UnsignedTransactionData::LEGACY_VERSION {
		FeeSpec::Legacy {
			gas_price: fields.uint()?,
			gas_limit: fields.uint()?.to::<u64>(),
		}
	} else {
		FeeSpec::Eip1559(Eip1559Fee {
			gas_limit: fields.uint()?.to::<u64>(),
			max_fee_per_gas: fields.uint()?,
			max_priority_fee_per_gas: fields.uint()?,
		})
	};
	builder.fee(fee).build()
}

/// Takes decoded envelope fields in order.
struct Fields(IntoIter<TypedValue>);

impl Fields {
	fn next(&mut self) -> Result<TypedValue, TransactionError> {
		self.0.next().ok_or_else(|| {
			TransactionError::MalformedEncoding("envelope has too few fields".to_string())
		})
	}

	fn uint(&mut self) -> Result<U256, TransactionError> {
		self.next()?.as_uint().ok_or_else(|| {
			TransactionError::MalformedEncoding("expected an integer field".to_string())
		})
	}

	fn string(&mut self) -> Result<String, TransactionError> {
		match self.next()? {
			TypedValue::String(text) => Ok(text),
			_ => Err(TransactionError::MalformedEncoding(
				"expected a string field".to_string(),
			)),
		}
	}

	fn bytes(&mut self) -> Result<Vec<u8>, TransactionError> {
		match self.next()? {
			TypedValue::DynamicBytes(raw) => Ok(raw),
			_ => Err(TransactionError::MalformedEncoding(
				"expected a bytes field".to_string(),
			)),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::HashEngine;
	use alloy_primitives::hex;

	fn transfer_call() -> Vec<u8> {
		let mut input = hex::decode("a9059cbb").unwrap();
		input.extend([0x11u8; 32]);
		input.extend([0x22u8; 32]);
		input
	}

	fn scenario_a() -> UnsignedTransactionData {
		UnsignedTransactionData::builder()
			.group_id("group0")
			.chain_id("chain0")
			.to("0x0102030405060708090a0b0c0d0e0f1011121314")
			.input(transfer_call())
			.block_limit(1000)
			.nonce("5f0c1e2a")
			.value(U256::ZERO)
			.gas_price(U256::from(20_000_000_000u64))
			.gas_limit(3_000_000)
			.build()
			.unwrap()
	}

	#[test]
	fn test_legacy_envelope_is_deterministic() {
		let data = scenario_a();
		let first = build_envelope(&data).unwrap();
		let second = build_envelope(&data.clone()).unwrap();
		assert_eq!(first, second);
		assert_eq!(first.len() % WORD, 0);

		for engine in [HashEngine::Keccak256, HashEngine::Sm3] {
			let hash = engine.hash(&first);
			assert_eq!(hash.as_bytes().len(), 32);
			assert_eq!(hash, engine.hash(&second));
		}
	}

	#[test]
	fn test_legacy_envelope_head() {
		let envelope = build_envelope(&scenario_a()).unwrap();
		// 11 head words, version first, then block limit and the fee words
		assert_eq!(envelope[31], 1);
		assert_eq!(U256::from_be_slice(&envelope[6 * WORD..7 * WORD]), U256::from(1000));
		assert_eq!(U256::from_be_slice(&envelope[8 * WORD..9 * WORD]), U256::ZERO);
		assert_eq!(
			U256::from_be_slice(&envelope[9 * WORD..10 * WORD]),
			U256::from(20_000_000_000u64)
		);
		assert_eq!(
			U256::from_be_slice(&envelope[10 * WORD..11 * WORD]),
			U256::from(3_000_000)
		);
	}

	#[test]
	fn test_envelope_round_trip() {
		let legacy = scenario_a();
		assert_eq!(decode_envelope(&build_envelope(&legacy).unwrap()).unwrap(), legacy);

		let deploy = UnsignedTransactionData::builder()
			.group_id("group0")
			.chain_id("chain0")
			.input(vec![0x60u8; 100])
			.abi(r#"[{"type":"constructor","inputs":[]}]"#)
			.block_limit(u64::MAX)
			.nonce("")
			.value(U256::MAX)
			.gas_limit(9_000_000)
			.max_fee_per_gas(U256::from(7))
			.max_priority_fee_per_gas(U256::from(1))
			.build()
			.unwrap();
		let decoded = decode_envelope(&build_envelope(&deploy).unwrap()).unwrap();
		assert_eq!(decoded, deploy);
		assert!(decoded.is_deploy());
	}

	#[test]
	fn test_fee_variant_changes_envelope() {
		let legacy = build_envelope(&scenario_a()).unwrap();
		let eip1559 = UnsignedTransactionData::builder()
			.group_id("group0")
			.chain_id("chain0")
			.to("0x0102030405060708090a0b0c0d0e0f1011121314")
			.input(transfer_call())
			.block_limit(1000)
			.nonce("5f0c1e2a")
			.gas_limit(3_000_000)
			.max_fee_per_gas(U256::from(20_000_000_000u64))
			.max_priority_fee_per_gas(U256::ZERO)
			.build()
			.unwrap();
		let eip1559 = build_envelope(&eip1559).unwrap();
		assert_eq!(eip1559[31], 2);
		assert_eq!(eip1559.len(), legacy.len() + WORD);
	}

	#[test]
	fn test_decode_rejects_bad_envelopes() {
		assert!(decode_envelope(&[]).is_err());

		let mut unknown = build_envelope(&scenario_a()).unwrap();
		unknown[31] = 9;
		assert!(matches!(
			decode_envelope(&unknown),
			Err(TransactionError::MalformedEncoding(_))
		));

		let envelope = build_envelope(&scenario_a()).unwrap();
		assert!(decode_envelope(&envelope[..envelope.len() - WORD]).is_err());
	}
}

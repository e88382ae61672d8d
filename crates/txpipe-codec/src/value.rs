//! Typed values.

use crate::{ceil_to_word, AbiType, CodecError, WORD};
use alloy_primitives::{Address, I256, U256};

/// A value tagged with its declared type.
///
/// Equality and hashing are structural over the raw contents and the type
/// tag, so `bytes32` and `uint256` values holding the same 32 bytes are
/// different values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypedValue {
	Bool(bool),
	Address(Address),
	Uint { bits: usize, value: U256 },
	Int { bits: usize, value: I256 },
	/// Left-aligned raw bytes; `raw.len()` equals `width`.
	FixedBytes { width: usize, raw: Vec<u8> },
	DynamicBytes(Vec<u8>),
	String(String),
	Array { element: AbiType, items: Vec<TypedValue> },
	FixedArray { element: AbiType, items: Vec<TypedValue> },
	Tuple(Vec<TypedValue>),
}

pub(crate) fn valid_bits(bits: usize) -> bool {
	bits > 0 && bits <= 256 && bits % 8 == 0
}

/// Whether the two's complement word `raw` is a sign extension of a `bits`
/// wide integer.
pub(crate) fn fits_signed(raw: U256, bits: usize) -> bool {
	if !valid_bits(bits) {
		return false;
	}
	let high = raw >> (bits - 1);
	high.is_zero() || high == U256::MAX >> (bits - 1)
}

impl TypedValue {
	pub fn uint(bits: usize, value: U256) -> Result<Self, CodecError> {
		if !valid_bits(bits) {
			return Err(CodecError::InvalidType(format!("uint{}", bits)));
		}
		if value.bit_len() > bits {
			return Err(CodecError::InvalidValue(format!(
				"{} does not fit in uint{}",
				value, bits
			)));
		}
		Ok(TypedValue::Uint { bits, value })
	}

	pub fn int(bits: usize, value: I256) -> Result<Self, CodecError> {
		if !valid_bits(bits) {
			return Err(CodecError::InvalidType(format!("int{}", bits)));
		}
		if !fits_signed(value.into_raw(), bits) {
			return Err(CodecError::InvalidValue(format!(
				"{} does not fit in int{}",
				value, bits
			)));
		}
		Ok(TypedValue::Int { bits, value })
	}

	pub fn uint256(value: U256) -> Self {
		TypedValue::Uint { bits: 256, value }
	}

	pub fn uint64(value: u64) -> Self {
		TypedValue::Uint {
			bits: 64,
			value: U256::from(value),
		}
	}

	pub fn uint32(value: u32) -> Self {
		TypedValue::Uint {
			bits: 32,
			value: U256::from(value),
		}
	}

	/// A `bytes<N>` value where N is the length of `raw`.
	pub fn fixed_bytes(raw: &[u8]) -> Result<Self, CodecError> {
		if raw.is_empty() || raw.len() > WORD {
			return Err(CodecError::InvalidValue(format!(
				"fixed byte width {} outside 1..=32",
				raw.len()
			)));
		}
		Ok(TypedValue::FixedBytes {
			width: raw.len(),
			raw: raw.to_vec(),
		})
	}

	pub fn bytes(raw: impl Into<Vec<u8>>) -> Self {
		TypedValue::DynamicBytes(raw.into())
	}

	pub fn string(text: impl Into<String>) -> Self {
		TypedValue::String(text.into())
	}

	/// A `T[]` value; every item must be of the element type.
	pub fn array(element: AbiType, items: Vec<TypedValue>) -> Result<Self, CodecError> {
		check_items(&element, &items)?;
		Ok(TypedValue::Array { element, items })
	}

	/// A `T[k]` value with `k = items.len()`.
	pub fn fixed_array(element: AbiType, items: Vec<TypedValue>) -> Result<Self, CodecError> {
		if items.is_empty() {
			return Err(CodecError::InvalidValue(
				"fixed array must have at least one item".to_string(),
			));
		}
		check_items(&element, &items)?;
		Ok(TypedValue::FixedArray { element, items })
	}

	/// Checks the invariants the constructors enforce, for values built
	/// directly from the variants.
	pub fn validate(&self) -> Result<(), CodecError> {
		match self {
			TypedValue::Uint { bits, value } => TypedValue::uint(*bits, *value).map(drop),
			TypedValue::Int { bits, value } => TypedValue::int(*bits, *value).map(drop),
			TypedValue::FixedBytes { width, raw } => {
				AbiType::FixedBytes(*width).validate()?;
				if raw.len() != *width {
					return Err(CodecError::InvalidValue(format!(
						"bytes{} value holds {} bytes",
						width,
						raw.len()
					)));
				}
				Ok(())
			},
			TypedValue::Array { element, items } => {
				element.check_element()?;
				check_items(element, items)?;
				items.iter().try_for_each(Self::validate)
			},
			TypedValue::FixedArray { element, items } => {
				if items.is_empty() {
					return Err(CodecError::InvalidValue(
						"fixed array must have at least one item".to_string(),
					));
				}
				element.check_element()?;
				check_items(element, items)?;
				items.iter().try_for_each(Self::validate)
			},
			TypedValue::Tuple(items) => items.iter().try_for_each(Self::validate),
			TypedValue::Bool(_)
			| TypedValue::Address(_)
			| TypedValue::DynamicBytes(_)
			| TypedValue::String(_) => Ok(()),
		}
	}

	/// The declared type of this value.
	pub fn abi_type(&self) -> AbiType {
		match self {
			TypedValue::Bool(_) => AbiType::Bool,
			TypedValue::Address(_) => AbiType::Address,
			TypedValue::Uint { bits, .. } => AbiType::Uint(*bits),
			TypedValue::Int { bits, .. } => AbiType::Int(*bits),
			TypedValue::FixedBytes { width, .. } => AbiType::FixedBytes(*width),
			TypedValue::DynamicBytes(_) => AbiType::Bytes,
			TypedValue::String(_) => AbiType::String,
			TypedValue::Array { element, .. } => AbiType::Array(Box::new(element.clone())),
			TypedValue::FixedArray { element, items } => {
				AbiType::FixedArray(Box::new(element.clone()), items.len())
			},
			TypedValue::Tuple(items) => AbiType::Tuple(items.iter().map(Self::abi_type).collect()),
		}
	}

	pub fn is_dynamic(&self) -> bool {
		match self {
			TypedValue::DynamicBytes(_) | TypedValue::String(_) | TypedValue::Array { .. } => true,
			TypedValue::FixedArray { element, .. } => element.is_dynamic(),
			TypedValue::Tuple(items) => items.iter().any(Self::is_dynamic),
			_ => false,
		}
	}

	/// Bytes this value occupies in the head of its enclosing tuple.
	pub fn head_len(&self) -> usize {
		if self.is_dynamic() {
			WORD
		} else {
			self.encoded_len()
		}
	}

	/// Exact length of this value's own encoding.
	pub fn encoded_len(&self) -> usize {
		match self {
			TypedValue::DynamicBytes(raw) => WORD + ceil_to_word(raw.len()),
			TypedValue::String(text) => WORD + ceil_to_word(text.len()),
			TypedValue::Array { items, .. } => WORD + tuple_len(items),
			TypedValue::FixedArray { items, .. } | TypedValue::Tuple(items) => tuple_len(items),
			_ => WORD,
		}
	}

	/// Length reserved for this value's data area.
	///
	/// For `bytes` and `string` of length L this is `32` when `L <= 32` and
	/// `(L / 32 + 1) * 32` otherwise, which is never shorter than the padded
	/// data and is one word longer when L is a non-zero multiple of 32. Every
	/// other value reserves exactly its encoded length.
	pub fn padded_length(&self) -> usize {
		match self {
			TypedValue::DynamicBytes(raw) => padded_data_len(raw.len()),
			TypedValue::String(text) => padded_data_len(text.len()),
			_ => self.encoded_len(),
		}
	}

	/// Tail space to reserve for a dynamic value, length word included.
	pub(crate) fn reserved_tail_len(&self) -> usize {
		match self {
			TypedValue::DynamicBytes(_) | TypedValue::String(_) => WORD + self.padded_length(),
			_ => self.padded_length(),
		}
	}

	pub fn as_uint(&self) -> Option<U256> {
		match self {
			TypedValue::Uint { value, .. } => Some(*value),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			TypedValue::String(text) => Some(text),
			_ => None,
		}
	}

	/// Contents of a `bytes` or `bytes<N>` value.
	pub fn as_bytes(&self) -> Option<&[u8]> {
		match self {
			TypedValue::DynamicBytes(raw) | TypedValue::FixedBytes { raw, .. } => Some(raw),
			_ => None,
		}
	}

	pub fn into_items(self) -> Option<Vec<TypedValue>> {
		match self {
			TypedValue::Tuple(items)
			| TypedValue::Array { items, .. }
			| TypedValue::FixedArray { items, .. } => Some(items),
			_ => None,
		}
	}
}

fn padded_data_len(len: usize) -> usize {
	if len <= WORD {
		WORD
	} else {
		(len / WORD + 1) * WORD
	}
}

fn tuple_len(items: &[TypedValue]) -> usize {
	items
		.iter()
		.map(|item| {
			if item.is_dynamic() {
				WORD + item.encoded_len()
			} else {
				item.encoded_len()
			}
		})
		.sum()
}

fn check_items(element: &AbiType, items: &[TypedValue]) -> Result<(), CodecError> {
	match items.iter().find(|item| item.abi_type() != *element) {
		Some(item) => Err(CodecError::InvalidValue(format!(
			"expected {} item, got {}",
			element,
			item.abi_type()
		))),
		None => Ok(()),
	}
}

impl From<bool> for TypedValue {
	fn from(value: bool) -> Self {
		TypedValue::Bool(value)
	}
}

impl From<Address> for TypedValue {
	fn from(value: Address) -> Self {
		TypedValue::Address(value)
	}
}

impl From<String> for TypedValue {
	fn from(value: String) -> Self {
		TypedValue::String(value)
	}
}

impl From<&str> for TypedValue {
	fn from(value: &str) -> Self {
		TypedValue::String(value.to_string())
	}
}

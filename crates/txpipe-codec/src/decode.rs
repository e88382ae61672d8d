use crate::value::fits_signed;
use crate::{ceil_to_word, AbiType, CodecError, TypedValue, WORD};
use alloy_primitives::{Address, I256, U256};

/// Decodes a single value of the declared type.
///
/// The input is what [`crate::encode`] produces for a value of that type.
pub fn decode(data: &[u8], ty: &AbiType) -> Result<TypedValue, CodecError> {
	ty.validate()?;
	check_layout(data, ty.head_len())?;
	Reader { data }.read_value(ty, 0)
}

/// Decodes the members of a tuple of the declared types.
pub fn decode_params(data: &[u8], types: &[AbiType]) -> Result<Vec<TypedValue>, CodecError> {
	types.iter().try_for_each(AbiType::validate)?;
	let head_len = types
		.iter()
		.fold(0usize, |total, ty| total.saturating_add(ty.head_len()));
	check_layout(data, head_len)?;
	Reader { data }.read_sequence(types.iter(), 0)
}

fn check_layout(data: &[u8], min_len: usize) -> Result<(), CodecError> {
	if data.len() % WORD != 0 {
		return Err(malformed(format!(
			"length {} is not a multiple of {}",
			data.len(),
			WORD
		)));
	}
	if data.len() < min_len {
		return Err(malformed(format!(
			"expected at least {} bytes, got {}",
			min_len,
			data.len()
		)));
	}
	Ok(())
}

fn malformed(message: impl Into<String>) -> CodecError {
	CodecError::MalformedEncoding(message.into())
}

struct Reader<'a> {
	data: &'a [u8],
}

impl<'a> Reader<'a> {
	fn word(&self, pos: usize) -> Result<&'a [u8], CodecError> {
		pos.checked_add(WORD)
			.and_then(|end| self.data.get(pos..end))
			.ok_or_else(|| malformed(format!("word at {} is out of bounds", pos)))
	}

	fn slice(&self, pos: usize, len: usize) -> Result<&'a [u8], CodecError> {
		pos.checked_add(len)
			.and_then(|end| self.data.get(pos..end))
			.ok_or_else(|| malformed(format!("{} bytes at {} are out of bounds", len, pos)))
	}

	fn read_u256(&self, pos: usize) -> Result<U256, CodecError> {
		Ok(U256::from_be_slice(self.word(pos)?))
	}

	fn read_usize(&self, pos: usize) -> Result<usize, CodecError> {
		let value = self.read_u256(pos)?;
		usize::try_from(value).map_err(|_| malformed(format!("{} at {} is not a valid length", value, pos)))
	}

	fn read_sequence<'t>(
		&self,
		types: impl Iterator<Item = &'t AbiType>,
		base: usize,
	) -> Result<Vec<TypedValue>, CodecError> {
		let mut head = base;
		let mut values = Vec::new();
		for ty in types {
			if ty.is_dynamic() {
				let offset = self.read_usize(head)?;
				let at = base
					.checked_add(offset)
					.ok_or_else(|| malformed(format!("offset {} overflows", offset)))?;
				values.push(self.read_value(ty, at)?);
				head += WORD;
			} else {
				values.push(self.read_value(ty, head)?);
				head += ty.head_len();
			}
		}
		Ok(values)
	}

	fn read_value(&self, ty: &AbiType, pos: usize) -> Result<TypedValue, CodecError> {
		match ty {
			AbiType::Bool => {
				let word = self.word(pos)?;
				match (word[..WORD - 1].iter().all(|b| *b == 0), word[WORD - 1]) {
					(true, 0) => Ok(TypedValue::Bool(false)),
					(true, 1) => Ok(TypedValue::Bool(true)),
					_ => Err(malformed(format!("bool at {} is not 0 or 1", pos))),
				}
			},
			AbiType::Address => {
				let word = self.word(pos)?;
				if word[..12].iter().any(|b| *b != 0) {
					return Err(malformed(format!("address at {} has dirty high bytes", pos)));
				}
				Ok(TypedValue::Address(Address::from_slice(&word[12..])))
			},
			AbiType::Uint(bits) => {
				let value = self.read_u256(pos)?;
				if value.bit_len() > *bits {
					return Err(malformed(format!("uint{} at {} is out of range", bits, pos)));
				}
				Ok(TypedValue::Uint { bits: *bits, value })
			},
			AbiType::Int(bits) => {
				let raw = self.read_u256(pos)?;
				if !fits_signed(raw, *bits) {
					return Err(malformed(format!("int{} at {} is out of range", bits, pos)));
				}
				Ok(TypedValue::Int {
					bits: *bits,
					value: I256::from_raw(raw),
				})
			},
			AbiType::FixedBytes(width) => {
				let word = self.word(pos)?;
				if word[*width..].iter().any(|b| *b != 0) {
					return Err(malformed(format!("bytes{} at {} has dirty padding", width, pos)));
				}
				Ok(TypedValue::FixedBytes {
					width: *width,
					raw: word[..*width].to_vec(),
				})
			},
			AbiType::Bytes => Ok(TypedValue::DynamicBytes(self.read_dynamic(pos)?.to_vec())),
			AbiType::String => {
				let raw = self.read_dynamic(pos)?;
				String::from_utf8(raw.to_vec())
					.map(TypedValue::String)
					.map_err(|_| malformed(format!("string at {} is not valid UTF-8", pos)))
			},
			AbiType::Array(inner) => {
				let len = self.read_usize(pos)?;
				let body = pos + WORD;
				let remaining = self.data.len().saturating_sub(body);
				if len.checked_mul(inner.head_len()).is_none_or(|need| need > remaining) {
					return Err(malformed(format!(
						"array length {} at {} exceeds the buffer",
						len, pos
					)));
				}
				let items = self.read_sequence(std::iter::repeat_n(inner.as_ref(), len), body)?;
				Ok(TypedValue::Array {
					element: inner.as_ref().clone(),
					items,
				})
			},
			AbiType::FixedArray(inner, len) => {
				let items = self.read_sequence(std::iter::repeat_n(inner.as_ref(), *len), pos)?;
				Ok(TypedValue::FixedArray {
					element: inner.as_ref().clone(),
					items,
				})
			},
			AbiType::Tuple(members) => Ok(TypedValue::Tuple(self.read_sequence(members.iter(), pos)?)),
		}
	}

	/// Reads a length-prefixed byte sequence and checks its padding fits.
	fn read_dynamic(&self, pos: usize) -> Result<&'a [u8], CodecError> {
		let len = self.read_usize(pos)?;
		let start = pos + WORD;
		self.slice(start, ceil_to_word(len))?;
		self.slice(start, len)
	}
}

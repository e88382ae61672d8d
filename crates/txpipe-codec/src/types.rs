//! Declared types.

use crate::value::valid_bits;
use crate::{CodecError, WORD};
use std::fmt;
use std::str::FromStr;

/// The declared type a value is encoded as or decoded into.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AbiType {
	Bool,
	Address,
	/// Unsigned integer of the given bit width (8..=256, multiple of 8).
	Uint(usize),
	/// Signed integer of the given bit width (8..=256, multiple of 8).
	Int(usize),
	/// Fixed byte sequence of the given width (1..=32).
	FixedBytes(usize),
	Bytes,
	String,
	Array(Box<AbiType>),
	FixedArray(Box<AbiType>, usize),
	Tuple(Vec<AbiType>),
}

impl AbiType {
	/// Whether values of this type live in the tail behind an offset word.
	pub fn is_dynamic(&self) -> bool {
		match self {
			AbiType::Bytes | AbiType::String | AbiType::Array(_) => true,
			AbiType::FixedArray(inner, _) => inner.is_dynamic(),
			AbiType::Tuple(members) => members.iter().any(AbiType::is_dynamic),
			_ => false,
		}
	}

	/// Bytes this type occupies in the head of its enclosing tuple.
	///
	/// Dynamic types take a single offset word; static composites are inlined.
	pub fn head_len(&self) -> usize {
		if self.is_dynamic() {
			return WORD;
		}
		match self {
			AbiType::FixedArray(inner, len) => inner.head_len().saturating_mul(*len),
			AbiType::Tuple(members) => members
				.iter()
				.fold(0usize, |total, member| total.saturating_add(member.head_len())),
			_ => WORD,
		}
	}

	/// Checks the widths and sizes that [`AbiType::parse`] enforces, for types
	/// built directly from the variants.
	pub fn validate(&self) -> Result<(), CodecError> {
		let invalid = || CodecError::InvalidType(self.to_string());
		match self {
			AbiType::Uint(bits) | AbiType::Int(bits) if !valid_bits(*bits) => Err(invalid()),
			AbiType::FixedBytes(width) if !(1..=WORD).contains(width) => Err(invalid()),
			AbiType::Array(inner) => inner.check_element(),
			AbiType::FixedArray(inner, len) => {
				if *len == 0 {
					return Err(invalid());
				}
				inner.check_element()
			},
			AbiType::Tuple(members) => members.iter().try_for_each(AbiType::validate),
			_ => Ok(()),
		}
	}

	/// Array elements must occupy head space.
	pub(crate) fn check_element(&self) -> Result<(), CodecError> {
		self.validate()?;
		if self.head_len() == 0 {
			return Err(CodecError::InvalidType(format!(
				"{} has no encoded width",
				self
			)));
		}
		Ok(())
	}

	/// Parses a canonical type string such as `uint256`, `bytes32[]` or
	/// `(address,uint256)[2]`.
	pub fn parse(s: &str) -> Result<Self, CodecError> {
		let ty = Self::parse_unchecked(s)?;
		ty.validate()?;
		Ok(ty)
	}

	fn parse_unchecked(s: &str) -> Result<Self, CodecError> {
		let s = s.trim();
		let invalid = || CodecError::InvalidType(s.to_string());

		if let Some(body) = s.strip_suffix(']') {
			let open = body.rfind('[').ok_or_else(invalid)?;
			let inner = Box::new(Self::parse_unchecked(&body[..open])?);
			let dim = &body[open + 1..];
			if dim.is_empty() {
				return Ok(AbiType::Array(inner));
			}
			let len: usize = dim.parse().map_err(|_| invalid())?;
			if len == 0 {
				return Err(invalid());
			}
			return Ok(AbiType::FixedArray(inner, len));
		}

		if let Some(body) = s.strip_prefix('(').and_then(|b| b.strip_suffix(')')) {
			let members = split_top_level(body)
				.ok_or_else(invalid)?
				.into_iter()
				.map(Self::parse_unchecked)
				.collect::<Result<Vec<_>, _>>()?;
			return Ok(AbiType::Tuple(members));
		}

		match s {
			"bool" => return Ok(AbiType::Bool),
			"address" => return Ok(AbiType::Address),
			"bytes" => return Ok(AbiType::Bytes),
			"string" => return Ok(AbiType::String),
			"uint" => return Ok(AbiType::Uint(256)),
			"int" => return Ok(AbiType::Int(256)),
			_ => {},
		}

		if let Some(bits) = s.strip_prefix("uint") {
			let bits = parse_bits(bits).ok_or_else(invalid)?;
			return Ok(AbiType::Uint(bits));
		}
		if let Some(bits) = s.strip_prefix("int") {
			let bits = parse_bits(bits).ok_or_else(invalid)?;
			return Ok(AbiType::Int(bits));
		}
		if let Some(width) = s.strip_prefix("bytes") {
			let width: usize = width.parse().map_err(|_| invalid())?;
			if !(1..=WORD).contains(&width) {
				return Err(invalid());
			}
			return Ok(AbiType::FixedBytes(width));
		}

		Err(invalid())
	}
}

fn parse_bits(text: &str) -> Option<usize> {
	let bits: usize = text.parse().ok()?;
	valid_bits(bits).then_some(bits)
}

/// Splits a tuple body on commas that are not nested in parentheses.
fn split_top_level(body: &str) -> Option<Vec<&str>> {
	if body.trim().is_empty() {
		return Some(Vec::new());
	}
	let mut parts = Vec::new();
	let mut depth = 0usize;
	let mut start = 0;
	for (i, c) in body.char_indices() {
		match c {
			'(' => depth += 1,
			')' => depth = depth.checked_sub(1)?,
			',' if depth == 0 => {
				parts.push(&body[start..i]);
				start = i + 1;
			},
			_ => {},
		}
	}
	if depth != 0 {
		return None;
	}
	parts.push(&body[start..]);
	Some(parts)
}

impl FromStr for AbiType {
	type Err = CodecError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl fmt::Display for AbiType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			AbiType::Bool => f.write_str("bool"),
			AbiType::Address => f.write_str("address"),
			AbiType::Uint(bits) => write!(f, "uint{}", bits),
			AbiType::Int(bits) => write!(f, "int{}", bits),
			AbiType::FixedBytes(width) => write!(f, "bytes{}", width),
			AbiType::Bytes => f.write_str("bytes"),
			AbiType::String => f.write_str("string"),
			AbiType::Array(inner) => write!(f, "{}[]", inner),
			AbiType::FixedArray(inner, len) => write!(f, "{}[{}]", inner, len),
			AbiType::Tuple(members) => {
				f.write_str("(")?;
				for (i, member) in members.iter().enumerate() {
					if i > 0 {
						f.write_str(",")?;
					}
					write!(f, "{}", member)?;
				}
				f.write_str(")")
			},
		}
	}
}

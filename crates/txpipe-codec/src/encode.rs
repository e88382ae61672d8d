use crate::{ceil_to_word, CodecError, TypedValue, WORD};
use alloy_primitives::U256;

/// Encodes a single value.
///
/// Static values produce their head words. Dynamic values produce their own
/// encoding without a leading offset word, which is what an enclosing tuple
/// places in its tail.
pub fn encode(value: &TypedValue) -> Result<Vec<u8>, CodecError> {
	value.validate()?;
	let mut out = Vec::with_capacity(value.encoded_len());
	encode_into(value, &mut out);
	Ok(out)
}

/// Encodes a sequence of values as the members of a tuple.
pub fn encode_params(values: &[TypedValue]) -> Result<Vec<u8>, CodecError> {
	values.iter().try_for_each(TypedValue::validate)?;
	let mut out = Vec::with_capacity(reserved_len(values));
	encode_tuple(values, &mut out);
	Ok(out)
}

/// Upper bound on the encoded length of `values` as a tuple.
///
/// Dynamic members reserve their length word plus their padded length, so the
/// bound can be computed before any offset is known.
pub fn reserved_len(values: &[TypedValue]) -> usize {
	values
		.iter()
		.map(|value| {
			if value.is_dynamic() {
				WORD + value.reserved_tail_len()
			} else {
				value.encoded_len()
			}
		})
		.sum()
}

fn push_word(out: &mut Vec<u8>, value: U256) {
	out.extend_from_slice(&value.to_be_bytes::<WORD>());
}

fn push_len(out: &mut Vec<u8>, len: usize) {
	push_word(out, U256::from(len));
}

fn push_padded(out: &mut Vec<u8>, data: &[u8]) {
	out.extend_from_slice(data);
	out.resize(out.len() + ceil_to_word(data.len()) - data.len(), 0);
}

fn encode_into(value: &TypedValue, out: &mut Vec<u8>) {
	match value {
		TypedValue::Bool(flag) => push_word(out, U256::from(*flag as u8)),
		TypedValue::Address(address) => {
			out.extend_from_slice(&[0u8; 12]);
			out.extend_from_slice(address.as_slice());
		},
		TypedValue::Uint { value, .. } => push_word(out, *value),
		TypedValue::Int { value, .. } => push_word(out, value.into_raw()),
		TypedValue::FixedBytes { raw, .. } => push_padded(out, raw),
		TypedValue::DynamicBytes(raw) => {
			push_len(out, raw.len());
			push_padded(out, raw);
		},
		TypedValue::String(text) => {
			push_len(out, text.len());
			push_padded(out, text.as_bytes());
		},
		TypedValue::Array { items, .. } => {
			push_len(out, items.len());
			encode_tuple(items, out);
		},
		TypedValue::FixedArray { items, .. } | TypedValue::Tuple(items) => encode_tuple(items, out),
	}
}

fn encode_tuple(items: &[TypedValue], out: &mut Vec<u8>) {
	let head_len: usize = items.iter().map(TypedValue::head_len).sum();
	let mut tail = Vec::new();
	for item in items {
		if item.is_dynamic() {
			push_len(out, head_len + tail.len());
			encode_into(item, &mut tail);
		} else {
			encode_into(item, out);
		}
	}
	out.extend_from_slice(&tail);
}

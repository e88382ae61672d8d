//! Typed value codec for contract arguments and transaction envelopes.
//!
//! Values are laid out in 32-byte words. Numeric primitives are big-endian and
//! right-aligned, fixed byte sequences are left-aligned, and dynamic values
//! (`bytes`, `string`, `T[]`, and tuples or fixed arrays that contain them) are
//! referenced from the head of their enclosing tuple by an offset word and
//! stored in its tail, zero-padded to the next word boundary.
//!
//! Decoding always needs the declared type: the same bytes decode differently
//! as `bytes32` and as `uint256`, and the resulting values compare unequal.

mod decode;
mod encode;
mod function;
mod types;
mod value;

pub use decode::{decode, decode_params};
pub use encode::{encode, encode_params, reserved_len};
pub use function::{encode_function_call, function_selector, MethodSelector};
pub use types::AbiType;
pub use value::TypedValue;

use thiserror::Error;

/// Size of one encoding word in bytes.
pub const WORD: usize = 32;

/// Errors that can occur while encoding or decoding typed values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
	/// The byte layout does not match the declared type.
	#[error("Malformed encoding: {0}")]
	MalformedEncoding(String),
	/// A value does not fit the type it was declared with.
	#[error("Invalid value: {0}")]
	InvalidValue(String),
	/// A type string could not be parsed.
	#[error("Invalid type: {0}")]
	InvalidType(String),
}

/// Rounds `len` up to a whole number of words.
pub(crate) fn ceil_to_word(len: usize) -> usize {
	len.div_ceil(WORD) * WORD
}

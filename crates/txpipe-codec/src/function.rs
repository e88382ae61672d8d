use crate::{encode_params, CodecError, TypedValue};
use alloy_primitives::hex;
use std::fmt;
use std::str::FromStr;

/// The four leading bytes of contract call data that identify the method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodSelector(pub [u8; 4]);

impl MethodSelector {
	/// Selector of the given call data, `None` when it is shorter than four bytes.
	pub fn from_call_data(data: &[u8]) -> Option<Self> {
		let head = data.get(..4)?;
		let mut selector = [0u8; 4];
		selector.copy_from_slice(head);
		Some(Self(selector))
	}
}

impl fmt::Display for MethodSelector {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", hex::encode_prefixed(self.0))
	}
}

impl FromStr for MethodSelector {
	type Err = CodecError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let raw = hex::decode(s).map_err(|e| CodecError::InvalidValue(format!("{}: {}", s, e)))?;
		let selector: [u8; 4] = raw
			.try_into()
			.map_err(|_| CodecError::InvalidValue(format!("{}: selector must be 4 bytes", s)))?;
		Ok(Self(selector))
	}
}

/// Selector of a canonical function signature such as `transfer(address,uint256)`.
///
/// The hash function is supplied by the caller so SM chains can select with SM3.
pub fn function_selector<H>(signature: &str, hasher: H) -> MethodSelector
where
	H: Fn(&[u8]) -> [u8; 32],
{
	let digest = hasher(signature.as_bytes());
	MethodSelector([digest[0], digest[1], digest[2], digest[3]])
}

/// Call data for a method: the selector followed by the encoded arguments.
pub fn encode_function_call(
	selector: MethodSelector,
	args: &[TypedValue],
) -> Result<Vec<u8>, CodecError> {
	let mut data = selector.0.to_vec();
	data.extend(encode_params(args)?);
	Ok(data)
}

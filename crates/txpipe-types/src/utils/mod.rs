//! Hex formatting helpers.
//!
//! Hashes, signatures and call data cross the transport boundary as hex
//! strings; these helpers normalise the `0x` prefix and shorten identifiers
//! for log output.

/// Truncates a hex string for display purposes.
///
/// Shows only the first 10 characters (enough for `0x` plus four bytes)
/// followed by ".." for longer strings.
pub fn truncate_id(id: &str) -> String {
	match id.char_indices().nth(10) {
		Some((cut, _)) => format!("{}..", &id[..cut]),
		None => id.to_string(),
	}
}

/// Adds "0x" prefix to a hex string if it doesn't already have one.
pub fn with_0x_prefix(hex_str: &str) -> String {
	if hex_str.to_lowercase().starts_with("0x") {
		hex_str.to_string()
	} else {
		format!("0x{}", hex_str)
	}
}

/// Removes "0x" or "0X" prefix from a hex string if present.
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str
		.strip_prefix("0x")
		.or_else(|| hex_str.strip_prefix("0X"))
		.unwrap_or(hex_str)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_truncate_id() {
		assert_eq!(truncate_id("0x12345678"), "0x12345678");
		assert_eq!(truncate_id("0x1234567890abcdef"), "0x12345678..");
	}

	#[test]
	fn test_truncate_id_multibyte() {
		assert_eq!(truncate_id("0x1234567é89"), "0x1234567é..");
		assert_eq!(truncate_id("ééééééééééé"), "éééééééééé..");
		assert_eq!(truncate_id("éééééééééé"), "éééééééééé");
	}

	#[test]
	fn test_with_0x_prefix() {
		assert_eq!(with_0x_prefix("a9059cbb"), "0xa9059cbb");
		assert_eq!(with_0x_prefix("0xa9059cbb"), "0xa9059cbb");
		assert_eq!(with_0x_prefix("0Xa9059cbb"), "0Xa9059cbb");
	}

	#[test]
	fn test_without_0x_prefix() {
		assert_eq!(without_0x_prefix("0xa9059cbb"), "a9059cbb");
		assert_eq!(without_0x_prefix("0Xa9059cbb"), "a9059cbb");
		assert_eq!(without_0x_prefix("a9059cbb"), "a9059cbb");
		assert_eq!(without_0x_prefix("/apps/hello"), "/apps/hello");
	}
}

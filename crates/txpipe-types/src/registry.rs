//! Registry trait for self-registering implementations.
//!
//! Every pluggable signer or transport module exposes a `Registry` struct that
//! names the implementation as it appears in configuration and hands out the
//! factory that builds it.

/// Base trait for implementation registries.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation,
	/// for example `"local"` in `[signer.implementations.local]` or `"jsonrpc"`
	/// in `[transport.implementations.jsonrpc]`.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	///
	/// Each capability crate defines its own factory type (`SignerFactory`,
	/// `TransportFactory`).
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}

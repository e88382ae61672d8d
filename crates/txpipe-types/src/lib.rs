//! Common types module for the transaction pipeline.
//!
//! This module defines the value types shared by every stage of the pipeline:
//! content hashes, signatures, receipts, the single-fire completion used at the
//! two suspension points, and the configuration schema framework each pluggable
//! implementation validates itself against.

/// Single-fire completion handles for asynchronous collaborators.
pub mod completion;
/// Crypto type selection and the content hash it produces.
pub mod crypto;
/// Receipts, call requests and call results exchanged with the transport.
pub mod receipt;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Secure string type for private keys and tokens.
pub mod secret_string;
/// Signature results produced by signer capabilities.
pub mod signature;
/// Utility functions for hex formatting.
pub mod utils;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

pub use completion::{Completion, CompletionReceiver, StatusCode};
pub use crypto::{ContentHash, CryptoType};
pub use receipt::{CallRequest, CallResult, Receipt};
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use signature::{EcdsaSignature, RawSignature, SignatureResult};
pub use utils::{truncate_id, with_0x_prefix, without_0x_prefix};
pub use validation::*;

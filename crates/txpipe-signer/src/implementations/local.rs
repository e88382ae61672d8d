//! Local private-key signer.
//!
//! Holds a secp256k1 key in memory and signs content hashes on the blocking
//! thread pool, resolving the completion from there.

use crate::{complete, SignCompletion, SignOutcome, SignerError, SignerInterface};
use alloy_primitives::{Address, B256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use txpipe_types::{
	ConfigSchema, ContentHash, EcdsaSignature, Field, FieldType, Schema, SecretString,
	ValidationError,
};

/// Signer backed by a private key held in process memory.
pub struct LocalSigner {
	signer: PrivateKeySigner,
}

impl LocalSigner {
	pub fn new(private_key: &SecretString) -> Result<Self, SignerError> {
		let signer: PrivateKeySigner = private_key.with_exposed(|key| {
			key.parse()
				.map_err(|_| SignerError::InvalidKey("Invalid private key format".to_string()))
		})?;
		Ok(Self { signer })
	}

	fn sign_hash(signer: &PrivateKeySigner, hash: ContentHash) -> SignOutcome {
		let signature = signer
			.sign_hash_sync(&B256::from(*hash.as_bytes()))
			.map_err(|e| SignerError::SigningFailed(e.to_string()))?;
		let signature = EcdsaSignature::from_bytes(&signature.as_bytes()).ok_or_else(|| {
			SignerError::SigningFailed("Signer produced an invalid recovery id".to_string())
		})?;
		Ok(Box::new(signature))
	}
}

/// Configuration schema for the local signer.
pub struct LocalSignerSchema;

impl ConfigSchema for LocalSignerSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new(
				"private_key",
				FieldType::Hex { bytes: Some(32) },
			)],
			vec![],
		);
		schema.validate(config)
	}
}

#[async_trait]
impl SignerInterface for LocalSigner {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LocalSignerSchema)
	}

	async fn address(&self) -> Result<Address, SignerError> {
		Ok(self.signer.address())
	}

	fn sign_async(&self, hash: ContentHash, completion: SignCompletion) {
		let signer = self.signer.clone();
		tokio::task::spawn_blocking(move || {
			let outcome = Self::sign_hash(&signer, hash);
			if let Err(e) = &outcome {
				tracing::warn!(hash = %hash, error = %e, "Local signing failed");
			}
			complete(completion, outcome);
		});
	}
}

/// Factory function to create a local signer from configuration.
///
/// Configuration parameters:
/// - `private_key`: 32-byte secp256k1 key as hex, with or without `0x`
pub fn create_signer(config: &toml::Value) -> Result<Box<dyn SignerInterface>, SignerError> {
	LocalSignerSchema
		.validate(config)
		.map_err(|e| SignerError::InvalidKey(format!("Invalid configuration: {}", e)))?;

	let private_key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.map(SecretString::from)
		.ok_or_else(|| SignerError::InvalidKey("private_key is required".to_string()))?;

	Ok(Box::new(LocalSigner::new(&private_key)?))
}

/// Registry for the local signer implementation.
pub struct Registry;

impl txpipe_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "local";
	type Factory = crate::SignerFactory;

	fn factory() -> Self::Factory {
		create_signer
	}
}

impl crate::SignerRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::SignerService;
	use txpipe_types::SignatureResult;

	const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcaf784d7bf4f2ff80";

	fn config(key: &str) -> toml::Value {
		toml::from_str(&format!("private_key = \"{}\"", key)).unwrap()
	}

	#[tokio::test]
	async fn test_address_from_key() {
		let signer = create_signer(&config(TEST_KEY)).unwrap();
		let address = signer.address().await.unwrap();
		assert_eq!(
			address,
			"0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
				.parse::<Address>()
				.unwrap()
		);
	}

	#[tokio::test]
	async fn test_signature_is_65_bytes_and_deterministic() {
		let service = SignerService::new(create_signer(&config(TEST_KEY)).unwrap());
		let hash = ContentHash::from([0x42u8; 32]);
		let first = service.sign(hash).await.unwrap();
		let second = service.sign(hash).await.unwrap();

		let encoded = first.encode();
		assert_eq!(encoded.len(), EcdsaSignature::ENCODED_LEN);
		assert_eq!(first.encoded_len(), Some(EcdsaSignature::ENCODED_LEN));
		assert!(encoded[64] <= 1);
		assert_eq!(encoded, second.encode());
	}

	#[test]
	fn test_rejects_bad_keys() {
		assert!(create_signer(&config("0x1234")).is_err());
		assert!(create_signer(&toml::Value::Table(Default::default())).is_err());
	}
}

//! Configuration module for the transaction pipeline.
//!
//! This module provides the structures a client session and its transaction
//! manager are built from. Configuration is written in TOML, may reference
//! environment variables as `${NAME}` or `${NAME:-default}`, and is validated
//! as a whole before anything is constructed from it.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["signer.toml", "transport.toml"]` to include other files
//! - Each top-level section must be unique across all files

mod loader;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use txpipe_types::CryptoType;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message only; the default rendering repeats the input
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Chain identity and per-session constants.
	pub session: SessionConfig,
	/// Signer implementations.
	pub signer: SignerConfig,
	/// Node transport implementations.
	pub transport: TransportConfig,
	/// Gas price policy.
	#[serde(default)]
	pub gas: GasConfig,
	/// Stage timeouts of the submission pipeline.
	#[serde(default)]
	pub orchestrator: OrchestratorConfig,
}

/// Chain identity and the constants fixed for the lifetime of a session.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
	pub group_id: String,
	pub chain_id: String,
	/// Selects the hash function of the session.
	#[serde(default = "default_crypto_type")]
	pub crypto_type: CryptoType,
	/// Whether contracts run on the WASM (script) VM.
	#[serde(default)]
	pub is_wasm: bool,
	/// Opaque data appended to every signed transaction.
	#[serde(default)]
	pub extra_data: String,
	/// Blocks added to the current block number to form the validity bound.
	#[serde(default = "default_block_limit_offset")]
	pub block_limit_offset: u64,
}

fn default_crypto_type() -> CryptoType {
	CryptoType::Ecdsa
}

fn default_block_limit_offset() -> u64 {
	500
}

/// Configuration for signer implementations.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignerConfig {
	/// Which implementation to use. Falls back to the default signer.
	pub primary: Option<String>,
	/// Map of signer implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for transport implementations.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransportConfig {
	/// Which implementation to use.
	pub primary: String,
	/// Map of transport implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Gas price policy.
///
/// `gas_price` and `gas_limit` apply to every method unless `methods` has an
/// entry for the call's 4-byte selector. When `eip1559` is set, transactions
/// that do not name a fee explicitly use it instead of the legacy price.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GasConfig {
	#[serde(default = "default_gas_price")]
	pub gas_price: u64,
	#[serde(default = "default_gas_limit")]
	pub gas_limit: u64,
	pub eip1559: Option<Eip1559Config>,
	/// Overrides keyed by `0x`-prefixed method selector.
	#[serde(default)]
	pub methods: HashMap<String, MethodGasConfig>,
}

impl Default for GasConfig {
	fn default() -> Self {
		Self {
			gas_price: default_gas_price(),
			gas_limit: default_gas_limit(),
			eip1559: None,
			methods: HashMap::new(),
		}
	}
}

fn default_gas_price() -> u64 {
	4_100_000_000
}

fn default_gas_limit() -> u64 {
	9_000_000
}

/// EIP-1559 fee parameters of the gas policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Eip1559Config {
	pub max_fee_per_gas: u64,
	pub max_priority_fee_per_gas: u64,
	/// Defaults to the policy's gas limit.
	pub gas_limit: Option<u64>,
}

/// Per-method gas overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MethodGasConfig {
	pub gas_price: Option<u64>,
	pub gas_limit: Option<u64>,
}

/// Stage timeouts of the submission pipeline.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrchestratorConfig {
	/// How long a transaction waits for its signature.
	#[serde(default = "default_sign_timeout_seconds")]
	pub sign_timeout_seconds: u64,
	/// How long a transaction waits for the node's receipt.
	#[serde(default = "default_submit_timeout_seconds")]
	pub submit_timeout_seconds: u64,
}

impl Default for OrchestratorConfig {
	fn default() -> Self {
		Self {
			sign_timeout_seconds: default_sign_timeout_seconds(),
			submit_timeout_seconds: default_submit_timeout_seconds(),
		}
	}
}

fn default_sign_timeout_seconds() -> u64 {
	30
}

fn default_submit_timeout_seconds() -> u64 {
	60
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to bound regex work.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last = 0;
	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match (std::env::var(var_name.as_str()), cap.get(2)) {
			(Ok(value), _) => value,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => {
				return Err(ConfigError::Validation(format!(
					"Environment variable '{}' not found",
					var_name.as_str()
				)))
			},
		};
		result.push_str(&input[last..full_match.start()]);
		result.push_str(&value);
		last = full_match.end();
	}
	result.push_str(&input[last..]);

	Ok(result)
}

fn is_method_selector(key: &str) -> bool {
	key.len() == 10
		&& key.starts_with("0x")
		&& key[2..].chars().all(|c| c.is_ascii_hexdigit())
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path = Path::new(path);
		let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
		let file_name = path
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path.display())))?;
		loader::ConfigLoader::new(base_dir).load(file_name).await
	}

	/// Validates the configuration as a whole.
	///
	/// - Session identifiers are not empty and the block offset is positive
	/// - The selected signer and transport are configured
	/// - Gas values are positive and method overrides are keyed by selector
	/// - Stage timeouts are between 1 second and 1 hour
	fn validate(&self) -> Result<(), ConfigError> {
		if self.session.group_id.is_empty() {
			return Err(ConfigError::Validation("Session group_id cannot be empty".into()));
		}
		if self.session.chain_id.is_empty() {
			return Err(ConfigError::Validation("Session chain_id cannot be empty".into()));
		}
		if self.session.block_limit_offset == 0 {
			return Err(ConfigError::Validation(
				"Session block_limit_offset must be greater than 0".into(),
			));
		}

		if self.signer.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one signer implementation required".into(),
			));
		}
		if let Some(primary) = &self.signer.primary {
			if !self.signer.implementations.contains_key(primary) {
				return Err(ConfigError::Validation(format!(
					"Primary signer '{}' not found in implementations",
					primary
				)));
			}
		}

		if self.transport.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Transport primary implementation cannot be empty".into(),
			));
		}
		if !self
			.transport
			.implementations
			.contains_key(&self.transport.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary transport '{}' not found in implementations",
				self.transport.primary
			)));
		}

		self.validate_gas()?;

		for (name, seconds) in [
			("sign_timeout_seconds", self.orchestrator.sign_timeout_seconds),
			("submit_timeout_seconds", self.orchestrator.submit_timeout_seconds),
		] {
			if seconds == 0 || seconds > 3600 {
				return Err(ConfigError::Validation(format!(
					"Orchestrator {} must be between 1 and 3600",
					name
				)));
			}
		}

		Ok(())
	}

	fn validate_gas(&self) -> Result<(), ConfigError> {
		if self.gas.gas_limit == 0 {
			return Err(ConfigError::Validation("Gas limit must be greater than 0".into()));
		}
		if let Some(eip1559) = &self.gas.eip1559 {
			if eip1559.max_priority_fee_per_gas > eip1559.max_fee_per_gas {
				return Err(ConfigError::Validation(
					"EIP-1559 max_priority_fee_per_gas cannot exceed max_fee_per_gas".into(),
				));
			}
			if eip1559.gas_limit == Some(0) {
				return Err(ConfigError::Validation(
					"EIP-1559 gas_limit must be greater than 0".into(),
				));
			}
		}
		for (selector, method) in &self.gas.methods {
			if !is_method_selector(selector) {
				return Err(ConfigError::Validation(format!(
					"Gas method key '{}' is not a 0x-prefixed 4-byte selector",
					selector
				)));
			}
			if method.gas_limit == Some(0) {
				return Err(ConfigError::Validation(format!(
					"Gas limit for method {} must be greater than 0",
					selector
				)));
			}
		}
		Ok(())
	}
}

/// Parses TOML text, resolving environment variables and validating the result.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

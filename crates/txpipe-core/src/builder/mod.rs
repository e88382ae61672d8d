//! Builder pattern for constructing transaction managers.
//!
//! Composes a [`TransactionManager`] from configuration using factory
//! functions for the signer and transport implementations. Each configured
//! implementation that has a factory is created and validated; the primary one
//! is handed to the manager.

use crate::engine::{StageTimeouts, TransactionManager};
use crate::gas::StaticGasProvider;
use crate::session::ClientSession;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Handle;
use txpipe_config::Config;
use txpipe_signer::{SignerError, SignerInterface, SignerService, DEFAULT_SIGNER};
use txpipe_transport::{TransportError, TransportInterface, TransportService};

/// Errors that can occur during manager construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions for every implementation the builder may create.
pub struct ManagerFactories<SF, TF> {
	pub signer_factories: HashMap<String, SF>,
	pub transport_factories: HashMap<String, TF>,
}

/// Builder for constructing a TransactionManager with pluggable implementations.
pub struct ManagerBuilder {
	config: Config,
}

impl ManagerBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the manager using the given factories.
	pub async fn build<SF, TF>(
		self,
		factories: ManagerFactories<SF, TF>,
	) -> Result<TransactionManager, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn SignerInterface>, SignerError>,
		TF: Fn(&toml::Value) -> Result<Box<dyn TransportInterface>, TransportError>,
	{
		let runtime = Handle::try_current().map_err(|e| {
			BuilderError::Config(format!("Manager needs a Tokio runtime: {}", e))
		})?;

		let primary_signer = self
			.config
			.signer
			.primary
			.as_deref()
			.unwrap_or(DEFAULT_SIGNER);
		let signer = SignerService::new(load_primary(
			"signer",
			primary_signer,
			&self.config.signer.implementations,
			&factories.signer_factories,
		)?);

		match signer.get_address().await {
			Ok(address) => {
				tracing::info!(component = "signer", address = %address, "Signer ready");
			},
			Err(e) => {
				tracing::error!(component = "signer", error = %e, "Failed to get signer address");
				return Err(BuilderError::Config(format!(
					"Failed to get signer address: {}",
					e
				)));
			},
		}

		let transport = TransportService::new(load_primary(
			"transport",
			&self.config.transport.primary,
			&self.config.transport.implementations,
			&factories.transport_factories,
		)?);

		let gas = StaticGasProvider::from_config(&self.config.gas)
			.map_err(|e| BuilderError::Config(e.to_string()))?;
		let session = ClientSession::from_config(&self.config.session);
		tracing::info!(
			group_id = %session.group_id(),
			chain_id = %session.chain_id(),
			crypto_type = ?session.crypto_type(),
			is_wasm = session.is_wasm(),
			"Session configured"
		);

		Ok(TransactionManager::new(session, signer, transport, runtime)
			.with_gas_provider(Arc::new(gas))
			.with_timeouts(StageTimeouts::from_config(&self.config.orchestrator)))
	}
}

/// Creates every configured implementation that has a factory and returns the
/// primary one.
fn load_primary<I, E, F>(
	component: &str,
	primary: &str,
	configs: &HashMap<String, toml::Value>,
	factories: &HashMap<String, F>,
) -> Result<Box<I>, BuilderError>
where
	I: ?Sized,
	E: Display,
	F: Fn(&toml::Value) -> Result<Box<I>, E>,
{
	let mut implementations = HashMap::new();
	for (name, config) in configs {
		if let Some(factory) = factories.get(name) {
			match factory(config) {
				Ok(implementation) => {
					// Validation already happened in the factory
					implementations.insert(name.clone(), implementation);
					let is_primary = name == primary;
					tracing::info!(component = %component, implementation = %name, enabled = %is_primary, "Loaded");
				},
				Err(e) => {
					tracing::error!(
						component = %component,
						implementation = %name,
						error = %e,
						"Failed to create implementation"
					);
					return Err(BuilderError::Config(format!(
						"Failed to create {} implementation '{}': {}",
						component, name, e
					)));
				},
			}
		}
	}

	if implementations.is_empty() {
		return Err(BuilderError::MissingComponent(format!(
			"No valid {} implementations available",
			component
		)));
	}

	implementations.remove(primary).ok_or_else(|| {
		BuilderError::Config(format!(
			"Primary {} '{}' failed to load or has invalid configuration",
			component, primary
		))
	})
}

/// Macro to build factories from config implementations
macro_rules! build_factories {
	($registered:expr, $config_impls:expr, $type_name:literal) => {{
		let registered: HashMap<&'static str, _> = $registered.into_iter().collect();
		let mut factories = HashMap::new();
		for name in $config_impls.keys() {
			if let Some(factory) = registered.get(name.as_str()) {
				factories.insert(name.clone(), *factory);
			} else {
				let mut available: Vec<_> = registered.keys().copied().collect();
				available.sort_unstable();
				return Err(BuilderError::Config(format!(
					"Unknown {} implementation '{}'. Available: [{}]",
					$type_name,
					name,
					available.join(", ")
				)));
			}
		}
		factories
	}};
}

/// Builds a manager from configuration using every registered implementation.
pub async fn build_manager_from_config(config: Config) -> Result<TransactionManager, BuilderError> {
	let signer_factories = build_factories!(
		txpipe_signer::get_all_implementations(),
		config.signer.implementations,
		"signer"
	);
	let transport_factories = build_factories!(
		txpipe_transport::get_all_implementations(),
		config.transport.implementations,
		"transport"
	);

	ManagerBuilder::new(config)
		.build(ManagerFactories {
			signer_factories,
			transport_factories,
		})
		.await
}

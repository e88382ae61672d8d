//! JSON-RPC transport.
//!
//! Talks JSON-RPC 2.0 over HTTP to a node. Every request carries the group and
//! node identifiers as its first two parameters:
//!
//! - `sendTransaction`: `[group, node, signed_hex, is_call]`, returns a receipt
//! - `call`: `[group, node, to, data_hex, signature_hex]`, returns a call result
//! - `getBlockNumber`: `[group, node]`, returns a number or hex quantity

use crate::{SubmitCompletion, TransportError, TransportInterface};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use txpipe_types::{
	truncate_id, with_0x_prefix, without_0x_prefix, CallRequest, CallResult, ConfigSchema, Field,
	FieldType, Receipt, Schema, ValidationError,
};

const DEFAULT_GROUP: &str = "group0";
const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Connection details shared with spawned submission tasks.
struct Endpoint {
	client: reqwest::Client,
	url: String,
	group: String,
	node: String,
	next_id: AtomicU64,
}

impl Endpoint {
	async fn request(&self, method: &str, args: Vec<Value>) -> Result<Value, TransportError> {
		let mut params = vec![json!(self.group), json!(self.node)];
		params.extend(args);
		let body = json!({
			"jsonrpc": "2.0",
			"id": self.next_id.fetch_add(1, Ordering::Relaxed),
			"method": method,
			"params": params,
		});

		let response = self
			.client
			.post(&self.url)
			.json(&body)
			.send()
			.await
			.map_err(|e| TransportError::Network(format!("{} request failed: {}", method, e)))?;
		let payload: Value = response.json().await.map_err(|e| {
			TransportError::InvalidResponse(format!("{} response is not JSON: {}", method, e))
		})?;
		parse_response(payload)
	}
}

/// Extracts `result` from a JSON-RPC response, mapping `error` to a node error.
fn parse_response(payload: Value) -> Result<Value, TransportError> {
	if let Some(error) = payload.get("error").filter(|e| !e.is_null()) {
		return Err(TransportError::Node {
			code: error.get("code").and_then(Value::as_i64).unwrap_or(-1),
			message: error
				.get("message")
				.and_then(Value::as_str)
				.unwrap_or_default()
				.to_string(),
		});
	}
	payload
		.get("result")
		.cloned()
		.ok_or_else(|| TransportError::InvalidResponse("response has no result".to_string()))
}

fn parse_block_number(value: &Value) -> Result<u64, TransportError> {
	if let Some(number) = value.as_u64() {
		return Ok(number);
	}
	value
		.as_str()
		.and_then(|s| match s.strip_prefix("0x") {
			Some(hex) => u64::from_str_radix(hex, 16).ok(),
			None => s.parse().ok(),
		})
		.ok_or_else(|| TransportError::InvalidResponse(format!("bad block number {}", value)))
}

/// JSON-RPC over HTTP transport.
pub struct JsonRpcTransport {
	endpoint: Arc<Endpoint>,
}

impl JsonRpcTransport {
	pub fn new(
		url: String,
		group: String,
		node: String,
		timeout: Duration,
	) -> Result<Self, TransportError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| TransportError::Implementation(format!("HTTP client: {}", e)))?;
		Ok(Self {
			endpoint: Arc::new(Endpoint {
				client,
				url,
				group,
				node,
				next_id: AtomicU64::new(1),
			}),
		})
	}
}

/// Configuration schema for the JSON-RPC transport.
pub struct JsonRpcTransportSchema;

impl ConfigSchema for JsonRpcTransportSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("url", FieldType::String).with_validator(|value| {
				match value.as_str() {
					Some(url) if url.starts_with("http://") || url.starts_with("https://") => Ok(()),
					_ => Err("url must start with http:// or https://".to_string()),
				}
			})],
			vec![
				Field::new("group", FieldType::String),
				Field::new("node", FieldType::String),
				Field::new(
					"timeout_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(600),
					},
				),
			],
		);
		schema.validate(config)
	}
}

#[async_trait]
impl TransportInterface for JsonRpcTransport {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(JsonRpcTransportSchema)
	}

	fn submit(&self, signed: Vec<u8>, is_call: bool, completion: SubmitCompletion) {
		let endpoint = self.endpoint.clone();
		tokio::spawn(async move {
			let outcome = async {
				let result = endpoint
					.request(
						"sendTransaction",
						vec![json!(hex::encode(&signed)), json!(is_call)],
					)
					.await?;
				serde_json::from_value::<Receipt>(result)
					.map_err(|e| TransportError::InvalidResponse(format!("receipt: {}", e)))
			}
			.await;
			match &outcome {
				Ok(receipt) => tracing::debug!(
					tx_hash = %truncate_id(&receipt.transaction_hash),
					block = receipt.block_number,
					"Node returned receipt"
				),
				Err(e) => tracing::warn!(error = %e, "sendTransaction failed"),
			}
			completion.complete(outcome);
		});
	}

	async fn call(
		&self,
		request: &CallRequest,
		signature: &[u8],
	) -> Result<CallResult, TransportError> {
		let result = self
			.endpoint
			.request(
				"call",
				vec![
					json!(without_0x_prefix(&request.to)),
					json!(hex::encode(&request.data)),
					json!(with_0x_prefix(&hex::encode(signature))),
				],
			)
			.await?;
		serde_json::from_value(result)
			.map_err(|e| TransportError::InvalidResponse(format!("call result: {}", e)))
	}

	async fn block_number(&self) -> Result<u64, TransportError> {
		let result = self.endpoint.request("getBlockNumber", vec![]).await?;
		parse_block_number(&result)
	}
}

/// Factory function to create a JSON-RPC transport from configuration.
///
/// Configuration parameters:
/// - `url`: node RPC endpoint
/// - `group`: group identifier, defaults to `group0`
/// - `node`: node name within the group, empty lets the node choose
/// - `timeout_seconds`: HTTP timeout, defaults to 30
pub fn create_transport(
	config: &toml::Value,
) -> Result<Box<dyn TransportInterface>, TransportError> {
	JsonRpcTransportSchema
		.validate(config)
		.map_err(|e| TransportError::Implementation(format!("Invalid configuration: {}", e)))?;

	let text = |key: &str| config.get(key).and_then(|v| v.as_str()).map(str::to_string);
	let url = text("url")
		.ok_or_else(|| TransportError::Implementation("url is required".to_string()))?;
	let group = text("group").unwrap_or_else(|| DEFAULT_GROUP.to_string());
	let node = text("node").unwrap_or_default();
	let timeout = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(|s| s as u64)
		.unwrap_or(DEFAULT_TIMEOUT_SECONDS);

	Ok(Box::new(JsonRpcTransport::new(
		url,
		group,
		node,
		Duration::from_secs(timeout),
	)?))
}

/// Registry for the JSON-RPC transport implementation.
pub struct Registry;

impl txpipe_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "jsonrpc";
	type Factory = crate::TransportFactory;

	fn factory() -> Self::Factory {
		create_transport
	}
}

impl crate::TransportRegistry for Registry {}

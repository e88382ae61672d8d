//! Transport-facing types for the pipeline.
//!
//! This module defines what the node returns for submitted transactions and
//! read-only calls, and the request a read-only call is made with.

use serde::{Deserialize, Serialize};

/// Transaction receipt containing execution details.
///
/// Field names follow the node's JSON representation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Receipt {
	/// Hash of the transaction as reported by the node.
	pub transaction_hash: String,
	/// Block in which the transaction was included.
	pub block_number: u64,
	/// Execution status, 0 means success.
	pub status: i32,
	/// Hex-encoded return data.
	pub output: String,
	/// Gas consumed, as the node reports it.
	pub gas_used: String,
	/// Address of the deployed contract for deployments, empty otherwise.
	pub contract_address: String,
	/// Optional node message, usually set on failure.
	pub message: String,
}

impl Receipt {
	/// Whether the transaction executed successfully.
	pub fn is_success(&self) -> bool {
		self.status == 0
	}
}

/// Request for a read-only call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRequest {
	/// Caller address, empty when the node should not attribute the call.
	pub from: String,
	/// Target contract.
	pub to: String,
	/// ABI encoded call data.
	pub data: Vec<u8>,
}

impl CallRequest {
	pub fn new(to: impl Into<String>, data: Vec<u8>) -> Self {
		Self {
			from: String::new(),
			to: to.into(),
			data,
		}
	}
}

/// Result of a read-only call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CallResult {
	/// Block the call was evaluated against.
	pub block_number: u64,
	/// Hex-encoded return data.
	pub output: String,
	/// Execution status, 0 means success.
	pub status: i32,
}

//! Test doubles for the manager's signer and transport.

use super::{StageTimeouts, TransactionManager};
use crate::request::{CallCallback, TransactionCallback};
use crate::session::ClientSession;
use alloy_primitives::Address;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, Semaphore};
use tracing_subscriber::EnvFilter;
use txpipe_signer::{SignCompletion, SignerError, SignerInterface, SignerService};
use txpipe_transport::{SubmitCompletion, TransportError, TransportInterface, TransportService};
use txpipe_types::{
	CallRequest, CallResult, ConfigSchema, ContentHash, CryptoType, EcdsaSignature, Receipt,
	Schema, ValidationError,
};

struct EmptySchema;

impl ConfigSchema for EmptySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

pub(crate) fn test_signature() -> EcdsaSignature {
	EcdsaSignature {
		r: [0x11; 32],
		s: [0x22; 32],
		v: 1,
	}
}

/// How [`TestSigner`] answers.
pub(crate) enum SignBehaviour {
	Sign,
	Fail,
	/// Drops the completion without resolving it.
	Drop,
	/// Keeps the completion and never resolves it.
	Hold,
	/// Signs once the semaphore hands out a permit.
	Gated(Arc<Semaphore>),
}

pub(crate) struct TestSigner {
	calls: Arc<AtomicUsize>,
	behaviour: SignBehaviour,
	held: Mutex<Vec<SignCompletion>>,
}

impl TestSigner {
	pub(crate) fn new(behaviour: SignBehaviour) -> (Self, Arc<AtomicUsize>) {
		let calls = Arc::new(AtomicUsize::new(0));
		let signer = Self {
			calls: calls.clone(),
			behaviour,
			held: Mutex::new(Vec::new()),
		};
		(signer, calls)
	}
}

#[async_trait]
impl SignerInterface for TestSigner {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(EmptySchema)
	}

	async fn address(&self) -> Result<Address, SignerError> {
		Ok(Address::ZERO)
	}

	fn sign_async(&self, _hash: ContentHash, completion: SignCompletion) {
		self.calls.fetch_add(1, Ordering::SeqCst);
		match &self.behaviour {
			SignBehaviour::Sign => {
				completion.complete(Ok(Box::new(test_signature())));
			},
			SignBehaviour::Fail => {
				completion.complete(Err(SignerError::SigningFailed("key locked".to_string())));
			},
			SignBehaviour::Drop => drop(completion),
			SignBehaviour::Hold => self.held.lock().unwrap().push(completion),
			SignBehaviour::Gated(gate) => {
				let gate = gate.clone();
				tokio::spawn(async move {
					if let Ok(_permit) = gate.acquire().await {
						completion.complete(Ok(Box::new(test_signature())));
					}
				});
			},
		}
	}
}

/// How [`TestTransport`] answers.
pub(crate) enum SubmitBehaviour {
	Receipt,
	/// Rejects submissions and calls with a node error.
	Fail,
	/// Drops the submission completion without resolving it.
	Drop,
	/// Keeps the completion and never resolves it; calls never return.
	Hold,
}

/// What the test transport has seen.
#[derive(Default)]
pub(crate) struct TransportLog {
	pub submits: AtomicUsize,
	pub calls: AtomicUsize,
	pub last_signed: Mutex<Option<Vec<u8>>>,
	pub last_call_signature: Mutex<Option<Vec<u8>>>,
}

pub(crate) struct TestTransport {
	log: Arc<TransportLog>,
	behaviour: SubmitBehaviour,
	held: Mutex<Vec<SubmitCompletion>>,
}

impl TestTransport {
	pub(crate) fn new() -> (Self, Arc<TransportLog>) {
		Self::with_behaviour(SubmitBehaviour::Receipt)
	}

	/// Transport whose node rejects every submission and call.
	pub(crate) fn failing() -> (Self, Arc<TransportLog>) {
		Self::with_behaviour(SubmitBehaviour::Fail)
	}

	pub(crate) fn with_behaviour(behaviour: SubmitBehaviour) -> (Self, Arc<TransportLog>) {
		let log = Arc::new(TransportLog::default());
		let transport = Self {
			log: log.clone(),
			behaviour,
			held: Mutex::new(Vec::new()),
		};
		(transport, log)
	}

	fn node_error() -> TransportError {
		TransportError::Node {
			code: -32000,
			message: "rejected".to_string(),
		}
	}
}

#[async_trait]
impl TransportInterface for TestTransport {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(EmptySchema)
	}

	fn submit(&self, signed: Vec<u8>, _is_call: bool, completion: SubmitCompletion) {
		self.log.submits.fetch_add(1, Ordering::SeqCst);
		*self.log.last_signed.lock().unwrap() = Some(signed);
		match self.behaviour {
			SubmitBehaviour::Receipt => {
				completion.complete(Ok(Receipt {
					transaction_hash: "0xabc".to_string(),
					block_number: 42,
					..Receipt::default()
				}));
			},
			SubmitBehaviour::Fail => {
				completion.complete(Err(Self::node_error()));
			},
			SubmitBehaviour::Drop => drop(completion),
			SubmitBehaviour::Hold => self.held.lock().unwrap().push(completion),
		}
	}

	async fn call(
		&self,
		_request: &CallRequest,
		signature: &[u8],
	) -> Result<CallResult, TransportError> {
		self.log.calls.fetch_add(1, Ordering::SeqCst);
		*self.log.last_call_signature.lock().unwrap() = Some(signature.to_vec());
		match self.behaviour {
			SubmitBehaviour::Fail => return Err(Self::node_error()),
			SubmitBehaviour::Hold => std::future::pending::<()>().await,
			SubmitBehaviour::Receipt | SubmitBehaviour::Drop => {},
		}
		Ok(CallResult {
			block_number: 42,
			output: "0x01".to_string(),
			status: 0,
		})
	}

	async fn block_number(&self) -> Result<u64, TransportError> {
		Ok(100)
	}
}

/// Routes manager logs to the test harness, filtered by `RUST_LOG`.
fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();
}

/// Manager over the given doubles with short stage limits, spawning on the
/// test's runtime.
pub(crate) fn manager(signer: TestSigner, transport: TestTransport) -> TransactionManager {
	manager_on(Handle::current(), signer, transport)
}

pub(crate) fn manager_on(
	runtime: Handle,
	signer: TestSigner,
	transport: TestTransport,
) -> TransactionManager {
	init_tracing();
	TransactionManager::new(
		ClientSession::new("group0", "chain0", CryptoType::Ecdsa),
		SignerService::new(Box::new(signer)),
		TransportService::new(Box::new(transport)),
		runtime,
	)
	.with_timeouts(StageTimeouts {
		sign: Duration::from_secs(2),
		submit: Duration::from_secs(2),
	})
}

/// Forwards callback invocations into a channel: block number or error code.
pub(crate) struct ChannelCallback {
	sender: mpsc::UnboundedSender<Result<u64, i32>>,
}

impl ChannelCallback {
	pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<Result<u64, i32>>) {
		let (sender, receiver) = mpsc::unbounded_channel();
		(Self { sender }, receiver)
	}
}

impl TransactionCallback for ChannelCallback {
	fn on_response(&self, receipt: Receipt) {
		let _ = self.sender.send(Ok(receipt.block_number));
	}

	fn on_error(&self, code: i32, _message: &str) {
		let _ = self.sender.send(Err(code));
	}
}

impl CallCallback for ChannelCallback {
	fn on_response(&self, result: CallResult) {
		let _ = self.sender.send(Ok(result.block_number));
	}

	fn on_error(&self, code: i32, _message: &str) {
		let _ = self.sender.send(Err(code));
	}
}

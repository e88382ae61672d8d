use super::TransactionManager;
use crate::pending::TransactionHandle;
use crate::request::{TransactionCallback, TransactionRequest};
use crate::state::{TxState, TxStateMachine};
use crate::TxError;
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::instrument;
use txpipe_codec::MethodSelector;
use txpipe_transaction::{
	assemble, build_envelope, FeeSpec, TransactionAttributes, UnsignedTransactionData,
};
use txpipe_types::{truncate_id, ContentHash, Receipt};
use uuid::Uuid;

impl TransactionManager {
	/// Turns a request into unsigned transaction data.
	///
	/// Missing fees come from the gas policy for the call's method selector,
	/// a missing block limit from the node's block number plus the session
	/// offset. Every call draws a fresh nonce.
	pub async fn prepare(
		&self,
		request: &TransactionRequest,
	) -> Result<UnsignedTransactionData, TxError> {
		let selector = MethodSelector::from_call_data(&request.data);
		let selector = selector.as_ref();

		let block_limit = match request.block_limit {
			Some(limit) => limit,
			None => self
				.transport
				.block_number()
				.await?
				.saturating_add(self.session.block_limit_offset()),
		};

		let builder = UnsignedTransactionData::builder()
			.group_id(self.session.group_id())
			.chain_id(self.session.chain_id())
			.to(request.to.clone().unwrap_or_default())
			.input(request.data.clone())
			.abi(request.abi.clone().unwrap_or_default())
			.block_limit(block_limit)
			.nonce(Uuid::new_v4().simple().to_string())
			.value(request.value);

		let builder = match (request.eip1559, request.gas_price) {
			(Some(_), Some(_)) => {
				return Err(TxError::InvalidFeeSpec(
					"gas price cannot be combined with an EIP-1559 fee".to_string(),
				))
			},
			(Some(_), None) if request.gas_limit.is_some() => {
				return Err(TxError::InvalidFeeSpec(
					"gas limit of an EIP-1559 request belongs in its fee".to_string(),
				))
			},
			(Some(fee), None) => builder.fee(FeeSpec::Eip1559(fee)),
			(None, Some(gas_price)) => builder.fee(FeeSpec::Legacy {
				gas_price,
				gas_limit: request
					.gas_limit
					.unwrap_or_else(|| self.gas.gas_limit(selector)),
			}),
			(None, None) => match self.gas.eip1559_fee(selector) {
				Some(mut fee) => {
					if let Some(gas_limit) = request.gas_limit {
						fee.gas_limit = gas_limit;
					}
					builder.fee(FeeSpec::Eip1559(fee))
				},
				None => builder.fee(FeeSpec::Legacy {
					gas_price: self.gas.gas_price(selector),
					gas_limit: request
						.gas_limit
						.unwrap_or_else(|| self.gas.gas_limit(selector)),
				}),
			},
		};

		Ok(builder.build()?)
	}

	/// Builds, hashes and starts signing `data`, returning a handle to its outcome.
	///
	/// Encoding problems are reported here, before the signer is contacted.
	/// Submitting data whose content hash is already pending joins that
	/// transaction instead of signing it again.
	pub fn submit_prepared(
		&self,
		data: UnsignedTransactionData,
		constructor: bool,
	) -> Result<TransactionHandle, TxError> {
		let mut machine = TxStateMachine::new();
		let envelope = build_envelope(&data)?;
		let hash = self.session.hash(&envelope);
		machine.hashed(hash);
		let attributes = TransactionAttributes::derive(self.session.is_wasm(), constructor);

		let (handle, created) = self.pending.join(hash, attributes);
		if !created {
			tracing::info!(
				tx_hash = %truncate_id(&hash.to_hex()),
				"Transaction already pending, waiting on the existing submission"
			);
			return Ok(handle);
		}

		let manager = self.clone();
		self.runtime.spawn(async move {
			let outcome = manager
				.sign_and_submit(&mut machine, hash, envelope, attributes)
				.await;
			match &outcome {
				Ok(receipt) => {
					tracing::info!(
						tx_hash = %truncate_id(&hash.to_hex()),
						block_number = receipt.block_number,
						status = receipt.status,
						"Transaction resolved"
					);
				},
				Err(e) => {
					machine.advance(TxState::Failed);
					tracing::error!(
						tx_hash = %truncate_id(&hash.to_hex()),
						code = e.code(),
						error = %e,
						"Transaction failed"
					);
				},
			}
			manager.pending.resolve(&hash, attributes, outcome);
		});

		Ok(handle)
	}

	async fn sign_and_submit(
		&self,
		machine: &mut TxStateMachine,
		hash: ContentHash,
		envelope: Vec<u8>,
		attributes: TransactionAttributes,
	) -> Result<Receipt, TxError> {
		machine.advance(TxState::AwaitingSignature);
		let signature = self.await_signature(hash).await?;

		let signed = assemble(
			&envelope,
			&hash,
			signature.as_ref(),
			attributes,
			self.session.extra_data(),
		)?;
		machine.advance(TxState::Assembled);

		let receiver = self.transport.submit(signed, false);
		machine.advance(TxState::Submitted);
		tracing::info!(tx_hash = %truncate_id(&hash.to_hex()), "Transaction submitted");

		let receipt = self.await_receipt(hash, receiver).await?;
		machine.advance(TxState::Resolved);
		Ok(receipt)
	}

	/// Sends a transaction and waits for its receipt.
	#[instrument(skip_all, fields(to = %request.to.as_deref().map(truncate_id).unwrap_or_default()))]
	pub async fn send_transaction(&self, request: &TransactionRequest) -> Result<Receipt, TxError> {
		let data = self.prepare(request).await?;
		self.submit_prepared(data, request.constructor)?.wait().await
	}

	/// Sends a transaction and reports its outcome to `callback`.
	///
	/// Returns the content hash once the transaction is handed to the signer.
	/// Errors found before that point are returned here and the callback is
	/// not invoked; afterwards exactly one callback method is invoked once.
	#[instrument(skip_all, fields(to = %request.to.as_deref().map(truncate_id).unwrap_or_default()))]
	pub async fn async_send_transaction(
		&self,
		request: &TransactionRequest,
		callback: Box<dyn TransactionCallback>,
	) -> Result<ContentHash, TxError> {
		let data = self.prepare(request).await?;
		let handle = self.submit_prepared(data, request.constructor)?;
		let hash = handle.hash();

		self.runtime.spawn(async move {
			match handle.wait().await {
				Ok(receipt) => callback.on_response(receipt),
				Err(e) => callback.on_error(e.code(), &e.to_string()),
			}
		});

		Ok(hash)
	}

	/// Sends a transaction and blocks the current thread until it resolves.
	///
	/// From a plain thread this drives the send on the manager's runtime. On a
	/// multi-threaded runtime worker the worker is handed off first. A
	/// current-thread runtime cannot block on itself and is rejected.
	pub fn send_transaction_blocking(&self, request: &TransactionRequest) -> Result<Receipt, TxError> {
		let Ok(current) = Handle::try_current() else {
			return self.runtime.block_on(self.send_transaction(request));
		};
		match current.runtime_flavor() {
			RuntimeFlavor::MultiThread => {
				tokio::task::block_in_place(|| current.block_on(self.send_transaction(request)))
			},
			_ => Err(TxError::Configuration(
				"blocking send cannot run on a current-thread runtime worker".to_string(),
			)),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::engine::testing::{
		manager, manager_on, ChannelCallback, SignBehaviour, SubmitBehaviour, TestSigner,
		TestTransport,
	};
	use crate::engine::StageTimeouts;
	use alloy_primitives::U256;
	use std::sync::atomic::Ordering;
	use std::sync::Arc;
	use std::time::Duration;
	use tokio::sync::Semaphore;
	use txpipe_transaction::{decode_envelope, decode_signed, Eip1559Fee};
	use txpipe_transport::TransportError;

	const TOKEN: &str = "0x7f0d0c6c8e7a2c7f6c5b5f8e3e1a9d4b2c1d0e0f";

	fn transfer_data() -> Vec<u8> {
		let mut data = vec![0xa9, 0x05, 0x9c, 0xbb];
		data.extend_from_slice(&[0x11; 64]);
		data
	}

	fn worker_runtime() -> tokio::runtime::Runtime {
		tokio::runtime::Builder::new_multi_thread()
			.worker_threads(2)
			.enable_all()
			.build()
			.unwrap()
	}

	#[tokio::test]
	async fn test_send_transaction_resolves_receipt() {
		let (signer, sign_calls) = TestSigner::new(SignBehaviour::Sign);
		let (transport, log) = TestTransport::new();
		let manager = manager(signer, transport);

		let request = TransactionRequest::call(TOKEN, transfer_data()).with_block_limit(1000);
		let receipt = manager.send_transaction(&request).await.unwrap();

		assert_eq!(receipt.block_number, 42);
		assert_eq!(sign_calls.load(Ordering::SeqCst), 1);
		assert_eq!(log.submits.load(Ordering::SeqCst), 1);
		assert_eq!(manager.pending_count(), 0);

		let signed = log.last_signed.lock().unwrap().clone().unwrap();
		let tx = decode_signed(&signed).unwrap();
		assert_eq!(tx.hash, manager.session().hash(&tx.envelope));
		assert_eq!(tx.signature.len(), 65);
		assert!(!tx.attributes.is_deploy());

		let data = decode_envelope(&tx.envelope).unwrap();
		assert_eq!(data.to(), TOKEN);
		assert_eq!(data.block_limit(), 1000);
		assert_eq!(data.group_id(), "group0");
	}

	#[tokio::test]
	async fn test_prepare_fills_gas_block_limit_and_nonce() {
		let (signer, _) = TestSigner::new(SignBehaviour::Sign);
		let (transport, _) = TestTransport::new();
		let manager = manager(signer, transport);

		let request = TransactionRequest::call(TOKEN, transfer_data());
		let first = manager.prepare(&request).await.unwrap();
		let second = manager.prepare(&request).await.unwrap();

		assert_eq!(first.block_limit(), 100 + 500);
		assert_eq!(
			*first.fee(),
			FeeSpec::Legacy {
				gas_price: U256::from(4_100_000_000u64),
				gas_limit: 9_000_000,
			}
		);
		assert!(!first.nonce().is_empty());
		assert_ne!(first.nonce(), second.nonce());
	}

	#[tokio::test]
	async fn test_prepare_with_explicit_fees() {
		let (signer, _) = TestSigner::new(SignBehaviour::Sign);
		let (transport, _) = TestTransport::new();
		let manager = manager(signer, transport);

		let fee = Eip1559Fee {
			gas_limit: 21_000,
			max_fee_per_gas: U256::from(30),
			max_priority_fee_per_gas: U256::from(2),
		};
		let data = manager
			.prepare(&TransactionRequest::call(TOKEN, vec![]).with_eip1559(fee))
			.await
			.unwrap();
		assert_eq!(*data.fee(), FeeSpec::Eip1559(fee));
		assert_eq!(data.version(), 2);

		let data = manager
			.prepare(&TransactionRequest::call(TOKEN, vec![]).with_gas(U256::from(7), 50_000))
			.await
			.unwrap();
		assert_eq!(data.version(), 1);
		assert_eq!(data.fee().gas_limit(), 50_000);
	}

	#[tokio::test]
	async fn test_mixed_fee_fails_before_signing() {
		let (signer, sign_calls) = TestSigner::new(SignBehaviour::Sign);
		let (transport, log) = TestTransport::new();
		let manager = manager(signer, transport);

		let request = TransactionRequest::call(TOKEN, transfer_data())
			.with_gas(U256::from(20_000_000_000u64), 3_000_000)
			.with_eip1559(Eip1559Fee {
				gas_limit: 21_000,
				max_fee_per_gas: U256::from(30),
				max_priority_fee_per_gas: U256::from(2),
			});
		let err = manager.send_transaction(&request).await.unwrap_err();

		assert_eq!(err.code(), TxError::INVALID_FEE_SPEC);
		assert_eq!(sign_calls.load(Ordering::SeqCst), 0);
		assert_eq!(log.submits.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn test_signer_failure_never_submits() {
		let (signer, sign_calls) = TestSigner::new(SignBehaviour::Fail);
		let (transport, log) = TestTransport::new();
		let manager = manager(signer, transport);

		let err = manager
			.send_transaction(&TransactionRequest::call(TOKEN, transfer_data()))
			.await
			.unwrap_err();

		assert!(matches!(err, TxError::SignerFailure(_)));
		assert_eq!(err.code(), 2001);
		assert_eq!(sign_calls.load(Ordering::SeqCst), 1);
		assert_eq!(log.submits.load(Ordering::SeqCst), 0);
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn test_concurrent_duplicates_sign_once() {
		let gate = Arc::new(Semaphore::new(0));
		let (signer, sign_calls) = TestSigner::new(SignBehaviour::Gated(gate.clone()));
		let (transport, log) = TestTransport::new();
		let manager = manager(signer, transport);

		let data = manager
			.prepare(&TransactionRequest::call(TOKEN, transfer_data()))
			.await
			.unwrap();

		let tasks = (0..8).map(|_| {
			let manager = manager.clone();
			let data = data.clone();
			tokio::spawn(async move { manager.submit_prepared(data, false) })
		});
		let handles: Vec<TransactionHandle> = futures::future::join_all(tasks)
			.await
			.into_iter()
			.map(|joined| joined.unwrap().unwrap())
			.collect();

		let hash = handles[0].hash();
		assert!(handles.iter().all(|h| h.hash() == hash));
		assert_eq!(manager.pending_count(), 1);

		gate.add_permits(1);
		let receipts = futures::future::join_all(handles.into_iter().map(|h| h.wait())).await;

		assert!(receipts.iter().all(|r| r.as_ref().unwrap().block_number == 42));
		assert_eq!(sign_calls.load(Ordering::SeqCst), 1);
		assert_eq!(log.submits.load(Ordering::SeqCst), 1);
		assert_eq!(manager.pending_count(), 0);
	}

	#[tokio::test]
	async fn test_dropped_signer_completion_is_timeout() {
		let (signer, _) = TestSigner::new(SignBehaviour::Drop);
		let (transport, log) = TestTransport::new();
		let manager = manager(signer, transport);

		let err = manager
			.send_transaction(&TransactionRequest::call(TOKEN, transfer_data()))
			.await
			.unwrap_err();

		assert_eq!(err.code(), TxError::TIMEOUT);
		assert_eq!(log.submits.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn test_silent_signer_is_bounded() {
		let (signer, _) = TestSigner::new(SignBehaviour::Hold);
		let (transport, _) = TestTransport::new();
		let manager = manager(signer, transport).with_timeouts(StageTimeouts {
			sign: Duration::from_millis(50),
			submit: Duration::from_secs(1),
		});

		let err = manager
			.send_transaction(&TransactionRequest::call(TOKEN, transfer_data()))
			.await
			.unwrap_err();

		assert!(matches!(err, TxError::Timeout(_)));
		assert_eq!(manager.pending_count(), 0);
	}

	#[tokio::test]
	async fn test_transport_failure_keeps_node_detail() {
		let (signer, _) = TestSigner::new(SignBehaviour::Sign);
		let (transport, _) = TestTransport::failing();
		let manager = manager(signer, transport);

		let err = manager
			.send_transaction(&TransactionRequest::call(TOKEN, transfer_data()).with_block_limit(1))
			.await
			.unwrap_err();

		match err {
			TxError::TransportFailure(TransportError::Node { code, .. }) => assert_eq!(code, -32000),
			other => panic!("unexpected error: {:?}", other),
		}
	}

	#[tokio::test]
	async fn test_deploy_sets_deploy_attribute() {
		let (signer, _) = TestSigner::new(SignBehaviour::Sign);
		let (transport, log) = TestTransport::new();
		let manager = manager(signer, transport);

		let request = TransactionRequest::deploy(vec![0x60, 0x80, 0x60, 0x40], Some("[]".to_string()));
		manager.send_transaction(&request).await.unwrap();

		let signed = log.last_signed.lock().unwrap().clone().unwrap();
		let tx = decode_signed(&signed).unwrap();
		assert!(tx.attributes.is_deploy());
		assert!(tx.attributes.contains(TransactionAttributes::EVM_ABI_CODEC));

		let data = decode_envelope(&tx.envelope).unwrap();
		assert!(data.is_deploy());
		assert_eq!(data.abi(), "[]");
	}

	#[tokio::test]
	async fn test_callback_receives_single_response() {
		let (signer, _) = TestSigner::new(SignBehaviour::Sign);
		let (transport, _) = TestTransport::new();
		let manager = manager(signer, transport);
		let (callback, mut outcomes) = ChannelCallback::new();

		let hash = manager
			.async_send_transaction(
				&TransactionRequest::call(TOKEN, transfer_data()),
				Box::new(callback),
			)
			.await
			.unwrap();

		assert_eq!(outcomes.recv().await, Some(Ok(42)));
		assert_eq!(outcomes.recv().await, None);
		assert!(!manager.pending.is_pending(&hash));
	}

	#[tokio::test]
	async fn test_callback_receives_signer_error() {
		let (signer, _) = TestSigner::new(SignBehaviour::Fail);
		let (transport, log) = TestTransport::new();
		let manager = manager(signer, transport);
		let (callback, mut outcomes) = ChannelCallback::new();

		manager
			.async_send_transaction(
				&TransactionRequest::call(TOKEN, transfer_data()),
				Box::new(callback),
			)
			.await
			.unwrap();

		assert_eq!(outcomes.recv().await, Some(Err(TxError::SIGNER_FAILURE)));
		assert_eq!(outcomes.recv().await, None);
		assert_eq!(log.submits.load(Ordering::SeqCst), 0);
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
	async fn test_blocking_send_uses_same_pipeline() {
		let (signer, sign_calls) = TestSigner::new(SignBehaviour::Sign);
		let (transport, log) = TestTransport::new();
		let manager = manager(signer, transport);

		let receipt = manager
			.send_transaction_blocking(&TransactionRequest::call(TOKEN, transfer_data()))
			.unwrap();

		assert_eq!(receipt.block_number, 42);
		assert_eq!(sign_calls.load(Ordering::SeqCst), 1);
		assert_eq!(log.submits.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn test_blocking_send_rejects_current_thread_runtime() {
		let (signer, sign_calls) = TestSigner::new(SignBehaviour::Sign);
		let (transport, _) = TestTransport::new();
		let manager = manager(signer, transport);

		let err = manager
			.send_transaction_blocking(&TransactionRequest::call(TOKEN, transfer_data()))
			.unwrap_err();

		assert_eq!(err.code(), TxError::CONFIGURATION);
		assert_eq!(sign_calls.load(Ordering::SeqCst), 0);
	}

	#[test]
	fn test_blocking_send_from_plain_thread() {
		let runtime = worker_runtime();
		let (signer, sign_calls) = TestSigner::new(SignBehaviour::Sign);
		let (transport, log) = TestTransport::new();
		let manager = manager_on(runtime.handle().clone(), signer, transport);

		let receipt = std::thread::spawn(move || {
			manager.send_transaction_blocking(&TransactionRequest::call(TOKEN, transfer_data()))
		})
		.join()
		.unwrap()
		.unwrap();

		assert_eq!(receipt.block_number, 42);
		assert_eq!(sign_calls.load(Ordering::SeqCst), 1);
		assert_eq!(log.submits.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn test_submit_prepared_outside_runtime() {
		let runtime = worker_runtime();
		let (signer, _) = TestSigner::new(SignBehaviour::Sign);
		let (transport, _) = TestTransport::new();
		let manager = manager_on(runtime.handle().clone(), signer, transport);

		let data = runtime
			.block_on(manager.prepare(&TransactionRequest::call(TOKEN, transfer_data())))
			.unwrap();
		let handle = manager.submit_prepared(data, false).unwrap();

		assert_eq!(runtime.block_on(handle.wait()).unwrap().block_number, 42);
		assert_eq!(manager.pending_count(), 0);
	}

	#[tokio::test]
	async fn test_dropped_transport_completion_is_timeout() {
		let (signer, _) = TestSigner::new(SignBehaviour::Sign);
		let (transport, log) = TestTransport::with_behaviour(SubmitBehaviour::Drop);
		let manager = manager(signer, transport);

		let err = manager
			.send_transaction(&TransactionRequest::call(TOKEN, transfer_data()))
			.await
			.unwrap_err();

		assert_eq!(err.code(), TxError::TIMEOUT);
		assert_eq!(log.submits.load(Ordering::SeqCst), 1);
		assert_eq!(manager.pending_count(), 0);
	}

	#[tokio::test]
	async fn test_silent_transport_is_bounded() {
		let (signer, _) = TestSigner::new(SignBehaviour::Sign);
		let (transport, log) = TestTransport::with_behaviour(SubmitBehaviour::Hold);
		let manager = manager(signer, transport).with_timeouts(StageTimeouts {
			sign: Duration::from_secs(1),
			submit: Duration::from_millis(50),
		});

		let err = manager
			.send_transaction(&TransactionRequest::call(TOKEN, transfer_data()))
			.await
			.unwrap_err();

		assert!(matches!(err, TxError::Timeout(_)));
		assert_eq!(log.submits.load(Ordering::SeqCst), 1);
		assert_eq!(manager.pending_count(), 0);
	}

	#[tokio::test]
	async fn test_callback_receives_single_transport_timeout() {
		let (signer, _) = TestSigner::new(SignBehaviour::Sign);
		let (transport, _) = TestTransport::with_behaviour(SubmitBehaviour::Hold);
		let manager = manager(signer, transport).with_timeouts(StageTimeouts {
			sign: Duration::from_secs(1),
			submit: Duration::from_millis(50),
		});
		let (callback, mut outcomes) = ChannelCallback::new();

		manager
			.async_send_transaction(
				&TransactionRequest::call(TOKEN, transfer_data()),
				Box::new(callback),
			)
			.await
			.unwrap();

		assert_eq!(outcomes.recv().await, Some(Err(TxError::TIMEOUT)));
		assert_eq!(outcomes.recv().await, None);
		assert_eq!(manager.pending_count(), 0);
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
	async fn test_constructor_flag_does_not_join_call() {
		let gate = Arc::new(Semaphore::new(0));
		let (signer, sign_calls) = TestSigner::new(SignBehaviour::Gated(gate.clone()));
		let (transport, log) = TestTransport::new();
		let manager = manager(signer, transport);

		let data = manager
			.prepare(&TransactionRequest::call(TOKEN, transfer_data()))
			.await
			.unwrap();
		let as_call = manager.submit_prepared(data.clone(), false).unwrap();
		let as_deploy = manager.submit_prepared(data, true).unwrap();

		assert_eq!(as_call.hash(), as_deploy.hash());
		assert_eq!(manager.pending_count(), 2);

		gate.add_permits(2);
		as_call.wait().await.unwrap();
		as_deploy.wait().await.unwrap();

		assert_eq!(sign_calls.load(Ordering::SeqCst), 2);
		assert_eq!(log.submits.load(Ordering::SeqCst), 2);
		assert_eq!(manager.pending_count(), 0);
	}
}

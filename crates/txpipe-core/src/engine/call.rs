use super::TransactionManager;
use crate::request::CallCallback;
use crate::state::{TxState, TxStateMachine};
use crate::TxError;
use tracing::instrument;
use txpipe_transaction::call_payload;
use txpipe_types::{truncate_id, CallRequest, CallResult, ContentHash};

impl TransactionManager {
	/// Content hash the signer is asked to sign for a call to `to` with `data`.
	pub fn call_hash(&self, to: &str, data: &[u8]) -> ContentHash {
		self.session.hash(&call_payload(to, data))
	}

	/// Signs a read-only call and evaluates it on the node.
	#[instrument(skip_all, fields(to = %truncate_id(to)))]
	pub async fn send_call(&self, to: &str, data: &[u8]) -> Result<CallResult, TxError> {
		self.run_call(CallRequest::new(to, data.to_vec()), None).await
	}

	/// Evaluates a read-only call with a signature the caller already holds.
	///
	/// The signer is not contacted.
	#[instrument(skip_all, fields(to = %truncate_id(to)))]
	pub async fn send_call_with_signature(
		&self,
		to: &str,
		data: &[u8],
		signature: &[u8],
	) -> Result<CallResult, TxError> {
		self.run_call(CallRequest::new(to, data.to_vec()), Some(signature.to_vec()))
			.await
	}

	/// Starts a read-only call and reports its result to `callback`.
	pub fn async_send_call(
		&self,
		to: &str,
		data: &[u8],
		callback: Box<dyn CallCallback>,
	) -> ContentHash {
		self.spawn_call(CallRequest::new(to, data.to_vec()), None, callback)
	}

	/// Callback form of [`TransactionManager::send_call_with_signature`].
	pub fn async_send_call_with_signature(
		&self,
		to: &str,
		data: &[u8],
		signature: &[u8],
		callback: Box<dyn CallCallback>,
	) -> ContentHash {
		self.spawn_call(
			CallRequest::new(to, data.to_vec()),
			Some(signature.to_vec()),
			callback,
		)
	}

	fn spawn_call(
		&self,
		request: CallRequest,
		signature: Option<Vec<u8>>,
		callback: Box<dyn CallCallback>,
	) -> ContentHash {
		let hash = self.call_hash(&request.to, &request.data);
		let manager = self.clone();
		self.runtime.spawn(async move {
			match manager.run_call(request, signature).await {
				Ok(result) => callback.on_response(result),
				Err(e) => callback.on_error(e.code(), &e.to_string()),
			}
		});
		hash
	}

	async fn run_call(
		&self,
		request: CallRequest,
		signature: Option<Vec<u8>>,
	) -> Result<CallResult, TxError> {
		let mut machine = TxStateMachine::new();
		let hash = self.call_hash(&request.to, &request.data);
		machine.hashed(hash);

		let outcome = self
			.sign_and_call(&mut machine, hash, &request, signature)
			.await;
		if let Err(e) = &outcome {
			machine.advance(TxState::Failed);
			tracing::warn!(
				tx_hash = %truncate_id(&hash.to_hex()),
				code = e.code(),
				error = %e,
				"Call failed"
			);
		}
		outcome
	}

	async fn sign_and_call(
		&self,
		machine: &mut TxStateMachine,
		hash: ContentHash,
		request: &CallRequest,
		signature: Option<Vec<u8>>,
	) -> Result<CallResult, TxError> {
		let signature = match signature {
			Some(signature) => signature,
			None => {
				machine.advance(TxState::AwaitingSignature);
				self.await_signature(hash).await?.encode()
			},
		};

		let result = tokio::time::timeout(
			self.timeouts.submit,
			self.transport.call(request, &signature),
		)
		.await
		.map_err(|_| {
			TxError::Timeout(format!(
				"no call result within {:?}",
				self.timeouts.submit
			))
		})??;

		machine.advance(TxState::ReadOnlyResolved);
		tracing::debug!(
			tx_hash = %truncate_id(&hash.to_hex()),
			block_number = result.block_number,
			status = result.status,
			"Call resolved"
		);
		Ok(result)
	}
}

//! Single-fire completion handles.
//!
//! Signers and transports report their result through a [`Completion`]. The
//! handle is consumed by [`Completion::complete`], so a collaborator cannot
//! resolve the same request twice. If the handle is dropped without being
//! completed, the waiting side observes [`CompletionReceiver::recv`] returning
//! `None` instead of hanging.

use std::fmt;
use tokio::sync::oneshot;

/// Status returned to the collaborator that completed a request.
///
/// Mirrors the integer status a signer callback hands back to its caller:
/// `Accepted` means the pipeline was still waiting and took the result,
/// `Discarded` means nobody was listening any more (timed out or cancelled).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
	Accepted,
	Discarded,
}

impl StatusCode {
	/// Numeric form of the status (0 accepted, -1 discarded).
	pub fn as_i32(self) -> i32 {
		match self {
			StatusCode::Accepted => 0,
			StatusCode::Discarded => -1,
		}
	}
}

/// Write half of a single-fire completion.
pub struct Completion<T> {
	sender: oneshot::Sender<T>,
}

/// Read half of a single-fire completion.
pub struct CompletionReceiver<T> {
	receiver: oneshot::Receiver<T>,
}

impl<T> Completion<T> {
	/// Creates a connected completion pair.
	pub fn channel() -> (Completion<T>, CompletionReceiver<T>) {
		let (sender, receiver) = oneshot::channel();
		(Completion { sender }, CompletionReceiver { receiver })
	}

	/// Delivers the result. Consumes the handle.
	pub fn complete(self, value: T) -> StatusCode {
		match self.sender.send(value) {
			Ok(()) => StatusCode::Accepted,
			Err(_) => {
				tracing::warn!("Completion delivered after the waiter went away, discarding");
				StatusCode::Discarded
			},
		}
	}

	/// Returns true once the waiting side has stopped listening.
	pub fn is_abandoned(&self) -> bool {
		self.sender.is_closed()
	}
}

impl<T> fmt::Debug for Completion<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Completion")
			.field("abandoned", &self.is_abandoned())
			.finish()
	}
}

impl<T> CompletionReceiver<T> {
	/// Waits for the result. `None` means the completion was dropped unfired.
	pub async fn recv(self) -> Option<T> {
		self.receiver.await.ok()
	}
}

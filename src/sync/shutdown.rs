//! Cooperative cancellation shared by the two background sync loops.

// std
use std::sync::atomic::{AtomicBool, Ordering};
// self
use crate::_prelude::*;

struct Inner {
	fired: AtomicBool,
	notify: tokio::sync::Notify,
}

/// A cooperative shutdown flag the sync loops race their sleep against via `tokio::select!`.
///
/// Avoids pulling in `tokio-util` solely for a cancellation token.
#[derive(Clone)]
pub struct ShutdownSignal(Arc<Inner>);
impl ShutdownSignal {
	/// Builds a signal that has not yet fired.
	pub fn new() -> Self {
		Self(Arc::new(Inner { fired: AtomicBool::new(false), notify: tokio::sync::Notify::new() }))
	}

	/// Wakes every waiter, current and future. Idempotent.
	pub fn shutdown(&self) {
		self.0.fired.store(true, Ordering::SeqCst);
		self.0.notify.notify_waiters();
	}

	/// Resolves once [`Self::shutdown`] has been called, even if it already fired before this
	/// call. The `notified()` future is constructed before the flag check so a shutdown racing
	/// concurrently with this call is never missed.
	pub async fn cancelled(&self) {
		let notified = self.0.notify.notified();

		if self.0.fired.load(Ordering::SeqCst) {
			return;
		}

		notified.await;
	}
}
impl Default for ShutdownSignal {
	fn default() -> Self {
		Self::new()
	}
}

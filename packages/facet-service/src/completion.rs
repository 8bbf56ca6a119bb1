use std::time::Duration;

use tokio::sync::watch;

// One-shot completion signal: starts pending, the first `complete` wins,
// and every waiter past or future observes the same answer.
#[derive(Clone, Debug)]
pub struct CompletionState {
	tx: watch::Sender<bool>,
}
impl CompletionState {
	pub fn new() -> Self {
		let (tx, _) = watch::channel(false);

		Self { tx }
	}

	pub fn complete(&self) {
		self.tx.send_replace(true);
	}

	pub fn is_complete(&self) -> bool {
		*self.tx.borrow()
	}

	// Waits up to `timeout` for completion; a zero timeout reads the
	// current state without suspending.
	pub async fn wait(&self, timeout: Duration) -> bool {
		if self.is_complete() {
			return true;
		}
		if timeout.is_zero() {
			return false;
		}

		let mut rx = self.tx.subscribe();

		match tokio::time::timeout(timeout, rx.wait_for(|complete| *complete)).await {
			Ok(result) => result.is_ok(),
			Err(_) => self.is_complete(),
		}
	}
}
impl Default for CompletionState {
	fn default() -> Self {
		Self::new()
	}
}

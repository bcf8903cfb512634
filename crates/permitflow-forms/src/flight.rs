//! Busy flag, cancellation and timeout for in-flight external calls.

use crate::action::{ActionResult, FormAction};
use crate::error::{FormError, FormResult};
use futures::FutureExt;
use futures::future::{AbortHandle, Abortable};
use permitflow_state::TransportRecord;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

/// Tracks whether an external call is running and how to abort it.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
	busy: Cell<bool>,
	abort: RefCell<Option<AbortHandle>>,
}

/// Clears the busy flag when dropped, whatever way the call ended.
pub(crate) struct FlightGuard<'a> {
	flight: &'a InFlight,
}

impl Drop for FlightGuard<'_> {
	fn drop(&mut self) {
		self.flight.busy.set(false);
		self.flight.abort.borrow_mut().take();
	}
}

impl InFlight {
	/// Mark the start of a call. `None` when one is already running.
	pub(crate) fn begin(&self) -> Option<FlightGuard<'_>> {
		if self.busy.replace(true) {
			return None;
		}
		Some(FlightGuard { flight: self })
	}

	pub(crate) fn is_busy(&self) -> bool {
		self.busy.get()
	}

	/// Abort the running call, if any. Returns whether one was aborted.
	pub(crate) fn cancel(&self) -> bool {
		match self.abort.borrow_mut().take() {
			Some(handle) => {
				handle.abort();
				true
			}
			None => false,
		}
	}

	/// Drive `future` to completion unless it is cancelled, times out or
	/// panics.
	pub(crate) async fn run<F: Future>(
		&self,
		future: F,
		timeout: Option<Duration>,
	) -> FormResult<F::Output> {
		let (handle, registration) = AbortHandle::new_pair();
		*self.abort.borrow_mut() = Some(handle);

		let guarded = Abortable::new(AssertUnwindSafe(future).catch_unwind(), registration);
		let outcome = match timeout {
			Some(limit) => tokio::time::timeout(limit, guarded)
				.await
				.map_err(|_| FormError::TimedOut(limit))?,
			None => guarded.await,
		};

		match outcome {
			Ok(Ok(output)) => Ok(output),
			Ok(Err(panic)) => Err(FormError::Panicked(panic_message(panic.as_ref()))),
			Err(_aborted) => Err(FormError::Cancelled),
		}
	}
}

/// Invoke `action` and fold every failure mode into an [`ActionResult`].
///
/// An `Err` from the action, a panic, a timeout and a cancellation all come
/// back as a failed result carrying the error text.
pub(crate) async fn invoke_action<T, A>(
	flight: &InFlight,
	action: &A,
	record: TransportRecord,
	timeout: Option<Duration>,
) -> ActionResult<T>
where
	T: 'static,
	A: FormAction<T>,
{
	match flight.run(action.invoke(record), timeout).await {
		Ok(Ok(result)) => result,
		Ok(Err(error)) => ActionResult::failed(format!("{error:#}")),
		Err(interruption) => {
			tracing::warn!(error = %interruption, "external action interrupted");
			ActionResult::failed(interruption.to_string())
		}
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(message) = payload.downcast_ref::<&str>() {
		(*message).to_string()
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.clone()
	} else {
		"unknown panic".to_string()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_begin_is_exclusive() {
		let flight = InFlight::default();
		let guard = flight.begin();
		assert!(guard.is_some());
		assert!(flight.is_busy());
		assert!(flight.begin().is_none());

		drop(guard);
		assert!(!flight.is_busy());
		assert!(flight.begin().is_some());
	}

	#[rstest]
	#[tokio::test]
	async fn test_run_reports_panic() {
		let flight = InFlight::default();
		let result = flight
			.run(async { panic!("validator exploded") }, None)
			.await
			.map(|()| ());
		match result {
			Err(FormError::Panicked(message)) => assert_eq!(message, "validator exploded"),
			other => panic!("unexpected outcome: {other:?}"),
		}
	}

	#[rstest]
	#[tokio::test(start_paused = true)]
	async fn test_run_times_out() {
		let flight = InFlight::default();
		let result = flight
			.run(futures::future::pending::<()>(), Some(Duration::from_millis(50)))
			.await;
		assert!(matches!(result, Err(FormError::TimedOut(_))));
	}

	#[rstest]
	#[tokio::test]
	async fn test_cancel_aborts_pending_call() {
		let flight = InFlight::default();
		let _guard = flight.begin();
		let pending = flight.run(futures::future::pending::<()>(), None);
		let cancel = async {
			tokio::task::yield_now().await;
			assert!(flight.cancel());
		};

		let (result, ()) = tokio::join!(pending, cancel);
		assert!(matches!(result, Err(FormError::Cancelled)));
	}

	#[rstest]
	#[tokio::test]
	async fn test_invoke_action_converts_err() {
		let flight = InFlight::default();
		let action = |_record: TransportRecord| async move {
			let output: crate::ActionOutput<()> = Err(anyhow::anyhow!("connection refused"));
			output
		};
		let result = invoke_action(&flight, &action, TransportRecord::new(), None).await;
		assert!(!result.success);
		assert_eq!(result.message, "connection refused");
	}

	#[rstest]
	fn test_cancel_without_call() {
		let flight = InFlight::default();
		assert!(!flight.cancel());
	}
}

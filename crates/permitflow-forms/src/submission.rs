//! Single-form submission
//!
//! [`SubmissionController`] flattens the form, hands the record to the
//! external action and folds the [`ActionResult`] back into the form: merged
//! data or a reset on success, stored field errors on failure, and exactly
//! one callback per attempt.

use crate::action::{ActionResult, FormAction};
use crate::binding::{BindOptions, FieldBinder, FieldBinding};
use crate::context::FormContext;
use crate::flight::{InFlight, invoke_action};
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;
use tracing::{debug, info, warn};

pub(crate) const ALREADY_SUBMITTING: &str = "A submission is already in progress";

type SuccessCallback<D> = Box<dyn Fn(Option<&D>, &str)>;
type ErrorCallback = Box<dyn Fn(&str)>;

/// Submits one form through an external action.
///
/// `T` is the form shape and `D` the data type the action answers with.
pub struct SubmissionController<T, D, A> {
	context: FormContext<T>,
	action: A,
	flight: InFlight,
	on_success: Option<SuccessCallback<D>>,
	on_error: Option<ErrorCallback>,
	_data: PhantomData<fn() -> D>,
}

impl<T, D, A> fmt::Debug for SubmissionController<T, D, A> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SubmissionController")
			.field("context", &self.context)
			.field("is_submitting", &self.flight.is_busy())
			.finish_non_exhaustive()
	}
}

impl<T, D, A> SubmissionController<T, D, A>
where
	T: 'static,
	D: Serialize + 'static,
	A: FormAction<D>,
{
	pub fn new(context: FormContext<T>, action: A) -> Self {
		Self {
			context,
			action,
			flight: InFlight::default(),
			on_success: None,
			on_error: None,
			_data: PhantomData,
		}
	}

	/// Called with the returned data and message after a successful submit.
	pub fn on_success(mut self, callback: impl Fn(Option<&D>, &str) + 'static) -> Self {
		self.on_success = Some(Box::new(callback));
		self
	}

	/// Called once with a human-readable message after a failed submit.
	pub fn on_error(mut self, callback: impl Fn(&str) + 'static) -> Self {
		self.on_error = Some(Box::new(callback));
		self
	}

	pub fn context(&self) -> &FormContext<T> {
		&self.context
	}

	/// Whether a submission is in flight. UI code disables the submit
	/// control while this is set.
	pub fn is_submitting(&self) -> bool {
		self.flight.is_busy()
	}

	/// Abort the in-flight submission. It then fails with a cancellation
	/// message reported through `on_error`.
	pub fn cancel_pending(&self) -> bool {
		self.flight.cancel()
	}

	/// Submit the current form state.
	///
	/// A call made while another is in flight returns a failed result at
	/// once, without invoking the action or any callback.
	pub async fn submit(&self) -> ActionResult<D> {
		let Some(_guard) = self.flight.begin() else {
			debug!("ignoring re-entrant submit");
			return ActionResult::failed(ALREADY_SUBMITTING);
		};

		let record = self.context.record();
		debug!(fields = record.len(), "submitting form");
		let timeout = self.context.settings().action_timeout();
		let result = invoke_action(&self.flight, &self.action, record, timeout).await;

		if result.success {
			self.apply_success(&result);
		} else {
			self.apply_failure(&result);
		}
		result
	}

	fn apply_success(&self, result: &ActionResult<D>) {
		if self.context.settings().reset_on_success {
			self.context.reset();
		} else {
			if let Some(data) = &result.data {
				match serde_json::to_value(data) {
					Ok(patch) => self.context.merge(&patch),
					Err(error) => warn!(%error, "cannot merge submission data into form state"),
				}
			}
			self.context.clear_errors();
		}
		info!(message = %result.message, "form submitted");
		if let Some(callback) = &self.on_success {
			callback(result.data.as_ref(), &result.message);
		}
	}

	fn apply_failure(&self, result: &ActionResult<D>) {
		if let Some(errors) = result.field_errors() {
			self.context.set_errors(errors.clone());
		}
		let message = result.failure_message(&self.context.settings().invalid_form_message);
		warn!(%message, "form submission failed");
		if let Some(callback) = &self.on_error {
			callback(&message);
		}
	}
}

impl<T: 'static, D, A> FieldBinder for SubmissionController<T, D, A> {
	fn bind_input_with(&self, path: &str, options: BindOptions) -> FieldBinding {
		self.context.bind_input_with(path, options)
	}
}

//! Multi-section wizards
//!
//! A [`WizardController`] walks the user through named sections of one
//! shared form. Moving forward runs the section validator and persists a
//! draft; moving backward never validates. Submitting from the last section
//! sends the whole accumulated state to the external action.
//!
//! Only one validation or submission runs at a time. Next, Submit and Back
//! are no-ops while one is pending.

use crate::action::{ActionResult, FormAction};
use crate::binding::{BindOptions, FieldBinder, FieldBinding};
use crate::context::{FormContext, FormScope};
use crate::draft::{Draft, DraftStore};
use crate::error::{FormError, FormResult};
use crate::flight::{InFlight, invoke_action};
use crate::submission::ALREADY_SUBMITTING;
use crate::validator::{SectionValidator, Verdict, judge};
use chrono::Utc;
use permitflow_state::{ErrorMap, FormState};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where a wizard is in its lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum WizardStatus {
	Editing(usize),
	Validating(usize),
	Submitting,
	Completed,
	/// The section failed validation or the final submission was rejected.
	///
	/// `message` is set only for a failed submission, so a rejection that
	/// carries no field errors still says why.
	Blocked {
		section: usize,
		errors: ErrorMap,
		message: Option<String>,
	},
}

type CompleteCallback<D> = Box<dyn Fn(Option<&D>)>;
type ErrorCallback = Box<dyn Fn(&str)>;

/// Drives a multi-section form from the first section to submission.
///
/// `T` is the form shape, `V` the section validator, `A` the submit action
/// and `D` the data type the action answers with.
pub struct WizardController<T, D, V, A> {
	id: String,
	sections: Vec<String>,
	context: FormContext<T>,
	validator: V,
	action: A,
	store: Arc<dyn DraftStore>,
	index: Cell<usize>,
	status: RefCell<WizardStatus>,
	flight: InFlight,
	epoch: Cell<u64>,
	on_complete: Option<CompleteCallback<D>>,
	on_error: Option<ErrorCallback>,
	_data: PhantomData<fn() -> D>,
}

impl<T, D, V, A> fmt::Debug for WizardController<T, D, V, A> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WizardController")
			.field("id", &self.id)
			.field("sections", &self.sections)
			.field("index", &self.index.get())
			.field("status", &*self.status.borrow())
			.finish_non_exhaustive()
	}
}

impl<T, D, V, A> WizardController<T, D, V, A>
where
	T: 'static,
	D: 'static,
	V: SectionValidator<T>,
	A: FormAction<D>,
{
	/// Create a wizard and resume the draft stored under `id`, if any.
	///
	/// A draft replaces the starting state and section. Drafts older than
	/// the configured maximum age are discarded.
	pub fn new(
		id: impl Into<String>,
		sections: Vec<String>,
		context: FormContext<T>,
		validator: V,
		action: A,
		store: Arc<dyn DraftStore>,
	) -> FormResult<Self> {
		let id = id.into();
		if sections.is_empty() {
			return Err(FormError::Configuration(format!(
				"wizard '{id}' has no sections"
			)));
		}

		let wizard = Self {
			id,
			sections,
			context,
			validator,
			action,
			store,
			index: Cell::new(0),
			status: RefCell::new(WizardStatus::Editing(0)),
			flight: InFlight::default(),
			epoch: Cell::new(0),
			on_complete: None,
			on_error: None,
			_data: PhantomData,
		};
		wizard.restore_draft();
		Ok(wizard)
	}

	/// Called with the returned data once the final submission succeeds.
	pub fn on_complete(mut self, callback: impl Fn(Option<&D>) + 'static) -> Self {
		self.on_complete = Some(Box::new(callback));
		self
	}

	/// Called once per failed submission or interrupted operation.
	pub fn on_error(mut self, callback: impl Fn(&str) + 'static) -> Self {
		self.on_error = Some(Box::new(callback));
		self
	}

	fn restore_draft(&self) {
		let draft = match self.store.get(&self.id) {
			Ok(Some(draft)) => draft,
			Ok(None) => return,
			Err(error) => {
				warn!(wizard_id = %self.id, %error, "cannot load wizard draft");
				return;
			}
		};

		if let Some(max_age) = self.context.settings().draft_max_age()
			&& draft.is_expired(max_age, Utc::now())
		{
			debug!(wizard_id = %self.id, saved_at = %draft.saved_at, "discarding expired draft");
			self.remove_draft();
			return;
		}

		let section = draft.section_index.min(self.last_section());
		self.context.replace_state(FormState::from_value(draft.state));
		self.move_to(section);
		debug!(wizard_id = %self.id, section, "resumed wizard draft");
	}

	fn persist_draft(&self, section: usize) {
		let draft = Draft::new(self.context.state().into_value(), section);
		match self.store.set(&self.id, &draft) {
			Ok(()) => debug!(wizard_id = %self.id, section, "persisted wizard draft"),
			Err(error) => warn!(wizard_id = %self.id, %error, "cannot persist wizard draft"),
		}
	}

	fn remove_draft(&self) {
		if let Err(error) = self.store.remove(&self.id) {
			warn!(wizard_id = %self.id, %error, "cannot remove wizard draft");
		}
	}

	fn move_to(&self, section: usize) {
		self.index.set(section);
		self.set_status(WizardStatus::Editing(section));
	}

	fn set_status(&self, status: WizardStatus) {
		*self.status.borrow_mut() = status;
	}

	fn report_error(&self, message: &str) {
		warn!(wizard_id = %self.id, %message, "wizard operation failed");
		if let Some(callback) = &self.on_error {
			callback(message);
		}
	}

	fn is_stale(&self, epoch: u64) -> bool {
		self.epoch.get() != epoch
	}

	async fn validate_section(&self, section: usize) -> FormResult<Verdict> {
		self.set_status(WizardStatus::Validating(section));
		let timeout = self.context.settings().validation_timeout();
		self.flight
			.run(judge(&self.validator, section, self.context.state()), timeout)
			.await
	}

	fn block(&self, section: usize, errors: ErrorMap, message: Option<String>) {
		self.context.set_errors(errors.clone());
		self.set_status(WizardStatus::Blocked {
			section,
			errors,
			message,
		});
	}

	/// Validate the current section and advance when it is valid.
	///
	/// Returns whether the wizard moved. An invalid section stores its
	/// errors and leaves the wizard where it was.
	pub async fn next(&self) -> bool {
		let section = self.index.get();
		if section >= self.last_section() || self.is_completed() {
			return false;
		}
		let Some(_guard) = self.flight.begin() else {
			debug!(wizard_id = %self.id, "ignoring next while busy");
			return false;
		};
		let epoch = self.epoch.get();

		let verdict = self.validate_section(section).await;
		if self.is_stale(epoch) {
			return false;
		}
		match verdict {
			Ok(Verdict::Valid) => {
				self.context.clear_errors();
				self.persist_draft(section + 1);
				self.move_to(section + 1);
				debug!(wizard_id = %self.id, section = section + 1, "advanced wizard");
				true
			}
			Ok(Verdict::Invalid(errors)) => {
				debug!(wizard_id = %self.id, section, errors = errors.len(), "section is invalid");
				self.block(section, errors, None);
				false
			}
			Err(error) => {
				self.report_error(&error.to_string());
				self.move_to(section);
				false
			}
		}
	}

	/// Step back one section without validating.
	pub fn back(&self) -> bool {
		let section = self.index.get();
		if section == 0 || self.is_busy() || self.is_completed() {
			return false;
		}
		self.context.clear_errors();
		self.move_to(section - 1);
		true
	}

	/// Jump back to an earlier section. Forward jumps have to go through
	/// [`next`](Self::next) so every section is validated.
	pub fn go_to(&self, target: usize) -> FormResult<()> {
		let current = self.index.get();
		if self.is_busy() || self.is_completed() {
			return Err(FormError::Navigation(
				"the wizard is not accepting input".to_string(),
			));
		}
		if target >= self.sections.len() {
			return Err(FormError::Navigation(format!(
				"section {target} does not exist"
			)));
		}
		if target > current {
			return Err(FormError::Navigation(format!(
				"cannot skip ahead from section {current} to section {target}"
			)));
		}
		if target < current {
			self.context.clear_errors();
			self.move_to(target);
		}
		Ok(())
	}

	/// [`go_to`](Self::go_to) by section name.
	pub fn go_to_section(&self, name: &str) -> FormResult<()> {
		let target = self
			.sections
			.iter()
			.position(|section| section == name)
			.ok_or_else(|| FormError::Navigation(format!("section '{name}' not found")))?;
		self.go_to(target)
	}

	/// Validate the last section and submit the full form state.
	pub async fn submit(&self) -> ActionResult<D> {
		let section = self.index.get();
		if section != self.last_section() {
			return ActionResult::failed("Submit is only available on the last section");
		}
		if self.is_completed() {
			return ActionResult::failed("The wizard is already completed");
		}
		let Some(_guard) = self.flight.begin() else {
			debug!(wizard_id = %self.id, "ignoring submit while busy");
			return ActionResult::failed(ALREADY_SUBMITTING);
		};
		let epoch = self.epoch.get();

		let verdict = self.validate_section(section).await;
		if self.is_stale(epoch) {
			return ActionResult::failed(FormError::Cancelled.to_string());
		}
		match verdict {
			Ok(Verdict::Valid) => {}
			Ok(Verdict::Invalid(errors)) => {
				let message = self.context.settings().invalid_form_message.clone();
				self.block(section, errors.clone(), None);
				return ActionResult::invalid(message, errors);
			}
			Err(error) => {
				let message = error.to_string();
				self.report_error(&message);
				self.move_to(section);
				return ActionResult::failed(message);
			}
		}

		self.context.clear_errors();
		self.persist_draft(section);
		self.set_status(WizardStatus::Submitting);

		let record = self.context.record();
		let timeout = self.context.settings().action_timeout();
		let result = invoke_action(&self.flight, &self.action, record, timeout).await;
		if self.is_stale(epoch) {
			return ActionResult::failed(FormError::Cancelled.to_string());
		}

		if result.success {
			self.remove_draft();
			self.set_status(WizardStatus::Completed);
			info!(wizard_id = %self.id, "wizard completed");
			if let Some(callback) = &self.on_complete {
				callback(result.data.as_ref());
			}
		} else {
			let errors = result.field_errors().cloned().unwrap_or_default();
			let message = result.failure_message(&self.context.settings().invalid_form_message);
			self.block(section, errors, Some(message.clone()));
			self.report_error(&message);
		}
		result
	}

	/// Abandon the wizard: abort pending work, drop the draft and start over
	/// from the initial values. Aborted work reports nothing.
	pub fn cancel(&self) {
		self.epoch.set(self.epoch.get() + 1);
		self.flight.cancel();
		self.remove_draft();
		self.context.reset();
		self.move_to(0);
		debug!(wizard_id = %self.id, "wizard cancelled");
	}

	/// Abort the pending validation or submission. The aborted operation
	/// reports a cancellation through `on_error`.
	pub fn cancel_pending(&self) -> bool {
		self.flight.cancel()
	}
}

impl<T, D, V, A> WizardController<T, D, V, A> {
	pub fn id(&self) -> &str {
		&self.id
	}

	pub fn context(&self) -> &FormContext<T> {
		&self.context
	}

	pub fn status(&self) -> WizardStatus {
		self.status.borrow().clone()
	}

	pub fn current_section(&self) -> usize {
		self.index.get()
	}

	pub fn current_section_name(&self) -> &str {
		&self.sections[self.index.get()]
	}

	pub fn sections(&self) -> &[String] {
		&self.sections
	}

	pub fn total_sections(&self) -> usize {
		self.sections.len()
	}

	fn last_section(&self) -> usize {
		self.sections.len() - 1
	}

	pub fn is_first_section(&self) -> bool {
		self.index.get() == 0
	}

	pub fn is_last_section(&self) -> bool {
		self.index.get() == self.last_section()
	}

	/// Whether a validation or submission is pending. Next and Submit
	/// controls are disabled while this is set.
	pub fn is_busy(&self) -> bool {
		self.flight.is_busy()
	}

	pub fn is_completed(&self) -> bool {
		matches!(*self.status.borrow(), WizardStatus::Completed)
	}

	/// Percentage of sections reached, counting the current one.
	pub fn progress(&self) -> f32 {
		((self.index.get() + 1) as f32 / self.sections.len() as f32) * 100.0
	}

	/// A view of the form restricted to `prefix`, for one section's fields.
	pub fn section_scope(&self, prefix: &str) -> FormResult<FormScope<T>> {
		self.context.scope(prefix)
	}
}

impl<T: 'static, D, V, A> FieldBinder for WizardController<T, D, V, A> {
	fn bind_input_with(&self, path: &str, options: BindOptions) -> FieldBinding {
		self.context.bind_input_with(path, options)
	}
}

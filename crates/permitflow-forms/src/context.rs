//! Shared state of one form instance
//!
//! [`FormContext`] owns the current [`FormState`], the initial values it was
//! built from and the [`ErrorStore`]. It is a cheap handle: clones share the
//! same form, which is how bindings reach back into it from `on_change`.

use crate::binding::{BindOptions, FieldBinder, FieldBinding, element_id};
use crate::error::FormResult;
use crate::settings::FormSettings;
use permitflow_state::{ErrorMap, ErrorStore, FormState, Path, TransportRecord, flatten};
use serde::Serialize;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, warn};

struct Inner<T> {
	initial: FormState<T>,
	state: RefCell<FormState<T>>,
	errors: RefCell<ErrorStore>,
	settings: FormSettings,
	unresolved: RefCell<HashSet<String>>,
}

/// Handle to a form's state, errors and settings.
pub struct FormContext<T> {
	inner: Rc<Inner<T>>,
}

impl<T> Clone for FormContext<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Rc::clone(&self.inner),
		}
	}
}

impl<T> fmt::Debug for FormContext<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FormContext")
			.field("state", &*self.inner.state.borrow())
			.field("errors", self.inner.errors.borrow().all())
			.finish_non_exhaustive()
	}
}

impl<T: Serialize> FormContext<T> {
	/// Create a form from its initial values with default settings.
	///
	/// # Examples
	///
	/// ```
	/// use permitflow_forms::{FieldBinder, FormContext};
	/// use serde_json::json;
	///
	/// let form = FormContext::new(&json!({"name": "", "age": 0})).unwrap();
	/// form.bind_input("name").on_change("Alex");
	///
	/// assert_eq!(form.read("name"), Some(json!("Alex")));
	/// assert!(form.has_changed());
	/// ```
	pub fn new(initial: &T) -> FormResult<Self> {
		Self::with_settings(initial, FormSettings::default())
	}

	pub fn with_settings(initial: &T, settings: FormSettings) -> FormResult<Self> {
		Ok(Self::from_state(FormState::new(initial)?, settings))
	}
}

impl<T> FormContext<T> {
	pub fn from_state(initial: FormState<T>, settings: FormSettings) -> Self {
		Self {
			inner: Rc::new(Inner {
				state: RefCell::new(initial.clone()),
				initial,
				errors: RefCell::new(ErrorStore::new()),
				settings,
				unresolved: RefCell::new(HashSet::new()),
			}),
		}
	}

	/// The current state. Every change produces a new reference.
	pub fn state(&self) -> FormState<T> {
		self.inner.state.borrow().clone()
	}

	pub fn initial(&self) -> FormState<T> {
		self.inner.initial.clone()
	}

	pub fn settings(&self) -> &FormSettings {
		&self.inner.settings
	}

	pub fn read(&self, path: &str) -> Option<Value> {
		self.inner.state.borrow().read(path).cloned()
	}

	/// Write `value` at `path` and clear the error stored there.
	pub fn set_value(&self, path: &str, value: impl Into<Value>) -> FormResult<()> {
		let path = Path::parse(path)?;
		self.apply(&path, value.into());
		Ok(())
	}

	fn apply(&self, path: &Path, value: Value) {
		let next = self.inner.state.borrow().write(path.as_str(), value);
		*self.inner.state.borrow_mut() = next;
		if self.inner.errors.borrow_mut().clear(path.as_str()) {
			debug!(path = %path, "cleared field error on change");
		}
	}

	pub fn replace_state(&self, state: FormState<T>) {
		*self.inner.state.borrow_mut() = state;
	}

	/// Shallow-merge the top-level keys of `patch` into the state.
	pub fn merge(&self, patch: &Value) {
		let next = self.inner.state.borrow().merge(patch);
		*self.inner.state.borrow_mut() = next;
	}

	/// Restore the initial values and drop every error.
	pub fn reset(&self) {
		self.replace_state(self.initial());
		self.clear_errors();
	}

	/// Whether the state differs from the initial values.
	pub fn has_changed(&self) -> bool {
		self.inner.state.borrow().value() != self.inner.initial.value()
	}

	/// The current state flattened for transport.
	pub fn record(&self) -> TransportRecord {
		flatten(self.inner.state.borrow().value())
	}

	pub fn errors(&self) -> ErrorMap {
		self.inner.errors.borrow().all().clone()
	}

	pub fn has_error(&self, path: &str) -> bool {
		self.inner.errors.borrow().has(path)
	}

	pub fn error(&self, path: &str) -> Option<Vec<String>> {
		self.inner.errors.borrow().get(path).map(<[String]>::to_vec)
	}

	pub fn set_errors(&self, errors: ErrorMap) {
		self.inner.errors.borrow_mut().set_all(errors);
	}

	pub fn clear_error(&self, path: &str) -> bool {
		self.inner.errors.borrow_mut().clear(path)
	}

	pub fn clear_errors(&self) {
		self.inner.errors.borrow_mut().clear_all();
	}

	/// A view of the sub-tree at `prefix`, with paths relative to it.
	pub fn scope(&self, prefix: &str) -> FormResult<FormScope<T>> {
		Ok(FormScope {
			context: self.clone(),
			prefix: Path::parse(prefix)?,
		})
	}

	fn warn_if_unresolved(&self, path: &Path) {
		if self.inner.initial.read(path.as_str()).is_some() {
			return;
		}
		if self.inner.unresolved.borrow_mut().insert(path.to_string()) {
			warn!(path = %path, "bound path is not part of the initial values");
		}
	}

	fn is_required(&self, path: &Path, options: &BindOptions) -> bool {
		options
			.required
			.unwrap_or_else(|| !self.inner.settings.is_optional(path.as_str()))
	}
}

impl<T: 'static> FormContext<T> {
	fn bind(&self, path: &Path, options: BindOptions) -> FieldBinding {
		self.warn_if_unresolved(path);
		let context = self.clone();
		let target = path.clone();
		FieldBinding::new(
			path.to_string(),
			options.id.clone().unwrap_or_else(|| element_id(path.as_str())),
			self.read(path.as_str()),
			self.has_error(path.as_str()),
			self.is_required(path, &options),
			Rc::new(move |value| context.apply(&target, value)),
		)
	}
}

fn inert_binding(raw: &str, options: BindOptions) -> FieldBinding {
	FieldBinding::new(
		raw.to_string(),
		options.id.unwrap_or_else(|| element_id(raw)),
		None,
		false,
		options.required.unwrap_or(true),
		Rc::new(|_| {}),
	)
}

impl<T: 'static> FieldBinder for FormContext<T> {
	fn bind_input_with(&self, path: &str, options: BindOptions) -> FieldBinding {
		match Path::parse(path) {
			Ok(path) => self.bind(&path, options),
			Err(error) => {
				warn!(path, %error, "cannot bind invalid path");
				inert_binding(path, options)
			}
		}
	}
}

/// A form restricted to the sub-tree below one path.
///
/// Section components get a scope instead of the whole form, so they only
/// see and bind the fields they own. Bindings keep their full path as
/// `name`, which keeps errors and element ids consistent with the form.
pub struct FormScope<T> {
	context: FormContext<T>,
	prefix: Path,
}

impl<T> Clone for FormScope<T> {
	fn clone(&self) -> Self {
		Self {
			context: self.context.clone(),
			prefix: self.prefix.clone(),
		}
	}
}

impl<T> fmt::Debug for FormScope<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FormScope")
			.field("prefix", &self.prefix)
			.finish_non_exhaustive()
	}
}

impl<T> FormScope<T> {
	pub fn prefix(&self) -> &Path {
		&self.prefix
	}

	fn absolute(&self, relative: &str) -> FormResult<Path> {
		Ok(self.prefix.child(relative)?)
	}

	/// The whole sub-tree, or `None` when nothing is stored at the prefix.
	pub fn value(&self) -> Option<Value> {
		self.context.read(self.prefix.as_str())
	}

	pub fn read(&self, relative: &str) -> Option<Value> {
		let path = self.absolute(relative).ok()?;
		self.context.read(path.as_str())
	}

	pub fn set_value(&self, relative: &str, value: impl Into<Value>) -> FormResult<()> {
		let path = self.absolute(relative)?;
		self.context.apply(&path, value.into());
		Ok(())
	}

	/// Errors below the prefix, keyed relative to it.
	pub fn errors(&self) -> ErrorMap {
		self.context.errors().scoped(&self.prefix)
	}

	pub fn has_errors(&self) -> bool {
		!self.errors().is_empty()
	}
}

impl<T: 'static> FieldBinder for FormScope<T> {
	fn bind_input_with(&self, relative: &str, options: BindOptions) -> FieldBinding {
		match self.absolute(relative) {
			Ok(path) => self.context.bind(&path, options),
			Err(error) => {
				warn!(prefix = %self.prefix, path = relative, %error, "cannot bind invalid path");
				inert_binding(relative, options)
			}
		}
	}
}

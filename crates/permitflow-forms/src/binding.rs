//! Field bindings handed to UI widgets
//!
//! A binding carries everything an input or select widget needs:
//! `name`, `id`, the current `value`, the ARIA error attributes and an
//! `on_change` callback. Calling `on_change` is the only way user input
//! reaches the form state, and it clears the error at the bound path in the
//! same call.

use serde_json::Value;
use std::fmt;
use std::rc::Rc;

pub(crate) type ChangeHandler = Rc<dyn Fn(Value)>;

/// Per-call overrides for a binding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindOptions {
	/// Overrides the `required` flag resolved from settings.
	pub required: Option<bool>,
	/// Overrides the generated element id.
	pub id: Option<String>,
}

impl BindOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn optional() -> Self {
		Self::new().with_required(false)
	}

	pub fn with_required(mut self, required: bool) -> Self {
		self.required = Some(required);
		self
	}

	pub fn with_id(mut self, id: impl Into<String>) -> Self {
		self.id = Some(id.into());
		self
	}
}

/// Element id generated for a path, e.g. `id_site-address-line1`.
pub fn element_id(path: &str) -> String {
	format!("id_{}", path.replace(permitflow_state::path::SEPARATOR, "-"))
}

fn display_value(value: &Value) -> String {
	match value {
		Value::Null => String::new(),
		Value::String(s) => s.clone(),
		other => other.to_string(),
	}
}

/// Binding for a single-valued input.
#[derive(Clone)]
pub struct FieldBinding {
	pub name: String,
	pub id: String,
	/// Current value, an empty string when the path holds nothing.
	pub value: Value,
	pub aria_invalid: bool,
	/// Points at the error message element when the field is invalid.
	pub aria_described_by: Option<String>,
	pub required: bool,
	handler: ChangeHandler,
}

impl FieldBinding {
	pub(crate) fn new(
		name: String,
		id: String,
		value: Option<Value>,
		aria_invalid: bool,
		required: bool,
		handler: ChangeHandler,
	) -> Self {
		let value = match value {
			None | Some(Value::Null) => Value::String(String::new()),
			Some(value) => value,
		};
		let aria_described_by = aria_invalid.then(|| format!("{id}-error"));
		Self {
			name,
			id,
			value,
			aria_invalid,
			aria_described_by,
			required,
			handler,
		}
	}

	/// Write `value` at the bound path and clear its error.
	pub fn on_change(&self, value: impl Into<Value>) {
		(self.handler)(value.into());
	}

	/// The value as a widget displays it.
	pub fn value_str(&self) -> String {
		display_value(&self.value)
	}

	/// Widget attributes in render order.
	///
	/// # Examples
	///
	/// ```
	/// use permitflow_forms::{FieldBinder, FormContext};
	/// use serde_json::json;
	///
	/// let form = FormContext::new(&json!({"name": "Alex"})).unwrap();
	/// let attributes = form.bind_input("name").attributes();
	///
	/// assert_eq!(attributes[0], ("name", "name".to_string()));
	/// assert!(attributes.contains(&("value", "Alex".to_string())));
	/// ```
	pub fn attributes(&self) -> Vec<(&'static str, String)> {
		let mut attributes = vec![
			("name", self.name.clone()),
			("id", self.id.clone()),
			("value", self.value_str()),
			("aria-invalid", self.aria_invalid.to_string()),
		];
		if let Some(described_by) = &self.aria_described_by {
			attributes.push(("aria-describedby", described_by.clone()));
		}
		if self.required {
			attributes.push(("required", String::new()));
		}
		attributes
	}
}

impl fmt::Debug for FieldBinding {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FieldBinding")
			.field("name", &self.name)
			.field("id", &self.id)
			.field("value", &self.value)
			.field("aria_invalid", &self.aria_invalid)
			.field("required", &self.required)
			.finish_non_exhaustive()
	}
}

/// Value of a select widget: one option or, for multi-selects, several.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectValue {
	Single(Value),
	Multiple(Vec<Value>),
}

impl SelectValue {
	pub fn is_selected(&self, option: &Value) -> bool {
		match self {
			Self::Single(value) => value == option,
			Self::Multiple(values) => values.contains(option),
		}
	}

	pub fn into_value(self) -> Value {
		match self {
			Self::Single(value) => value,
			Self::Multiple(values) => Value::Array(values),
		}
	}
}

impl From<Value> for SelectValue {
	fn from(value: Value) -> Self {
		match value {
			Value::Array(values) => Self::Multiple(values),
			Value::Null => Self::Single(Value::String(String::new())),
			other => Self::Single(other),
		}
	}
}

impl From<&str> for SelectValue {
	fn from(value: &str) -> Self {
		Self::Single(Value::from(value))
	}
}

impl From<String> for SelectValue {
	fn from(value: String) -> Self {
		Self::Single(Value::from(value))
	}
}

impl<V: Into<Value>> From<Vec<V>> for SelectValue {
	fn from(values: Vec<V>) -> Self {
		Self::Multiple(values.into_iter().map(Into::into).collect())
	}
}

/// Binding for a single or multi-valued select.
///
/// A multi-select writes its values as an array at the bound path. The
/// array stays an array in the state tree; it is only turned into a string
/// when the state is flattened for transport.
#[derive(Clone)]
pub struct SelectBinding {
	pub name: String,
	pub id: String,
	pub value: SelectValue,
	pub aria_invalid: bool,
	pub aria_described_by: Option<String>,
	pub required: bool,
	handler: ChangeHandler,
}

impl SelectBinding {
	pub(crate) fn from_field(field: FieldBinding) -> Self {
		Self {
			name: field.name,
			id: field.id,
			value: SelectValue::from(field.value),
			aria_invalid: field.aria_invalid,
			aria_described_by: field.aria_described_by,
			required: field.required,
			handler: field.handler,
		}
	}

	pub fn on_change(&self, value: impl Into<SelectValue>) {
		(self.handler)(value.into().into_value());
	}

	pub fn is_multiple(&self) -> bool {
		matches!(self.value, SelectValue::Multiple(_))
	}

	pub fn is_selected(&self, option: &Value) -> bool {
		self.value.is_selected(option)
	}
}

impl fmt::Debug for SelectBinding {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SelectBinding")
			.field("name", &self.name)
			.field("id", &self.id)
			.field("value", &self.value)
			.field("aria_invalid", &self.aria_invalid)
			.field("required", &self.required)
			.finish_non_exhaustive()
	}
}

/// Anything that can hand out bindings for paths in a form state.
pub trait FieldBinder {
	fn bind_input_with(&self, path: &str, options: BindOptions) -> FieldBinding;

	fn bind_input(&self, path: &str) -> FieldBinding {
		self.bind_input_with(path, BindOptions::default())
	}

	fn bind_select_with(&self, path: &str, options: BindOptions) -> SelectBinding {
		SelectBinding::from_field(self.bind_input_with(path, options))
	}

	fn bind_select(&self, path: &str) -> SelectBinding {
		self.bind_select_with(path, BindOptions::default())
	}
}

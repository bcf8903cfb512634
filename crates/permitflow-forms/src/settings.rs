//! Form engine settings
//!
//! Settings are plain data so they can live in a project's TOML
//! configuration:
//!
//! ```toml
//! reset_on_success = true
//! action_timeout_ms = 15000
//! validation_timeout_ms = 5000
//! invalid_form_message = "Please fix the errors in the form"
//! draft_max_age_secs = 604800
//! optional_fields = ["site.address.line2"]
//! ```

use crate::error::FormResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_INVALID_FORM_MESSAGE: &str = "Please fix the errors in the form";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormSettings {
	/// Restore the initial values after a successful submission instead of
	/// merging the returned data.
	pub reset_on_success: bool,
	/// Upper bound for one external action call.
	pub action_timeout_ms: Option<u64>,
	/// Upper bound for one section validation.
	pub validation_timeout_ms: Option<u64>,
	/// Reported through `on_error` when a submission comes back with field errors.
	pub invalid_form_message: String,
	/// Drafts older than this are discarded when a wizard mounts.
	pub draft_max_age_secs: Option<u64>,
	/// Paths whose bindings default to `required = false`.
	pub optional_fields: Vec<String>,
}

impl Default for FormSettings {
	fn default() -> Self {
		Self {
			reset_on_success: false,
			action_timeout_ms: None,
			validation_timeout_ms: None,
			invalid_form_message: DEFAULT_INVALID_FORM_MESSAGE.to_string(),
			draft_max_age_secs: None,
			optional_fields: Vec::new(),
		}
	}
}

impl FormSettings {
	/// Parse settings from TOML. Missing keys take their defaults.
	///
	/// # Examples
	///
	/// ```
	/// use permitflow_forms::FormSettings;
	///
	/// let settings = FormSettings::from_toml_str("reset_on_success = true").unwrap();
	/// assert!(settings.reset_on_success);
	/// assert_eq!(settings.action_timeout(), None);
	/// ```
	pub fn from_toml_str(source: &str) -> FormResult<Self> {
		Ok(toml::from_str(source)?)
	}

	pub fn with_reset_on_success(mut self, reset: bool) -> Self {
		self.reset_on_success = reset;
		self
	}

	pub fn with_action_timeout(mut self, timeout: Duration) -> Self {
		self.action_timeout_ms = Some(duration_to_millis(timeout));
		self
	}

	pub fn with_validation_timeout(mut self, timeout: Duration) -> Self {
		self.validation_timeout_ms = Some(duration_to_millis(timeout));
		self
	}

	pub fn with_invalid_form_message(mut self, message: impl Into<String>) -> Self {
		self.invalid_form_message = message.into();
		self
	}

	pub fn with_draft_max_age(mut self, max_age: Duration) -> Self {
		self.draft_max_age_secs = Some(max_age.as_secs());
		self
	}

	pub fn with_optional_field(mut self, path: impl Into<String>) -> Self {
		self.optional_fields.push(path.into());
		self
	}

	pub fn action_timeout(&self) -> Option<Duration> {
		self.action_timeout_ms.map(Duration::from_millis)
	}

	pub fn validation_timeout(&self) -> Option<Duration> {
		self.validation_timeout_ms.map(Duration::from_millis)
	}

	pub fn draft_max_age(&self) -> Option<chrono::Duration> {
		self.draft_max_age_secs
			.and_then(|secs| i64::try_from(secs).ok())
			.and_then(chrono::Duration::try_seconds)
	}

	pub fn is_optional(&self, path: &str) -> bool {
		self.optional_fields.iter().any(|optional| optional == path)
	}
}

fn duration_to_millis(duration: Duration) -> u64 {
	u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

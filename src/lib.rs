//! # Permitflow
//!
//! Form state and multi-step wizards for business forms.
//!
//! Permitflow keeps a form's data as one nested state tree addressed by
//! dot-separated paths, carries it across flat key/value transports, and
//! drives single forms and multi-section wizards through validation and
//! submission.
//!
//! ## Crates
//!
//! - [`state`] (`permitflow-state`) - paths, the state tree, flatten/unflatten
//!   transcoding and per-path error maps
//! - [`forms`] (`permitflow-forms`, feature `forms`, default) - field bindings,
//!   submission and wizard controllers, draft stores and settings
//!
//! ## Quick Example
//!
//! ```
//! use permitflow::prelude::*;
//! use serde_json::json;
//!
//! let form = FormContext::new(&json!({"name": "", "site": {"name": ""}})).unwrap();
//! form.bind_input("site.name").on_change("Depot 4");
//!
//! let record = form.record();
//! assert_eq!(record.get("site.name"), Some("Depot 4"));
//! assert_eq!(record.get("name"), Some(""));
//! ```

pub use permitflow_state as state;

#[cfg(feature = "forms")]
pub use permitflow_forms as forms;

pub use permitflow_state::{
	ErrorMap, ErrorStore, FormState, Path, StateError, StateResult, TransportRecord, flatten,
	unflatten, unflatten_with_shape,
};

#[cfg(feature = "forms")]
pub use permitflow_forms::{
	ActionFailure, ActionOutput, ActionResult, BindOptions, Draft, DraftStore, FieldBinder,
	FieldBinding, FileDraftStore, FnValidator, FormAction, FormContext, FormError, FormResult,
	FormScope, FormSettings, InMemoryDraftStore, SectionValidator, SelectBinding, SelectValue,
	SubmissionController, WizardController, WizardStatus,
};

/// Re-exports for typical form code.
pub mod prelude {
	pub use crate::{ErrorMap, FormState, Path, TransportRecord, flatten, unflatten};

	#[cfg(feature = "forms")]
	pub use crate::{
		ActionOutput, ActionResult, BindOptions, FieldBinder, FormContext, FormSettings,
		SubmissionController, WizardController, WizardStatus,
	};
}

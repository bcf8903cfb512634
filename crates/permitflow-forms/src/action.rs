//! The external action contract
//!
//! Every collaborator the engine calls out to (a REST endpoint, an RPC,
//! a direct database call) is reached through [`FormAction`] and answers with
//! an [`ActionResult`]. The engine never looks past this contract.

use async_trait::async_trait;
use permitflow_state::{ErrorMap, TransportRecord};
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Error payload of a failed action.
///
/// On the wire this is either a plain string or an object mapping paths to
/// message lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionFailure {
	Message(String),
	Fields(ErrorMap),
}

/// Uniform `{success, message, data?, error?}` result of an external action.
///
/// # Examples
///
/// ```
/// use permitflow_forms::{ActionFailure, ActionResult};
///
/// let result: ActionResult<()> = serde_json::from_str(
///     r#"{"success": false, "message": "", "error": {"email": ["Email already exists"]}}"#,
/// )
/// .unwrap();
///
/// assert!(!result.success);
/// assert!(result.field_errors().unwrap().contains("email"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult<T> {
	pub success: bool,
	#[serde(default)]
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<ActionFailure>,
}

/// What an action implementation returns; `Err` stands for a thrown exception.
pub type ActionOutput<T> = anyhow::Result<ActionResult<T>>;

impl<T> ActionResult<T> {
	pub fn succeeded(message: impl Into<String>) -> Self {
		Self {
			success: true,
			message: message.into(),
			data: None,
			error: None,
		}
	}

	pub fn with_data(message: impl Into<String>, data: T) -> Self {
		Self {
			data: Some(data),
			..Self::succeeded(message)
		}
	}

	/// A failure carrying a single human-readable error.
	pub fn failed(message: impl Into<String>) -> Self {
		let message = message.into();
		Self {
			success: false,
			error: Some(ActionFailure::Message(message.clone())),
			message,
			data: None,
		}
	}

	/// A failure carrying per-field errors.
	pub fn invalid(message: impl Into<String>, errors: ErrorMap) -> Self {
		Self {
			success: false,
			message: message.into(),
			data: None,
			error: Some(ActionFailure::Fields(errors)),
		}
	}

	pub fn field_errors(&self) -> Option<&ErrorMap> {
		match &self.error {
			Some(ActionFailure::Fields(errors)) => Some(errors),
			_ => None,
		}
	}

	/// The single message to report for a failed result.
	///
	/// Field errors are reported with `invalid_form_message` since the
	/// messages themselves are shown inline.
	pub fn failure_message(&self, invalid_form_message: &str) -> String {
		match &self.error {
			Some(ActionFailure::Fields(_)) => invalid_form_message.to_string(),
			Some(ActionFailure::Message(message)) => message.clone(),
			None if self.message.is_empty() => "Submission failed".to_string(),
			None => self.message.clone(),
		}
	}
}

/// An external asynchronous action invoked with the flattened form state.
///
/// Closures returning a future implement this trait directly:
///
/// ```
/// use permitflow_forms::{ActionOutput, ActionResult, FormAction};
/// use permitflow_state::TransportRecord;
///
/// fn assert_action<A: FormAction<()>>(_: &A) {}
///
/// let save = |record: TransportRecord| async move {
///     let output: ActionOutput<()> = Ok(ActionResult::succeeded(format!("{} fields", record.len())));
///     output
/// };
/// assert_action(&save);
/// ```
#[async_trait(?Send)]
pub trait FormAction<T: 'static> {
	async fn invoke(&self, record: TransportRecord) -> ActionOutput<T>;
}

#[async_trait(?Send)]
impl<T, F, Fut> FormAction<T> for F
where
	T: 'static,
	F: Fn(TransportRecord) -> Fut,
	Fut: Future<Output = ActionOutput<T>> + 'static,
{
	async fn invoke(&self, record: TransportRecord) -> ActionOutput<T> {
		(self)(record).await
	}
}

use permitflow_state::StateError;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum FormError {
	#[error(transparent)]
	State(#[from] StateError),
	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
	#[error("Invalid form settings: {0}")]
	Settings(#[from] toml::de::Error),
	#[error("Invalid configuration: {0}")]
	Configuration(String),
	#[error("Cannot navigate: {0}")]
	Navigation(String),
	#[error("Draft store error for '{id}': {reason}")]
	Draft { id: String, reason: String },
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Operation was cancelled")]
	Cancelled,
	#[error("Operation timed out after {} ms", .0.as_millis())]
	TimedOut(Duration),
	#[error("Operation panicked: {0}")]
	Panicked(String),
}

pub type FormResult<T> = Result<T, FormError>;

impl FormError {
	pub(crate) fn draft(id: &str, reason: impl ToString) -> Self {
		Self::Draft {
			id: id.to_string(),
			reason: reason.to_string(),
		}
	}

	/// Whether the error came from interrupting an in-flight operation.
	pub fn is_interruption(&self) -> bool {
		matches!(self, Self::Cancelled | Self::TimedOut(_) | Self::Panicked(_))
	}
}

/// Errors raised while parsing paths or converting state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
	#[error("Invalid path '{path}': {reason}")]
	InvalidPath { path: String, reason: String },
	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
	#[error("Transport encoding error: {0}")]
	Transport(String),
}

pub type StateResult<T> = Result<T, StateError>;

impl StateError {
	pub(crate) fn invalid_path(path: &str, reason: &str) -> Self {
		Self::InvalidPath {
			path: path.to_string(),
			reason: reason.to_string(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_invalid_path_display() {
		let err = StateError::invalid_path("a..b", "path contains an empty segment");
		assert_eq!(
			err.to_string(),
			"Invalid path 'a..b': path contains an empty segment"
		);
	}

	#[rstest]
	fn test_serialization_error_from() {
		let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
		let err: StateError = source.into();
		assert!(matches!(err, StateError::Serialization(_)));
	}
}

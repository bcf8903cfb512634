//! Section validation adapter
//!
//! The wizard never depends on a validation library. It asks a
//! [`SectionValidator`] for an outcome of whatever type the library produces,
//! then asks the same validator whether that outcome is valid and which
//! per-path errors it carries.

use async_trait::async_trait;
use permitflow_state::{ErrorMap, FormState};
use std::future::Future;

#[async_trait(?Send)]
pub trait SectionValidator<T: 'static> {
	/// Whatever the underlying validation library returns.
	type Outcome;

	async fn validate(&self, section: usize, state: FormState<T>) -> Self::Outcome;

	fn is_valid(&self, outcome: &Self::Outcome) -> bool;

	fn errors(&self, outcome: &Self::Outcome) -> ErrorMap;
}

/// Closures returning an [`ErrorMap`] validate directly: an empty map is valid.
#[async_trait(?Send)]
impl<T, F, Fut> SectionValidator<T> for F
where
	T: 'static,
	F: Fn(usize, FormState<T>) -> Fut,
	Fut: Future<Output = ErrorMap> + 'static,
{
	type Outcome = ErrorMap;

	async fn validate(&self, section: usize, state: FormState<T>) -> ErrorMap {
		(self)(section, state).await
	}

	fn is_valid(&self, outcome: &ErrorMap) -> bool {
		outcome.is_empty()
	}

	fn errors(&self, outcome: &ErrorMap) -> ErrorMap {
		outcome.clone()
	}
}

/// Validator assembled from three functions: `validate`, `is_valid` and
/// `errors`.
///
/// # Examples
///
/// ```
/// use permitflow_forms::{FnValidator, SectionValidator};
/// use permitflow_state::{ErrorMap, FormState};
///
/// struct Report {
///     missing: Vec<String>,
/// }
///
/// let validator = FnValidator::new(
///     |_section: usize, state: FormState<serde_json::Value>| async move {
///         let missing = ["name"]
///             .iter()
///             .filter(|path| state.read(path).and_then(|v| v.as_str()).is_none_or(str::is_empty))
///             .map(|path| path.to_string())
///             .collect();
///         Report { missing }
///     },
///     |report: &Report| report.missing.is_empty(),
///     |report: &Report| {
///         report
///             .missing
///             .iter()
///             .map(|path| (path.clone(), vec!["Required".to_string()]))
///             .collect::<ErrorMap>()
///     },
/// );
/// # fn assert_validator<V: SectionValidator<serde_json::Value>>(_: &V) {}
/// # assert_validator(&validator);
/// ```
pub struct FnValidator<F, P, E> {
	validate: F,
	is_valid: P,
	errors: E,
}

impl<F, P, E> FnValidator<F, P, E> {
	pub fn new(validate: F, is_valid: P, errors: E) -> Self {
		Self {
			validate,
			is_valid,
			errors,
		}
	}
}

#[async_trait(?Send)]
impl<T, V, F, Fut, P, E> SectionValidator<T> for FnValidator<F, P, E>
where
	T: 'static,
	V: 'static,
	F: Fn(usize, FormState<T>) -> Fut,
	Fut: Future<Output = V> + 'static,
	P: Fn(&V) -> bool,
	E: Fn(&V) -> ErrorMap,
{
	type Outcome = V;

	async fn validate(&self, section: usize, state: FormState<T>) -> V {
		(self.validate)(section, state).await
	}

	fn is_valid(&self, outcome: &V) -> bool {
		(self.is_valid)(outcome)
	}

	fn errors(&self, outcome: &V) -> ErrorMap {
		(self.errors)(outcome)
	}
}

/// Result of running a validator against one section.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Verdict {
	Valid,
	Invalid(ErrorMap),
}

pub(crate) async fn judge<T, V>(validator: &V, section: usize, state: FormState<T>) -> Verdict
where
	T: 'static,
	V: SectionValidator<T>,
{
	let outcome = validator.validate(section, state).await;
	if validator.is_valid(&outcome) {
		Verdict::Valid
	} else {
		Verdict::Invalid(validator.errors(&outcome))
	}
}

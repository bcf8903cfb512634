//! The form state tree
//!
//! [`FormState`] wraps a `serde_json::Value` behind an `Rc` and tags it with
//! the caller's shape `T`. Writes never touch the shared tree: each one
//! produces a new `FormState` with a new top-level reference, so reactive UI
//! code can detect change with [`FormState::ptr_eq`].

use crate::error::StateResult;
use crate::path;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

/// Nested form state typed by the caller-supplied shape `T`.
pub struct FormState<T> {
	tree: Rc<Value>,
	_shape: PhantomData<fn() -> T>,
}

impl<T: Serialize> FormState<T> {
	/// Build a state tree from a typed value.
	///
	/// # Examples
	///
	/// ```
	/// use permitflow_state::FormState;
	/// use serde::Serialize;
	///
	/// #[derive(Serialize)]
	/// struct Contact {
	///     name: String,
	/// }
	///
	/// let state = FormState::new(&Contact { name: "Alex".to_string() }).unwrap();
	/// assert_eq!(state.read("name"), Some(&serde_json::json!("Alex")));
	/// ```
	pub fn new(initial: &T) -> StateResult<Self> {
		Ok(Self::from_value(serde_json::to_value(initial)?))
	}
}

impl<T: DeserializeOwned> FormState<T> {
	/// Deserialize the tree back into `T`.
	pub fn typed(&self) -> StateResult<T> {
		Ok(serde_json::from_value(self.tree.as_ref().clone())?)
	}
}

impl<T> FormState<T> {
	pub fn from_value(value: Value) -> Self {
		Self {
			tree: Rc::new(value),
			_shape: PhantomData,
		}
	}

	pub fn value(&self) -> &Value {
		&self.tree
	}

	pub fn into_value(self) -> Value {
		Rc::unwrap_or_clone(self.tree)
	}

	pub fn read(&self, path: &str) -> Option<&Value> {
		path::read(&self.tree, path)
	}

	/// Return a new state with `value` stored at `path`.
	///
	/// # Examples
	///
	/// ```
	/// use permitflow_state::FormState;
	/// use serde_json::json;
	///
	/// let state: FormState<serde_json::Value> = FormState::from_value(json!({"name": ""}));
	/// let next = state.write("name", json!("Alex"));
	///
	/// assert!(!next.ptr_eq(&state));
	/// assert_eq!(state.read("name"), Some(&json!("")));
	/// assert_eq!(next.read("name"), Some(&json!("Alex")));
	/// ```
	pub fn write(&self, path: &str, value: Value) -> Self {
		Self::from_value(path::write(&self.tree, path, value))
	}

	/// Return a new state with the top-level keys of `patch` merged in.
	///
	/// Keys present in `patch` replace the existing value wholesale. A patch
	/// that is not an object replaces the whole tree.
	pub fn merge(&self, patch: &Value) -> Self {
		match (self.tree.as_ref(), patch) {
			(Value::Object(current), Value::Object(incoming)) => {
				let mut merged = current.clone();
				for (key, value) in incoming {
					merged.insert(key.clone(), value.clone());
				}
				Self::from_value(Value::Object(merged))
			}
			_ => Self::from_value(patch.clone()),
		}
	}

	/// Whether both states share the same top-level reference.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.tree, &other.tree)
	}
}

impl<T> Clone for FormState<T> {
	fn clone(&self) -> Self {
		Self {
			tree: Rc::clone(&self.tree),
			_shape: PhantomData,
		}
	}
}

impl<T> PartialEq for FormState<T> {
	fn eq(&self, other: &Self) -> bool {
		self.tree == other.tree
	}
}

impl<T> fmt::Debug for FormState<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("FormState").field(&self.tree).finish()
	}
}

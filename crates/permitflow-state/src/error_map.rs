//! Per-path validation errors
//!
//! Errors are always keyed by path, never by widget, so the same map serves a
//! single form and every section of a wizard.

use crate::path::Path;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map;

/// Mapping from path to an ordered, non-empty list of messages.
///
/// A path absent from the map has no active error. Inserting an empty
/// message list removes the entry instead, and deserializing drops paths
/// whose list is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
	from = "BTreeMap<String, Vec<String>>",
	into = "BTreeMap<String, Vec<String>>"
)]
pub struct ErrorMap {
	entries: BTreeMap<String, Vec<String>>,
}

impl ErrorMap {
	pub fn new() -> Self {
		Self::default()
	}

	/// Replace the messages for `path`.
	pub fn insert(&mut self, path: impl Into<String>, messages: Vec<String>) {
		let path = path.into();
		if messages.is_empty() {
			self.entries.remove(&path);
		} else {
			self.entries.insert(path, messages);
		}
	}

	/// Append one message for `path`.
	///
	/// # Examples
	///
	/// ```
	/// use permitflow_state::ErrorMap;
	///
	/// let mut errors = ErrorMap::new();
	/// errors.push("email", "Email is required");
	/// errors.push("email", "Email is invalid");
	/// assert_eq!(errors.get("email").unwrap().len(), 2);
	/// ```
	pub fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
		self.entries
			.entry(path.into())
			.or_default()
			.push(message.into());
	}

	pub fn get(&self, path: &str) -> Option<&[String]> {
		self.entries.get(path).map(Vec::as_slice)
	}

	pub fn contains(&self, path: &str) -> bool {
		self.entries.contains_key(path)
	}

	pub fn remove(&mut self, path: &str) -> Option<Vec<String>> {
		self.entries.remove(path)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn paths(&self) -> impl Iterator<Item = &str> {
		self.entries.keys().map(String::as_str)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
		self.entries
			.iter()
			.map(|(path, messages)| (path.as_str(), messages.as_slice()))
	}

	/// Errors below `prefix`, re-keyed relative to it.
	///
	/// # Examples
	///
	/// ```
	/// use permitflow_state::{ErrorMap, Path};
	///
	/// let mut errors = ErrorMap::new();
	/// errors.push("site.address.line1", "Required");
	/// errors.push("contact.email", "Invalid");
	///
	/// let site = errors.scoped(&Path::parse("site").unwrap());
	/// assert!(site.contains("address.line1"));
	/// assert_eq!(site.len(), 1);
	/// ```
	pub fn scoped(&self, prefix: &Path) -> ErrorMap {
		self.entries
			.iter()
			.filter_map(|(path, messages)| {
				let path = Path::parse(path).ok()?;
				let relative = path.strip_prefix(prefix)?;
				Some((String::from(relative), messages.clone()))
			})
			.collect()
	}

	fn without_empty(mut self) -> Self {
		self.entries.retain(|_, messages| !messages.is_empty());
		self
	}
}

impl<K: Into<String>> FromIterator<(K, Vec<String>)> for ErrorMap {
	fn from_iter<I: IntoIterator<Item = (K, Vec<String>)>>(iter: I) -> Self {
		let mut map = ErrorMap::new();
		for (path, messages) in iter {
			map.insert(path, messages);
		}
		map
	}
}

impl From<BTreeMap<String, Vec<String>>> for ErrorMap {
	fn from(entries: BTreeMap<String, Vec<String>>) -> Self {
		Self { entries }.without_empty()
	}
}

impl From<ErrorMap> for BTreeMap<String, Vec<String>> {
	fn from(map: ErrorMap) -> Self {
		map.entries
	}
}

impl IntoIterator for ErrorMap {
	type Item = (String, Vec<String>);
	type IntoIter = btree_map::IntoIter<String, Vec<String>>;

	fn into_iter(self) -> Self::IntoIter {
		self.entries.into_iter()
	}
}

/// The live error state of one form or wizard instance.
#[derive(Debug, Clone, Default)]
pub struct ErrorStore {
	errors: ErrorMap,
}

impl ErrorStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Replace every error at once, dropping entries with no messages.
	pub fn set_all(&mut self, errors: ErrorMap) {
		self.errors = errors.without_empty();
	}

	/// Remove the error at `path`. Returns whether one was present.
	pub fn clear(&mut self, path: &str) -> bool {
		self.errors.remove(path).is_some()
	}

	pub fn clear_all(&mut self) {
		self.errors = ErrorMap::new();
	}

	pub fn has(&self, path: &str) -> bool {
		self.errors.contains(path)
	}

	pub fn get(&self, path: &str) -> Option<&[String]> {
		self.errors.get(path)
	}

	pub fn is_empty(&self) -> bool {
		self.errors.is_empty()
	}

	pub fn len(&self) -> usize {
		self.errors.len()
	}

	pub fn all(&self) -> &ErrorMap {
		&self.errors
	}
}

//! Dot-separated paths into a nested state tree
//!
//! A path such as `"authorization.issuedToName"` addresses a location in a
//! JSON-like tree by walking object keys. Every segment is an object-key
//! traversal: arrays are opaque leaves held at the path that owns them.
//!
//! [`read`] and [`write`] work on plain `&str` paths because that is what UI
//! code hands over. [`Path`] is the parsed form used wherever a path is
//! stored or composed.

use crate::error::{StateError, StateResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Separator between path segments.
pub const SEPARATOR: char = '.';

/// A validated, non-empty dot-separated path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Path {
	raw: String,
}

impl Path {
	/// Parse a path, rejecting empty paths and empty segments.
	///
	/// # Examples
	///
	/// ```
	/// use permitflow_state::Path;
	///
	/// let path = Path::parse("project._id").unwrap();
	/// assert_eq!(path.segments().collect::<Vec<_>>(), vec!["project", "_id"]);
	///
	/// assert!(Path::parse("").is_err());
	/// assert!(Path::parse("project..id").is_err());
	/// ```
	pub fn parse(raw: &str) -> StateResult<Self> {
		if raw.is_empty() {
			return Err(StateError::invalid_path(raw, "path is empty"));
		}
		if raw.split(SEPARATOR).any(str::is_empty) {
			return Err(StateError::invalid_path(
				raw,
				"path contains an empty segment",
			));
		}
		Ok(Self {
			raw: raw.to_string(),
		})
	}

	pub fn as_str(&self) -> &str {
		&self.raw
	}

	pub fn segments(&self) -> impl Iterator<Item = &str> {
		self.raw.split(SEPARATOR)
	}

	/// Number of segments in the path.
	pub fn depth(&self) -> usize {
		self.segments().count()
	}

	/// Last segment of the path.
	pub fn last(&self) -> &str {
		self.raw
			.rsplit_once(SEPARATOR)
			.map_or(self.raw.as_str(), |(_, last)| last)
	}

	/// The enclosing path, or `None` for a single-segment path.
	///
	/// # Examples
	///
	/// ```
	/// use permitflow_state::Path;
	///
	/// let path = Path::parse("authorization.issuedToName").unwrap();
	/// assert_eq!(path.parent().unwrap().as_str(), "authorization");
	/// assert!(Path::parse("name").unwrap().parent().is_none());
	/// ```
	pub fn parent(&self) -> Option<Path> {
		self.raw.rsplit_once(SEPARATOR).map(|(parent, _)| Self {
			raw: parent.to_string(),
		})
	}

	/// Append another path below this one.
	pub fn join(&self, child: &Path) -> Path {
		Self {
			raw: format!("{}{}{}", self.raw, SEPARATOR, child.raw),
		}
	}

	/// Append a relative path given as a string.
	pub fn child(&self, relative: &str) -> StateResult<Path> {
		Ok(self.join(&Path::parse(relative)?))
	}

	/// Whether `prefix` is this path or one of its ancestors.
	pub fn starts_with(&self, prefix: &Path) -> bool {
		self.raw
			.strip_prefix(prefix.as_str())
			.is_some_and(|rest| rest.is_empty() || rest.starts_with(SEPARATOR))
	}

	/// The part of this path below `prefix`, if `prefix` is a strict ancestor.
	///
	/// # Examples
	///
	/// ```
	/// use permitflow_state::Path;
	///
	/// let path = Path::parse("site.address.line1").unwrap();
	/// let prefix = Path::parse("site").unwrap();
	/// assert_eq!(path.strip_prefix(&prefix).unwrap().as_str(), "address.line1");
	/// assert!(prefix.strip_prefix(&prefix).is_none());
	/// ```
	pub fn strip_prefix(&self, prefix: &Path) -> Option<Path> {
		let rest = self.raw.strip_prefix(prefix.as_str())?;
		let rest = rest.strip_prefix(SEPARATOR)?;
		Some(Self {
			raw: rest.to_string(),
		})
	}
}

impl fmt::Display for Path {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.raw)
	}
}

impl AsRef<str> for Path {
	fn as_ref(&self) -> &str {
		&self.raw
	}
}

impl FromStr for Path {
	type Err = StateError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl TryFrom<String> for Path {
	type Error = StateError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::parse(&value)
	}
}

impl TryFrom<&str> for Path {
	type Error = StateError;

	fn try_from(value: &str) -> Result<Self, Self::Error> {
		Self::parse(value)
	}
}

impl From<Path> for String {
	fn from(path: Path) -> Self {
		path.raw
	}
}

/// Read the value at `path`.
///
/// Returns `None` when a segment is missing or an intermediate value is not
/// an object. Never panics.
///
/// # Examples
///
/// ```
/// use permitflow_state::path::read;
/// use serde_json::json;
///
/// let state = json!({"project": {"_id": "p-1"}, "tags": ["a"]});
/// assert_eq!(read(&state, "project._id"), Some(&json!("p-1")));
/// assert_eq!(read(&state, "project.missing"), None);
/// assert_eq!(read(&state, "tags.0"), None);
/// ```
pub fn read<'a>(state: &'a Value, path: &str) -> Option<&'a Value> {
	path.split(SEPARATOR)
		.try_fold(state, |node, segment| node.as_object()?.get(segment))
}

/// Return a copy of `state` with `value` stored at `path`.
///
/// Missing intermediate objects are created. An intermediate value that is
/// not an object is replaced by a fresh object. `state` itself is untouched.
///
/// # Examples
///
/// ```
/// use permitflow_state::path::write;
/// use serde_json::json;
///
/// let state = json!({"site": "north"});
/// let next = write(&state, "site.address.line1", json!("1 Quay St"));
///
/// assert_eq!(state, json!({"site": "north"}));
/// assert_eq!(next, json!({"site": {"address": {"line1": "1 Quay St"}}}));
/// ```
pub fn write(state: &Value, path: &str, value: Value) -> Value {
	let mut next = state.clone();
	write_in_place(&mut next, path, value);
	next
}

/// Store `value` at `path` inside `root`, creating objects along the way.
pub fn write_in_place(root: &mut Value, path: &str, value: Value) {
	let segments: Vec<&str> = path.split(SEPARATOR).collect();
	write_segments(root, &segments, value);
}

fn write_segments(node: &mut Value, segments: &[&str], value: Value) {
	let Some((head, rest)) = segments.split_first() else {
		*node = value;
		return;
	};
	if !node.is_object() {
		*node = Value::Object(Map::new());
	}
	if let Value::Object(map) = node {
		let child = map.entry(head.to_string()).or_insert(Value::Null);
		write_segments(child, rest, value);
	}
}

//! Flat key/value transcoding of nested state
//!
//! Transports such as `application/x-www-form-urlencoded` bodies only carry
//! flat string pairs. [`flatten`] turns a nested tree into a
//! [`TransportRecord`] whose keys are dot-joined paths; [`unflatten`] and
//! [`unflatten_with_shape`] rebuild the tree on the receiving side.
//!
//! Encoding rules:
//!
//! | Value          | Record entry                                      |
//! |----------------|---------------------------------------------------|
//! | `null`         | omitted                                           |
//! | string         | the string itself                                 |
//! | number, bool   | `to_string()`                                     |
//! | array          | one compact JSON string under the array's own key |
//! | object         | recursed, keys extended with `.<subkey>`          |
//!
//! Arrays always use the single JSON-string encoding. There is no
//! repeated-key form.
//!
//! Object keys that themselves contain `.` cannot be told apart from nesting
//! after flattening.

use crate::error::{StateError, StateResult};
use crate::path::{self, SEPARATOR};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::collections::btree_map;

/// Flat mapping from dot-joined path to string value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransportRecord {
	entries: BTreeMap<String, String>,
}

impl TransportRecord {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
		self.entries.insert(key.into(), value.into())
	}

	pub fn get(&self, key: &str) -> Option<&str> {
		self.entries.get(key).map(String::as_str)
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.entries.contains_key(key)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.entries.keys().map(String::as_str)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	/// Encode as an `application/x-www-form-urlencoded` body.
	///
	/// # Examples
	///
	/// ```
	/// use permitflow_state::flatten;
	/// use serde_json::json;
	///
	/// let record = flatten(&json!({"site": {"name": "North Quay"}, "tags": ["a"]}));
	/// assert_eq!(
	///     record.to_urlencoded().unwrap(),
	///     "site.name=North+Quay&tags=%5B%22a%22%5D"
	/// );
	/// ```
	pub fn to_urlencoded(&self) -> StateResult<String> {
		serde_urlencoded::to_string(&self.entries)
			.map_err(|e| StateError::Transport(e.to_string()))
	}

	/// Decode an `application/x-www-form-urlencoded` body.
	///
	/// When a key repeats, the last occurrence wins.
	pub fn from_urlencoded(body: &str) -> StateResult<Self> {
		let pairs: Vec<(String, String)> =
			serde_urlencoded::from_str(body).map_err(|e| StateError::Transport(e.to_string()))?;
		Ok(pairs.into_iter().collect())
	}
}

impl FromIterator<(String, String)> for TransportRecord {
	fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
		Self {
			entries: iter.into_iter().collect(),
		}
	}
}

impl IntoIterator for TransportRecord {
	type Item = (String, String);
	type IntoIter = btree_map::IntoIter<String, String>;

	fn into_iter(self) -> Self::IntoIter {
		self.entries.into_iter()
	}
}

/// Flatten a nested tree into a transport record.
///
/// Only object keys produce entries, so a scalar or array at the root yields
/// an empty record. The input must be acyclic, which `serde_json::Value`
/// guarantees by construction.
///
/// # Examples
///
/// ```
/// use permitflow_state::flatten;
/// use serde_json::json;
///
/// let record = flatten(&json!({
///     "project": {"_id": "p-1", "active": true},
///     "crew": ["ana", "li"],
///     "notes": null,
/// }));
///
/// assert_eq!(record.get("project._id"), Some("p-1"));
/// assert_eq!(record.get("project.active"), Some("true"));
/// assert_eq!(record.get("crew"), Some(r#"["ana","li"]"#));
/// assert!(!record.contains_key("notes"));
/// ```
pub fn flatten(value: &Value) -> TransportRecord {
	let mut record = TransportRecord::new();
	if let Value::Object(map) = value {
		flatten_object(&mut record, None, map);
	}
	record
}

fn flatten_object(record: &mut TransportRecord, prefix: Option<&str>, map: &Map<String, Value>) {
	for (key, value) in map {
		let composite = match prefix {
			Some(prefix) => format!("{prefix}{SEPARATOR}{key}"),
			None => key.clone(),
		};
		match value {
			Value::Null => {}
			Value::Object(nested) => flatten_object(record, Some(&composite), nested),
			Value::Array(_) => {
				record.insert(composite, value.to_string());
			}
			Value::String(s) => {
				record.insert(composite, s.clone());
			}
			Value::Bool(_) | Value::Number(_) => {
				record.insert(composite, value.to_string());
			}
		}
	}
}

/// Rebuild a nested tree from a transport record.
///
/// Leaves come back as strings, except values that parse as a JSON array,
/// which are restored as arrays. Use [`unflatten_with_shape`] when numbers
/// and booleans must be recovered too.
///
/// # Examples
///
/// ```
/// use permitflow_state::{flatten, unflatten};
/// use serde_json::json;
///
/// let record = flatten(&json!({"site": {"name": "North"}, "crew": ["ana"]}));
/// assert_eq!(unflatten(&record), json!({"site": {"name": "North"}, "crew": ["ana"]}));
/// ```
pub fn unflatten(record: &TransportRecord) -> Value {
	let mut root = Value::Object(Map::new());
	for (key, raw) in record.iter() {
		path::write_in_place(&mut root, key, decode_untyped(raw));
	}
	root
}

/// Rebuild a nested tree, re-typing each leaf after the value found at the
/// same path in `shape`.
///
/// A leaf whose text does not parse as the shape's type stays a string.
/// Keys absent from `shape` are decoded as in [`unflatten`].
///
/// # Examples
///
/// ```
/// use permitflow_state::{flatten, unflatten_with_shape};
/// use serde_json::json;
///
/// let shape = json!({"name": "", "age": 0, "inducted": false, "roles": []});
/// let state = json!({"name": "Alex", "age": 34, "inducted": true, "roles": ["lead"]});
///
/// let rebuilt = unflatten_with_shape(&flatten(&state), &shape);
/// assert_eq!(rebuilt, state);
/// ```
pub fn unflatten_with_shape(record: &TransportRecord, shape: &Value) -> Value {
	let mut root = Value::Object(Map::new());
	for (key, raw) in record.iter() {
		let value = match path::read(shape, key) {
			Some(template) => decode_as(raw, template),
			None => decode_untyped(raw),
		};
		path::write_in_place(&mut root, key, value);
	}
	root
}

fn decode_untyped(raw: &str) -> Value {
	parse_array(raw).unwrap_or_else(|| Value::String(raw.to_string()))
}

fn decode_as(raw: &str, template: &Value) -> Value {
	let typed = match template {
		Value::Bool(_) => raw.parse::<bool>().ok().map(Value::Bool),
		Value::Number(_) => serde_json::from_str::<Number>(raw).ok().map(Value::Number),
		Value::Array(_) => parse_array(raw),
		_ => None,
	};
	typed.unwrap_or_else(|| Value::String(raw.to_string()))
}

fn parse_array(raw: &str) -> Option<Value> {
	if !raw.starts_with('[') {
		return None;
	}
	match serde_json::from_str(raw) {
		Ok(array @ Value::Array(_)) => Some(array),
		_ => None,
	}
}

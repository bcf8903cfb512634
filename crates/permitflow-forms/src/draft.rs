//! Persisted wizard drafts
//!
//! A draft is the full form state plus the section the user was on, keyed
//! by wizard id. The wizard talks to storage only through [`DraftStore`].
//! Two stores ship with the crate:
//! - [`InMemoryDraftStore`], process-wide through [`InMemoryDraftStore::shared`]
//! - [`FileDraftStore`], one JSON file per wizard id

use crate::error::{FormError, FormResult};
use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
	pub state: Value,
	pub section_index: usize,
	pub saved_at: DateTime<Utc>,
}

impl Draft {
	pub fn new(state: Value, section_index: usize) -> Self {
		Self {
			state,
			section_index,
			saved_at: Utc::now(),
		}
	}

	pub fn is_expired(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
		now.signed_duration_since(self.saved_at) > max_age
	}
}

/// Keyed storage for drafts.
pub trait DraftStore: Send + Sync {
	fn get(&self, id: &str) -> FormResult<Option<Draft>>;

	fn set(&self, id: &str, draft: &Draft) -> FormResult<()>;

	/// Remove the draft for `id`. Removing a missing draft succeeds.
	fn remove(&self, id: &str) -> FormResult<()>;
}

static SHARED: Lazy<InMemoryDraftStore> = Lazy::new(InMemoryDraftStore::new);

/// Drafts held in memory. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDraftStore {
	drafts: Arc<RwLock<HashMap<String, Draft>>>,
}

impl InMemoryDraftStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// The process-wide store.
	pub fn shared() -> Self {
		SHARED.clone()
	}

	pub fn len(&self) -> usize {
		self.drafts.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.drafts.read().is_empty()
	}
}

impl DraftStore for InMemoryDraftStore {
	fn get(&self, id: &str) -> FormResult<Option<Draft>> {
		Ok(self.drafts.read().get(id).cloned())
	}

	fn set(&self, id: &str, draft: &Draft) -> FormResult<()> {
		self.drafts.write().insert(id.to_string(), draft.clone());
		Ok(())
	}

	fn remove(&self, id: &str) -> FormResult<()> {
		self.drafts.write().remove(id);
		Ok(())
	}
}

/// Drafts stored as `<dir>/<encoded id>.json`.
///
/// Ids are percent-encoded into file names, so distinct ids never share a
/// file and no id can escape the directory.
#[derive(Debug, Clone)]
pub struct FileDraftStore {
	dir: PathBuf,
}

impl FileDraftStore {
	/// Open a store in `dir`, creating the directory if needed.
	pub fn new(dir: impl Into<PathBuf>) -> FormResult<Self> {
		let dir = dir.into();
		fs::create_dir_all(&dir)?;
		Ok(Self { dir })
	}

	pub fn dir(&self) -> &FsPath {
		&self.dir
	}

	fn file_for(&self, id: &str) -> FormResult<PathBuf> {
		if id.is_empty() {
			return Err(FormError::draft(id, "wizard id is empty"));
		}
		Ok(self.dir.join(format!("{}.json", encode_id(id))))
	}
}

/// Everything except `[A-Za-z0-9_-]` is escaped in draft file names.
const FILE_NAME: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_');

fn encode_id(id: &str) -> String {
	utf8_percent_encode(id, FILE_NAME).to_string()
}

impl DraftStore for FileDraftStore {
	fn get(&self, id: &str) -> FormResult<Option<Draft>> {
		let file = self.file_for(id)?;
		let contents = match fs::read_to_string(&file) {
			Ok(contents) => contents,
			Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
			Err(error) => return Err(error.into()),
		};
		serde_json::from_str(&contents)
			.map(Some)
			.map_err(|error| FormError::draft(id, error))
	}

	fn set(&self, id: &str, draft: &Draft) -> FormResult<()> {
		let file = self.file_for(id)?;
		let staging = file.with_extension("json.tmp");
		fs::write(&staging, serde_json::to_vec_pretty(draft)?)?;
		if let Err(error) = fs::rename(&staging, &file) {
			let _ = fs::remove_file(&staging);
			return Err(error.into());
		}
		debug!(wizard_id = id, file = %file.display(), "draft written");
		Ok(())
	}

	fn remove(&self, id: &str) -> FormResult<()> {
		match fs::remove_file(self.file_for(id)?) {
			Ok(()) => Ok(()),
			Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
			Err(error) => Err(error.into()),
		}
	}
}

//! Nested form state for permitflow
//!
//! This crate holds the data side of the form engine:
//! - [`Path`] and the [`path`] accessors that read and write a nested
//!   `serde_json::Value` tree by dot-separated path
//! - [`FormState`], the immutable-by-write state tree handed to UI code
//! - the [`transcode`] module, which flattens a tree into a [`TransportRecord`]
//!   of string pairs and rebuilds it on the receiving side
//! - [`ErrorMap`] and [`ErrorStore`] for per-path validation messages
//!
//! Nothing here performs I/O or depends on an async runtime.

pub mod error;
pub mod error_map;
pub mod path;
pub mod state;
pub mod transcode;

pub use error::{StateError, StateResult};
pub use error_map::{ErrorMap, ErrorStore};
pub use path::Path;
pub use state::FormState;
pub use transcode::{TransportRecord, flatten, unflatten, unflatten_with_shape};

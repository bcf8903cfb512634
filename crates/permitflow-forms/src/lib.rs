//! Form controllers for permitflow
//!
//! This crate provides the behaviour built on top of `permitflow-state`:
//! - Field bindings for input and select widgets, including section scopes
//! - Single-form submission through an external async action
//! - Multi-section wizards with validation gates and persisted drafts
//! - Cancellation and timeouts for pending validations and submissions
//!
//! Everything runs on one thread. Handles are `Rc`-based and async work is
//! driven by whatever executor the UI layer uses; only the timeouts need a
//! tokio time driver.

pub mod action;
pub mod binding;
pub mod context;
pub mod draft;
pub mod error;
mod flight;
pub mod settings;
pub mod submission;
pub mod validator;
pub mod wizard;

pub use action::{ActionFailure, ActionOutput, ActionResult, FormAction};
pub use binding::{BindOptions, FieldBinder, FieldBinding, SelectBinding, SelectValue};
pub use context::{FormContext, FormScope};
pub use draft::{Draft, DraftStore, FileDraftStore, InMemoryDraftStore};
pub use error::{FormError, FormResult};
pub use settings::FormSettings;
pub use submission::SubmissionController;
pub use validator::{FnValidator, SectionValidator};
pub use wizard::{WizardController, WizardStatus};

//! Wizard controller tests
//!
//! Tests for section navigation, validation gates, drafts and final submission

use chrono::{Duration as ChronoDuration, Utc};
use permitflow_forms::{
	ActionOutput, ActionResult, Draft, DraftStore, FieldBinder, FileDraftStore, FnValidator,
	FormContext, FormSettings, InMemoryDraftStore, WizardController, WizardStatus,
};
use permitflow_state::{ErrorMap, FormState, TransportRecord};
use rstest::rstest;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::cell::{Cell, RefCell};
use std::future::{Ready, ready};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Person {
	name: String,
	age: u32,
}

fn person_form() -> FormContext<Person> {
	FormContext::new(&Person {
		name: String::new(),
		age: 0,
	})
	.unwrap()
}

fn sections(names: &[&str]) -> Vec<String> {
	names.iter().map(|name| name.to_string()).collect()
}

/// Section 0 needs a name; every other section is valid.
fn require_name(section: usize, state: FormState<Person>) -> Ready<ErrorMap> {
	let mut errors = ErrorMap::new();
	let name = state.read("name").and_then(Value::as_str).unwrap_or_default();
	if section == 0 && name.is_empty() {
		errors.push("name", "Name is required");
	}
	ready(errors)
}

fn always_valid<T>(_section: usize, _state: FormState<T>) -> Ready<ErrorMap> {
	ready(ErrorMap::new())
}

fn accept(_record: TransportRecord) -> Ready<ActionOutput<Value>> {
	ready(Ok(ActionResult::succeeded("ok")))
}

#[rstest]
#[tokio::test]
async fn test_next_is_gated_on_section_validation() {
	let wizard = WizardController::new(
		"scenario-a",
		sections(&["details", "review"]),
		person_form(),
		require_name,
		accept,
		Arc::new(InMemoryDraftStore::new()),
	)
	.unwrap();

	assert!(!wizard.next().await);
	assert_eq!(wizard.current_section(), 0);
	assert!(wizard.context().has_error("name"));
	assert!(matches!(
		wizard.status(),
		WizardStatus::Blocked { section: 0, ref errors, message: None } if errors.contains("name")
	));

	wizard.bind_input("name").on_change("Alex");
	assert!(!wizard.context().has_error("name"));

	assert!(wizard.next().await);
	assert_eq!(wizard.current_section(), 1);
	assert!(!wizard.context().has_error("name"));
	assert_eq!(wizard.status(), WizardStatus::Editing(1));
}

#[rstest]
#[case(1)]
#[case(3)]
#[case(7)]
#[tokio::test]
async fn test_valid_next_never_skips_a_section(#[case] presses: usize) {
	let names = ["site", "hazards", "controls", "review", "sign-off"];
	let wizard = WizardController::new(
		"monotonic",
		sections(&names),
		person_form(),
		always_valid,
		accept,
		Arc::new(InMemoryDraftStore::new()),
	)
	.unwrap();

	let mut visited = vec![wizard.current_section()];
	for _ in 0..presses {
		wizard.next().await;
		visited.push(wizard.current_section());
	}

	assert_eq!(wizard.current_section(), presses.min(names.len() - 1));
	for pair in visited.windows(2) {
		assert!(pair[1] == pair[0] || pair[1] == pair[0] + 1);
	}
}

#[rstest]
#[tokio::test]
async fn test_draft_resumes_after_next() {
	let store = InMemoryDraftStore::shared();
	let id = "draft-roundtrip-person";
	let first = WizardController::new(
		id,
		sections(&["details", "contact", "review"]),
		person_form(),
		always_valid,
		accept,
		Arc::new(store.clone()),
	)
	.unwrap();
	first.bind_input("name").on_change("Alex");
	first.bind_input("age").on_change(41);
	assert!(first.next().await);
	let saved_state = first.context().state();
	let saved_section = first.current_section();

	let resumed = WizardController::new(
		id,
		sections(&["details", "contact", "review"]),
		person_form(),
		always_valid,
		accept,
		Arc::new(store.clone()),
	)
	.unwrap();

	assert_eq!(resumed.current_section(), saved_section);
	assert_eq!(resumed.context().state(), saved_state);
	assert_eq!(
		resumed.context().state().typed().unwrap(),
		Person {
			name: "Alex".to_string(),
			age: 41
		}
	);
	store.remove(id).unwrap();
}

#[rstest]
#[tokio::test]
async fn test_submit_sends_full_state_and_clears_draft() {
	let store = Arc::new(InMemoryDraftStore::new());
	let received = Rc::new(RefCell::new(None));
	let sink = Rc::clone(&received);
	let completed = Rc::new(RefCell::new(None));
	let done = Rc::clone(&completed);
	let form = FormContext::new(&json!({
		"site": {"name": ""},
		"hazards": [],
		"signOff": {"issuedToName": ""},
	}))
	.unwrap();
	let wizard = WizardController::new(
		"permit-7",
		sections(&["site", "hazards", "sign-off"]),
		form,
		always_valid,
		move |record: TransportRecord| {
			*sink.borrow_mut() = Some(record);
			let output: ActionOutput<Value> =
				Ok(ActionResult::with_data("Permit issued", json!({"_id": "ptw-7"})));
			ready(output)
		},
		store.clone(),
	)
	.unwrap()
	.on_complete(move |data: Option<&Value>| *done.borrow_mut() = data.cloned());

	wizard.bind_input("site.name").on_change("Depot 4");
	assert!(wizard.next().await);
	wizard.bind_select("hazards").on_change(vec!["height", "electrical"]);
	assert!(wizard.next().await);
	wizard.bind_input("signOff.issuedToName").on_change("Sam");
	assert!(!store.is_empty());

	let result = wizard.submit().await;

	assert!(result.success);
	let record = received.borrow_mut().take().unwrap();
	assert_eq!(record.get("site.name"), Some("Depot 4"));
	assert_eq!(record.get("hazards"), Some(r#"["height","electrical"]"#));
	assert_eq!(record.get("signOff.issuedToName"), Some("Sam"));
	assert_eq!(wizard.status(), WizardStatus::Completed);
	assert!(store.is_empty());
	assert_eq!(*completed.borrow(), Some(json!({"_id": "ptw-7"})));
}

#[rstest]
#[tokio::test]
async fn test_rejected_submit_keeps_data_and_blocks() {
	let reported = Rc::new(RefCell::new(Vec::new()));
	let sink = Rc::clone(&reported);
	let wizard = WizardController::new(
		"rejected",
		sections(&["details"]),
		person_form(),
		always_valid,
		|_record: TransportRecord| {
			let mut errors = ErrorMap::new();
			errors.push("name", "Name is already registered");
			let output: ActionOutput<Value> = Ok(ActionResult::invalid("", errors));
			ready(output)
		},
		Arc::new(InMemoryDraftStore::new()),
	)
	.unwrap()
	.on_error(move |message: &str| sink.borrow_mut().push(message.to_string()));
	wizard.bind_input("name").on_change("Alex");

	let result = wizard.submit().await;

	assert!(!result.success);
	assert!(wizard.context().has_error("name"));
	assert_eq!(wizard.context().read("name"), Some(json!("Alex")));
	assert!(matches!(wizard.status(), WizardStatus::Blocked { section: 0, .. }));
	assert_eq!(
		*reported.borrow(),
		vec!["Please fix the errors in the form".to_string()]
	);
	assert!(!wizard.is_busy());
}

#[rstest]
#[tokio::test]
async fn test_failed_submit_without_field_errors_keeps_message() {
	let wizard = WizardController::new(
		"offline",
		sections(&["details"]),
		person_form(),
		always_valid,
		|_record: TransportRecord| {
			let output: ActionOutput<Value> = Ok(ActionResult::failed("Permit register is offline"));
			ready(output)
		},
		Arc::new(InMemoryDraftStore::new()),
	)
	.unwrap();

	let result = wizard.submit().await;

	assert!(!result.success);
	assert_eq!(
		wizard.status(),
		WizardStatus::Blocked {
			section: 0,
			errors: ErrorMap::new(),
			message: Some("Permit register is offline".to_string()),
		}
	);
	assert!(wizard.context().errors().is_empty());
}

/// Section 1 needs an age; every other section is valid.
fn require_age_on_second(section: usize, state: FormState<Person>) -> Ready<ErrorMap> {
	let mut errors = ErrorMap::new();
	if section == 1 && state.read("age") == Some(&json!(0)) {
		errors.push("age", "Age is required");
	}
	ready(errors)
}

#[rstest]
#[case::back(true)]
#[case::go_to(false)]
#[tokio::test]
async fn test_stepping_back_clears_section_errors(#[case] use_back: bool) {
	let wizard = WizardController::new(
		"step-back",
		sections(&["details", "contact", "review"]),
		person_form(),
		require_age_on_second,
		accept,
		Arc::new(InMemoryDraftStore::new()),
	)
	.unwrap();
	assert!(wizard.next().await);
	assert!(!wizard.next().await);
	assert!(wizard.context().has_error("age"));
	assert!(matches!(wizard.status(), WizardStatus::Blocked { section: 1, .. }));

	if use_back {
		assert!(wizard.back());
	} else {
		wizard.go_to(0).unwrap();
	}

	assert!(wizard.context().errors().is_empty());
	assert_eq!(wizard.status(), WizardStatus::Editing(0));
	assert_eq!(wizard.current_section(), 0);
}

#[rstest]
#[tokio::test]
async fn test_invalid_last_section_does_not_call_action() {
	let calls = Rc::new(Cell::new(0));
	let counter = Rc::clone(&calls);
	let wizard = WizardController::new(
		"invalid-last",
		sections(&["details"]),
		person_form(),
		require_name,
		move |_record: TransportRecord| {
			counter.set(counter.get() + 1);
			accept(TransportRecord::new())
		},
		Arc::new(InMemoryDraftStore::new()),
	)
	.unwrap();

	let result = wizard.submit().await;

	assert!(!result.success);
	assert_eq!(calls.get(), 0);
	assert!(wizard.context().has_error("name"));
}

#[rstest]
#[tokio::test]
async fn test_adapter_validator_gates_next() {
	struct Report {
		missing: Vec<&'static str>,
	}

	let validator = FnValidator::new(
		|_section: usize, state: FormState<Person>| {
			let age = state.read("age").and_then(Value::as_u64).unwrap_or_default();
			ready(Report {
				missing: if age == 0 { vec!["age"] } else { Vec::new() },
			})
		},
		|report: &Report| report.missing.is_empty(),
		|report: &Report| {
			report
				.missing
				.iter()
				.map(|path| (*path, vec!["Age is required".to_string()]))
				.collect::<ErrorMap>()
		},
	);
	let wizard = WizardController::new(
		"adapter",
		sections(&["details", "review"]),
		person_form(),
		validator,
		accept,
		Arc::new(InMemoryDraftStore::new()),
	)
	.unwrap();

	assert!(!wizard.next().await);
	assert_eq!(wizard.context().error("age"), Some(vec!["Age is required".to_string()]));

	wizard.bind_input("age").on_change(30);
	assert!(wizard.next().await);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_validation_timeout_reports_once() {
	let reported = Rc::new(RefCell::new(Vec::new()));
	let sink = Rc::clone(&reported);
	let settings = FormSettings::default().with_validation_timeout(Duration::from_millis(50));
	let form = FormContext::with_settings(&json!({"name": "Alex"}), settings).unwrap();
	let wizard = WizardController::new(
		"slow-validator",
		sections(&["details", "review"]),
		form,
		|_section: usize, _state: FormState<Value>| async move {
			futures::future::pending::<()>().await;
			ErrorMap::new()
		},
		accept,
		Arc::new(InMemoryDraftStore::new()),
	)
	.unwrap()
	.on_error(move |message: &str| sink.borrow_mut().push(message.to_string()));

	assert!(!wizard.next().await);

	assert_eq!(wizard.current_section(), 0);
	assert_eq!(wizard.status(), WizardStatus::Editing(0));
	assert_eq!(
		*reported.borrow(),
		vec!["Operation timed out after 50 ms".to_string()]
	);
	assert!(!wizard.is_busy());
}

#[rstest]
#[tokio::test]
async fn test_next_is_ignored_while_validating() {
	let calls = Rc::new(Cell::new(0));
	let counter = Rc::clone(&calls);
	let release = Rc::new(tokio::sync::Notify::new());
	let gate = Rc::clone(&release);
	let wizard = WizardController::new(
		"busy",
		sections(&["a", "b", "c"]),
		person_form(),
		move |_section: usize, _state: FormState<Person>| {
			counter.set(counter.get() + 1);
			let gate = Rc::clone(&gate);
			async move {
				gate.notified().await;
				ErrorMap::new()
			}
		},
		accept,
		Arc::new(InMemoryDraftStore::new()),
	)
	.unwrap();

	let first = wizard.next();
	let second = async {
		tokio::task::yield_now().await;
		assert_eq!(wizard.status(), WizardStatus::Validating(0));
		assert!(!wizard.back());
		let moved = wizard.next().await;
		release.notify_one();
		moved
	};
	let (first, second) = tokio::join!(first, second);

	assert!(first);
	assert!(!second);
	assert_eq!(calls.get(), 1);
	assert_eq!(wizard.current_section(), 1);
}

#[rstest]
#[tokio::test]
async fn test_cancel_discards_pending_submission_silently() {
	let reported = Rc::new(Cell::new(0));
	let counter = Rc::clone(&reported);
	let store = Arc::new(InMemoryDraftStore::new());
	let wizard = WizardController::new(
		"abandon",
		sections(&["only"]),
		person_form(),
		always_valid,
		|_record: TransportRecord| async move {
			futures::future::pending::<()>().await;
			let output: ActionOutput<Value> = Ok(ActionResult::succeeded(""));
			output
		},
		store.clone(),
	)
	.unwrap()
	.on_error(move |_message: &str| counter.set(counter.get() + 1));
	wizard.bind_input("name").on_change("Alex");

	let pending = wizard.submit();
	let cancel = async {
		tokio::task::yield_now().await;
		assert_eq!(wizard.status(), WizardStatus::Submitting);
		wizard.cancel();
	};
	let (result, ()) = tokio::join!(pending, cancel);

	assert!(!result.success);
	assert_eq!(reported.get(), 0);
	assert_eq!(wizard.status(), WizardStatus::Editing(0));
	assert_eq!(wizard.context().read("name"), Some(json!("")));
	assert!(store.is_empty());
	assert!(!wizard.is_busy());
}

#[rstest]
#[tokio::test]
async fn test_cancel_pending_submission_reports_once() {
	let reported = Rc::new(RefCell::new(Vec::new()));
	let sink = Rc::clone(&reported);
	let wizard = WizardController::new(
		"abort-submit",
		sections(&["only"]),
		person_form(),
		always_valid,
		|_record: TransportRecord| async move {
			futures::future::pending::<()>().await;
			let output: ActionOutput<Value> = Ok(ActionResult::succeeded(""));
			output
		},
		Arc::new(InMemoryDraftStore::new()),
	)
	.unwrap()
	.on_error(move |message: &str| sink.borrow_mut().push(message.to_string()));

	let pending = wizard.submit();
	let cancel = async {
		tokio::task::yield_now().await;
		assert!(wizard.cancel_pending());
	};
	let (result, ()) = tokio::join!(pending, cancel);

	assert!(!result.success);
	assert_eq!(*reported.borrow(), vec!["Operation was cancelled".to_string()]);
	assert!(matches!(wizard.status(), WizardStatus::Blocked { section: 0, .. }));
}

#[rstest]
fn test_expired_draft_is_discarded() {
	let store = Arc::new(InMemoryDraftStore::new());
	let stale = Draft {
		state: json!({"name": "Old", "age": 1}),
		section_index: 1,
		saved_at: Utc::now() - ChronoDuration::days(30),
	};
	store.set("stale", &stale).unwrap();
	let settings = FormSettings::default().with_draft_max_age(Duration::from_secs(24 * 60 * 60));
	let form = FormContext::with_settings(
		&Person {
			name: String::new(),
			age: 0,
		},
		settings,
	)
	.unwrap();

	let wizard = WizardController::new(
		"stale",
		sections(&["details", "review"]),
		form,
		always_valid,
		accept,
		store.clone(),
	)
	.unwrap();

	assert_eq!(wizard.current_section(), 0);
	assert_eq!(wizard.context().read("name"), Some(json!("")));
	assert!(store.is_empty());
}

#[rstest]
#[tokio::test]
async fn test_file_store_resumes_across_instances() {
	let dir = tempfile::tempdir().unwrap();
	let store: Arc<dyn DraftStore> = Arc::new(FileDraftStore::new(dir.path()).unwrap());
	let names = sections(&["details", "review"]);

	let first = WizardController::new(
		"contact/12",
		names.clone(),
		person_form(),
		require_name,
		accept,
		Arc::clone(&store),
	)
	.unwrap();
	first.bind_input("name").on_change("Alex");
	assert!(first.next().await);

	let resumed = WizardController::new(
		"contact/12",
		names,
		person_form(),
		require_name,
		accept,
		Arc::clone(&store),
	)
	.unwrap();
	assert_eq!(resumed.current_section(), 1);
	assert_eq!(resumed.context().read("name"), Some(json!("Alex")));
	assert!(resumed.is_last_section());

	assert!(resumed.submit().await.success);
	assert_eq!(store.get("contact/12").unwrap(), None);
}

#[rstest]
#[tokio::test]
async fn test_section_scope_binds_within_section() {
	let form = FormContext::new(&json!({
		"site": {"name": "", "address": {"line1": ""}},
		"contact": {"email": ""},
	}))
	.unwrap();
	let wizard = WizardController::new(
		"scoped",
		sections(&["site", "contact"]),
		form,
		|section: usize, state: FormState<Value>| {
			let mut errors = ErrorMap::new();
			if section == 0 && state.read("site.name") == Some(&json!("")) {
				errors.push("site.name", "Site name is required");
			}
			ready(errors)
		},
		accept,
		Arc::new(InMemoryDraftStore::new()),
	)
	.unwrap();

	assert!(!wizard.next().await);
	let site = wizard.section_scope("site").unwrap();
	assert!(site.errors().contains("name"));

	site.bind_input("name").on_change("Depot 4");
	assert!(!site.has_errors());
	assert!(wizard.next().await);
	assert_eq!(wizard.current_section_name(), "contact");
	assert_eq!(wizard.progress(), 100.0);
}

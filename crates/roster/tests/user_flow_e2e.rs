#![forbid(unsafe_code)]

//! End-to-end tests for the user administration flow.
//!
//! # Invariants tested
//!
//! 1. An invalid form never reaches the store and queues no notification.
//! 2. A created user is persisted, announced and resets the form.
//! 3. An edit keeps `created_at`, stamps `updated_at` and rebases the form.
//! 4. Domain-only failures (no role selected) surface as form errors.
//! 5. A new session on the same file sees every committed change.
//! 6. Invalid environment settings refuse to build a session.

use std::sync::Arc;
use std::time::Duration;

use roster::MemoryStorage;
use roster::prelude::*;
use roster::session::fields;
use roster_core::ManualClock;

fn session_at(path: &std::path::Path) -> Session {
    Session::create(RosterConfig::default().with_state_path(path))
}

fn fill(form: &mut FormController, name: &str, email: &str) {
    form.set_value(fields::NAME, name);
    form.set_value(fields::EMAIL, email);
    form.set_value(fields::PHONE, "+351 912 345 678");
    form.toggle_list_item(fields::USER_TYPES, "UI/UX Designer");
}

#[test]
fn invalid_form_never_reaches_store() {
    let mut session = Session::create(RosterConfig::default());
    let mut form = session.user_form(None);
    form.set_value(fields::EMAIL, "ana@");

    let outcome = pollster::block_on(session.submit_user_form(&mut form, None));

    assert_eq!(outcome, SubmitOutcome::Invalid);
    assert_eq!(session.store().users().len(), 2);
    assert!(session.notifications().is_empty());
    assert!(form.error(fields::NAME).is_some());
    assert!(form.error(fields::EMAIL).is_some());
    assert!(!form.is_submitting());
}

#[test]
fn create_then_edit_then_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roster.json");

    let mut session = session_at(&path);
    let mut form = session.user_form(None);
    fill(&mut form, "Ana Costa", "ana@example.pt");
    let outcome = pollster::block_on(session.submit_user_form(&mut form, None));
    assert!(outcome.is_submitted());
    assert!(form.is_pristine());
    assert_eq!(form.values().text(fields::NAME), "");

    let ana = session.store().recent(1)[0].clone();
    assert_eq!(ana.name, "Ana Costa");

    let mut edit = session.edit_user(&ana.id).unwrap();
    edit.set_value(fields::NAME, "Ana Maria Costa");
    let outcome = pollster::block_on(session.submit_user_form(&mut edit, Some(&ana.id)));
    assert!(outcome.is_submitted());
    assert!(edit.is_pristine());
    assert_eq!(edit.values().text(fields::NAME), "Ana Maria Costa");
    assert!(session.store().current_user().is_none());

    let texts: Vec<_> = session
        .notifications()
        .iter()
        .map(|n| n.message.clone())
        .collect();
    assert_eq!(texts, vec![messages::USER_CREATED, messages::USER_UPDATED]);
    session.dispose().unwrap();

    let reopened = session_at(&path);
    let stored = reopened.store().find(&ana.id).unwrap();
    assert_eq!(stored.name, "Ana Maria Costa");
    assert_eq!(stored.created_at, ana.created_at);
    assert!(stored.updated_at.is_some());
    assert_eq!(reopened.store().users().len(), 3);
}

#[test]
fn missing_role_becomes_form_error() {
    let mut session = Session::with_parts(
        RosterConfig::default(),
        Arc::new(MemoryStorage::new()),
        Arc::new(ManualClock::new(0)),
    );
    let mut form = session.user_form(None);
    fill(&mut form, "Rui", "rui@example.pt");
    form.toggle_list_item(fields::USER_TYPES, "UI/UX Designer");

    let outcome = pollster::block_on(session.submit_user_form(&mut form, None));

    assert!(matches!(outcome, SubmitOutcome::Failed(_)));
    assert_eq!(
        form.get_field_props(fields::USER_TYPES).error.as_deref(),
        Some("Selecione pelo menos um tipo de utilizador")
    );
    assert_eq!(form.values().text(fields::NAME), "Rui");
    let last = session.notifications().iter().last().unwrap();
    assert_eq!(last.kind, NotificationKind::Error);
    assert_eq!(last.message, messages::VALIDATION_ERROR);
}

#[test]
fn notifications_expire_on_tick() {
    let mut session = Session::create(RosterConfig::default());
    session.delete_user(&UserId::new("1")).unwrap();
    assert!(session.tick(Duration::from_millis(4999)).is_empty());
    assert_eq!(session.tick(Duration::from_millis(1)).len(), 1);
}

#[test]
fn invalid_env_is_rejected() {
    let err = Session::from_env_with(|key| match key {
        "ROSTER_NOTIFICATION_CAPACITY" => Some("0".to_string()),
        _ => None,
    })
    .unwrap_err();
    assert!(matches!(err, Error::Config(ref errors) if errors.len() == 1));
    assert!(err.to_string().contains("notification_capacity=0"));
}

#[test]
fn env_session_uses_settings() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let path_str = path.to_string_lossy().into_owned();
    let session = Session::from_env_with(|key| match key {
        "ROSTER_STATE_PATH" => Some(path_str.clone()),
        "ROSTER_NOTIFICATION_MS" => Some("1000".to_string()),
        _ => None,
    })
    .unwrap();
    assert_eq!(session.config().state_path.as_deref(), Some(path.as_path()));
    assert_eq!(
        session.notifications().default_duration(),
        Duration::from_millis(1000)
    );
}

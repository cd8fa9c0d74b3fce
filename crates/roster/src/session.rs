//! User administration session.
//!
//! A [`Session`] owns the [`UserStore`], the [`NotificationQueue`] and the
//! [`RosterConfig`] they were built from. It supplies the user form, turns a
//! submitted form into a store mutation and queues the matching
//! notification.
//!
//! # Example
//!
//! ```
//! use roster::prelude::*;
//!
//! let mut session = Session::create(RosterConfig::default());
//! let mut form = session.user_form(None);
//! form.set_value("name", "Ana Costa");
//! form.set_value("email", "ana@example.pt");
//! form.set_value("phone", "+351 912 345 678");
//! form.toggle_list_item("userTypes", "Web Developer");
//!
//! let outcome = pollster::block_on(session.submit_user_form(&mut form, None));
//! assert!(outcome.is_submitted());
//! assert_eq!(session.store().users().len(), 3);
//! assert_eq!(
//!     session.notifications().iter().last().map(|n| n.message.as_str()),
//!     Some(messages::USER_CREATED)
//! );
//! session.dispose().unwrap();
//! ```

use std::sync::Arc;
use std::time::Duration;

use roster_core::constants::messages;
use roster_core::{Clock, SystemClock, UserDraft, UserId, UserRecord};
use roster_forms::form::{FormController, SubmitOutcome};
use roster_forms::validation::{FieldValue, FormRules, FormValues, RuleSet};
use roster_runtime::{
    KeyValueStorage, NotificationId, NotificationQueue, RosterConfig, StorageResult, StoreError,
    UserStore,
};

/// Form field names shared by the user form and [`draft_from_values`].
pub mod fields {
    pub const NAME: &str = "name";
    pub const EMAIL: &str = "email";
    pub const PHONE: &str = "phone";
    pub const PASSWORD: &str = "password";
    pub const USER_TYPES: &str = "userTypes";
}

/// Initial values of the user form, prefilled from `existing` when editing.
#[must_use]
pub fn user_form_values(existing: Option<&UserRecord>) -> FormValues {
    match existing {
        Some(user) => FormValues::new()
            .with(fields::NAME, user.name.as_str())
            .with(fields::USER_TYPES, FieldValue::List(user.user_types.clone()))
            .with(fields::EMAIL, user.email.as_str())
            .with(fields::PASSWORD, user.password.as_str())
            .with(fields::PHONE, user.phone.as_str()),
        None => FormValues::new()
            .with(fields::NAME, "")
            .with(fields::USER_TYPES, FieldValue::List(Vec::new()))
            .with(fields::EMAIL, "")
            .with(fields::PASSWORD, "")
            .with(fields::PHONE, ""),
    }
}

/// Inline rules of the user form.
///
/// Role tags and the exact phone shape are left to the domain gate.
#[must_use]
pub fn user_form_rules(config: &RosterConfig) -> FormRules {
    FormRules::new()
        .field(fields::NAME, RuleSet::builder().required().build())
        .field(fields::EMAIL, RuleSet::builder().required().email().build())
        .field(
            fields::PHONE,
            RuleSet::builder()
                .required()
                .phone_min_digits(config.phone_min_digits)
                .build(),
        )
}

/// Read a [`UserDraft`] out of submitted form values. Missing fields are empty.
#[must_use]
pub fn draft_from_values(values: &FormValues) -> UserDraft {
    UserDraft {
        name: values.text(fields::NAME).to_string(),
        email: values.text(fields::EMAIL).to_string(),
        phone: values.text(fields::PHONE).to_string(),
        password: values.text(fields::PASSWORD).to_string(),
        user_types: values.list(fields::USER_TYPES).to_vec(),
    }
}

/// Store, notifications and config for one admin session.
#[derive(Debug)]
pub struct Session {
    config: RosterConfig,
    store: UserStore,
    notifications: NotificationQueue,
}

impl Session {
    /// Open the storage `config` points at and load the store.
    #[must_use]
    pub fn create(config: RosterConfig) -> Self {
        let storage = config.open_storage();
        Self::with_parts(config, storage, Arc::new(SystemClock))
    }

    /// Build a session from `ROSTER_*` environment variables.
    ///
    /// Unlike [`RosterConfig::from_env`], any invalid setting is an error.
    pub fn from_env() -> crate::Result<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// [`Self::from_env`] over an arbitrary variable source.
    pub fn from_env_with<F>(get: F) -> crate::Result<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let parsed = RosterConfig::from_env_with(get);
        if !parsed.errors.is_empty() {
            return Err(crate::Error::Config(parsed.errors));
        }
        Ok(Self::create(parsed.config))
    }

    /// Build a session over explicit storage and clock.
    #[must_use]
    pub fn with_parts(
        config: RosterConfig,
        storage: Arc<dyn KeyValueStorage>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store = UserStore::create(&config, storage, Arc::clone(&clock));
        let notifications = NotificationQueue::from_config(&config).with_clock(clock);
        tracing::debug!(users = store.users().len(), "session created");
        Self {
            config,
            store,
            notifications,
        }
    }

    /// Flush pending store writes.
    pub fn dispose(self) -> StorageResult<()> {
        self.store.dispose()
    }

    #[must_use]
    pub fn config(&self) -> &RosterConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &UserStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut UserStore {
        &mut self.store
    }

    #[must_use]
    pub fn notifications(&self) -> &NotificationQueue {
        &self.notifications
    }

    pub fn notifications_mut(&mut self) -> &mut NotificationQueue {
        &mut self.notifications
    }

    /// A fresh user form, prefilled from `existing` when editing.
    #[must_use]
    pub fn user_form(&self, existing: Option<&UserRecord>) -> FormController {
        FormController::new(user_form_values(existing), user_form_rules(&self.config))
    }

    /// Select `id` as the current user and return a form prefilled with it.
    pub fn edit_user(&mut self, id: &UserId) -> Result<FormController, StoreError> {
        self.store.set_current_user(id)?;
        Ok(self.user_form(self.store.current_user()))
    }

    /// Create (`editing` is `None`) or update a user from form values, and
    /// queue the outcome notification.
    pub fn save_user(
        &mut self,
        editing: Option<&UserId>,
        values: &FormValues,
    ) -> Result<UserRecord, StoreError> {
        let draft = draft_from_values(values);
        let (result, success) = match editing {
            Some(id) => (self.store.update_user(id, draft), messages::USER_UPDATED),
            None => (self.store.add_user(draft), messages::USER_CREATED),
        };
        match &result {
            Ok(user) => {
                tracing::debug!(id = %user.id, updated = editing.is_some(), "user saved");
                self.notifications.success(success);
            }
            Err(StoreError::Validation(errors)) => {
                tracing::debug!(errors = %errors, "user rejected by validation");
                self.notifications.error(messages::VALIDATION_ERROR);
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to save user");
                self.notifications.error(messages::GENERIC_ERROR);
            }
        }
        result
    }

    /// Submit `form` through [`Self::save_user`].
    ///
    /// A created user resets the form; an updated one becomes its new
    /// baseline. Domain validation errors are copied into the form.
    pub async fn submit_user_form(
        &mut self,
        form: &mut FormController,
        editing: Option<&UserId>,
    ) -> SubmitOutcome {
        let mut saved = None;
        let mut failure = None;
        let outcome = form
            .submit(|values| {
                let result = self
                    .save_user(editing, &values)
                    .map(|user| saved = Some(user))
                    .map_err(|e| {
                        failure = Some(e.clone());
                        e
                    });
                std::future::ready(result)
            })
            .await;

        match (&outcome, saved, failure) {
            (SubmitOutcome::Submitted, Some(user), _) => match editing {
                Some(_) => form.reinitialize(user_form_values(Some(&user))),
                None => form.reset_form(),
            },
            (_, _, Some(StoreError::Validation(errors))) => {
                form.set_errors(errors.iter());
            }
            _ => {}
        }
        outcome
    }

    /// Delete `id` and queue the outcome notification.
    pub fn delete_user(&mut self, id: &UserId) -> Result<(), StoreError> {
        let result = self.store.delete_user(id);
        match &result {
            Ok(()) => {
                self.notifications.success(messages::USER_DELETED);
            }
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "failed to delete user");
                self.notifications.error(messages::GENERIC_ERROR);
            }
        }
        result
    }

    /// Advance notification countdowns.
    pub fn tick(&mut self, elapsed: Duration) -> Vec<NotificationId> {
        self.notifications.tick(elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_core::ManualClock;
    use roster_runtime::{MemoryStorage, NotificationKind};

    fn session() -> Session {
        Session::with_parts(
            RosterConfig::default(),
            Arc::new(MemoryStorage::new()),
            Arc::new(ManualClock::new(1_760_000_000_000)),
        )
    }

    fn filled(form: &mut FormController) {
        form.set_value(fields::NAME, "Ana Costa");
        form.set_value(fields::EMAIL, "ana@example.pt");
        form.set_value(fields::PHONE, "+351 912 345 678");
        form.toggle_list_item(fields::USER_TYPES, "Web Developer");
    }

    #[test]
    fn new_form_is_empty_and_pristine() {
        let form = session().user_form(None);
        assert_eq!(form.values().text(fields::NAME), "");
        assert!(form.values().list(fields::USER_TYPES).is_empty());
        assert!(form.is_pristine());
    }

    #[test]
    fn edit_form_is_prefilled() {
        let mut session = session();
        let form = session.edit_user(&UserId::new("1")).unwrap();
        assert_eq!(form.values().text(fields::NAME), "Augusto Chagas");
        assert_eq!(
            form.values().list(fields::USER_TYPES),
            ["Web Developer", "UI/UX Designer"]
        );
        assert!(session.store().current_user().is_some());
    }

    #[test]
    fn draft_reads_every_field() {
        let values = FormValues::new()
            .with(fields::NAME, "Ana")
            .with(fields::EMAIL, "a@b.pt")
            .with(fields::PHONE, "912345678")
            .with(fields::PASSWORD, "x")
            .with(fields::USER_TYPES, FieldValue::List(vec!["Project Manager".into()]));
        let draft = draft_from_values(&values);
        assert_eq!(draft.name, "Ana");
        assert_eq!(draft.password, "x");
        assert_eq!(draft.user_types, vec!["Project Manager".to_string()]);
        assert_eq!(draft_from_values(&FormValues::new()), UserDraft::default());
    }

    #[test]
    fn form_rules_follow_config() {
        let config = RosterConfig::default().with_phone_min_digits(9);
        let mut form = FormController::new(user_form_values(None), user_form_rules(&config));
        form.set_value(fields::PHONE, "912345678");
        assert_eq!(form.validate_field(fields::PHONE), None);
    }

    #[test]
    fn save_creates_and_notifies() {
        let mut session = session();
        let mut form = session.user_form(None);
        filled(&mut form);
        let user = session.save_user(None, form.values()).unwrap();
        assert_eq!(session.store().find(&user.id), Some(&user));
        let last = session.notifications().iter().last().unwrap();
        assert_eq!(last.kind, NotificationKind::Success);
        assert_eq!(last.message, messages::USER_CREATED);
    }

    #[test]
    fn save_without_roles_reports_validation_error() {
        let mut session = session();
        let mut form = session.user_form(None);
        filled(&mut form);
        form.toggle_list_item(fields::USER_TYPES, "Web Developer");
        let err = session.save_user(None, form.values()).unwrap_err();
        assert!(err.field_errors().is_some_and(|e| e.get("userTypes").is_some()));
        let last = session.notifications().iter().last().unwrap();
        assert_eq!(last.message, messages::VALIDATION_ERROR);
        assert_eq!(session.store().users().len(), 2);
    }

    #[test]
    fn update_missing_user_is_generic_error() {
        let mut session = session();
        let mut form = session.user_form(None);
        filled(&mut form);
        let err = session
            .save_user(Some(&UserId::new("gone")), form.values())
            .unwrap_err();
        assert_eq!(err, StoreError::NotFound(UserId::new("gone")));
        let last = session.notifications().iter().last().unwrap();
        assert_eq!(last.message, messages::GENERIC_ERROR);
    }

    #[test]
    fn delete_notifies_both_ways() {
        let mut session = session();
        session.delete_user(&UserId::new("2")).unwrap();
        assert!(session.delete_user(&UserId::new("2")).is_err());
        let texts: Vec<_> = session
            .notifications()
            .iter()
            .map(|n| n.message.as_str())
            .collect();
        assert_eq!(texts, vec![messages::USER_DELETED, messages::GENERIC_ERROR]);
    }

    #[test]
    fn tick_expires_notifications() {
        let mut session = session();
        session.delete_user(&UserId::new("1")).unwrap();
        assert_eq!(session.tick(Duration::from_millis(5000)).len(), 1);
        assert!(session.notifications().is_empty());
    }
}

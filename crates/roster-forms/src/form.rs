#![forbid(unsafe_code)]

//! Form state controller.
//!
//! [`FormController`] owns a form's values, per-field errors, touched set and
//! submitting flag. UI collaborators bind fields through
//! [`FormController::get_field_props`] and feed the returned [`FormMsg`]s
//! back through [`FormController::update`].
//!
//! # Invariants
//!
//! 1. `errors` only holds fields whose last validation pass failed.
//! 2. `touched` only grows until [`FormController::reset_form`].
//! 3. A field's error is surfaced through [`FieldProps`] only once touched.
//! 4. [`FormController::submit`] never runs the callback on an invalid form
//!    and always clears `is_submitting` once the callback settles or the
//!    submit future is dropped.
//!
//! # Example
//!
//! ```rust
//! use roster_forms::form::{FormController, SubmitOutcome};
//! use roster_forms::validation::{FormRules, FormValues, RuleSet};
//!
//! let mut form = FormController::new(
//!     FormValues::new().with("name", ""),
//!     FormRules::new().field("name", RuleSet::builder().required().build()),
//! );
//!
//! let outcome = pollster::block_on(form.submit(|_| async { Ok::<(), String>(()) }));
//! assert_eq!(outcome, SubmitOutcome::Invalid);
//! assert_eq!(form.error("name"), Some("Este campo é obrigatório"));
//!
//! form.set_value("name", "Ana");
//! let outcome = pollster::block_on(form.submit(|values| async move {
//!     assert_eq!(values.text("name"), "Ana");
//!     Ok::<(), String>(())
//! }));
//! assert_eq!(outcome, SubmitOutcome::Submitted);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::future::Future;

use crate::validation::{FieldValue, FormRules, FormValues, Validator};

/// Receives the message of a failed submit callback.
pub type ErrorReporter = Box<dyn Fn(&str) + Send + Sync>;

// ---------------------------------------------------------------------------
// Policies and outcomes
// ---------------------------------------------------------------------------

/// What happens to a field's error when its value changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditPolicy {
    /// Drop the error without re-validating. The field may be invalid but
    /// show nothing until the next blur or submit.
    #[default]
    ClearError,
    /// Keep the error until the next explicit validation.
    Retain,
    /// Re-run the field's rules on every change.
    Revalidate,
}

/// How a [`FormController::submit`] call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Validation failed; the callback was not run.
    Invalid,
    /// The callback completed successfully.
    Submitted,
    /// The callback returned an error, already passed to the reporter.
    Failed(String),
}

impl SubmitOutcome {
    #[must_use]
    pub fn is_submitted(&self) -> bool {
        matches!(self, Self::Submitted)
    }
}

/// A UI event for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMsg {
    Change { field: String, value: FieldValue },
    Blur { field: String },
}

/// Read model for binding one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldProps {
    pub name: String,
    /// Current value; missing fields read as empty text.
    pub value: FieldValue,
    /// Error message, only once the field is touched.
    pub error: Option<String>,
}

impl FieldProps {
    /// Message for a value change on this field.
    #[must_use]
    pub fn on_change(&self, value: impl Into<FieldValue>) -> FormMsg {
        FormMsg::Change {
            field: self.name.clone(),
            value: value.into(),
        }
    }

    /// Message for focus leaving this field.
    #[must_use]
    pub fn on_blur(&self) -> FormMsg {
        FormMsg::Blur {
            field: self.name.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// FormController
// ---------------------------------------------------------------------------

/// Clears the submitting flag when dropped.
struct SubmittingGuard<'a>(&'a mut bool);

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

/// Values, errors and touched state of one form.
pub struct FormController {
    initial: FormValues,
    values: FormValues,
    errors: BTreeMap<String, String>,
    touched: BTreeSet<String>,
    is_submitting: bool,
    rules: FormRules,
    policy: EditPolicy,
    reporter: Option<ErrorReporter>,
}

impl FormController {
    /// Create a controller with the default [`EditPolicy::ClearError`].
    #[must_use]
    pub fn new(initial: FormValues, rules: FormRules) -> Self {
        Self {
            values: initial.clone(),
            initial,
            errors: BTreeMap::new(),
            touched: BTreeSet::new(),
            is_submitting: false,
            rules,
            policy: EditPolicy::default(),
            reporter: None,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: EditPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Route submit callback failures to `reporter` instead of the log.
    #[must_use]
    pub fn with_error_reporter(mut self, reporter: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.reporter = Some(Box::new(reporter));
        self
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn values(&self) -> &FormValues {
        &self.values
    }

    #[must_use]
    pub fn value(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    /// Current error of `field`, regardless of touched state.
    #[must_use]
    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    /// All current errors, keyed by field.
    #[must_use]
    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    #[must_use]
    pub fn is_touched(&self, field: &str) -> bool {
        self.touched.contains(field)
    }

    /// Touched fields in name order.
    #[must_use]
    pub fn touched_fields(&self) -> Vec<&str> {
        self.touched.iter().map(String::as_str).collect()
    }

    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.is_submitting
    }

    #[must_use]
    pub fn policy(&self) -> EditPolicy {
        self.policy
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// No ruled field currently carries an error.
    ///
    /// This reflects the last validation pass, not a fresh one: an untouched
    /// form with failing values still reports valid until validated.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.rules.field_names().all(|f| !self.errors.contains_key(f))
    }

    // -------------------------------------------------------------------------
    // Dirty tracking
    // -------------------------------------------------------------------------

    /// Whether `field` differs from its initial value.
    #[must_use]
    pub fn is_dirty(&self, field: &str) -> bool {
        self.values.get(field) != self.initial.get(field)
    }

    /// Fields whose value differs from the initial one, in name order.
    #[must_use]
    pub fn dirty_fields(&self) -> Vec<&str> {
        let names: BTreeSet<&str> = self
            .values
            .field_names()
            .chain(self.initial.field_names())
            .collect();
        names.into_iter().filter(|f| self.is_dirty(f)).collect()
    }

    /// No field touched and no value changed.
    #[must_use]
    pub fn is_pristine(&self) -> bool {
        self.touched.is_empty() && self.dirty_fields().is_empty()
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    /// Apply a [`FormMsg`] produced by [`FieldProps`].
    pub fn update(&mut self, msg: FormMsg) {
        match msg {
            FormMsg::Change { field, value } => self.set_value(field, value),
            FormMsg::Blur { field } => self.handle_blur(&field),
        }
    }

    /// Store a new value and apply the [`EditPolicy`] to its error.
    pub fn set_value(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        let field = field.into();
        self.values.insert(field.clone(), value);
        match self.policy {
            EditPolicy::ClearError => {
                self.errors.remove(&field);
            }
            EditPolicy::Retain => {}
            EditPolicy::Revalidate => {
                self.validate_field(&field);
            }
        }
    }

    /// Add `item` to a list field if absent, remove it if present.
    ///
    /// A missing or non-list field becomes a one-item list.
    pub fn toggle_list_item(&mut self, field: &str, item: &str) {
        let mut items = match self.values.get_mut(field) {
            Some(FieldValue::List(items)) => std::mem::take(items),
            _ => Vec::new(),
        };
        if let Some(pos) = items.iter().position(|i| i == item) {
            items.remove(pos);
        } else {
            items.push(item.to_string());
        }
        self.set_value(field, FieldValue::List(items));
    }

    /// Mark `field` touched and validate it if it has rules.
    pub fn handle_blur(&mut self, field: &str) {
        self.touched.insert(field.to_string());
        if self.rules.has_rules(field) {
            self.validate_field(field);
        }
    }

    /// Run `field`'s rules, store or clear its error, and return it.
    ///
    /// Fields without rules are always valid and leave `errors` untouched.
    pub fn validate_field(&mut self, field: &str) -> Option<String> {
        let rules = self.rules.get(field)?;
        let value = self.values.get(field).cloned().unwrap_or_default();
        match rules.first_error(&value, &self.values) {
            Some(message) => {
                self.errors.insert(field.to_string(), message.clone());
                Some(message)
            }
            None => {
                self.errors.remove(field);
                None
            }
        }
    }

    /// Validate every ruled field and replace the error map in one step.
    pub fn validate_form(&mut self) -> bool {
        let empty = FieldValue::default();
        let errors: BTreeMap<String, String> = self
            .rules
            .field_names()
            .filter_map(|field| {
                let rules = self.rules.get(field)?;
                let value = self.values.get(field).unwrap_or(&empty);
                rules
                    .validate(value, &self.values)
                    .error_message()
                    .map(|m| (field.to_string(), m))
            })
            .collect();
        let valid = errors.is_empty();
        if !valid {
            tracing::debug!(failed = errors.len(), "form validation failed");
        }
        self.errors = errors;
        valid
    }

    /// Replace the error map with errors found outside the field rules.
    ///
    /// The fields are marked touched so their bindings show the errors.
    pub fn set_errors<I, K, V>(&mut self, errors: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.errors = errors
            .into_iter()
            .map(|(field, message)| (field.into(), message.into()))
            .collect();
        self.touched.extend(self.errors.keys().cloned());
    }

    /// Restore initial values and clear errors, touched and submitting.
    pub fn reset_form(&mut self) {
        self.values = self.initial.clone();
        self.errors.clear();
        self.touched.clear();
        self.is_submitting = false;
    }

    /// Make the current values the new baseline for dirty tracking and reset.
    pub fn reinitialize(&mut self, initial: FormValues) {
        self.initial = initial;
        self.reset_form();
    }

    /// Binding data for `field`.
    #[must_use]
    pub fn get_field_props(&self, field: &str) -> FieldProps {
        FieldProps {
            name: field.to_string(),
            value: self.values.get(field).cloned().unwrap_or_default(),
            error: if self.touched.contains(field) {
                self.errors.get(field).cloned()
            } else {
                None
            },
        }
    }

    // -------------------------------------------------------------------------
    // Submission
    // -------------------------------------------------------------------------

    /// First half of a submit: touch every ruled field and validate.
    ///
    /// Returns a snapshot of the values and sets `is_submitting` when valid.
    /// A second call while submitting is not rejected; check
    /// [`Self::is_submitting`] first.
    pub fn begin_submit(&mut self) -> Option<FormValues> {
        let ruled: Vec<String> = self.rules.field_names().map(str::to_string).collect();
        self.touched.extend(ruled);
        if !self.validate_form() {
            return None;
        }
        self.is_submitting = true;
        Some(self.values.clone())
    }

    /// Second half of a submit: clear `is_submitting`.
    pub fn finish_submit(&mut self) {
        self.is_submitting = false;
    }

    /// Validate and, when valid, await `on_submit` with a snapshot of the
    /// values.
    ///
    /// Callback errors go to the error reporter (or `tracing::error!`) and
    /// come back as [`SubmitOutcome::Failed`].
    pub async fn submit<F, Fut, E>(&mut self, on_submit: F) -> SubmitOutcome
    where
        F: FnOnce(FormValues) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: fmt::Display,
    {
        let Some(values) = self.begin_submit() else {
            return SubmitOutcome::Invalid;
        };
        let result = {
            // Cleared on completion and when the future is dropped mid-await.
            let _submitting = SubmittingGuard(&mut self.is_submitting);
            on_submit(values).await
        };
        match result {
            Ok(()) => SubmitOutcome::Submitted,
            Err(err) => {
                let message = err.to_string();
                self.report_error(&message);
                SubmitOutcome::Failed(message)
            }
        }
    }

    fn report_error(&self, message: &str) {
        match &self.reporter {
            Some(reporter) => reporter(message),
            None => tracing::error!(error = %message, "form submission error"),
        }
    }
}

impl fmt::Debug for FormController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormController")
            .field("values", &self.values)
            .field("errors", &self.errors)
            .field("touched", &self.touched)
            .field("is_submitting", &self.is_submitting)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

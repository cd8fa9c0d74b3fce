#![forbid(unsafe_code)]

//! Core validation types and built-in rules.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

// ---------------------------------------------------------------------------
// Error Codes (for i18n lookup)
// ---------------------------------------------------------------------------

/// Error code for required field validation.
pub const ERROR_CODE_REQUIRED: &str = "required";
/// Error code for email validation.
pub const ERROR_CODE_EMAIL: &str = "email";
/// Error code for phone validation.
pub const ERROR_CODE_PHONE: &str = "phone";
/// Error code for minimum length validation.
pub const ERROR_CODE_MIN_LENGTH: &str = "too_short";
/// Error code for maximum length validation.
pub const ERROR_CODE_MAX_LENGTH: &str = "too_long";
/// Error code for closure rules.
pub const ERROR_CODE_CUSTOM: &str = "custom";
/// Error code produced by [`Not`].
pub const ERROR_CODE_NOT: &str = "not";

const MSG_REQUIRED: &str = "Este campo é obrigatório";
const MSG_EMAIL: &str = "Email inválido";
const MSG_PHONE: &str = "Telefone inválido";
const MSG_MIN_LENGTH: &str = "Mínimo de {min} caracteres";
const MSG_MAX_LENGTH: &str = "Máximo de {max} caracteres";

/// Digit count required by [`Phone::new`].
pub const DEFAULT_PHONE_MIN_DIGITS: usize = 10;

// ---------------------------------------------------------------------------
// FieldValue / FormValues
// ---------------------------------------------------------------------------

/// The value held by one form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Text input.
    Text(String),
    /// Single checkbox.
    Bool(bool),
    /// Checkbox group or multi-select.
    List(Vec<String>),
}

impl FieldValue {
    /// An empty text value.
    #[must_use]
    pub fn empty_text() -> Self {
        Self::Text(String::new())
    }

    /// Borrow the text, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the items, if this is a list value.
    #[must_use]
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Whether the value counts as "not filled in".
    ///
    /// Empty text, `false` and empty lists are empty. Whitespace-only text is
    /// not empty here; [`Required`] trims separately.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::Bool(b) => !b,
            Self::List(items) => items.is_empty(),
        }
    }
}

impl Default for FieldValue {
    fn default() -> Self {
        Self::empty_text()
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        Self::List(items)
    }
}

/// Snapshot of every field value, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues(BTreeMap<String, FieldValue>);

impl FormValues {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(field.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    /// Text of `field`, or `""` when missing or not text.
    #[must_use]
    pub fn text(&self, field: &str) -> &str {
        self.get(field).and_then(FieldValue::as_text).unwrap_or("")
    }

    /// Items of `field`, or an empty slice when missing or not a list.
    #[must_use]
    pub fn list(&self, field: &str) -> &[String] {
        self.get(field).and_then(FieldValue::as_list).unwrap_or(&[])
    }

    /// Checkbox state of `field`; missing or non-bool is `false`.
    #[must_use]
    pub fn flag(&self, field: &str) -> bool {
        matches!(self.get(field), Some(FieldValue::Bool(true)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub(crate) fn get_mut(&mut self, field: &str) -> Option<&mut FieldValue> {
        self.0.get_mut(field)
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for FormValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// ValidationError
// ---------------------------------------------------------------------------

/// A validation error with code, message template and interpolation params.
///
/// # Example
///
/// ```rust
/// use roster_forms::validation::ValidationError;
///
/// let error = ValidationError::new("too_short", "Mínimo de {min} caracteres")
///     .with_param("min", 8);
///
/// assert_eq!(error.format_message(), "Mínimo de 8 caracteres");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Stable error code for programmatic handling and i18n.
    pub code: &'static str,
    /// Message template.
    pub message: String,
    /// Values substituted for `{key}` in the template.
    pub params: HashMap<String, String>,
}

impl ValidationError {
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            params: HashMap::new(),
        }
    }

    /// Add a parameter for message interpolation.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(key.into(), value.to_string());
        self
    }

    /// The template with every `{key}` replaced by its parameter.
    #[must_use]
    pub fn format_message(&self) -> String {
        let mut result = self.message.clone();
        for (key, value) in &self.params {
            result = result.replace(&format!("{{{key}}}"), value);
        }
        result
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_message())
    }
}

impl std::error::Error for ValidationError {}

// ---------------------------------------------------------------------------
// ValidationResult
// ---------------------------------------------------------------------------

/// The result of running one rule.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ValidationResult {
    #[default]
    Valid,
    Invalid(ValidationError),
}

impl ValidationResult {
    fn invalid(error: ValidationError) -> Self {
        Self::Invalid(error)
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    #[must_use]
    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid(_))
    }

    #[must_use]
    pub fn error(&self) -> Option<&ValidationError> {
        match self {
            Self::Valid => None,
            Self::Invalid(e) => Some(e),
        }
    }

    /// Formatted message when invalid.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.error().map(ValidationError::format_message)
    }

    /// First error wins.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match self {
            Self::Valid => other,
            Self::Invalid(_) => self,
        }
    }

    /// Valid if either side is valid.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        match self {
            Self::Valid => Self::Valid,
            Self::Invalid(_) => other,
        }
    }
}

// ---------------------------------------------------------------------------
// Validator Trait
// ---------------------------------------------------------------------------

/// A field rule.
///
/// Rules see the field's own value plus a snapshot of every value in the
/// form, so cross-field checks ("confirm password") are plain rules too.
///
/// Closures of shape `Fn(&FieldValue, &FormValues) -> Option<String>` are
/// rules: `Some(message)` means invalid.
///
/// ```rust
/// use roster_forms::validation::{FieldValue, FormValues, Validator};
///
/// let no_spaces = |value: &FieldValue, _: &FormValues| {
///     value
///         .as_text()
///         .filter(|s| s.contains(' '))
///         .map(|_| "Sem espaços".to_string())
/// };
///
/// let ctx = FormValues::new();
/// assert!(no_spaces.validate(&"ana".into(), &ctx).is_valid());
/// assert!(no_spaces.validate(&"a na".into(), &ctx).is_invalid());
/// ```
pub trait Validator: Send + Sync {
    /// Check `value` in the context of `values`.
    fn validate(&self, value: &FieldValue, values: &FormValues) -> ValidationResult;

    /// Default message template for this rule.
    fn error_message(&self) -> &str;
}

impl<F> Validator for F
where
    F: Fn(&FieldValue, &FormValues) -> Option<String> + Send + Sync,
{
    fn validate(&self, value: &FieldValue, values: &FormValues) -> ValidationResult {
        match self(value, values) {
            Some(message) => {
                ValidationResult::invalid(ValidationError::new(ERROR_CODE_CUSTOM, message))
            }
            None => ValidationResult::Valid,
        }
    }

    fn error_message(&self) -> &str {
        "Valor inválido"
    }
}

// ---------------------------------------------------------------------------
// Built-in Validators
// ---------------------------------------------------------------------------

/// Fails on empty or whitespace-only text, `false`, and empty lists.
#[derive(Debug, Clone, Default)]
pub struct Required {
    message: Option<String>,
}

impl Required {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the default message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl Validator for Required {
    fn validate(&self, value: &FieldValue, _values: &FormValues) -> ValidationResult {
        let missing = match value {
            FieldValue::Text(s) => s.trim().is_empty(),
            other => other.is_empty(),
        };
        if missing {
            ValidationResult::invalid(ValidationError::new(
                ERROR_CODE_REQUIRED,
                self.error_message(),
            ))
        } else {
            ValidationResult::Valid
        }
    }

    fn error_message(&self) -> &str {
        self.message.as_deref().unwrap_or(MSG_REQUIRED)
    }
}

/// Shape check for `local@domain.tld`, shared with the domain gate
/// [`roster_core::is_valid_email`].
///
/// Empty values pass; compose with [`Required`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Email;

impl Email {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Validator for Email {
    fn validate(&self, value: &FieldValue, _values: &FormValues) -> ValidationResult {
        match value.as_text() {
            Some(text) if !text.is_empty() && !roster_core::is_valid_email(text) => {
                ValidationResult::invalid(ValidationError::new(ERROR_CODE_EMAIL, MSG_EMAIL))
            }
            _ => ValidationResult::Valid,
        }
    }

    fn error_message(&self) -> &str {
        MSG_EMAIL
    }
}

/// Loose phone check for inline feedback.
///
/// Fails when the value has fewer than `min_digits` digits, or contains a
/// char other than digits, whitespace, `-`, `+`, `(`, `)`. Empty values pass.
#[derive(Debug, Clone, Copy)]
pub struct Phone {
    /// Minimum digit count.
    pub min_digits: usize,
}

impl Default for Phone {
    fn default() -> Self {
        Self::new()
    }
}

impl Phone {
    #[must_use]
    pub fn new() -> Self {
        Self {
            min_digits: DEFAULT_PHONE_MIN_DIGITS,
        }
    }

    #[must_use]
    pub fn min_digits(min_digits: usize) -> Self {
        Self { min_digits }
    }

    fn matches(&self, text: &str) -> bool {
        let allowed = text
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_whitespace() || matches!(c, '-' | '+' | '(' | ')'));
        let digits = text.chars().filter(char::is_ascii_digit).count();
        allowed && digits >= self.min_digits
    }
}

impl Validator for Phone {
    fn validate(&self, value: &FieldValue, _values: &FormValues) -> ValidationResult {
        match value.as_text() {
            Some(text) if !text.is_empty() && !self.matches(text) => ValidationResult::invalid(
                ValidationError::new(ERROR_CODE_PHONE, MSG_PHONE)
                    .with_param("min_digits", self.min_digits),
            ),
            _ => ValidationResult::Valid,
        }
    }

    fn error_message(&self) -> &str {
        MSG_PHONE
    }
}

/// Text must have at least `min` chars (Unicode scalar values).
#[derive(Debug, Clone, Copy)]
pub struct MinLength {
    pub min: usize,
}

impl MinLength {
    #[must_use]
    pub fn new(min: usize) -> Self {
        Self { min }
    }
}

impl Validator for MinLength {
    fn validate(&self, value: &FieldValue, _values: &FormValues) -> ValidationResult {
        let Some(text) = value.as_text().filter(|s| !s.is_empty()) else {
            return ValidationResult::Valid;
        };
        let len = text.chars().count();
        if len < self.min {
            ValidationResult::invalid(
                ValidationError::new(ERROR_CODE_MIN_LENGTH, MSG_MIN_LENGTH)
                    .with_param("min", self.min)
                    .with_param("actual", len),
            )
        } else {
            ValidationResult::Valid
        }
    }

    fn error_message(&self) -> &str {
        MSG_MIN_LENGTH
    }
}

/// Text must have at most `max` chars (Unicode scalar values).
#[derive(Debug, Clone, Copy)]
pub struct MaxLength {
    pub max: usize,
}

impl MaxLength {
    #[must_use]
    pub fn new(max: usize) -> Self {
        Self { max }
    }
}

impl Validator for MaxLength {
    fn validate(&self, value: &FieldValue, _values: &FormValues) -> ValidationResult {
        let Some(text) = value.as_text() else {
            return ValidationResult::Valid;
        };
        let len = text.chars().count();
        if len > self.max {
            ValidationResult::invalid(
                ValidationError::new(ERROR_CODE_MAX_LENGTH, MSG_MAX_LENGTH)
                    .with_param("max", self.max)
                    .with_param("actual", len),
            )
        } else {
            ValidationResult::Valid
        }
    }

    fn error_message(&self) -> &str {
        MSG_MAX_LENGTH
    }
}

// ---------------------------------------------------------------------------
// Composition Validators
// ---------------------------------------------------------------------------

/// Both rules must pass; the first failure is reported.
#[derive(Debug, Clone)]
pub struct And<A, B> {
    pub first: A,
    pub second: B,
}

impl<A, B> And<A, B> {
    #[must_use]
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: Validator, B: Validator> Validator for And<A, B> {
    fn validate(&self, value: &FieldValue, values: &FormValues) -> ValidationResult {
        match self.first.validate(value, values) {
            ValidationResult::Valid => self.second.validate(value, values),
            err => err,
        }
    }

    fn error_message(&self) -> &str {
        self.first.error_message()
    }
}

/// At least one rule must pass; otherwise the second failure is reported.
#[derive(Debug, Clone)]
pub struct Or<A, B> {
    pub first: A,
    pub second: B,
}

impl<A, B> Or<A, B> {
    #[must_use]
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: Validator, B: Validator> Validator for Or<A, B> {
    fn validate(&self, value: &FieldValue, values: &FormValues) -> ValidationResult {
        match self.first.validate(value, values) {
            ValidationResult::Valid => ValidationResult::Valid,
            _ => self.second.validate(value, values),
        }
    }

    fn error_message(&self) -> &str {
        self.second.error_message()
    }
}

/// Passes exactly when the inner rule fails.
#[derive(Debug, Clone)]
pub struct Not<V> {
    pub inner: V,
    /// Reported when the inner rule passes.
    pub message: String,
}

impl<V> Not<V> {
    #[must_use]
    pub fn new(inner: V, message: impl Into<String>) -> Self {
        Self {
            inner,
            message: message.into(),
        }
    }
}

impl<V: Validator> Validator for Not<V> {
    fn validate(&self, value: &FieldValue, values: &FormValues) -> ValidationResult {
        match self.inner.validate(value, values) {
            ValidationResult::Valid => {
                ValidationResult::invalid(ValidationError::new(ERROR_CODE_NOT, &self.message))
            }
            ValidationResult::Invalid(_) => ValidationResult::Valid,
        }
    }

    fn error_message(&self) -> &str {
        &self.message
    }
}

/// An ordered rule sequence for one field.
///
/// Rules run top to bottom and stop at the first failure; later rules are
/// not evaluated.
#[derive(Default)]
pub struct All {
    validators: Vec<Box<dyn Validator>>,
}

/// The rules attached to one field.
pub type RuleSet = All;

impl All {
    #[must_use]
    pub fn new(validators: Vec<Box<dyn Validator>>) -> Self {
        Self { validators }
    }

    /// Start a fluent [`RuleSetBuilder`].
    #[must_use]
    pub fn builder() -> RuleSetBuilder {
        RuleSetBuilder::new()
    }

    /// Append a rule.
    pub fn push(&mut self, validator: impl Validator + 'static) {
        self.validators.push(Box::new(validator));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Formatted message of the first failing rule.
    #[must_use]
    pub fn first_error(&self, value: &FieldValue, values: &FormValues) -> Option<String> {
        self.validate(value, values).error_message()
    }
}

impl Validator for All {
    fn validate(&self, value: &FieldValue, values: &FormValues) -> ValidationResult {
        for validator in &self.validators {
            let result = validator.validate(value, values);
            if result.is_invalid() {
                return result;
            }
        }
        ValidationResult::Valid
    }

    fn error_message(&self) -> &str {
        self.validators
            .first()
            .map_or("Validação falhou", |v| v.error_message())
    }
}

impl fmt::Debug for All {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("All")
            .field(
                "validators",
                &format!("[{} validators]", self.validators.len()),
            )
            .finish()
    }
}

// ---------------------------------------------------------------------------
// RuleSetBuilder
// ---------------------------------------------------------------------------

/// Fluent construction of a [`RuleSet`].
///
/// ```rust
/// use roster_forms::validation::{FormValues, RuleSet, Validator};
///
/// let rules = RuleSet::builder().required().email().build();
/// let ctx = FormValues::new();
///
/// assert!(rules.validate(&"ana@example.pt".into(), &ctx).is_valid());
/// assert_eq!(
///     rules.first_error(&"".into(), &ctx).as_deref(),
///     Some("Este campo é obrigatório")
/// );
/// ```
#[derive(Default)]
pub struct RuleSetBuilder {
    validators: Vec<Box<dyn Validator>>,
}

impl RuleSetBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add any rule, including a closure.
    #[must_use]
    pub fn custom(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    #[must_use]
    pub fn required(self) -> Self {
        self.custom(Required::new())
    }

    #[must_use]
    pub fn email(self) -> Self {
        self.custom(Email::new())
    }

    /// Phone rule with the default digit minimum.
    #[must_use]
    pub fn phone(self) -> Self {
        self.custom(Phone::new())
    }

    #[must_use]
    pub fn phone_min_digits(self, min_digits: usize) -> Self {
        self.custom(Phone::min_digits(min_digits))
    }

    #[must_use]
    pub fn min_length(self, min: usize) -> Self {
        self.custom(MinLength::new(min))
    }

    #[must_use]
    pub fn max_length(self, max: usize) -> Self {
        self.custom(MaxLength::new(max))
    }

    #[must_use]
    pub fn build(self) -> RuleSet {
        All::new(self.validators)
    }
}

impl fmt::Debug for RuleSetBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSetBuilder")
            .field("len", &self.validators.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// FormRules
// ---------------------------------------------------------------------------

/// Field name → [`RuleSet`]. Fields without an entry never fail.
#[derive(Debug, Default)]
pub struct FormRules {
    fields: BTreeMap<String, RuleSet>,
}

impl FormRules {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `rules` to `field`, replacing earlier ones.
    #[must_use]
    pub fn field(mut self, field: impl Into<String>, rules: RuleSet) -> Self {
        self.fields.insert(field.into(), rules);
        self
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&RuleSet> {
        self.fields.get(field)
    }

    #[must_use]
    pub fn has_rules(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Ruled field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! User domain service.
//!
//! This is the authoritative gate in front of every store mutation. The form
//! layer runs its own lighter rules for inline feedback; a draft only
//! reaches the store after [`validate_user`] accepts it.
//!
//! # Invariants
//!
//! 1. A draft accepted by [`validate_user`] has a non-blank name, a
//!    shape-valid email, a Portuguese phone number and at least one role.
//! 2. [`format_for_display`] and [`format_phone`] are pure; the source
//!    record is never modified.
//! 3. [`generate_id`] ids are time-prefixed and randomly suffixed. Uniqueness
//!    is probabilistic; the store rejects duplicates.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of the random part of a generated id.
const ID_SUFFIX_LEN: usize = 5;

/// Country prefix accepted (and rendered) for phone numbers.
const PHONE_COUNTRY_PREFIX: &str = "+351";

/// Digits in a national phone number.
const PHONE_NATIONAL_DIGITS: usize = 9;

// ---------------------------------------------------------------------------
// UserId
// ---------------------------------------------------------------------------

/// Opaque user identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A stored user.
///
/// Serialized field names match the persisted layout (`userTypes`,
/// `createdAt`, `updatedAt`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub phone: String,
    /// Opaque placeholder, never checked for strength.
    #[serde(default)]
    pub password: String,
    pub user_types: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// Build a new record from a draft, stamping `created_at`.
    #[must_use]
    pub fn from_draft(id: UserId, draft: UserDraft, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: draft.name,
            email: draft.email,
            phone: draft.phone,
            password: draft.password,
            user_types: draft.user_types,
            created_at,
            updated_at: None,
        }
    }

    /// Apply an edit, keeping `id` and `created_at`.
    #[must_use]
    pub fn with_edit(&self, draft: UserDraft, updated_at: DateTime<Utc>) -> Self {
        Self {
            id: self.id.clone(),
            name: draft.name,
            email: draft.email,
            phone: draft.phone,
            password: draft.password,
            user_types: draft.user_types,
            created_at: self.created_at,
            updated_at: Some(updated_at),
        }
    }

    /// The editable part of this record, e.g. to prefill an edit form.
    #[must_use]
    pub fn to_draft(&self) -> UserDraft {
        UserDraft {
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            password: self.password.clone(),
            user_types: self.user_types.clone(),
        }
    }

    /// Whether the record carries `role` among its tags.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.user_types.iter().any(|t| t == role)
    }
}

/// A candidate record as produced by the user form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDraft {
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub user_types: Vec<String>,
}

impl UserDraft {
    /// Add `role` if missing, remove it if present.
    ///
    /// Order of the remaining tags is preserved and duplicates never appear.
    pub fn toggle_role(&mut self, role: &str) {
        if let Some(pos) = self.user_types.iter().position(|t| t == role) {
            self.user_types.remove(pos);
        } else {
            self.user_types.push(role.to_string());
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Field name → message for a rejected draft.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    /// An empty error set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` for `field`, replacing any earlier one.
    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    /// Message for `field`, if it failed.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Failed fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in self.iter() {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldErrors {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Outcome of [`validate_user`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserValidation {
    pub errors: FieldErrors,
}

impl UserValidation {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Ok(())` when valid, otherwise the collected errors.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Validate a draft before it may enter the store.
///
/// Every field is checked (errors are collected, not short-circuited).
///
/// ```
/// use roster_core::{UserDraft, validate_user};
///
/// let draft = UserDraft {
///     name: String::new(),
///     email: "a@b.com".into(),
///     phone: "+351912345678".into(),
///     password: String::new(),
///     user_types: vec!["Web Developer".into()],
/// };
/// let result = validate_user(&draft);
/// assert!(!result.is_valid());
/// assert_eq!(result.errors.get("name"), Some("Nome é obrigatório"));
/// assert_eq!(result.errors.len(), 1);
/// ```
#[must_use]
pub fn validate_user(draft: &UserDraft) -> UserValidation {
    let mut errors = FieldErrors::new();

    if draft.name.trim().is_empty() {
        errors.insert("name", "Nome é obrigatório");
    }

    if draft.email.trim().is_empty() {
        errors.insert("email", "Email é obrigatório");
    } else if !is_valid_email(&draft.email) {
        errors.insert("email", "Email deve ter formato válido");
    }

    if draft.phone.trim().is_empty() {
        errors.insert("phone", "Telefone é obrigatório");
    } else if !is_valid_phone(&draft.phone) {
        errors.insert("phone", "Telefone deve ter formato válido");
    }

    if draft.user_types.is_empty() {
        errors.insert("userTypes", "Selecione pelo menos um tipo de utilizador");
    }

    UserValidation { errors }
}

/// Shape check for `local@domain.tld`.
///
/// No whitespace anywhere, exactly one `@` with text before it, and a `.`
/// in the domain with text on both sides.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

/// Portuguese phone check: optional `+351`, then exactly nine digits.
///
/// Whitespace anywhere in the input is ignored.
#[must_use]
pub fn is_valid_phone(phone: &str) -> bool {
    let compact: String = phone.chars().filter(|c| !c.is_whitespace()).collect();
    let national = compact
        .strip_prefix(PHONE_COUNTRY_PREFIX)
        .unwrap_or(&compact);
    national.len() == PHONE_NATIONAL_DIGITS && national.bytes().all(|b| b.is_ascii_digit())
}

// ---------------------------------------------------------------------------
// Id generation
// ---------------------------------------------------------------------------

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

/// Generate a fresh id: base-36 millisecond timestamp plus a random suffix.
pub fn generate_id(clock: &dyn Clock) -> UserId {
    let mut rng = rand::thread_rng();
    let mut id = to_base36(clock.now_millis());
    id.extend((0..ID_SUFFIX_LEN).map(|_| char::from(BASE36[rng.gen_range(0..BASE36.len())])));
    UserId(id)
}

// ---------------------------------------------------------------------------
// Display formatting
// ---------------------------------------------------------------------------

/// A record plus the derived strings list views show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayUser {
    pub user: UserRecord,
    /// Role tags joined with `", "`.
    pub user_types_display: String,
    /// Phone rendered by [`format_phone`].
    pub phone_display: String,
}

/// Derive display-only fields for `user`.
#[must_use]
pub fn format_for_display(user: &UserRecord) -> DisplayUser {
    DisplayUser {
        user: user.clone(),
        user_types_display: user.user_types.join(", "),
        phone_display: format_phone(&user.phone),
    }
}

/// Render a Portuguese number as `+351 XXX XXX XXX`.
///
/// Inputs whose digits do not start with `351` are returned unchanged.
///
/// ```
/// use roster_core::format_phone;
///
/// assert_eq!(format_phone("351916534613"), "+351 916 534 613");
/// assert_eq!(format_phone("+351 916 534 613"), "+351 916 534 613");
/// assert_eq!(format_phone("916534613"), "916534613");
/// ```
#[must_use]
pub fn format_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    let Some(number) = digits.strip_prefix("351") else {
        return phone.to_string();
    };
    // ASCII digits only, so byte offsets are char offsets.
    let cut = |from: usize, to: usize| number.get(from.min(number.len())..to.min(number.len()));
    format!(
        "{PHONE_COUNTRY_PREFIX} {} {} {}",
        cut(0, 3).unwrap_or_default(),
        cut(3, 6).unwrap_or_default(),
        cut(6, number.len()).unwrap_or_default()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn draft() -> UserDraft {
        UserDraft {
            name: "Ana Costa".into(),
            email: "ana@example.pt".into(),
            phone: "+351 912 345 678".into(),
            password: "secret".into(),
            user_types: vec!["Web Developer".into()],
        }
    }

    #[test]
    fn valid_draft_passes() {
        assert!(validate_user(&draft()).is_valid());
    }

    #[test]
    fn empty_name_is_the_only_error() {
        let mut d = draft();
        d.name = String::new();
        d.email = "a@b.com".into();
        d.phone = "+351912345678".into();
        let v = validate_user(&d);
        assert!(!v.is_valid());
        assert_eq!(v.errors.len(), 1);
        assert_eq!(v.errors.get("name"), Some("Nome é obrigatório"));
    }

    #[test]
    fn whitespace_name_is_rejected() {
        let mut d = draft();
        d.name = "   ".into();
        assert_eq!(
            validate_user(&d).errors.get("name"),
            Some("Nome é obrigatório")
        );
    }

    #[test]
    fn all_errors_are_collected() {
        let v = validate_user(&UserDraft::default());
        assert_eq!(v.errors.len(), 4);
        assert_eq!(v.errors.get("email"), Some("Email é obrigatório"));
        assert_eq!(v.errors.get("phone"), Some("Telefone é obrigatório"));
        assert_eq!(
            v.errors.get("userTypes"),
            Some("Selecione pelo menos um tipo de utilizador")
        );
    }

    #[test]
    fn malformed_email_and_phone_messages() {
        let mut d = draft();
        d.email = "not-an-email".into();
        d.phone = "12345".into();
        let v = validate_user(&d);
        assert_eq!(v.errors.get("email"), Some("Email deve ter formato válido"));
        assert_eq!(v.errors.get("phone"), Some("Telefone deve ter formato válido"));
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("user.name+tag@mail.example.co.uk"));
        assert!(!is_valid_email("user@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@.com"));
        assert!(!is_valid_email("user@example."));
        assert!(!is_valid_email("us er@example.com"));
        assert!(!is_valid_email("a@b@c.com"));
    }

    #[test]
    fn phone_shapes() {
        assert!(is_valid_phone("912345678"));
        assert!(is_valid_phone("+351912345678"));
        assert!(is_valid_phone("+351 912 345 678"));
        assert!(!is_valid_phone("351912345678"));
        assert!(!is_valid_phone("+35191234567"));
        assert!(!is_valid_phone("91234567a"));
        assert!(!is_valid_phone("912-345-678"));
    }

    #[test]
    fn format_phone_groups_digits() {
        assert_eq!(format_phone("351916534613"), "+351 916 534 613");
        assert_eq!(format_phone("+351 934 123 456"), "+351 934 123 456");
    }

    #[test]
    fn format_phone_short_number_does_not_panic() {
        assert_eq!(format_phone("35191"), "+351 91  ");
        assert_eq!(format_phone("351"), "+351   ");
    }

    #[test]
    fn format_phone_passthrough() {
        assert_eq!(format_phone("912 345 678"), "912 345 678");
        assert_eq!(format_phone(""), "");
    }

    #[test]
    fn display_user_is_derived() {
        let record = UserRecord::from_draft(
            UserId::new("x"),
            UserDraft {
                user_types: vec!["Web Developer".into(), "UI/UX Designer".into()],
                phone: "351916534613".into(),
                ..draft()
            },
            Utc::now(),
        );
        let display = format_for_display(&record);
        assert_eq!(display.user_types_display, "Web Developer, UI/UX Designer");
        assert_eq!(display.phone_display, "+351 916 534 613");
        assert_eq!(display.user, record);
    }

    #[test]
    fn generated_ids_have_time_prefix() {
        let clock = ManualClock::new(36 * 36);
        let id = generate_id(&clock);
        assert!(id.as_str().starts_with("100"));
        assert_eq!(id.as_str().len(), 3 + ID_SUFFIX_LEN);
        assert!(id.as_str().bytes().all(|b| BASE36.contains(&b)));
    }

    #[test]
    fn generated_ids_differ_at_same_instant() {
        let clock = ManualClock::new(1_700_000_000_000);
        let a = generate_id(&clock);
        let b = generate_id(&clock);
        let c = generate_id(&clock);
        // 36^5 suffixes; three draws colliding is not a realistic outcome.
        assert!(a != b || b != c);
    }

    #[test]
    fn base36_encoding() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn edit_keeps_identity_and_creation_time() {
        let created = Utc::now();
        let record = UserRecord::from_draft(UserId::new("7"), draft(), created);
        let later = created + chrono::Duration::seconds(5);
        let edited = record.with_edit(
            UserDraft {
                name: "Ana C.".into(),
                ..draft()
            },
            later,
        );
        assert_eq!(edited.id, record.id);
        assert_eq!(edited.created_at, created);
        assert_eq!(edited.updated_at, Some(later));
        assert_eq!(edited.name, "Ana C.");
    }

    #[test]
    fn toggle_role_adds_and_removes() {
        let mut d = UserDraft::default();
        d.toggle_role("Web Developer");
        d.toggle_role("Project Manager");
        assert_eq!(d.user_types, vec!["Web Developer", "Project Manager"]);
        d.toggle_role("Web Developer");
        assert_eq!(d.user_types, vec!["Project Manager"]);
    }

    #[test]
    fn record_json_uses_camel_case() {
        let record = UserRecord::from_draft(UserId::new("1"), draft(), Utc::now());
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("userTypes").is_some());
        assert!(json.get("createdAt").is_some());
        assert!(json.get("updatedAt").is_none());
        assert_eq!(json["id"], "1");
    }

    #[test]
    fn record_parses_js_iso_timestamps() {
        let json = r#"{"id":"1","name":"A","email":"a@b.pt","phone":"912345678",
            "password":"x","userTypes":["Web Developer"],
            "createdAt":"2025-10-03T00:00:00.000Z"}"#;
        let record: UserRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.created_at.timestamp(), 1_759_449_600);
        assert!(record.updated_at.is_none());
    }

    #[test]
    fn field_errors_display() {
        let errors: FieldErrors = [("name", "a"), ("email", "b")].into_iter().collect();
        assert_eq!(errors.to_string(), "email: b; name: a");
    }
}

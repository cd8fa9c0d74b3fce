//! The user list store.
//!
//! [`UserState`] is a plain reducer: [`UserState::update`] applies one
//! [`UserAction`] and reports what happened as a [`Transition`]. It never
//! fails and never does I/O.
//!
//! [`UserStore`] wraps the reducer with the domain gate
//! ([`validate_user`]), id and timestamp stamping, and persistence of the
//! whole list after every committed transition.
//!
//! # Invariants
//!
//! 1. Ids in `users` are unique. `AddUser` with an existing id is rejected and
//!    duplicate ids in loaded or replaced lists keep the first record.
//! 2. A rejected action only changes `error`.
//! 3. After every committed transition the list is written to storage; a
//!    failed write leaves the store dirty and [`UserStore::dispose`] retries
//!    it once.
//! 4. Loading never fails: an absent slot yields the seed list, an
//!    unparsable one yields the seed list with a warning, and individual
//!    undecodable records are skipped.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use roster_core::{SystemClock, UserDraft};
//! use roster_runtime::{MemoryStorage, RosterConfig, UserStore};
//!
//! let mut store = UserStore::create(
//!     &RosterConfig::default(),
//!     Arc::new(MemoryStorage::new()),
//!     Arc::new(SystemClock),
//! );
//! assert_eq!(store.users().len(), 2); // seed
//!
//! let user = store
//!     .add_user(UserDraft {
//!         name: "Ana Costa".into(),
//!         email: "ana@example.pt".into(),
//!         phone: "912345678".into(),
//!         password: String::new(),
//!         user_types: vec!["Web Developer".into()],
//!     })
//!     .unwrap();
//! assert_eq!(store.recent(1)[0].id, user.id);
//! store.dispose().unwrap();
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use roster_core::constants::{USER_TYPES, seed_users};
use roster_core::{
    Clock, DisplayUser, FieldErrors, UserDraft, UserId, UserRecord, format_for_display,
    generate_id, validate_user,
};

use crate::config::RosterConfig;
use crate::storage::{KeyValueStorage, StorageResult};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a store operation was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The draft failed [`validate_user`].
    Validation(FieldErrors),
    /// No user has this id.
    NotFound(UserId),
    /// A user with this id already exists.
    DuplicateId(UserId),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Validation(errors) => write!(f, "validation failed: {errors}"),
            StoreError::NotFound(id) => write!(f, "user {id} not found"),
            StoreError::DuplicateId(id) => write!(f, "user id {id} already exists"),
        }
    }
}

impl std::error::Error for StoreError {}

impl StoreError {
    /// Field errors, when this is a validation failure.
    #[must_use]
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            StoreError::Validation(errors) => Some(errors),
            StoreError::NotFound(_) | StoreError::DuplicateId(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Reducer
// ---------------------------------------------------------------------------

/// Everything the store can be asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    /// Replace the whole list and clear `loading`.
    SetUsers(Vec<UserRecord>),
    /// Append a record.
    AddUser(UserRecord),
    /// Replace the record with the same id, keeping its `created_at`, and
    /// clear `current_user`.
    UpdateUser(UserRecord),
    /// Remove the record with this id.
    DeleteUser(UserId),
    SetCurrentUser(Option<UserRecord>),
    SetLoading(bool),
    /// Record an error and clear `loading`.
    SetError(StoreError),
    ClearError,
}

impl UserAction {
    /// Stable name for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            UserAction::SetUsers(_) => "set_users",
            UserAction::AddUser(_) => "add_user",
            UserAction::UpdateUser(_) => "update_user",
            UserAction::DeleteUser(_) => "delete_user",
            UserAction::SetCurrentUser(_) => "set_current_user",
            UserAction::SetLoading(_) => "set_loading",
            UserAction::SetError(_) => "set_error",
            UserAction::ClearError => "clear_error",
        }
    }
}

/// What a reducer step did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The user list changed and must be persisted.
    Committed,
    /// Only non-list state changed.
    Updated,
    /// The action was refused; only `error` changed.
    Rejected(StoreError),
}

/// Reducer state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserState {
    /// Records in insertion order.
    pub users: Vec<UserRecord>,
    pub loading: bool,
    pub error: Option<StoreError>,
    pub current_user: Option<UserRecord>,
}

impl UserState {
    fn position(&self, id: &UserId) -> Option<usize> {
        self.users.iter().position(|u| &u.id == id)
    }

    fn reject(&mut self, error: StoreError) -> Transition {
        self.error = Some(error.clone());
        Transition::Rejected(error)
    }

    /// Apply `action`. Total and synchronous.
    pub fn update(&mut self, action: UserAction) -> Transition {
        match action {
            UserAction::SetUsers(users) => {
                self.users = dedupe_by_id(users);
                self.loading = false;
                Transition::Committed
            }
            UserAction::AddUser(user) => {
                if self.position(&user.id).is_some() {
                    return self.reject(StoreError::DuplicateId(user.id));
                }
                self.users.push(user);
                self.loading = false;
                self.error = None;
                Transition::Committed
            }
            UserAction::UpdateUser(mut user) => {
                let Some(pos) = self.position(&user.id) else {
                    return self.reject(StoreError::NotFound(user.id));
                };
                user.created_at = self.users[pos].created_at;
                self.users[pos] = user;
                self.current_user = None;
                self.loading = false;
                self.error = None;
                Transition::Committed
            }
            UserAction::DeleteUser(id) => {
                let Some(pos) = self.position(&id) else {
                    return self.reject(StoreError::NotFound(id));
                };
                self.users.remove(pos);
                self.loading = false;
                self.error = None;
                Transition::Committed
            }
            UserAction::SetCurrentUser(user) => {
                self.current_user = user;
                Transition::Updated
            }
            UserAction::SetLoading(loading) => {
                self.loading = loading;
                Transition::Updated
            }
            UserAction::SetError(error) => {
                self.error = Some(error);
                self.loading = false;
                Transition::Updated
            }
            UserAction::ClearError => {
                self.error = None;
                Transition::Updated
            }
        }
    }
}

fn dedupe_by_id(users: Vec<UserRecord>) -> Vec<UserRecord> {
    let mut seen = HashSet::new();
    users
        .into_iter()
        .filter(|u| {
            let fresh = seen.insert(u.id.clone());
            if !fresh {
                tracing::warn!(id = %u.id, "dropping record with duplicate id");
            }
            fresh
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Persisted layout
// ---------------------------------------------------------------------------

/// A stored record, tolerant of fields older builds did not write.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredUser {
    id: UserId,
    name: String,
    email: String,
    phone: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    user_types: Vec<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl StoredUser {
    fn into_record(self, fallback_created: DateTime<Utc>) -> UserRecord {
        UserRecord {
            id: self.id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            password: self.password,
            user_types: self.user_types,
            created_at: self.created_at.unwrap_or(fallback_created),
            updated_at: self.updated_at,
        }
    }
}

/// Decode the persisted list. `None` when the payload is not a JSON array.
fn decode_users(raw: &str, now: DateTime<Utc>) -> Option<Vec<UserRecord>> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "stored user list is not valid JSON");
            return None;
        }
    };
    let Value::Array(items) = value else {
        tracing::warn!("stored user list is not a JSON array");
        return None;
    };
    let users = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<StoredUser>(item) {
            Ok(stored) => Some(stored.into_record(now)),
            Err(e) => {
                tracing::warn!(index, error = %e, "skipping undecodable stored user");
                None
            }
        })
        .collect();
    Some(users)
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// Users carrying one catalogued role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleCount {
    pub value: &'static str,
    pub label: &'static str,
    pub count: usize,
}

impl RoleCount {
    /// Label pluralized with a trailing `s` when more than one user has it.
    #[must_use]
    pub fn display_label(&self) -> String {
        if self.count > 1 {
            format!("{}s", self.label)
        } else {
            self.label.to_string()
        }
    }
}

/// Summary counts for a dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStats {
    pub total: usize,
    /// At most two roles, in catalog order, each with at least one user.
    pub roles: Vec<RoleCount>,
}

const STATS_ROLE_LIMIT: usize = 2;

// ---------------------------------------------------------------------------
// UserStore
// ---------------------------------------------------------------------------

/// Owns the user list, its persistence and its clock.
pub struct UserStore {
    state: UserState,
    storage: Arc<dyn KeyValueStorage>,
    clock: Arc<dyn Clock>,
    key: String,
    dirty: bool,
}

impl UserStore {
    /// Load the store from `storage`, falling back to the seed list.
    pub fn create(
        config: &RosterConfig,
        storage: Arc<dyn KeyValueStorage>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut store = Self {
            state: UserState::default(),
            storage,
            clock,
            key: config.storage_key.clone(),
            dirty: false,
        };
        store.state.update(UserAction::SetLoading(true));
        let users = store.load();
        store.state.update(UserAction::SetUsers(users));
        tracing::debug!(
            key = %store.key,
            backend = store.storage.name(),
            users = store.state.users.len(),
            "user store created"
        );
        store
    }

    fn load(&self) -> Vec<UserRecord> {
        match self.storage.get(&self.key) {
            Ok(Some(raw)) => decode_users(&raw, self.clock.now()).unwrap_or_else(seed_users),
            Ok(None) => {
                tracing::debug!(key = %self.key, "no stored users, using seed list");
                seed_users()
            }
            Err(e) => {
                tracing::warn!(
                    key = %self.key,
                    error = %e,
                    "failed to read stored users, using seed list"
                );
                seed_users()
            }
        }
    }

    /// Write the list to storage. Leaves the store dirty on failure.
    pub fn flush(&mut self) -> StorageResult<()> {
        let json = serde_json::to_string(&self.state.users)?;
        match self.storage.set(&self.key, &json) {
            Ok(()) => {
                self.dirty = false;
                tracing::debug!(key = %self.key, users = self.state.users.len(), "persisted users");
                Ok(())
            }
            Err(e) => {
                self.dirty = true;
                Err(e)
            }
        }
    }

    /// Flush pending changes (one retry of a failed write) and release the
    /// store.
    pub fn dispose(mut self) -> StorageResult<()> {
        if self.dirty {
            tracing::debug!(key = %self.key, "retrying pending write on dispose");
            self.flush()?;
        }
        tracing::debug!(key = %self.key, "user store disposed");
        Ok(())
    }

    /// Apply an action, persisting if the list changed.
    pub fn dispatch(&mut self, action: UserAction) -> Transition {
        let name = action.name();
        let transition = self.state.update(action);
        tracing::debug!(action = name, transition = ?transition, "user store transition");
        if transition == Transition::Committed {
            self.dirty = true;
            if let Err(e) = self.flush() {
                tracing::warn!(key = %self.key, error = %e, "failed to persist users");
            }
        }
        transition
    }

    fn commit(&mut self, action: UserAction) -> Result<(), StoreError> {
        match self.dispatch(action) {
            Transition::Rejected(error) => Err(error),
            Transition::Committed | Transition::Updated => Ok(()),
        }
    }

    fn gate(&mut self, draft: &UserDraft) -> Result<(), StoreError> {
        validate_user(draft).into_result().map_err(|errors| {
            let error = StoreError::Validation(errors);
            self.dispatch(UserAction::SetError(error.clone()));
            error
        })
    }

    // -- Mutations --

    /// Validate, stamp id and `created_at`, and append.
    pub fn add_user(&mut self, draft: UserDraft) -> Result<UserRecord, StoreError> {
        self.gate(&draft)?;
        let id = generate_id(self.clock.as_ref());
        let record = UserRecord::from_draft(id, draft, self.clock.now());
        self.commit(UserAction::AddUser(record.clone()))?;
        Ok(record)
    }

    /// Validate and replace `id`'s editable fields, keeping `created_at`.
    pub fn update_user(&mut self, id: &UserId, draft: UserDraft) -> Result<UserRecord, StoreError> {
        self.gate(&draft)?;
        let now = self.clock.now();
        let record = match self.find(id) {
            Some(existing) => existing.with_edit(draft, now),
            None => UserRecord::from_draft(id.clone(), draft, now),
        };
        self.commit(UserAction::UpdateUser(record.clone()))?;
        Ok(record)
    }

    /// Remove `id`. A missing id records `NotFound` and leaves the list alone.
    pub fn delete_user(&mut self, id: &UserId) -> Result<(), StoreError> {
        self.commit(UserAction::DeleteUser(id.clone()))
    }

    /// Select `id` for editing.
    pub fn set_current_user(&mut self, id: &UserId) -> Result<(), StoreError> {
        match self.find(id).cloned() {
            Some(user) => self.commit(UserAction::SetCurrentUser(Some(user))),
            None => {
                let error = StoreError::NotFound(id.clone());
                self.dispatch(UserAction::SetError(error.clone()));
                Err(error)
            }
        }
    }

    pub fn clear_current_user(&mut self) {
        self.dispatch(UserAction::SetCurrentUser(None));
    }

    pub fn clear_error(&mut self) {
        self.dispatch(UserAction::ClearError);
    }

    // -- Views --

    #[must_use]
    pub fn state(&self) -> &UserState {
        &self.state
    }

    /// Records in insertion order.
    #[must_use]
    pub fn users(&self) -> &[UserRecord] {
        &self.state.users
    }

    #[must_use]
    pub fn current_user(&self) -> Option<&UserRecord> {
        self.state.current_user.as_ref()
    }

    #[must_use]
    pub fn error(&self) -> Option<&StoreError> {
        self.state.error.as_ref()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.loading
    }

    /// Whether a committed change has not reached storage yet.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[must_use]
    pub fn storage_key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn find(&self, id: &UserId) -> Option<&UserRecord> {
        self.state.users.iter().find(|u| &u.id == id)
    }

    /// Case-insensitive substring match on name, email or any role tag.
    ///
    /// An empty term matches everyone.
    #[must_use]
    pub fn search(&self, term: &str) -> Vec<&UserRecord> {
        let needle = term.to_lowercase();
        self.state
            .users
            .iter()
            .filter(|u| {
                u.name.to_lowercase().contains(&needle)
                    || u.email.to_lowercase().contains(&needle)
                    || u.user_types.iter().any(|t| t.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// The last `n` inserted records, newest first.
    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<&UserRecord> {
        self.state.users.iter().rev().take(n).collect()
    }

    #[must_use]
    pub fn stats(&self) -> UserStats {
        let roles = USER_TYPES
            .iter()
            .map(|t| RoleCount {
                value: t.value,
                label: t.label,
                count: self.state.users.iter().filter(|u| u.has_role(t.value)).count(),
            })
            .filter(|r| r.count > 0)
            .take(STATS_ROLE_LIMIT)
            .collect();
        UserStats {
            total: self.state.users.len(),
            roles,
        }
    }

    /// Every record with display fields derived.
    #[must_use]
    pub fn display_users(&self) -> Vec<DisplayUser> {
        self.state.users.iter().map(format_for_display).collect()
    }
}

impl fmt::Debug for UserStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserStore")
            .field("key", &self.key)
            .field("backend", &self.storage.name())
            .field("users", &self.state.users.len())
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

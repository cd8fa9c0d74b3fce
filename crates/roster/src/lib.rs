#![forbid(unsafe_code)]

//! Roster public facade crate.
//!
//! This crate provides the surface UI collaborators use. It re-exports the
//! common types of the internal crates, offers the [`Session`] glue that
//! connects the user form to the store and notification queue, and a
//! lightweight prelude for day-to-day usage.

use std::fmt;

pub mod session;

// --- Core re-exports -------------------------------------------------------

pub use roster_core::constants::{USER_TYPES, UserType, messages};
pub use roster_core::logging;
pub use roster_core::{
    Clock, DisplayUser, FieldErrors, SystemClock, UserDraft, UserId, UserRecord, UserValidation,
    format_for_display, format_phone, validate_user,
};

// --- Forms re-exports ------------------------------------------------------

pub use roster_forms::{
    EditPolicy, FieldProps, FieldValue, FormController, FormMsg, FormRules, FormValues, RuleSet,
    SubmitOutcome, Validator,
};

// --- Runtime re-exports ----------------------------------------------------

pub use roster_runtime::{
    ConfigError, FileStorage, KeyValueStorage, MemoryStorage, Notification, NotificationId,
    NotificationKind, NotificationQueue, Politeness, RosterConfig, StorageError, StoreError,
    UserStats, UserStore,
};

pub use session::{Session, draft_from_values, user_form_rules, user_form_values};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for Roster sessions.
#[derive(Debug)]
pub enum Error {
    /// Invalid configuration; every violation is listed.
    Config(Vec<ConfigError>),
    /// A store operation was refused.
    Store(StoreError),
    /// The storage backend failed.
    Storage(StorageError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(errors) => {
                write!(f, "invalid configuration: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{err}")?;
                }
                Ok(())
            }
            Self::Store(err) => write!(f, "{err}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(_) => None,
            Self::Store(err) => Some(err),
            Self::Storage(err) => Some(err),
        }
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        Self::Storage(err)
    }
}

/// Standard result type for Roster APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Error, FormController, FormValues, NotificationKind, Result, RosterConfig, Session,
        StoreError, SubmitOutcome, UserDraft, UserId, UserRecord, messages,
    };

    pub use crate::{core, forms, runtime};
}

pub use roster_core as core;
pub use roster_forms as forms;
pub use roster_runtime as runtime;

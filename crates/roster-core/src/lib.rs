#![forbid(unsafe_code)]

//! Roster core: the user domain and the small shared services around it.
//!
//! # Key Components
//!
//! - [`user`] - [`UserRecord`], [`UserDraft`], the authoritative
//!   [`validate_user`] gate, id generation and display formatting
//! - [`clock`] - [`Clock`] time source abstraction
//! - [`constants`] - role catalog, seed records and user-facing messages
//! - [`logging`] - tracing re-exports and optional subscriber setup
//!
//! # Role in Roster
//! `roster-core` sits at the bottom of the dependency graph. The store in
//! `roster-runtime` calls into it before every mutation, and the facade crate
//! re-exports it for UI collaborators that need display formatting.

pub mod clock;
pub mod constants;
pub mod logging;
pub mod user;

pub use clock::{Clock, SystemClock};
#[cfg(any(test, feature = "test-helpers"))]
pub use clock::ManualClock;
pub use user::{
    DisplayUser, FieldErrors, UserDraft, UserId, UserRecord, UserValidation, format_for_display,
    format_phone, generate_id, is_valid_email, is_valid_phone, validate_user,
};

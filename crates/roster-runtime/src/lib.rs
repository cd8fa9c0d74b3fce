#![forbid(unsafe_code)]

//! Roster runtime: state that outlives a single view.
//!
//! # Key Components
//!
//! - [`store`] - [`UserStore`] and its [`UserState`] reducer
//! - [`storage`] - [`KeyValueStorage`] backends (memory and JSON file)
//! - [`notifications`] - [`NotificationQueue`] with tick-driven expiry
//! - [`config`] - [`RosterConfig`] and `ROSTER_*` environment overrides
//!
//! # Role in Roster
//! The store gates every mutation through `roster_core::validate_user`,
//! stamps ids and timestamps with an injected clock, and writes the list to
//! storage after each change. The facade crate wires the store and the
//! notification queue into a session.

pub mod config;
pub mod notifications;
pub mod storage;
pub mod store;

pub use config::{ConfigError, RosterConfig, RosterConfigParse};
pub use notifications::{
    Notification, NotificationId, NotificationKind, NotificationQueue, Politeness,
};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage, StorageError, StorageResult};
pub use store::{
    RoleCount, StoreError, Transition, UserAction, UserState, UserStats, UserStore,
};

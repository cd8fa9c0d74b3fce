//! Time provider abstraction.
//!
//! Records carry creation and update timestamps, and ids embed the current
//! millisecond. Production code reads the system clock; tests use
//! [`ManualClock`] (behind the `test-helpers` feature) to get stable values.
//!
//! # Example
//!
//! ```
//! use roster_core::{Clock, SystemClock};
//!
//! let clock = SystemClock;
//! assert!(clock.now_millis() > 0);
//! ```

use std::fmt::Debug;

use chrono::{DateTime, Utc};

#[cfg(any(test, feature = "test-helpers"))]
use std::sync::Mutex;

/// A time provider for record timestamps and id prefixes.
pub trait Clock: Send + Sync + Debug {
    /// Current UTC time.
    fn now(&self) -> DateTime<Utc>;

    /// Current time as milliseconds since the Unix epoch.
    ///
    /// Times before the epoch clamp to zero.
    fn now_millis(&self) -> u64 {
        u64::try_from(self.now().timestamp_millis()).unwrap_or(0)
    }
}

/// Production clock backed by [`chrono::Utc::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Test clock that only moves when told to.
///
/// ```ignore
/// use roster_core::{Clock, ManualClock};
///
/// let clock = ManualClock::new(1_000);
/// assert_eq!(clock.now_millis(), 1_000);
/// clock.advance_millis(250);
/// assert_eq!(clock.now_millis(), 1_250);
/// ```
#[cfg(any(test, feature = "test-helpers"))]
#[derive(Debug)]
pub struct ManualClock {
    millis: Mutex<i64>,
}

#[cfg(any(test, feature = "test-helpers"))]
impl ManualClock {
    /// Create a clock frozen at `millis` since the epoch.
    #[must_use]
    pub fn new(millis: i64) -> Self {
        Self {
            millis: Mutex::new(millis),
        }
    }

    /// Move the clock forward.
    pub fn advance_millis(&self, delta: i64) {
        if let Ok(mut guard) = self.millis.lock() {
            *guard += delta;
        }
    }

    /// Jump to an absolute time.
    pub fn set_millis(&self, millis: i64) {
        if let Ok(mut guard) = self.millis.lock() {
            *guard = millis;
        }
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = self.millis.lock().map(|g| *g).unwrap_or(0);
        DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_default()
    }
}

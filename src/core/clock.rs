//! Monotonic timestamps and the clocks that produce them.
//!
//! Timeouts are evaluated lazily: a clock is only read when the host polls
//! the driver, so the effective timeout precision equals the poll cadence.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

const MICROS_PER_SEC: u64 = 1_000_000;
const MICROS_PER_MILLI: u64 = 1_000;

/// A monotonic reading with second and microsecond components.
///
/// The all-zero value is reserved as the "time unavailable" sentinel.
/// Clocks never hand out zero for a real reading.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp {
    secs: u64,
    micros: u32,
}

impl Timestamp {
    /// Sentinel returned when no time source is available.
    pub const ZERO: Timestamp = Timestamp { secs: 0, micros: 0 };

    /// Build a timestamp, carrying whole seconds out of `micros`.
    pub fn new(secs: u64, micros: u32) -> Self {
        let carry = u64::from(micros) / MICROS_PER_SEC;
        Self {
            secs: secs.saturating_add(carry),
            micros: (u64::from(micros) % MICROS_PER_SEC) as u32,
        }
    }

    pub fn from_micros(total: u64) -> Self {
        Self {
            secs: total / MICROS_PER_SEC,
            micros: (total % MICROS_PER_SEC) as u32,
        }
    }

    pub fn from_duration(duration: Duration) -> Self {
        Self {
            secs: duration.as_secs(),
            micros: duration.subsec_micros(),
        }
    }

    pub fn secs(&self) -> u64 {
        self.secs
    }

    pub fn micros(&self) -> u32 {
        self.micros
    }

    /// Total microseconds, saturating at `u64::MAX`.
    pub fn as_micros(&self) -> u64 {
        self.secs
            .saturating_mul(MICROS_PER_SEC)
            .saturating_add(u64::from(self.micros))
    }

    /// True for the zero sentinel.
    pub fn is_unavailable(&self) -> bool {
        *self == Self::ZERO
    }

    /// Advance by a millisecond duration.
    ///
    /// Uses exact microsecond carry. Sub-second remainders are never rounded
    /// into whole seconds.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tablefsm::core::Timestamp;
    ///
    /// let ts = Timestamp::new(10, 600_000).add_millis(1_500);
    /// assert_eq!(ts, Timestamp::new(12, 100_000));
    /// ```
    pub fn add_millis(&self, ms: u64) -> Self {
        let micros = u64::from(self.micros) + (ms % 1_000) * MICROS_PER_MILLI;
        Self {
            secs: self
                .secs
                .saturating_add(ms / 1_000)
                .saturating_add(micros / MICROS_PER_SEC),
            micros: (micros % MICROS_PER_SEC) as u32,
        }
    }

    /// Time elapsed since `earlier`, zero if `earlier` is in the future.
    pub fn saturating_duration_since(&self, earlier: Timestamp) -> Duration {
        Duration::from_micros(self.as_micros().saturating_sub(earlier.as_micros()))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}", self.secs, self.micros)
    }
}

/// Result of comparing the current time against a deadline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimeStatus {
    /// `now` and the deadline are the same instant.
    Equal,
    /// The deadline lies strictly before `now`.
    Expired,
    /// The deadline lies strictly after `now`.
    NotExpired,
}

impl TimeStatus {
    /// Whether the driver selects the timeout entry for this status.
    ///
    /// Reaching the deadline instant counts as timed out.
    pub fn is_due(self) -> bool {
        !matches!(self, TimeStatus::NotExpired)
    }
}

/// Compare `now` against `deadline`.
///
/// # Example
///
/// ```rust
/// use tablefsm::core::{compare, TimeStatus, Timestamp};
///
/// let deadline = Timestamp::new(5, 10);
/// assert_eq!(compare(Timestamp::new(5, 11), deadline), TimeStatus::Expired);
/// assert_eq!(compare(Timestamp::new(5, 10), deadline), TimeStatus::Equal);
/// assert_eq!(compare(Timestamp::new(4, 999_999), deadline), TimeStatus::NotExpired);
/// ```
pub fn compare(now: Timestamp, deadline: Timestamp) -> TimeStatus {
    if deadline.secs < now.secs {
        return TimeStatus::Expired;
    }
    if deadline.secs > now.secs {
        return TimeStatus::NotExpired;
    }
    match deadline.micros.cmp(&now.micros) {
        std::cmp::Ordering::Equal => TimeStatus::Equal,
        std::cmp::Ordering::Less => TimeStatus::Expired,
        std::cmp::Ordering::Greater => TimeStatus::NotExpired,
    }
}

/// Monotonic time source.
///
/// Implementations must never go backwards within a process.
pub trait Clock: fmt::Debug + Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Process-relative clock backed by [`Instant`].
#[derive(Clone, Copy, Debug, Default)]
pub struct MonotonicClock;

impl MonotonicClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        static ORIGIN: OnceLock<Instant> = OnceLock::new();
        let elapsed = ORIGIN.get_or_init(Instant::now).elapsed();
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        // Shifted by one tick so a real reading is never the zero sentinel.
        Timestamp::from_micros(micros.saturating_add(1))
    }
}

/// Manually advanced clock shared between clones.
///
/// Every clone observes the same time, so a test can keep one handle while
/// an instance reads through another.
///
/// # Example
///
/// ```rust
/// use tablefsm::core::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// let observer = clock.clone();
/// let before = observer.now();
/// clock.advance_millis(250);
/// assert_eq!(observer.now(), before.add_millis(250));
/// ```
#[derive(Clone, Debug)]
pub struct ManualClock {
    micros: Arc<AtomicU64>,
}

impl ManualClock {
    /// Start at one second past the origin.
    pub fn new() -> Self {
        Self::starting_at(Timestamp::new(1, 0))
    }

    pub fn starting_at(start: Timestamp) -> Self {
        Self {
            micros: Arc::new(AtomicU64::new(start.as_micros())),
        }
    }

    pub fn advance(&self, by: Duration) {
        let delta = u64::try_from(by.as_micros()).unwrap_or(u64::MAX);
        // Always `Ok`: the update closure never declines.
        self.micros
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(current.saturating_add(delta))
            })
            .ok();
    }

    pub fn advance_millis(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    /// Jump to `to`. Setting [`Timestamp::ZERO`] simulates an unavailable
    /// time source.
    pub fn set(&self, to: Timestamp) {
        self.micros.store(to.as_micros(), Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_micros(self.micros.load(Ordering::SeqCst))
    }
}

//! Client activity tracking.
//!
//! A single timestamp records when the last request arrived. It is written
//! by every transport worker and read by status probes; stale reads are fine.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Duration, TimeZone, Utc};

/// How recently a request must have arrived for a client to count as connected.
pub const ACTIVITY_WINDOW_SECS: i64 = 30;

const NEVER: i64 = i64::MIN;

/// Wall-clock time of the most recent inbound request.
#[derive(Debug)]
pub struct ActivityClock {
    last_millis: AtomicI64,
}

impl Default for ActivityClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityClock {
    /// Creates a clock that has never seen a request.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_millis: AtomicI64::new(NEVER),
        }
    }

    /// Records a request arriving now.
    pub fn record(&self) {
        self.record_at(Utc::now());
    }

    /// Records a request arriving at `at`.
    pub fn record_at(&self, at: DateTime<Utc>) {
        self.last_millis.store(at.timestamp_millis(), Ordering::Relaxed);
    }

    /// When the last request arrived, if any has.
    #[must_use]
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        match self.last_millis.load(Ordering::Relaxed) {
            NEVER => None,
            millis => Utc.timestamp_millis_opt(millis).single(),
        }
    }

    /// Returns `true` if a request arrived within `window` before `now`.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.last_activity()
            .is_some_and(|last| now.signed_duration_since(last) < window)
    }

    /// Estimated number of connected clients: 1 if a request arrived in the
    /// last [`ACTIVITY_WINDOW_SECS`] seconds, else 0.
    #[must_use]
    pub fn connected_clients(&self) -> u32 {
        u32::from(self.is_active_at(Utc::now(), Duration::seconds(ACTIVITY_WINDOW_SECS)))
    }
}

/// Coarse server state shown by status indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    /// The server is not running.
    Offline,
    /// Running, no recent client activity.
    Listening,
    /// Running with a client active inside the activity window.
    Connected,
}

impl ServerStatus {
    /// Derives the status from the running flag and the activity clock.
    #[must_use]
    pub fn probe(running: bool, clock: &ActivityClock) -> Self {
        if !running {
            Self::Offline
        } else if clock.connected_clients() > 0 {
            Self::Connected
        } else {
            Self::Listening
        }
    }

    /// Short label for display.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Offline => "Offline",
            Self::Listening => "Listening",
            Self::Connected => "Connected",
        }
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

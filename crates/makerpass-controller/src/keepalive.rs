//! Keep-alive monitor.
//!
//! The authority pings every five minutes. If nothing at all is heard for
//! longer than the keep-alive timeout while the terminal is authenticated, the
//! connection is presumed dead and must be dropped so the transport can
//! reconnect.

use std::time::{Duration, Instant};

use crate::connectivity::ConnectivityState;

/// Tracks the last time anything was heard from the authority.
#[derive(Debug, Clone)]
pub struct KeepAliveMonitor {
    timeout: Duration,
    last_activity: Instant,
}

impl KeepAliveMonitor {
    pub fn new(timeout: Duration, now: Instant) -> Self {
        Self {
            timeout,
            last_activity: now,
        }
    }

    /// Stamp "last heard from authority".
    pub fn record_activity(&mut self, now: Instant) {
        self.last_activity = now;
    }

    #[must_use]
    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the silence duration if the link should be failed.
    ///
    /// Only an open, authenticated connection can time out. The caller is
    /// expected to reset connectivity when this fires, which keeps it from
    /// firing again on the next tick.
    #[must_use]
    pub fn check_timeout(&self, conn: &ConnectivityState, now: Instant) -> Option<Duration> {
        if !(conn.socket_open() && conn.authenticated()) {
            return None;
        }
        let silence = now.saturating_duration_since(self.last_activity);
        (silence > self.timeout).then_some(silence)
    }
}

//! Card presence monitor.
//!
//! Some machines must only run while the operator's card stays on the reader.
//! Readers report the card repeatedly while it is present, so the session is
//! ended once the gap since the last sighting exceeds the presence timeout.
//! The check is purely local and works the same with or without a link.

use std::time::{Duration, Instant};

use makerpass_core::{CardCode, DeviceType};

use crate::relay::RelayStateKind;

/// Last card sighting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardPresence {
    pub last_code: Option<CardCode>,
    pub last_seen_at: Option<Instant>,
}

impl CardPresence {
    pub fn record(&mut self, code: CardCode, now: Instant) {
        self.last_code = Some(code);
        self.last_seen_at = Some(now);
    }

    pub fn clear(&mut self) {
        self.last_code = None;
        self.last_seen_at = None;
    }
}

#[derive(Debug, Clone)]
pub struct PresenceMonitor {
    timeout: Duration,
    presence: CardPresence,
}

impl PresenceMonitor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            presence: CardPresence::default(),
        }
    }

    #[must_use]
    pub fn presence(&self) -> &CardPresence {
        &self.presence
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Record a sighting. Every scan counts, whatever its outcome.
    pub fn record_scan(&mut self, code: CardCode, now: Instant) {
        self.presence.record(code, now);
    }

    /// Returns `true` if a presence-gated session must be ended now.
    ///
    /// Only applies to machines in `MachineRunning` whose resource requires
    /// card presence. A session with no sighting on record counts as expired.
    #[must_use]
    pub fn should_end(
        &self,
        required: bool,
        device_type: DeviceType,
        state: RelayStateKind,
        now: Instant,
    ) -> bool {
        if !(required && device_type.is_machine() && state == RelayStateKind::MachineRunning) {
            return false;
        }
        match self.presence.last_seen_at {
            Some(seen) => now.saturating_duration_since(seen) > self.timeout,
            None => true,
        }
    }

    pub fn clear(&mut self) {
        self.presence.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const TIMEOUT: Duration = Duration::from_secs(2);

    fn card() -> CardCode {
        CardCode::new("00AB12CD").unwrap()
    }

    #[test]
    fn test_record_and_clear() {
        let now = Instant::now();
        let mut monitor = PresenceMonitor::new(TIMEOUT);
        monitor.record_scan(card(), now);
        assert_eq!(monitor.presence().last_code, Some(card()));
        assert_eq!(monitor.presence().last_seen_at, Some(now));

        monitor.clear();
        assert_eq!(monitor.presence(), &CardPresence::default());
    }

    #[test]
    fn test_ends_only_after_gap_exceeds_timeout() {
        let t0 = Instant::now();
        let mut monitor = PresenceMonitor::new(TIMEOUT);
        monitor.record_scan(card(), t0);

        let check = |now| {
            monitor.should_end(true, DeviceType::Machine, RelayStateKind::MachineRunning, now)
        };
        assert!(!check(t0 + TIMEOUT));
        assert!(check(t0 + TIMEOUT + Duration::from_millis(1)));
    }

    #[test]
    fn test_missing_sighting_counts_as_expired() {
        let monitor = PresenceMonitor::new(TIMEOUT);
        assert!(monitor.should_end(
            true,
            DeviceType::Machine,
            RelayStateKind::MachineRunning,
            Instant::now()
        ));
    }

    #[rstest]
    #[case(false, DeviceType::Machine, RelayStateKind::MachineRunning)]
    #[case(true, DeviceType::Door, RelayStateKind::DoorPulsing)]
    #[case(true, DeviceType::Machine, RelayStateKind::Idle)]
    fn test_inactive_outside_gated_sessions(
        #[case] required: bool,
        #[case] device_type: DeviceType,
        #[case] state: RelayStateKind,
    ) {
        let monitor = PresenceMonitor::new(TIMEOUT);
        let later = Instant::now() + Duration::from_secs(60);
        assert!(!monitor.should_end(required, device_type, state, later));
    }
}

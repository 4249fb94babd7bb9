//! Session and relay state machine.
//!
//! The relay is never tracked as a separate flag. Whether it is energized, and
//! until when, is derived from the single phase the machine is in, so an
//! energized relay without an active door pulse or machine session cannot be
//! represented.
//!
//! # States
//!
//! - `Idle`: relay off
//! - `DoorPulsing`: relay on until a deadline; door devices only
//! - `MachineRunning`: relay on for the length of a session; machine devices only
//!
//! # Transitions
//!
//! - `grant`: Idle | DoorPulsing → DoorPulsing (door), any → MachineRunning (machine)
//! - `expire`: DoorPulsing → Idle once the deadline has passed
//! - `end_session`: MachineRunning → Idle
//!
//! A repeated grant re-arms the door deadline or replaces the machine session.
//! Grants never stack.
//!
//! # Examples
//!
//! ```
//! use makerpass_controller::{RelayMachine, RelayStateKind};
//! use makerpass_core::DeviceType;
//! use std::time::{Duration, Instant};
//!
//! let t0 = Instant::now();
//! let mut relay = RelayMachine::new(DeviceType::Door, Duration::from_secs(5));
//!
//! relay.grant("Alice", None, t0);
//! assert!(relay.is_energized());
//!
//! relay.expire(t0 + Duration::from_secs(5));
//! assert_eq!(relay.state_kind(), RelayStateKind::Idle);
//! assert!(!relay.is_energized());
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use makerpass_core::DeviceType;
use makerpass_core::constants::MAX_HISTORY_SIZE;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Observable state of the relay machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayStateKind {
    /// Relay off, no active user.
    Idle,

    /// Door relay energized until its deadline.
    DoorPulsing,

    /// Machine relay energized for an open-ended session.
    MachineRunning,
}

impl fmt::Display for RelayStateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelayStateKind::Idle => "Idle",
            RelayStateKind::DoorPulsing => "DoorPulsing",
            RelayStateKind::MachineRunning => "MachineRunning",
        };
        write!(f, "{name}")
    }
}

/// An active machine session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Authority-issued id; `None` for grants that carried no id.
    pub session_id: Option<String>,

    pub user_name: String,

    pub started_at: Instant,
}

impl Session {
    /// Time the session has been running at `now`.
    #[must_use]
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }
}

/// Relay output as seen from outside, derived from the machine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayState {
    pub active: bool,
    pub mode: DeviceType,
    /// Deadline for a door pulse; `None` while idle or running a machine.
    pub end_at: Option<Instant>,
}

/// A single state change with the time it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayTransition {
    pub from: RelayStateKind,
    pub to: RelayStateKind,
    pub at: Instant,
}

#[derive(Debug, Clone)]
enum Phase {
    Idle,
    DoorPulsing { user: String, ends_at: Instant },
    MachineRunning(Session),
}

impl Phase {
    fn kind(&self) -> RelayStateKind {
        match self {
            Phase::Idle => RelayStateKind::Idle,
            Phase::DoorPulsing { .. } => RelayStateKind::DoorPulsing,
            Phase::MachineRunning(_) => RelayStateKind::MachineRunning,
        }
    }
}

/// Relay and session lifecycle for one configured device type.
#[derive(Debug)]
pub struct RelayMachine {
    device_type: DeviceType,
    door_pulse: Duration,
    phase: Phase,
    history: VecDeque<RelayTransition>,
}

impl RelayMachine {
    pub fn new(device_type: DeviceType, door_pulse: Duration) -> Self {
        Self {
            device_type,
            door_pulse,
            phase: Phase::Idle,
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    #[must_use]
    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    #[must_use]
    pub fn state_kind(&self) -> RelayStateKind {
        self.phase.kind()
    }

    #[must_use]
    pub fn relay_state(&self) -> RelayState {
        RelayState {
            active: self.is_energized(),
            mode: self.device_type,
            end_at: self.door_deadline(),
        }
    }

    #[must_use]
    pub fn is_energized(&self) -> bool {
        !matches!(self.phase, Phase::Idle)
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        match &self.phase {
            Phase::MachineRunning(session) => Some(session),
            _ => None,
        }
    }

    /// User the relay is currently energized for.
    #[must_use]
    pub fn active_user(&self) -> Option<&str> {
        match &self.phase {
            Phase::Idle => None,
            Phase::DoorPulsing { user, .. } => Some(user),
            Phase::MachineRunning(session) => Some(&session.user_name),
        }
    }

    #[must_use]
    pub fn door_deadline(&self) -> Option<Instant> {
        match &self.phase {
            Phase::DoorPulsing { ends_at, .. } => Some(*ends_at),
            _ => None,
        }
    }

    /// Energize the relay for `user`.
    ///
    /// Doors pulse for the configured duration from `now`, re-arming any
    /// running pulse. Machines open a session with `session_id`, replacing
    /// any running one.
    pub fn grant(
        &mut self,
        user: impl Into<String>,
        session_id: Option<String>,
        now: Instant,
    ) -> RelayTransition {
        let user = user.into();
        let next = match self.device_type {
            DeviceType::Door => {
                let ends_at = now + self.door_pulse;
                let pulse_ms = self.door_pulse.as_millis();
                info!(%user, pulse_ms, "Door unlocked");
                Phase::DoorPulsing { user, ends_at }
            }
            DeviceType::Machine => {
                info!(%user, session_id = ?session_id, "Machine session started");
                Phase::MachineRunning(Session {
                    session_id,
                    user_name: user,
                    started_at: now,
                })
            }
        };
        self.enter(next, now)
    }

    /// End a door pulse whose deadline has been reached.
    ///
    /// This is the only way a door pulse ends.
    pub fn expire(&mut self, now: Instant) -> Option<RelayTransition> {
        match self.phase {
            Phase::DoorPulsing { ends_at, .. } if now >= ends_at => {
                info!("Door relocked");
                Some(self.enter(Phase::Idle, now))
            }
            _ => None,
        }
    }

    /// End the running machine session and return it.
    ///
    /// A no-op returning `None` unless a session is running.
    pub fn end_session(&mut self, now: Instant) -> Option<Session> {
        if !matches!(self.phase, Phase::MachineRunning(_)) {
            debug!(state = %self.state_kind(), "end_session with no running session, ignoring");
            return None;
        }

        let previous = std::mem::replace(&mut self.phase, Phase::Idle);
        self.record(RelayStateKind::MachineRunning, RelayStateKind::Idle, now);

        match previous {
            Phase::MachineRunning(session) => {
                let elapsed_secs = session.elapsed(now).as_secs();
                info!(user = %session.user_name, elapsed_secs, "Machine session ended");
                Some(session)
            }
            _ => None,
        }
    }

    /// Recent transitions, oldest first. Bounded to the last 100.
    pub fn history(&self) -> &VecDeque<RelayTransition> {
        &self.history
    }

    /// The last `count` transitions, oldest first.
    pub fn last_transitions(&self, count: usize) -> Vec<RelayTransition> {
        self.history
            .iter()
            .rev()
            .take(count)
            .rev()
            .copied()
            .collect()
    }

    fn enter(&mut self, next: Phase, now: Instant) -> RelayTransition {
        let from = self.phase.kind();
        let to = next.kind();
        self.phase = next;
        self.record(from, to, now)
    }

    fn record(&mut self, from: RelayStateKind, to: RelayStateKind, at: Instant) -> RelayTransition {
        let transition = RelayTransition { from, to, at };
        if self.history.len() >= MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
        self.history.push_back(transition);
        transition
    }
}

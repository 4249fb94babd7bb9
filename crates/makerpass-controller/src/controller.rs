//! The access controller aggregate.
//!
//! [`AccessController`] owns every piece of control state and sequences the
//! components. Each entry point takes the current time and returns the
//! [`ControllerAction`]s to execute, in order. Nothing here blocks, performs
//! I/O, or fails.
//!
//! # Tick order
//!
//! [`AccessController::tick`] evaluates timers in a fixed order:
//!
//! 1. keep-alive expiry
//! 2. door pulse expiry
//! 3. card presence
//! 4. periodic display refresh
//! 5. return to the idle screen after a temporary message
//!
//! The driver processes inbound messages before ticking in the same
//! iteration, so a message and a timeout landing together resolve with the
//! message first.
//!
//! # Examples
//!
//! ```
//! use makerpass_controller::{AccessController, ControllerAction, DeviceIdentity};
//! use makerpass_core::{CardCode, DeviceType, TimingConfig};
//! use std::time::{Duration, Instant};
//!
//! let identity = DeviceIdentity {
//!     resource_id: "ERNPTY".into(),
//!     api_key: "k3y".into(),
//!     device_type: DeviceType::Door,
//!     master_key: CardCode::new("0BADCAFE").unwrap(),
//!     door_pulse: Duration::from_secs(5),
//! };
//! let t0 = Instant::now();
//! let mut controller = AccessController::new(identity, &TimingConfig::default(), t0);
//!
//! // The master key opens the door even while offline.
//! let actions = controller.on_scan(CardCode::new("0badcafe").unwrap(), t0);
//! assert!(actions.contains(&ControllerAction::SetRelay { energized: true }));
//! ```

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use makerpass_core::constants::{
    DENY_FLASH_MS, DISPLAY_REFRESH_MS, MASTER_KEY_USER, SCAN_FLASH_MS, TEMP_MESSAGE_MS,
};
use makerpass_core::{CardCode, DeviceConfig, DeviceType, DisplayRequest, TimingConfig};
use makerpass_protocol::{Inbound, MessageParser, Outbound};
use tracing::{debug, info, trace, warn};

use crate::action::ControllerAction;
use crate::connectivity::ConnectivityState;
use crate::handshake::Handshake;
use crate::keepalive::KeepAliveMonitor;
use crate::presence::{CardPresence, PresenceMonitor};
use crate::relay::{RelayMachine, RelayState, RelayStateKind, RelayTransition, Session};
use crate::router::{AccessRouter, Decision, MessageRoute, ScanRoute};

/// Fixed identity of this terminal.
#[derive(Clone)]
pub struct DeviceIdentity {
    pub resource_id: String,
    pub api_key: String,
    pub device_type: DeviceType,
    pub master_key: CardCode,
    pub door_pulse: Duration,
}

impl From<&DeviceConfig> for DeviceIdentity {
    fn from(config: &DeviceConfig) -> Self {
        Self {
            resource_id: config.resource_id.clone(),
            api_key: config.api_key.clone(),
            device_type: config.device_type,
            master_key: config.master_key.clone(),
            door_pulse: config.door_pulse(),
        }
    }
}

impl std::fmt::Debug for DeviceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceIdentity")
            .field("resource_id", &self.resource_id)
            .field("api_key", &"<redacted>")
            .field("device_type", &self.device_type)
            .field("master_key", &"<redacted>")
            .field("door_pulse", &self.door_pulse)
            .finish()
    }
}

/// Control core of the terminal.
#[derive(Debug)]
pub struct AccessController {
    resource_id: String,
    conn: ConnectivityState,
    keepalive: KeepAliveMonitor,
    handshake: Handshake,
    router: AccessRouter,
    relay: RelayMachine,
    presence: PresenceMonitor,
    /// Last time the countdown or runtime screen was pushed.
    last_refresh: Option<Instant>,
    /// When the temporary message on screen gives way to the idle screen.
    temp_until: Option<Instant>,
}

impl AccessController {
    pub fn new(identity: DeviceIdentity, timing: &TimingConfig, now: Instant) -> Self {
        let DeviceIdentity {
            resource_id,
            api_key,
            device_type,
            master_key,
            door_pulse,
        } = identity;

        Self {
            conn: ConnectivityState::new(resource_id.clone()),
            keepalive: KeepAliveMonitor::new(timing.keepalive_timeout(), now),
            handshake: Handshake::new(resource_id.clone(), api_key),
            router: AccessRouter::new(master_key),
            relay: RelayMachine::new(device_type, door_pulse),
            presence: PresenceMonitor::new(timing.card_present_timeout()),
            last_refresh: None,
            temp_until: None,
            resource_id,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn connectivity(&self) -> &ConnectivityState {
        &self.conn
    }

    pub fn relay_state(&self) -> RelayState {
        self.relay.relay_state()
    }

    pub fn session(&self) -> Option<&Session> {
        self.relay.session()
    }

    pub fn state_kind(&self) -> RelayStateKind {
        self.relay.state_kind()
    }

    pub fn presence(&self) -> &CardPresence {
        self.presence.presence()
    }

    pub fn history(&self) -> &VecDeque<RelayTransition> {
        self.relay.history()
    }

    pub fn device_type(&self) -> DeviceType {
        self.relay.device_type()
    }

    /// Screen to show when nothing is in progress.
    pub fn idle_display(&self) -> DisplayRequest {
        if !self.conn.is_online() {
            DisplayRequest::Offline
        } else if !self.conn.resource_enabled() {
            DisplayRequest::ResourceDisabled
        } else {
            DisplayRequest::Ready {
                resource_name: self.conn.resource_name().to_string(),
            }
        }
    }

    // ------------------------------------------------------------------
    // Connectivity events
    // ------------------------------------------------------------------

    /// The link collaborator reported an association change.
    pub fn on_link_change(&mut self, up: bool, _now: Instant) -> Vec<ControllerAction> {
        if !self.conn.set_link(up) {
            return Vec::new();
        }
        if up {
            info!("Link up");
            Vec::new()
        } else {
            warn!("Link down");
            self.temp_until = None;
            vec![ControllerAction::Display(DisplayRequest::Offline)]
        }
    }

    /// The transport opened a socket. Authenticates immediately.
    pub fn on_connected(&mut self, now: Instant) -> Vec<ControllerAction> {
        info!(resource_id = %self.resource_id, "Connected to authority, authenticating");
        self.conn.socket_opened();
        self.keepalive.record_activity(now);
        vec![ControllerAction::Send(self.handshake.device_auth())]
    }

    /// The transport lost its socket.
    ///
    /// Connectivity is reset; a running door pulse or machine session is left
    /// alone.
    pub fn on_disconnected(&mut self, _now: Instant) -> Vec<ControllerAction> {
        if !self.conn.socket_closed() {
            return Vec::new();
        }
        warn!(
            state = %self.relay.state_kind(),
            "Disconnected from authority"
        );
        self.temp_until = None;
        vec![ControllerAction::Display(DisplayRequest::Offline)]
    }

    /// A transport-level ping or pong frame arrived.
    pub fn on_transport_activity(&mut self, now: Instant) {
        self.keepalive.record_activity(now);
    }

    // ------------------------------------------------------------------
    // Authority messages
    // ------------------------------------------------------------------

    /// A text frame arrived. It counts as activity even if it fails to decode.
    pub fn on_text(&mut self, text: &str, now: Instant) -> Vec<ControllerAction> {
        self.keepalive.record_activity(now);
        match MessageParser::parse(text) {
            Ok(msg) => self.on_message(msg, now),
            Err(e) => {
                warn!(error = %e, "Dropping malformed authority message");
                Vec::new()
            }
        }
    }

    pub fn on_message(&mut self, msg: Inbound, now: Instant) -> Vec<ControllerAction> {
        self.keepalive.record_activity(now);
        trace!(kind = msg.kind(), "Authority message");

        match self.router.route_message(msg) {
            MessageRoute::AuthSuccess(grant) => {
                match self.handshake.on_auth_success(&mut self.conn, &grant) {
                    // Keep the countdown or runtime screen up during a re-auth
                    Some(display) if !self.relay.is_energized() => {
                        vec![ControllerAction::Display(display)]
                    }
                    _ => Vec::new(),
                }
            }
            MessageRoute::AuthFailure { message } => {
                let display = self.handshake.on_auth_failure(&mut self.conn, &message);
                vec![
                    self.temp_message(display, now),
                    ControllerAction::Disconnect { reason: message },
                ]
            }
            MessageRoute::Ping => vec![ControllerAction::Send(Outbound::Pong)],
            MessageRoute::Pong => Vec::new(),
            MessageRoute::Decision(Decision::Grant {
                user_name,
                session_id,
            }) => self.grant(user_name, session_id, now),
            MessageRoute::Decision(Decision::Deny { reason }) => {
                info!(%reason, "Access denied by authority");
                vec![
                    self.temp_message(DisplayRequest::AccessDenied { reason }, now),
                    ControllerAction::FlashIndicator(Duration::from_millis(DENY_FLASH_MS)),
                ]
            }
            MessageRoute::Decision(Decision::EndSession { user_name }) => {
                self.end_session(user_name, now)
            }
            MessageRoute::Ignored { kind } => {
                warn!(%kind, "Ignoring unknown authority message");
                Vec::new()
            }
        }
    }

    // ------------------------------------------------------------------
    // Scans
    // ------------------------------------------------------------------

    /// A card was read.
    pub fn on_scan(&mut self, code: CardCode, now: Instant) -> Vec<ControllerAction> {
        self.presence.record_scan(code.clone(), now);
        let mut actions = vec![ControllerAction::FlashIndicator(Duration::from_millis(
            SCAN_FLASH_MS,
        ))];

        match self.router.route_scan(&code, &self.conn) {
            ScanRoute::MasterKey => {
                info!("Master key presented");
                actions.extend(self.grant(MASTER_KEY_USER.to_string(), None, now));
            }
            ScanRoute::OfflineDeny => {
                // Re-sightings during a running session are expected; only
                // report a denial when nothing is in progress.
                if self.relay.is_energized() {
                    trace!(card = %code, "Card sighting while offline");
                } else {
                    warn!(card = %code, "Scan denied, authority unreachable");
                    actions.push(self.temp_message(DisplayRequest::OfflineDenied, now));
                    actions.push(ControllerAction::FlashIndicator(Duration::from_millis(
                        DENY_FLASH_MS,
                    )));
                }
            }
            ScanRoute::Forward => {
                debug!(card = %code, "Forwarding scan to authority");
                actions.push(ControllerAction::Send(Outbound::RfidScan {
                    resource_id: self.resource_id.clone(),
                    rfid_code: code,
                }));
            }
        }

        actions
    }

    // ------------------------------------------------------------------
    // Timers
    // ------------------------------------------------------------------

    pub fn tick(&mut self, now: Instant) -> Vec<ControllerAction> {
        let mut actions = Vec::new();

        if let Some(silence) = self.keepalive.check_timeout(&self.conn, now) {
            warn!(
                silence_secs = silence.as_secs(),
                "Authority silent past keep-alive timeout, dropping connection"
            );
            self.conn.socket_closed();
            self.temp_until = None;
            actions.push(ControllerAction::Disconnect {
                reason: "keep-alive timeout".to_string(),
            });
            actions.push(ControllerAction::Display(DisplayRequest::Offline));
        }

        if self.relay.expire(now).is_some() {
            self.last_refresh = None;
            self.temp_until = None;
            actions.push(ControllerAction::SetRelay { energized: false });
            actions.push(ControllerAction::Display(self.idle_display()));
        }

        if self.presence.should_end(
            self.conn.require_card_present(),
            self.relay.device_type(),
            self.relay.state_kind(),
            now,
        ) {
            actions.extend(self.end_for_absent_card(now));
        }

        if let Some(display) = self.refresh_display(now) {
            actions.push(ControllerAction::Display(display));
        }

        if self.temp_until.is_some_and(|until| now >= until) {
            self.temp_until = None;
            // A grant since then owns the screen
            if !self.relay.is_energized() {
                actions.push(ControllerAction::Display(self.idle_display()));
            }
        }

        actions
    }

    /// Show a screen that reverts to the idle screen after [`TEMP_MESSAGE_MS`].
    fn temp_message(&mut self, display: DisplayRequest, now: Instant) -> ControllerAction {
        self.temp_until = Some(now + Duration::from_millis(TEMP_MESSAGE_MS));
        ControllerAction::Display(display)
    }

    // ------------------------------------------------------------------
    // Relay sequencing
    // ------------------------------------------------------------------

    fn grant(
        &mut self,
        user_name: String,
        session_id: Option<String>,
        now: Instant,
    ) -> Vec<ControllerAction> {
        let was_energized = self.relay.is_energized();
        self.relay.grant(user_name.clone(), session_id, now);
        self.last_refresh = Some(now);
        self.temp_until = None;

        let mut actions = Vec::with_capacity(2);
        if !was_energized {
            actions.push(ControllerAction::SetRelay { energized: true });
        }
        let display = match self.relay.device_type() {
            DeviceType::Door => DisplayRequest::DoorCountdown {
                user: user_name,
                remaining_secs: self.door_remaining_secs(now),
            },
            DeviceType::Machine => DisplayRequest::SessionStarted { user: user_name },
        };
        actions.push(ControllerAction::Display(display));
        actions
    }

    /// End the machine session. A non-empty `user_override` replaces the
    /// session's user on the display.
    fn end_session(
        &mut self,
        user_override: Option<String>,
        now: Instant,
    ) -> Vec<ControllerAction> {
        let Some(session) = self.relay.end_session(now) else {
            return Vec::new();
        };
        self.last_refresh = None;

        let user = user_override
            .filter(|name| !name.is_empty())
            .unwrap_or(session.user_name);
        vec![
            ControllerAction::SetRelay { energized: false },
            self.temp_message(DisplayRequest::SessionEnded { user }, now),
        ]
    }

    fn end_for_absent_card(&mut self, now: Instant) -> Vec<ControllerAction> {
        let timeout_ms = self.presence.timeout().as_millis();
        warn!(timeout_ms, "Card removed, ending session");

        let mut actions = Vec::new();
        let session_id = self
            .relay
            .session()
            .and_then(|session| session.session_id.clone())
            .filter(|id| !id.is_empty());

        match session_id {
            Some(session_id) if self.conn.socket_open() && self.conn.authenticated() => {
                actions.push(ControllerAction::Send(Outbound::SessionEnd {
                    resource_id: self.resource_id.clone(),
                    session_id,
                }));
            }
            _ => debug!("Ending session locally without notifying authority"),
        }

        actions.extend(self.end_session(None, now));
        self.presence.clear();
        actions
    }

    fn refresh_display(&mut self, now: Instant) -> Option<DisplayRequest> {
        let last = self.last_refresh?;
        if now.saturating_duration_since(last) < Duration::from_millis(DISPLAY_REFRESH_MS) {
            return None;
        }
        self.last_refresh = Some(now);

        let user = self.relay.active_user()?.to_string();
        match self.relay.state_kind() {
            RelayStateKind::DoorPulsing => Some(DisplayRequest::DoorCountdown {
                user,
                remaining_secs: self.door_remaining_secs(now),
            }),
            RelayStateKind::MachineRunning => Some(DisplayRequest::SessionRuntime {
                user,
                elapsed_secs: self.relay.session()?.elapsed(now).as_secs(),
            }),
            RelayStateKind::Idle => None,
        }
    }

    fn door_remaining_secs(&self, now: Instant) -> u64 {
        self.relay
            .door_deadline()
            .map(|deadline| {
                deadline
                    .saturating_duration_since(now)
                    .as_millis()
                    .div_ceil(1000) as u64
            })
            .unwrap_or(0)
    }
}

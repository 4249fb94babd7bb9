//! Access-control core of the MakerPass terminal.
//!
//! This crate decides, from card scans and authority messages, whether the
//! relay is energized, for how long, and under which offline rules. It is a
//! pure state machine: every operation takes the current time and returns the
//! [`ControllerAction`]s the driver must execute. No I/O happens here.
//!
//! # Components
//!
//! - [`ConnectivityState`]: link, socket and authentication flags
//! - [`KeepAliveMonitor`]: declares the authority dead after prolonged silence
//! - [`Handshake`]: `device_auth` on connect, auth result handling
//! - [`AccessRouter`]: maps scans and authority messages to decisions
//! - [`RelayMachine`]: relay and session lifecycle for door and machine devices
//! - [`PresenceMonitor`]: ends presence-gated sessions when the card is gone
//! - [`AccessController`]: owns all of the above and sequences them

pub mod action;
pub mod connectivity;
pub mod controller;
pub mod handshake;
pub mod keepalive;
pub mod presence;
pub mod relay;
pub mod router;

pub use action::ControllerAction;
pub use connectivity::ConnectivityState;
pub use controller::{AccessController, DeviceIdentity};
pub use handshake::Handshake;
pub use keepalive::KeepAliveMonitor;
pub use presence::{CardPresence, PresenceMonitor};
pub use relay::{RelayMachine, RelayState, RelayStateKind, RelayTransition, Session};
pub use router::{AccessRouter, Decision, MessageRoute, ScanRoute};

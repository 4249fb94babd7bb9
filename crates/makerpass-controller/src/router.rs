//! Access decision router.
//!
//! Scans are routed locally first: the master key opens without the
//! authority, everything else is denied while offline and forwarded while
//! online. Authority messages are matched exhaustively and reduced to the few
//! outcomes the controller acts on.

use makerpass_core::CardCode;
use makerpass_protocol::{AuthGrant, Inbound};

use crate::connectivity::ConnectivityState;

/// Where a scan goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanRoute {
    /// Grant locally as the master key, regardless of connectivity.
    MasterKey,
    /// Deny locally without contacting the authority.
    OfflineDeny,
    /// Send `rfid_scan` and wait for the authority's decision.
    Forward,
}

/// Access decision taken by the authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Grant {
        user_name: String,
        session_id: Option<String>,
    },
    Deny {
        reason: String,
    },
    EndSession {
        user_name: Option<String>,
    },
}

/// What an inbound message means to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageRoute {
    Decision(Decision),
    AuthSuccess(AuthGrant),
    AuthFailure { message: String },
    Ping,
    Pong,
    Ignored { kind: String },
}

#[derive(Debug, Clone)]
pub struct AccessRouter {
    master_key: CardCode,
}

impl AccessRouter {
    pub fn new(master_key: CardCode) -> Self {
        Self { master_key }
    }

    /// Decide where a scan goes.
    ///
    /// `CardCode` is normalized to uppercase, so the master key comparison is
    /// case-insensitive.
    #[must_use]
    pub fn route_scan(&self, code: &CardCode, conn: &ConnectivityState) -> ScanRoute {
        if *code == self.master_key {
            ScanRoute::MasterKey
        } else if !conn.link_up() || !conn.authenticated() {
            ScanRoute::OfflineDeny
        } else {
            ScanRoute::Forward
        }
    }

    #[must_use]
    pub fn route_message(&self, msg: Inbound) -> MessageRoute {
        match msg {
            Inbound::AuthSuccess(grant) => MessageRoute::AuthSuccess(grant),
            Inbound::AuthError { message } | Inbound::Error { message } => {
                MessageRoute::AuthFailure { message }
            }
            Inbound::Ping => MessageRoute::Ping,
            Inbound::Pong => MessageRoute::Pong,
            Inbound::AccessGranted { user_name } => MessageRoute::Decision(Decision::Grant {
                user_name,
                session_id: None,
            }),
            Inbound::AccessDenied { reason } => MessageRoute::Decision(Decision::Deny { reason }),
            Inbound::SessionStarted {
                session_id,
                user_name,
            } => MessageRoute::Decision(Decision::Grant {
                user_name,
                session_id,
            }),
            Inbound::SessionEnded { user_name } => {
                MessageRoute::Decision(Decision::EndSession { user_name })
            }
            Inbound::Unknown { kind } => MessageRoute::Ignored { kind },
        }
    }
}

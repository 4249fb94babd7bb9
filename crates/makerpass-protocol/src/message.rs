use std::fmt;

use makerpass_core::CardCode;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Message sent from the terminal to the authority.
///
/// # Serde representation
///
/// ```json
/// {"type":"device_auth","resource_id":"ERNPTY","api_key":"..."}
/// {"type":"rfid_scan","resource_id":"ERNPTY","rfid_code":"00AB12CD"}
/// {"type":"session_end","resource_id":"ERNPTY","session_id":"S1"}
/// {"type":"pong"}
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    /// Identity presented once per connection, immediately on connect.
    DeviceAuth { resource_id: String, api_key: String },

    /// Card scan forwarded for an access decision.
    RfidScan {
        resource_id: String,
        rfid_code: CardCode,
    },

    /// Terminal-initiated end of a machine session.
    SessionEnd {
        resource_id: String,
        session_id: String,
    },

    /// Reply to an authority `ping`.
    Pong,
}

impl Outbound {
    /// The `type` discriminant, for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Outbound::DeviceAuth { .. } => "device_auth",
            Outbound::RfidScan { .. } => "rfid_scan",
            Outbound::SessionEnd { .. } => "session_end",
            Outbound::Pong => "pong",
        }
    }

    /// Encode as a JSON text frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Json` if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// The API key must never reach the logs.
impl fmt::Debug for Outbound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outbound::DeviceAuth { resource_id, .. } => f
                .debug_struct("DeviceAuth")
                .field("resource_id", resource_id)
                .field("api_key", &"<redacted>")
                .finish(),
            Outbound::RfidScan {
                resource_id,
                rfid_code,
            } => f
                .debug_struct("RfidScan")
                .field("resource_id", resource_id)
                .field("rfid_code", rfid_code)
                .finish(),
            Outbound::SessionEnd {
                resource_id,
                session_id,
            } => f
                .debug_struct("SessionEnd")
                .field("resource_id", resource_id)
                .field("session_id", session_id)
                .finish(),
            Outbound::Pong => write!(f, "Pong"),
        }
    }
}

/// Attributes the authority attaches to a successful authentication.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthGrant {
    pub enabled: bool,
    pub require_card_present: bool,
    /// Display name; the terminal falls back to its resource id when absent.
    pub resource_name: Option<String>,
}

/// Message received from the authority, decoded once at the boundary.
///
/// Unrecognized `type` values collapse into [`Inbound::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    AuthSuccess(AuthGrant),
    AuthError {
        message: String,
    },
    Error {
        message: String,
    },
    Ping,
    Pong,
    AccessGranted {
        user_name: String,
    },
    AccessDenied {
        reason: String,
    },
    SessionStarted {
        /// `None` when the authority supplied no id or an empty one.
        session_id: Option<String>,
        user_name: String,
    },
    SessionEnded {
        user_name: Option<String>,
    },
    Unknown {
        kind: String,
    },
}

impl Inbound {
    /// The `type` discriminant, for logging.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Inbound::AuthSuccess(_) => "auth_success",
            Inbound::AuthError { .. } => "auth_error",
            Inbound::Error { .. } => "error",
            Inbound::Ping => "ping",
            Inbound::Pong => "pong",
            Inbound::AccessGranted { .. } => "access_granted",
            Inbound::AccessDenied { .. } => "access_denied",
            Inbound::SessionStarted { .. } => "session_started",
            Inbound::SessionEnded { .. } => "session_ended",
            Inbound::Unknown { kind } => kind,
        }
    }
}

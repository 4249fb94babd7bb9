//! Authority message parser.
//!
//! Converts a raw JSON text frame into an [`Inbound`] message. Decoding is
//! lenient in the same places the authority is: optional fields fall back to
//! defaults, a field of the wrong JSON type is treated as absent, and the user
//! name may arrive as either `user_name` or `user` (`user_name` wins).
//!
//! # Examples
//!
//! ```
//! use makerpass_protocol::{Inbound, MessageParser};
//!
//! let msg = MessageParser::parse(r#"{"type":"access_granted","user":"Alice"}"#).unwrap();
//! assert_eq!(msg, Inbound::AccessGranted { user_name: "Alice".into() });
//!
//! // Unknown types are not errors.
//! let msg = MessageParser::parse(r#"{"type":"firmware_update"}"#).unwrap();
//! assert_eq!(msg.kind(), "firmware_update");
//!
//! // Non-JSON payloads are.
//! assert!(MessageParser::parse("not json").is_err());
//! ```

use makerpass_core::constants::{DEFAULT_DENY_REASON, DEFAULT_ERROR_MESSAGE, DEFAULT_USER_NAME};
use serde_json::{Map, Value};

use crate::message::{AuthGrant, Inbound};
use crate::{ProtocolError, Result};

/// Parser for authority messages.
pub struct MessageParser;

impl MessageParser {
    /// Parse one JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Json` if the input is not JSON and
    /// `ProtocolError::Malformed` if it is not a JSON object.
    pub fn parse(input: &str) -> Result<Inbound> {
        let value: Value = serde_json::from_str(input)?;
        let obj = value
            .as_object()
            .ok_or_else(|| ProtocolError::Malformed("expected a JSON object".to_string()))?;

        Ok(Self::from_object(obj))
    }

    fn from_object(obj: &Map<String, Value>) -> Inbound {
        let kind = string_field(obj, &["type"]).unwrap_or_default();

        match kind.as_str() {
            "auth_success" => Inbound::AuthSuccess(AuthGrant {
                enabled: bool_field(obj, "enabled"),
                require_card_present: bool_field(obj, "require_card_present"),
                resource_name: string_field(obj, &["resource_name"]),
            }),
            "auth_error" => Inbound::AuthError {
                message: error_message(obj),
            },
            "error" => Inbound::Error {
                message: error_message(obj),
            },
            "ping" => Inbound::Ping,
            "pong" => Inbound::Pong,
            "access_granted" => Inbound::AccessGranted {
                user_name: user_name(obj),
            },
            "access_denied" => Inbound::AccessDenied {
                reason: string_field(obj, &["reason", "message"])
                    .unwrap_or_else(|| DEFAULT_DENY_REASON.to_string()),
            },
            "session_started" => Inbound::SessionStarted {
                session_id: string_field(obj, &["session_id"]).filter(|id| !id.is_empty()),
                user_name: user_name(obj),
            },
            "session_ended" => Inbound::SessionEnded {
                user_name: string_field(obj, &["user_name", "user"]),
            },
            _ => Inbound::Unknown { kind },
        }
    }
}

/// First of `keys` holding a JSON string.
fn string_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

fn bool_field(obj: &Map<String, Value>, key: &str) -> bool {
    obj.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn user_name(obj: &Map<String, Value>) -> String {
    string_field(obj, &["user_name", "user"]).unwrap_or_else(|| DEFAULT_USER_NAME.to_string())
}

fn error_message(obj: &Map<String, Value>) -> String {
    string_field(obj, &["message"]).unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string())
}

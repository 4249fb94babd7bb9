//! Authentication handshake.
//!
//! `device_auth` goes out as soon as the socket opens, without waiting for
//! anything; the authority enforces ordering on its side. The reply decides
//! whether the terminal is online.

use makerpass_core::DisplayRequest;
use makerpass_protocol::{AuthGrant, Outbound};
use tracing::{info, warn};

use crate::connectivity::ConnectivityState;

/// Device credentials presented on every connect.
#[derive(Clone)]
pub struct Handshake {
    resource_id: String,
    api_key: String,
}

impl Handshake {
    pub fn new(resource_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            api_key: api_key.into(),
        }
    }

    /// The `device_auth` message for a fresh connection.
    #[must_use]
    pub fn device_auth(&self) -> Outbound {
        Outbound::DeviceAuth {
            resource_id: self.resource_id.clone(),
            api_key: self.api_key.clone(),
        }
    }

    /// Apply an `auth_success`.
    ///
    /// Returns the screen to show, or `None` if the message arrived with no
    /// socket open and was ignored.
    pub fn on_auth_success(
        &self,
        conn: &mut ConnectivityState,
        grant: &AuthGrant,
    ) -> Option<DisplayRequest> {
        if !conn.apply_auth_success(grant, &self.resource_id) {
            return None;
        }

        info!(
            resource = %conn.resource_name(),
            enabled = conn.resource_enabled(),
            require_card_present = conn.require_card_present(),
            "Authenticated with authority"
        );

        Some(if conn.resource_enabled() {
            DisplayRequest::Ready {
                resource_name: conn.resource_name().to_string(),
            }
        } else {
            DisplayRequest::ResourceDisabled
        })
    }

    /// Apply an `auth_error` or `error`. The connection is treated as dead.
    pub fn on_auth_failure(&self, conn: &mut ConnectivityState, message: &str) -> DisplayRequest {
        warn!(%message, "Authority reported an error, dropping connection");
        conn.auth_failed();
        DisplayRequest::Error {
            message: message.to_string(),
        }
    }
}

impl std::fmt::Debug for Handshake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handshake")
            .field("resource_id", &self.resource_id)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

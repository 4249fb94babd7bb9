//! Connectivity state shared by the keep-alive monitor, the handshake and the
//! access router.
//!
//! Three independent flags describe how far the terminal can trust the
//! authority, ordered by strength:
//!
//! ```text
//! authenticated ⇒ socket_open ⇒ link_up
//! ```
//!
//! Every mutator preserves that chain: dropping a weaker flag clears all
//! stronger ones, and a stronger flag is never raised without the weaker ones.

use makerpass_protocol::AuthGrant;
use tracing::{debug, warn};

/// Link, socket and authentication flags plus the authority's view of this
/// resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectivityState {
    link_up: bool,
    socket_open: bool,
    authenticated: bool,
    resource_enabled: bool,
    require_card_present: bool,
    resource_name: String,
}

impl ConnectivityState {
    /// Create an all-offline state. `resource_name` is shown until the
    /// authority supplies a display name.
    pub fn new(resource_name: impl Into<String>) -> Self {
        Self {
            link_up: false,
            socket_open: false,
            authenticated: false,
            resource_enabled: false,
            require_card_present: false,
            resource_name: resource_name.into(),
        }
    }

    #[must_use]
    pub fn link_up(&self) -> bool {
        self.link_up
    }

    #[must_use]
    pub fn socket_open(&self) -> bool {
        self.socket_open
    }

    #[must_use]
    pub fn authenticated(&self) -> bool {
        self.authenticated
    }

    #[must_use]
    pub fn resource_enabled(&self) -> bool {
        self.resource_enabled
    }

    #[must_use]
    pub fn require_card_present(&self) -> bool {
        self.require_card_present
    }

    #[must_use]
    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    /// Returns `true` when scans may be forwarded to the authority.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.link_up && self.authenticated
    }

    /// Record a link association change.
    ///
    /// Returns `true` if the flag changed. Losing the link also closes the
    /// socket and drops authentication.
    pub fn set_link(&mut self, up: bool) -> bool {
        if self.link_up == up {
            return false;
        }
        self.link_up = up;
        if !up {
            self.clear_session_flags();
        }
        self.debug_check();
        true
    }

    /// Record a transport connect.
    ///
    /// An open socket is proof of a working link, so the link flag is raised
    /// too if the link collaborator has not reported yet.
    pub fn socket_opened(&mut self) {
        if !self.link_up {
            debug!("socket opened before link report, marking link up");
            self.link_up = true;
        }
        self.socket_open = true;
        self.debug_check();
    }

    /// Record a transport disconnect.
    ///
    /// Clears the socket, authentication and enabled flags. The card-presence
    /// requirement and display name are kept so that an active session stays
    /// supervised while offline. Returns `true` if anything changed.
    pub fn socket_closed(&mut self) -> bool {
        let changed = self.socket_open || self.authenticated || self.resource_enabled;
        self.clear_session_flags();
        self.debug_check();
        changed
    }

    /// Adopt the attributes of an `auth_success`.
    ///
    /// Duplicate successes overwrite the same fields. Returns `false` and
    /// changes nothing if no socket is open.
    pub fn apply_auth_success(&mut self, grant: &AuthGrant, fallback_name: &str) -> bool {
        if !self.socket_open {
            warn!("auth_success without an open socket, ignoring");
            return false;
        }
        self.authenticated = true;
        self.resource_enabled = grant.enabled;
        self.require_card_present = grant.require_card_present;
        self.resource_name = grant
            .resource_name
            .clone()
            .unwrap_or_else(|| fallback_name.to_string());
        self.debug_check();
        true
    }

    /// Record an authority-reported fault. The connection is unusable until
    /// the transport reconnects and re-authenticates.
    pub fn auth_failed(&mut self) {
        self.clear_session_flags();
        self.debug_check();
    }

    fn clear_session_flags(&mut self) {
        self.socket_open = false;
        self.authenticated = false;
        self.resource_enabled = false;
    }

    fn debug_check(&self) {
        debug_assert!(!self.authenticated || self.socket_open);
        debug_assert!(!self.socket_open || self.link_up);
    }
}

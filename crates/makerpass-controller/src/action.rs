use std::time::Duration;

use makerpass_core::DisplayRequest;
use makerpass_protocol::Outbound;

/// Side effect requested by the controller.
///
/// The driver executes actions in the order they are returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerAction {
    /// Transmit this message to the authority.
    Send(Outbound),

    /// Drop the current socket; the transport reconnects on its own schedule.
    Disconnect {
        /// Reason for closing the connection
        reason: String,
    },

    /// Drive the relay output. Emitted only when the energized state changes.
    SetRelay { energized: bool },

    /// Show this screen.
    Display(DisplayRequest),

    /// Flash the reader LED and beeper for this long.
    FlashIndicator(Duration),
}

impl ControllerAction {
    /// Returns `true` if this action sends a message to the authority.
    #[must_use]
    pub fn is_send(&self) -> bool {
        matches!(self, ControllerAction::Send(_))
    }
}

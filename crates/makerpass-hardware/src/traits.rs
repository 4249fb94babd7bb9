//! Peripheral trait definitions.
//!
//! These traits are the seam between the control loop and the physical
//! terminal. All of them use native `async fn` methods, which makes them not
//! object-safe; use generic type parameters.

#![allow(async_fn_in_trait)]

use std::time::Duration;

use makerpass_core::{CardCode, DisplayRequest};

use crate::error::Result;

/// Relay driving the door strike or the machine's power contactor.
pub trait RelayOutput: Send {
    /// Energize or release the relay.
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be driven.
    async fn set_energized(&mut self, energized: bool) -> Result<()>;

    /// Last state successfully written to the relay.
    fn is_energized(&self) -> bool;
}

/// Status screen next to the reader.
pub trait StatusDisplay: Send {
    /// Show a screen, replacing whatever was shown before.
    ///
    /// # Errors
    ///
    /// Returns an error if the display cannot be updated.
    async fn show(&mut self, request: &DisplayRequest) -> Result<()>;
}

/// LED and beeper feedback on the reader.
pub trait ActivityIndicator: Send {
    /// Flash the indicator for `duration`.
    ///
    /// Implementations must not hold the caller for the whole flash.
    ///
    /// # Errors
    ///
    /// Returns an error if the indicator cannot be driven.
    async fn flash(&mut self, duration: Duration) -> Result<()>;
}

/// Card reader.
///
/// Readers repeat the code for as long as the card stays in the field, so the
/// same code may be returned many times in a row.
pub trait CardReader: Send {
    /// Wait for the next card read.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::Disconnected`](crate::HardwareError::Disconnected)
    /// once the reader is gone and will produce no more codes.
    async fn read_card(&mut self) -> Result<CardCode>;
}

//! Mock relay output.

use tokio::sync::{mpsc, watch};

use crate::{Result, traits::RelayOutput};

/// Mock relay recording every write.
///
/// # Examples
///
/// ```
/// use makerpass_hardware::mock::MockRelay;
/// use makerpass_hardware::RelayOutput;
///
/// #[tokio::main]
/// async fn main() -> makerpass_hardware::Result<()> {
///     let (mut relay, mut handle) = MockRelay::new();
///
///     relay.set_energized(true).await?;
///     assert!(handle.is_energized());
///     assert_eq!(handle.drain_writes(), vec![true]);
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockRelay {
    energized: bool,
    state_tx: watch::Sender<bool>,
    write_tx: mpsc::UnboundedSender<bool>,
}

impl MockRelay {
    /// Create a released relay and its handle.
    pub fn new() -> (Self, MockRelayHandle) {
        let (state_tx, state_rx) = watch::channel(false);
        let (write_tx, write_rx) = mpsc::unbounded_channel();

        let relay = Self {
            energized: false,
            state_tx,
            write_tx,
        };
        let handle = MockRelayHandle { state_rx, write_rx };

        (relay, handle)
    }
}

impl RelayOutput for MockRelay {
    async fn set_energized(&mut self, energized: bool) -> Result<()> {
        self.energized = energized;
        // The handle may have been dropped; the relay keeps working without it.
        self.state_tx.send_replace(energized);
        let _ = self.write_tx.send(energized);
        Ok(())
    }

    fn is_energized(&self) -> bool {
        self.energized
    }
}

/// Handle for observing a [`MockRelay`].
#[derive(Debug)]
pub struct MockRelayHandle {
    state_rx: watch::Receiver<bool>,
    write_rx: mpsc::UnboundedReceiver<bool>,
}

impl MockRelayHandle {
    /// Current relay state.
    pub fn is_energized(&self) -> bool {
        *self.state_rx.borrow()
    }

    /// Wait until the relay reaches `energized`.
    ///
    /// Returns immediately if it already has. Returns an error if the relay
    /// was dropped first.
    pub async fn wait_for(&mut self, energized: bool) -> Result<()> {
        self.state_rx
            .wait_for(|state| *state == energized)
            .await
            .map(|_| ())
            .map_err(|_| crate::HardwareError::disconnected("mock relay dropped"))
    }

    /// Every write since the last drain, oldest first.
    pub fn drain_writes(&mut self) -> Vec<bool> {
        let mut writes = Vec::new();
        while let Ok(state) = self.write_rx.try_recv() {
            writes.push(state);
        }
        writes
    }
}

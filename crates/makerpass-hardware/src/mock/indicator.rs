//! Mock activity indicator.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::{Result, traits::ActivityIndicator};

/// Mock indicator recording flash durations.
#[derive(Debug)]
pub struct MockIndicator {
    flash_tx: mpsc::UnboundedSender<Duration>,
}

impl MockIndicator {
    pub fn new() -> (Self, MockIndicatorHandle) {
        let (flash_tx, flash_rx) = mpsc::unbounded_channel();
        (Self { flash_tx }, MockIndicatorHandle { flash_rx })
    }
}

impl ActivityIndicator for MockIndicator {
    async fn flash(&mut self, duration: Duration) -> Result<()> {
        let _ = self.flash_tx.send(duration);
        Ok(())
    }
}

#[derive(Debug)]
pub struct MockIndicatorHandle {
    flash_rx: mpsc::UnboundedReceiver<Duration>,
}

impl MockIndicatorHandle {
    /// Every flash since the last drain, oldest first.
    pub fn drain(&mut self) -> Vec<Duration> {
        let mut flashes = Vec::new();
        while let Ok(flash) = self.flash_rx.try_recv() {
            flashes.push(flash);
        }
        flashes
    }
}

//! Mock status display.

use makerpass_core::DisplayRequest;
use tokio::sync::mpsc;

use crate::{Result, traits::StatusDisplay};

/// Mock display forwarding every screen to its handle.
#[derive(Debug)]
pub struct MockDisplay {
    current: Option<DisplayRequest>,
    screen_tx: mpsc::UnboundedSender<DisplayRequest>,
}

impl MockDisplay {
    pub fn new() -> (Self, MockDisplayHandle) {
        let (screen_tx, screen_rx) = mpsc::unbounded_channel();
        (
            Self {
                current: None,
                screen_tx,
            },
            MockDisplayHandle { screen_rx },
        )
    }

    /// Screen currently shown.
    pub fn current(&self) -> Option<&DisplayRequest> {
        self.current.as_ref()
    }
}

impl StatusDisplay for MockDisplay {
    async fn show(&mut self, request: &DisplayRequest) -> Result<()> {
        self.current = Some(request.clone());
        let _ = self.screen_tx.send(request.clone());
        Ok(())
    }
}

/// Handle receiving the screens shown on a [`MockDisplay`].
#[derive(Debug)]
pub struct MockDisplayHandle {
    screen_rx: mpsc::UnboundedReceiver<DisplayRequest>,
}

impl MockDisplayHandle {
    /// Every screen shown since the last drain, oldest first.
    pub fn drain(&mut self) -> Vec<DisplayRequest> {
        let mut screens = Vec::new();
        while let Ok(screen) = self.screen_rx.try_recv() {
            screens.push(screen);
        }
        screens
    }

    /// Wait for the next screen. `None` once the display is dropped.
    pub async fn next(&mut self) -> Option<DisplayRequest> {
        self.screen_rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_screens_forwarded() {
        let (mut display, mut handle) = MockDisplay::new();
        display.show(&DisplayRequest::Offline).await.unwrap();
        display
            .show(&DisplayRequest::SessionStarted {
                user: "Alice".into(),
            })
            .await
            .unwrap();

        assert_eq!(
            display.current(),
            Some(&DisplayRequest::SessionStarted {
                user: "Alice".into()
            })
        );
        assert_eq!(handle.drain().len(), 2);
    }

    #[tokio::test]
    async fn test_next_returns_none_after_drop() {
        let (display, mut handle) = MockDisplay::new();
        drop(display);
        assert_eq!(handle.next().await, None);
    }
}

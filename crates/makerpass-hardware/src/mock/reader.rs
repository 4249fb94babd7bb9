//! Mock card reader.
//!
//! Cards are pushed through the handle and come out of
//! [`read_card`](crate::CardReader::read_card) in order. Dropping every handle
//! makes the reader report a disconnect once the queue is drained.

use makerpass_core::CardCode;
use tokio::sync::mpsc;

use crate::{HardwareError, Result, traits::CardReader};

/// Mock card reader fed from a [`MockCardReaderHandle`].
///
/// # Examples
///
/// ```
/// use makerpass_core::CardCode;
/// use makerpass_hardware::mock::MockCardReader;
/// use makerpass_hardware::CardReader;
///
/// #[tokio::main]
/// async fn main() -> makerpass_hardware::Result<()> {
///     let (mut reader, handle) = MockCardReader::new();
///
///     handle.present_card(CardCode::new("0badcafe").unwrap()).await?;
///     let card = reader.read_card().await?;
///     assert_eq!(card.as_str(), "0BADCAFE");
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockCardReader {
    card_rx: mpsc::Receiver<CardCode>,
}

impl MockCardReader {
    pub fn new() -> (Self, MockCardReaderHandle) {
        let (card_tx, card_rx) = mpsc::channel(32);
        (Self { card_rx }, MockCardReaderHandle { card_tx })
    }
}

impl CardReader for MockCardReader {
    async fn read_card(&mut self) -> Result<CardCode> {
        self.card_rx
            .recv()
            .await
            .ok_or_else(|| HardwareError::disconnected("mock card reader"))
    }
}

/// Handle presenting cards to a [`MockCardReader`].
#[derive(Debug, Clone)]
pub struct MockCardReaderHandle {
    card_tx: mpsc::Sender<CardCode>,
}

impl MockCardReaderHandle {
    /// Present a card once.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader has been dropped.
    pub async fn present_card(&self, code: CardCode) -> Result<()> {
        self.card_tx
            .send(code)
            .await
            .map_err(|_| HardwareError::disconnected("mock card reader"))
    }

    /// Present the card a Wiegand reader would report for `raw`.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader has been dropped.
    pub async fn present_wiegand(&self, raw: u32) -> Result<()> {
        self.present_card(CardCode::from_wiegand(raw)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cards_read_in_order() {
        let (mut reader, handle) = MockCardReader::new();

        tokio::spawn(async move {
            handle.present_wiegand(1).await.unwrap();
            handle.present_wiegand(0xDEAD_BEEF).await.unwrap();
        });

        assert_eq!(reader.read_card().await.unwrap().as_str(), "00000001");
        assert_eq!(reader.read_card().await.unwrap().as_str(), "DEADBEEF");
    }

    #[tokio::test]
    async fn test_dropped_handle_disconnects_reader() {
        let (mut reader, handle) = MockCardReader::new();
        handle.present_wiegand(7).await.unwrap();
        drop(handle);

        assert!(reader.read_card().await.is_ok());
        let err = reader.read_card().await.unwrap_err();
        assert!(err.is_disconnect());
    }

    #[tokio::test]
    async fn test_present_after_reader_dropped_fails() {
        let (reader, handle) = MockCardReader::new();
        drop(reader);
        assert!(handle.present_wiegand(7).await.is_err());
    }
}

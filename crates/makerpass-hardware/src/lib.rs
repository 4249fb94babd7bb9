//! Peripheral abstraction layer for the MakerPass terminal.
//!
//! The control loop talks to four peripherals: the relay that powers the door
//! strike or machine, the status display, the reader's activity indicator and
//! the card reader itself. Each is a trait so the loop can run against real
//! drivers, the console stand-ins in [`console`], or the [`mock`] devices used
//! in tests.
//!
//! All traits use native `async fn` methods (Edition 2024 RPITIT), so they are
//! consumed through generic parameters rather than trait objects:
//!
//! ```no_run
//! use makerpass_hardware::{CardReader, RelayOutput, Result};
//!
//! async fn open_on_any_card<R: CardReader, O: RelayOutput>(
//!     reader: &mut R,
//!     relay: &mut O,
//! ) -> Result<()> {
//!     let _card = reader.read_card().await?;
//!     relay.set_energized(true).await
//! }
//! ```
//!
//! # Mock Implementations
//!
//! Every mock is created as a `(device, handle)` pair. The device goes to the
//! code under test; the handle drives inputs and observes outputs:
//!
//! ```
//! use makerpass_hardware::mock::MockCardReader;
//! use makerpass_hardware::CardReader;
//!
//! #[tokio::main]
//! async fn main() -> makerpass_hardware::Result<()> {
//!     let (mut reader, handle) = MockCardReader::new();
//!     handle.present_wiegand(0x00AB_12CD).await?;
//!     assert_eq!(reader.read_card().await?.as_str(), "00AB12CD");
//!     Ok(())
//! }
//! ```

pub mod console;
pub mod error;
pub mod mock;
pub mod traits;

pub use error::{HardwareError, Result};
pub use traits::{ActivityIndicator, CardReader, RelayOutput, StatusDisplay};

//! Mock peripherals for testing and development.
//!
//! Each mock is returned together with a handle that drives its inputs or
//! records its outputs, so tests can run the control loop without hardware.

pub mod display;
pub mod indicator;
pub mod reader;
pub mod relay;

pub use display::{MockDisplay, MockDisplayHandle};
pub use indicator::{MockIndicator, MockIndicatorHandle};
pub use reader::{MockCardReader, MockCardReaderHandle};
pub use relay::{MockRelay, MockRelayHandle};

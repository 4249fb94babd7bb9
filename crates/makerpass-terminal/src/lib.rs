//! MakerPass access terminal.
//!
//! The binary wires the configuration, the peripherals and the authority
//! transport into a [`Runtime`], which drives the
//! [`AccessController`](makerpass_controller::AccessController) from a single
//! task.

pub mod runtime;

pub use runtime::{Peripherals, Runtime};

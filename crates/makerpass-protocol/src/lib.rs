//! Wire vocabulary between the access terminal and the authority.
//!
//! Messages are JSON objects discriminated by a `type` field. Outbound
//! messages are encoded with serde; inbound messages are decoded once at the
//! boundary by [`MessageParser`] into the closed [`Inbound`] enum.

pub mod error;
pub mod message;
pub mod parser;

pub use error::{ProtocolError, Result};
pub use message::{AuthGrant, Inbound, Outbound};
pub use parser::MessageParser;

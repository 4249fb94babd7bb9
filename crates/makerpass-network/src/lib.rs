//! Authority transport for the MakerPass terminal.
//!
//! The authority speaks JSON text frames over a WebSocket. This crate provides
//! the socket itself and the task that keeps it connected.
//!
//! # Components
//!
//! - **WsClient**: one WebSocket connection with connect and send timeouts
//! - **Transport**: background task owning a `WsClient`, reconnecting on a
//!   fixed interval and talking to the control loop over channels
//!
//! # Example
//!
//! ```no_run
//! use makerpass_network::{TransportCommand, TransportConfig, TransportEvent, spawn_transport};
//! use makerpass_protocol::Outbound;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let (handle, _task) = spawn_transport(TransportConfig {
//!     url: "ws://127.0.0.1:8080/ws".into(),
//!     reconnect_interval: Duration::from_secs(5),
//!     connect_timeout: Duration::from_secs(10),
//! });
//! let (commands, mut events) = handle.into_parts();
//!
//! while let Some(event) = events.recv().await {
//!     if event == TransportEvent::Connected {
//!         let _ = commands.try_send(TransportCommand::Send(Outbound::Pong));
//!     }
//! }
//! # }
//! ```

mod client;
mod transport;

pub use client::{Incoming, WsClient, WsClientConfig, WsClientError};
pub use transport::{
    TransportCommand, TransportConfig, TransportEvent, TransportHandle, spawn_transport,
};

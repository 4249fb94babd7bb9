//! Reconnecting transport task.
//!
//! The task owns the [`WsClient`] and keeps it connected, retrying on a fixed
//! interval. The control loop never touches the socket: it sends
//! [`TransportCommand`]s and receives [`TransportEvent`]s.
//!
//! ```text
//! control loop ──TransportCommand──> transport task ──(WebSocket)──> authority
//!              <──TransportEvent────
//! ```
//!
//! Messages sent while disconnected are dropped; the controller re-syncs
//! through the handshake on the next connect.

use std::time::Duration;

use makerpass_protocol::Outbound;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::{Incoming, WsClient, WsClientConfig};

const CHANNEL_CAPACITY: usize = 64;

/// Request from the control loop to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCommand {
    /// Encode and send a message. Dropped while disconnected.
    Send(Outbound),

    /// Drop the current socket and reconnect after the retry interval.
    Disconnect { reason: String },

    /// Close the socket and stop the task.
    Shutdown,
}

/// Report from the transport to the control loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A socket was opened.
    Connected,

    /// A text frame arrived.
    Text(String),

    /// A ping, pong or other non-text frame arrived.
    Activity,

    /// The socket was lost or closed.
    Disconnected { reason: String },
}

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub url: String,
    pub reconnect_interval: Duration,
    pub connect_timeout: Duration,
}

/// Control-loop side of the transport channels.
#[derive(Debug)]
pub struct TransportHandle {
    commands: mpsc::Sender<TransportCommand>,
    events: mpsc::Receiver<TransportEvent>,
}

impl TransportHandle {
    /// Wrap raw channels, e.g. to drive the control loop from a test script.
    pub fn new(
        commands: mpsc::Sender<TransportCommand>,
        events: mpsc::Receiver<TransportEvent>,
    ) -> Self {
        Self { commands, events }
    }

    pub fn into_parts(
        self,
    ) -> (
        mpsc::Sender<TransportCommand>,
        mpsc::Receiver<TransportEvent>,
    ) {
        (self.commands, self.events)
    }
}

/// Start the transport task.
///
/// The task runs until it receives [`TransportCommand::Shutdown`], the
/// command channel closes, or the event receiver is dropped.
pub fn spawn_transport(config: TransportConfig) -> (TransportHandle, JoinHandle<()>) {
    let (command_tx, command_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);

    let transport = Transport {
        client: WsClient::new(WsClientConfig {
            url: config.url,
            timeout: config.connect_timeout,
        }),
        reconnect_interval: config.reconnect_interval,
        commands: command_rx,
        events: event_tx,
    };
    let task = tokio::spawn(transport.run());

    (TransportHandle::new(command_tx, event_rx), task)
}

struct Transport {
    client: WsClient,
    reconnect_interval: Duration,
    commands: mpsc::Receiver<TransportCommand>,
    events: mpsc::Sender<TransportEvent>,
}

enum Step {
    Command(Option<TransportCommand>),
    Incoming(Result<Incoming, crate::WsClientError>),
}

impl Transport {
    async fn run(mut self) {
        info!(url = %self.client.url(), "Transport started");

        loop {
            if !self.client.is_connected() {
                match self.client.connect().await {
                    Ok(()) => {
                        if !self.emit(TransportEvent::Connected).await {
                            break;
                        }
                    }
                    Err(e) => {
                        debug!(error = %e, "Connect attempt failed");
                        if !self.wait_offline().await {
                            break;
                        }
                        continue;
                    }
                }
            }

            let step = tokio::select! {
                cmd = self.commands.recv() => Step::Command(cmd),
                incoming = self.client.recv() => Step::Incoming(incoming),
            };

            let keep_running = match step {
                Step::Command(None | Some(TransportCommand::Shutdown)) => false,
                Step::Command(Some(TransportCommand::Send(msg))) => self.send(msg).await,
                Step::Command(Some(TransportCommand::Disconnect { reason })) => {
                    info!(%reason, "Dropping connection on request");
                    let _ = self.client.close().await;
                    self.lost(reason).await
                }
                Step::Incoming(Ok(Incoming::Text(text))) => {
                    self.emit(TransportEvent::Text(text)).await
                }
                Step::Incoming(Ok(Incoming::Activity)) => self.emit(TransportEvent::Activity).await,
                Step::Incoming(Ok(Incoming::Closed(reason))) => {
                    self.lost(reason.unwrap_or_else(|| "closed by authority".to_string()))
                        .await
                }
                Step::Incoming(Err(e)) => self.lost(e.to_string()).await,
            };

            if !keep_running {
                break;
            }
        }

        let _ = self.client.close().await;
        info!("Transport stopped");
    }

    async fn send(&mut self, msg: Outbound) -> bool {
        let kind = msg.kind();
        let text = match msg.to_json() {
            Ok(text) => text,
            Err(e) => {
                warn!(kind, error = %e, "Failed to encode message, dropping");
                return true;
            }
        };

        match self.client.send_text(text).await {
            Ok(()) => {
                debug!(kind, "Sent message");
                true
            }
            Err(e) => self.lost(e.to_string()).await,
        }
    }

    /// Report a lost socket and wait out the retry interval.
    async fn lost(&mut self, reason: String) -> bool {
        warn!(%reason, "Connection to authority lost");
        self.emit(TransportEvent::Disconnected { reason }).await && self.wait_offline().await
    }

    /// Sleep for the retry interval while draining commands.
    ///
    /// Returns `false` if the task should stop.
    async fn wait_offline(&mut self) -> bool {
        let sleep = tokio::time::sleep(self.reconnect_interval);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return true,
                cmd = self.commands.recv() => match cmd {
                    None | Some(TransportCommand::Shutdown) => return false,
                    Some(TransportCommand::Send(msg)) => {
                        debug!(kind = msg.kind(), "Offline, dropping message");
                    }
                    Some(TransportCommand::Disconnect { .. }) => {}
                },
            }
        }
    }

    /// Returns `false` once the control loop has gone away.
    async fn emit(&self, event: TransportEvent) -> bool {
        self.events.send(event).await.is_ok()
    }
}

//! The terminal's control loop.
//!
//! One task owns the [`AccessController`] and every peripheral. Each turn of
//! the loop waits for the first of three sources, feeds it to the controller
//! and executes the returned actions before waiting again:
//!
//! 1. transport events (connects, authority messages, disconnects)
//! 2. card reads
//! 3. the tick interval
//!
//! The `select!` is biased in that order, so an authority message that is
//! already queued is handled before a timer check in the same turn.
//!
//! # Time
//!
//! The controller is given `tokio::time::Instant::now()` converted to a std
//! [`Instant`](std::time::Instant). Under a paused test clock this follows the
//! virtual time, so timing scenarios run instantly.

use std::time::Duration;

use makerpass_controller::{AccessController, ControllerAction, DeviceIdentity};
use makerpass_core::{CardCode, DisplayRequest, TimingConfig};
use makerpass_hardware::{ActivityIndicator, CardReader, HardwareError, RelayOutput, StatusDisplay};
use makerpass_network::{TransportCommand, TransportEvent, TransportHandle};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// The four peripherals the loop drives.
#[derive(Debug)]
pub struct Peripherals<R, D, I, C> {
    pub relay: R,
    pub display: D,
    pub indicator: I,
    pub reader: C,
}

/// Single-task driver for the access controller.
pub struct Runtime<R, D, I, C> {
    controller: AccessController,
    relay: R,
    display: D,
    indicator: I,
    reader: C,
    tick_interval: Duration,
}

enum Step {
    Transport(TransportEvent),
    Card(Result<CardCode, HardwareError>),
    Tick,
}

fn now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}

impl<R, D, I, C> Runtime<R, D, I, C>
where
    R: RelayOutput,
    D: StatusDisplay,
    I: ActivityIndicator,
    C: CardReader,
{
    pub fn new(
        identity: DeviceIdentity,
        timing: &TimingConfig,
        peripherals: Peripherals<R, D, I, C>,
    ) -> Self {
        let Peripherals {
            relay,
            display,
            indicator,
            reader,
        } = peripherals;

        Self {
            controller: AccessController::new(identity, timing, now()),
            relay,
            display,
            indicator,
            reader,
            tick_interval: timing.tick_interval(),
        }
    }

    pub fn controller(&self) -> &AccessController {
        &self.controller
    }

    pub fn relay(&self) -> &R {
        &self.relay
    }

    /// Run until the transport's event channel closes.
    ///
    /// A reader that reports a disconnect is not polled again; the terminal
    /// keeps serving the authority and the timers without it.
    pub async fn run(&mut self, transport: TransportHandle) {
        let (commands, mut events) = transport.into_parts();

        // The relay starts released, matching the controller's idle state
        self.set_relay(false).await;
        let initial = self.controller.idle_display();
        self.show(&initial).await;

        let actions = self.controller.on_link_change(true, now());
        self.execute(actions, &commands).await;

        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut reader_alive = true;

        let tick_ms = self.tick_interval.as_millis();
        info!(
            device_type = %self.controller.device_type(),
            tick_ms,
            "Control loop started"
        );

        loop {
            let step = tokio::select! {
                biased;
                event = events.recv() => match event {
                    Some(event) => Step::Transport(event),
                    None => break,
                },
                card = self.reader.read_card(), if reader_alive => Step::Card(card),
                _ = ticker.tick() => Step::Tick,
            };

            let now = now();
            let actions = match step {
                Step::Transport(TransportEvent::Connected) => self.controller.on_connected(now),
                Step::Transport(TransportEvent::Text(text)) => self.controller.on_text(&text, now),
                Step::Transport(TransportEvent::Activity) => {
                    self.controller.on_transport_activity(now);
                    Vec::new()
                }
                Step::Transport(TransportEvent::Disconnected { reason }) => {
                    debug!(%reason, "Transport reported disconnect");
                    self.controller.on_disconnected(now)
                }
                Step::Card(Ok(code)) => self.controller.on_scan(code, now),
                Step::Card(Err(e)) if e.is_disconnect() => {
                    error!(error = %e, "Card reader gone, scans disabled");
                    reader_alive = false;
                    Vec::new()
                }
                Step::Card(Err(e)) => {
                    warn!(error = %e, "Card read failed");
                    Vec::new()
                }
                Step::Tick => self.controller.tick(now),
            };

            self.execute(actions, &commands).await;
        }

        info!("Control loop stopped");
    }

    /// Release the relay before the process exits.
    pub async fn shutdown(&mut self) {
        if self.relay.is_energized() {
            info!("Releasing relay on shutdown");
        }
        self.set_relay(false).await;
    }

    async fn execute(
        &mut self,
        actions: Vec<ControllerAction>,
        commands: &mpsc::Sender<TransportCommand>,
    ) {
        for action in actions {
            match action {
                ControllerAction::Send(msg) => send_command(commands, TransportCommand::Send(msg)),
                ControllerAction::Disconnect { reason } => {
                    send_command(commands, TransportCommand::Disconnect { reason });
                }
                ControllerAction::SetRelay { energized } => self.set_relay(energized).await,
                ControllerAction::Display(request) => self.show(&request).await,
                ControllerAction::FlashIndicator(duration) => {
                    if let Err(e) = self.indicator.flash(duration).await {
                        debug!(error = %e, "Indicator flash failed");
                    }
                }
            }
        }
    }

    async fn set_relay(&mut self, energized: bool) {
        if let Err(e) = self.relay.set_energized(energized).await {
            error!(energized, error = %e, "Failed to drive relay");
        }
    }

    async fn show(&mut self, request: &DisplayRequest) {
        if let Err(e) = self.display.show(request).await {
            warn!(error = %e, "Display update failed");
        }
    }
}

/// Hand a command to the transport without blocking the loop.
///
/// A full queue means the transport is stuck on a slow socket; the command is
/// dropped and the keep-alive check recovers the link.
fn send_command(commands: &mpsc::Sender<TransportCommand>, command: TransportCommand) {
    match commands.try_send(command) {
        Ok(()) => {}
        Err(TrySendError::Full(command)) => {
            warn!(?command, "Transport queue full, dropping command");
        }
        Err(TrySendError::Closed(_)) => {
            debug!("Transport stopped, dropping command");
        }
    }
}

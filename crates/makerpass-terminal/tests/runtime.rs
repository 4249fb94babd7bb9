//! Control loop scenarios against mock peripherals and a scripted authority.
//!
//! All tests run on a paused clock: whenever every task is idle, tokio
//! advances virtual time to the next timer, so multi-second timeouts finish
//! instantly and deterministically.

use std::time::Duration;

use makerpass_controller::{DeviceIdentity, RelayStateKind};
use makerpass_core::{CardCode, DeviceType, DisplayRequest, TimingConfig};
use makerpass_hardware::mock::{
    MockCardReader, MockCardReaderHandle, MockDisplay, MockDisplayHandle, MockIndicator,
    MockIndicatorHandle, MockRelay, MockRelayHandle,
};
use makerpass_network::{TransportCommand, TransportEvent, TransportHandle};
use makerpass_protocol::Outbound;
use makerpass_terminal::{Peripherals, Runtime};
use tokio::sync::mpsc;
use tokio::time::Instant;

const MASTER_KEY: u32 = 0x0BAD_CAFE;
const ALICE: u32 = 0x1122_3344;

type MockRuntime = Runtime<MockRelay, MockDisplay, MockIndicator, MockCardReader>;

/// The authority side of the transport channels.
struct FakeAuthority {
    events: mpsc::Sender<TransportEvent>,
    commands: mpsc::Receiver<TransportCommand>,
}

impl FakeAuthority {
    async fn push(&self, event: TransportEvent) {
        self.events.send(event).await.unwrap();
    }

    async fn text(&self, json: &str) {
        self.push(TransportEvent::Text(json.to_string())).await;
    }

    async fn command(&mut self) -> TransportCommand {
        self.commands.recv().await.expect("control loop stopped")
    }

    /// Open a socket and answer the handshake.
    async fn connect(&mut self, auth_success: &str) {
        self.push(TransportEvent::Connected).await;
        assert_eq!(
            self.command().await,
            TransportCommand::Send(Outbound::DeviceAuth {
                resource_id: "ERNPTY".into(),
                api_key: "k3y".into(),
            })
        );
        self.text(auth_success).await;
    }
}

struct Devices {
    relay: MockRelayHandle,
    display: MockDisplayHandle,
    indicator: MockIndicatorHandle,
    reader: MockCardReaderHandle,
}

impl Devices {
    async fn wait_for_screen(
        &mut self,
        wanted: impl Fn(&DisplayRequest) -> bool,
    ) -> DisplayRequest {
        loop {
            let screen = self.display.next().await.expect("display dropped");
            if wanted(&screen) {
                return screen;
            }
        }
    }
}

fn setup(
    device_type: DeviceType,
    timing: TimingConfig,
) -> (MockRuntime, TransportHandle, FakeAuthority, Devices) {
    let (relay, relay_handle) = MockRelay::new();
    let (display, display_handle) = MockDisplay::new();
    let (indicator, indicator_handle) = MockIndicator::new();
    let (reader, reader_handle) = MockCardReader::new();

    let identity = DeviceIdentity {
        resource_id: "ERNPTY".into(),
        api_key: "k3y".into(),
        device_type,
        master_key: CardCode::from_wiegand(MASTER_KEY),
        door_pulse: Duration::from_secs(5),
    };
    let runtime = Runtime::new(
        identity,
        &timing,
        Peripherals {
            relay,
            display,
            indicator,
            reader,
        },
    );

    let (command_tx, command_rx) = mpsc::channel(16);
    let (event_tx, event_rx) = mpsc::channel(16);

    (
        runtime,
        TransportHandle::new(command_tx, event_rx),
        FakeAuthority {
            events: event_tx,
            commands: command_rx,
        },
        Devices {
            relay: relay_handle,
            display: display_handle,
            indicator: indicator_handle,
            reader: reader_handle,
        },
    )
}

const AUTH_OK: &str = r#"{"type":"auth_success","enabled":true,"resource_name":"Front Door"}"#;
const AUTH_PRESENCE: &str =
    r#"{"type":"auth_success","enabled":true,"require_card_present":true,"resource_name":"Lathe"}"#;

#[tokio::test(start_paused = true)]
async fn test_door_grant_pulses_relay_for_five_seconds() {
    let (mut runtime, transport, mut authority, mut devices) =
        setup(DeviceType::Door, TimingConfig::default());

    let script = async move {
        assert_eq!(devices.display.next().await, Some(DisplayRequest::Offline));

        authority.connect(AUTH_OK).await;
        let ready = devices
            .wait_for_screen(|s| matches!(s, DisplayRequest::Ready { .. }))
            .await;
        assert_eq!(
            ready,
            DisplayRequest::Ready {
                resource_name: "Front Door".into()
            }
        );

        devices.reader.present_wiegand(ALICE).await.unwrap();
        assert_eq!(
            authority.command().await,
            TransportCommand::Send(Outbound::RfidScan {
                resource_id: "ERNPTY".into(),
                rfid_code: CardCode::from_wiegand(ALICE),
            })
        );
        assert_eq!(devices.indicator.drain(), vec![Duration::from_millis(100)]);

        authority
            .text(r#"{"type":"access_granted","user_name":"Alice"}"#)
            .await;
        devices.relay.wait_for(true).await.unwrap();
        let granted_at = Instant::now();

        devices.relay.wait_for(false).await.unwrap();
        let held = granted_at.elapsed();
        assert!(held >= Duration::from_secs(5), "released early: {held:?}");
        assert!(held < Duration::from_millis(5100), "released late: {held:?}");

        // Back to the ready screen
        devices
            .wait_for_screen(|s| matches!(s, DisplayRequest::Ready { .. }))
            .await;
        // Initial release, energize, release
        assert_eq!(devices.relay.drain_writes(), vec![false, true, false]);
    };

    tokio::join!(runtime.run(transport), script);
    assert_eq!(runtime.controller().state_kind(), RelayStateKind::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_master_key_opens_door_while_offline() {
    let (mut runtime, transport, mut authority, mut devices) =
        setup(DeviceType::Door, TimingConfig::default());

    let script = async move {
        devices.reader.present_wiegand(MASTER_KEY).await.unwrap();
        devices.relay.wait_for(true).await.unwrap();
        devices.relay.wait_for(false).await.unwrap();

        // An ordinary card is turned away locally
        devices.reader.present_wiegand(ALICE).await.unwrap();
        devices
            .wait_for_screen(|s| *s == DisplayRequest::OfflineDenied)
            .await;

        // Nothing was offered to the transport
        assert!(authority.commands.try_recv().is_err());
        drop(authority);
    };

    tokio::join!(runtime.run(transport), script);
    assert!(!runtime.controller().relay_state().active);
}

#[tokio::test(start_paused = true)]
async fn test_machine_session_ends_when_card_removed() {
    let (mut runtime, transport, mut authority, mut devices) =
        setup(DeviceType::Machine, TimingConfig::default());

    let script = async move {
        authority.connect(AUTH_PRESENCE).await;

        devices.reader.present_wiegand(ALICE).await.unwrap();
        assert!(matches!(
            authority.command().await,
            TransportCommand::Send(Outbound::RfidScan { .. })
        ));
        authority
            .text(r#"{"type":"session_started","session_id":"S1","user_name":"Alice"}"#)
            .await;
        devices.relay.wait_for(true).await.unwrap();
        let started_at = Instant::now();

        // The card is never seen again
        assert_eq!(
            authority.command().await,
            TransportCommand::Send(Outbound::SessionEnd {
                resource_id: "ERNPTY".into(),
                session_id: "S1".into(),
            })
        );
        devices.relay.wait_for(false).await.unwrap();
        assert!(started_at.elapsed() > Duration::from_secs(2));

        devices
            .wait_for_screen(|s| {
                *s == DisplayRequest::SessionEnded {
                    user: "Alice".into(),
                }
            })
            .await;
    };

    tokio::join!(runtime.run(transport), script);
    assert!(runtime.controller().session().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_card_held_keeps_machine_running() {
    let (mut runtime, transport, mut authority, mut devices) =
        setup(DeviceType::Machine, TimingConfig::default());

    let script = async move {
        authority.connect(AUTH_PRESENCE).await;
        devices.reader.present_wiegand(ALICE).await.unwrap();
        authority.command().await;
        authority
            .text(r#"{"type":"session_started","session_id":"S1","user_name":"Alice"}"#)
            .await;
        devices.relay.wait_for(true).await.unwrap();

        // The reader repeats the code every half second for ten seconds
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(500)).await;
            devices.reader.present_wiegand(ALICE).await.unwrap();
            assert!(matches!(
                authority.command().await,
                TransportCommand::Send(Outbound::RfidScan { .. })
            ));
        }
        assert!(devices.relay.is_energized());

        authority
            .text(r#"{"type":"session_ended","user_name":"Alice"}"#)
            .await;
        devices.relay.wait_for(false).await.unwrap();
    };

    tokio::join!(runtime.run(transport), script);
}

#[tokio::test(start_paused = true)]
async fn test_keepalive_timeout_requests_disconnect() {
    let timing = TimingConfig {
        keepalive_timeout_ms: 1000,
        ..TimingConfig::default()
    };
    let (mut runtime, transport, mut authority, mut devices) = setup(DeviceType::Door, timing);

    let script = async move {
        authority.connect(AUTH_OK).await;
        devices
            .wait_for_screen(|s| matches!(s, DisplayRequest::Ready { .. }))
            .await;
        let authenticated_at = Instant::now();

        assert_eq!(
            authority.command().await,
            TransportCommand::Disconnect {
                reason: "keep-alive timeout".into()
            }
        );
        assert!(authenticated_at.elapsed() > Duration::from_secs(1));
        devices
            .wait_for_screen(|s| *s == DisplayRequest::Offline)
            .await;
    };

    tokio::join!(runtime.run(transport), script);
    assert!(!runtime.controller().connectivity().is_online());
}

#[tokio::test(start_paused = true)]
async fn test_ping_answered_and_keeps_link_alive() {
    let timing = TimingConfig {
        keepalive_timeout_ms: 1000,
        ..TimingConfig::default()
    };
    let (mut runtime, transport, mut authority, _devices) = setup(DeviceType::Door, timing);

    let script = async move {
        authority.connect(AUTH_OK).await;

        for _ in 0..5 {
            tokio::time::sleep(Duration::from_millis(600)).await;
            authority.text(r#"{"type":"ping"}"#).await;
            assert_eq!(
                authority.command().await,
                TransportCommand::Send(Outbound::Pong)
            );
        }
    };

    tokio::join!(runtime.run(transport), script);
    assert!(runtime.controller().connectivity().is_online());
}

#[tokio::test(start_paused = true)]
async fn test_lost_reader_does_not_stop_loop() {
    let (mut runtime, transport, mut authority, devices) =
        setup(DeviceType::Door, TimingConfig::default());

    let script = async move {
        drop(devices.reader);
        tokio::time::sleep(Duration::from_millis(200)).await;

        authority.connect(AUTH_OK).await;
        authority.text(r#"{"type":"ping"}"#).await;
        assert_eq!(
            authority.command().await,
            TransportCommand::Send(Outbound::Pong)
        );
    };

    tokio::join!(runtime.run(transport), script);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_releases_relay() {
    let (mut runtime, transport, authority, mut devices) =
        setup(DeviceType::Machine, TimingConfig::default());

    let script = async move {
        devices.reader.present_wiegand(MASTER_KEY).await.unwrap();
        devices.relay.wait_for(true).await.unwrap();
        drop(authority);
        devices
    };

    let ((), devices) = tokio::join!(runtime.run(transport), script);
    assert_eq!(
        runtime.controller().state_kind(),
        RelayStateKind::MachineRunning
    );

    runtime.shutdown().await;
    assert!(!devices.relay.is_energized());
}

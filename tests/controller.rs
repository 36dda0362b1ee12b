// MIT License - Copyright (c) 2026 Peter Wright
// ESP32 LED link
//
// Controller lifecycle and producers, driven over a duplex pipe.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use ledlink::{
    Color, ConnectionState, DeviceEvent, EventReceiver, LedController, LinkConfig, LinkError,
    LinkEvent,
};
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::sync::broadcast::error::TryRecvError;

fn quiet_config() -> LinkConfig {
    LinkConfig::builder()
        .read_timeout_ms(10)
        .query_status_on_connect(false)
        .build()
}

async fn attached(config: LinkConfig) -> (LedController<DuplexStream>, DuplexStream) {
    let (host, device) = duplex(64 * 1024);
    let controller = LedController::new(config);
    assert_eq!(controller.attach(host).await, ConnectionState::Connected);
    (controller, device)
}

/// Shut the controller down and collect everything the device received.
async fn drain(controller: &LedController<DuplexStream>, mut device: DuplexStream) -> String {
    controller.shutdown().await;
    let mut received = Vec::new();
    device.read_to_end(&mut received).await.unwrap();
    String::from_utf8(received).unwrap()
}

fn pending(rx: &mut EventReceiver) -> Vec<LinkEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn statuses(events: &[LinkEvent]) -> Vec<&str> {
    events
        .iter()
        .filter_map(|e| match e {
            LinkEvent::Status(text) => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_attach_reports_connected_and_queries_status() {
    let (host, mut device) = duplex(1024);
    device.write_all(b"RESPONSE: Mode: RAINBOW | LED: OFF\n").await.unwrap();

    let controller = LedController::new(LinkConfig::builder().read_timeout_ms(10).build());
    let mut rx = controller.subscribe();
    assert_eq!(controller.attach(host).await, ConnectionState::Connected);

    let events = pending(&mut rx);
    assert_eq!(
        events[0],
        LinkEvent::StateChanged {
            old: ConnectionState::Disconnected,
            new: ConnectionState::AwaitingPermission,
        }
    );
    assert!(events.contains(&LinkEvent::StateChanged {
        old: ConnectionState::AwaitingPermission,
        new: ConnectionState::Connected,
    }));
    assert_eq!(
        statuses(&events),
        vec![
            "Requesting USB permission...",
            "Connected to ESP32",
            "Mode: RAINBOW | LED: OFF",
        ]
    );

    assert_eq!(drain(&controller, device).await, "status\n");
}

#[tokio::test(start_paused = true)]
async fn test_set_color_switches_to_solid_first() {
    let (controller, device) = attached(quiet_config()).await;

    controller.set_color(Color::Red).await.unwrap();

    assert_eq!(drain(&controller, device).await, "solid\nred\n");
}

#[tokio::test(start_paused = true)]
async fn test_out_of_range_brightness_does_no_io() {
    let (controller, device) = attached(quiet_config()).await;
    let mut rx = controller.subscribe();

    let err = controller.set_brightness(300).await.unwrap_err();
    assert!(matches!(err, LinkError::InvalidParameter { value: 300, .. }));
    assert!(err.is_rejected_before_io());
    assert_eq!(statuses(&pending(&mut rx)), vec![err.to_string()]);

    let err = controller.set_brightness(-1).await.unwrap_err();
    assert!(matches!(err, LinkError::InvalidParameter { value: -1, .. }));

    controller.set_brightness(255).await.unwrap();
    assert_eq!(drain(&controller, device).await, "brightness:255\n");
}

#[tokio::test(start_paused = true)]
async fn test_send_text_parses_wire_tokens() {
    let (controller, device) = attached(quiet_config()).await;

    controller.send_text("rainbow").await.unwrap();
    controller.send_text("update:check").await.unwrap();
    assert!(controller.send_text("bad\ttoken").await.is_err());
    assert!(controller.send_text("brightness:999").await.is_err());

    assert_eq!(drain(&controller, device).await, "rainbow\nupdate:check\n");
}

#[tokio::test]
async fn test_detach_then_send_is_not_connected() {
    let (controller, _device) = attached(quiet_config()).await;
    let mut rx = controller.subscribe();

    assert_eq!(controller.detach().await, ConnectionState::Disconnected);
    assert!(!controller.link().is_open().await);

    let err = controller.off().await.unwrap_err();
    assert!(matches!(err, LinkError::NotConnected));

    let events = pending(&mut rx);
    assert_eq!(
        events[0],
        LinkEvent::StateChanged {
            old: ConnectionState::Connected,
            new: ConnectionState::Disconnected,
        }
    );
    assert_eq!(statuses(&events), vec!["Device disconnected", "Not connected"]);
}

#[tokio::test]
async fn test_permission_denied_leaves_link_closed() {
    let controller: LedController<DuplexStream> = LedController::new(quiet_config());
    let mut rx = controller.subscribe();

    controller
        .handle_event(DeviceEvent::DeviceFound {
            port: "/dev/ttyUSB0".to_string(),
        })
        .await;
    let state = controller.handle_event(DeviceEvent::PermissionDenied).await;
    assert_eq!(state, ConnectionState::Disconnected);
    assert!(!controller.link().is_open().await);
    assert_eq!(
        statuses(&pending(&mut rx)),
        vec!["Requesting USB permission...", "USB permission denied"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_music_stream_sends_samples_until_stopped() {
    let (controller, device) = attached(quiet_config()).await;

    let mut n = 0u8;
    controller
        .start_music(move || {
            n = n.wrapping_add(30);
            n
        })
        .await
        .unwrap();
    assert!(controller.is_music_running().await);

    tokio::time::sleep(Duration::from_millis(240)).await;
    let sent = controller.stop_music().await.expect("stream was running");
    assert!(!controller.is_music_running().await);
    assert!(sent >= 3, "only {sent} samples sent");

    // Nothing more after stopping.
    tokio::time::sleep(Duration::from_millis(500)).await;
    let received = drain(&controller, device).await;
    let lines: Vec<&str> = received.lines().collect();
    assert_eq!(lines.len() as u64, sent);
    assert_eq!(&lines[..3], &["music:30", "music:60", "music:90"]);
    // 120 saturates to the top of the range
    if lines.len() > 3 {
        assert_eq!(lines[3], "music:100");
    }
}

#[tokio::test]
async fn test_music_requires_connection() {
    let controller: LedController<DuplexStream> = LedController::new(quiet_config());
    let err = controller.start_music(|| 50u8).await.unwrap_err();
    assert!(matches!(err, LinkError::NotConnected));
    assert_eq!(controller.stop_music().await, None);
}

#[tokio::test(start_paused = true)]
async fn test_detach_stops_music_stream() {
    let (controller, _device) = attached(quiet_config()).await;
    controller.start_music(|| 10u8).await.unwrap();

    controller.detach().await;
    assert!(!controller.is_music_running().await);
}

#[tokio::test(start_paused = true)]
async fn test_keepalive_pings_while_connected() {
    let config = LinkConfig::builder()
        .read_timeout_ms(10)
        .query_status_on_connect(false)
        .keepalive_interval_ms(1000)
        .build();
    let (controller, device) = attached(config).await;

    tokio::time::sleep(Duration::from_millis(3500)).await;

    let received = drain(&controller, device).await;
    let lines: Vec<&str> = received.lines().collect();
    assert!(lines.len() >= 3, "only {} pings", lines.len());
    assert!(lines.iter().all(|l| *l == "ping"));
}

#[tokio::test(start_paused = true)]
async fn test_failed_write_disconnects() {
    let (host, _device) = duplex(4);
    let controller = LedController::new(quiet_config());
    controller.attach(host).await;
    assert!(controller.is_connected().await);
    let mut rx = controller.subscribe();

    let err = controller.send_text(&"x".repeat(20)).await.unwrap_err();
    assert!(matches!(err, LinkError::TransportWrite(_)));
    assert_eq!(controller.state().await, ConnectionState::Disconnected);
    assert!(!controller.is_connected().await);

    let events = pending(&mut rx);
    assert_eq!(
        statuses(&events),
        vec!["Send error: write timed out", "Device disconnected"]
    );
    assert!(matches!(controller.off().await, Err(LinkError::NotConnected)));
}

#[tokio::test]
async fn test_is_connected_follows_lifecycle() {
    let controller: LedController<DuplexStream> = LedController::new(quiet_config());
    assert!(!controller.is_connected().await);

    let (host, _device) = duplex(1024);
    controller.attach(host).await;
    assert!(controller.is_connected().await);

    controller.detach().await;
    assert!(!controller.is_connected().await);
}

#[tokio::test(start_paused = true)]
async fn test_zero_event_capacity_is_raised() {
    let config = LinkConfig {
        event_capacity: 0,
        ..quiet_config()
    };
    let controller = LedController::new(config);
    let mut rx = controller.subscribe();

    let (host, _device) = duplex(1024);
    assert_eq!(controller.attach(host).await, ConnectionState::Connected);
    // Capacity 1 keeps only the newest event.
    let mut last = None;
    loop {
        match rx.try_recv() {
            Ok(event) => last = Some(event),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    assert_eq!(last, Some(LinkEvent::Status("Connected to ESP32".to_string())));
}

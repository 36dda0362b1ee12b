// MIT License - Copyright (c) 2026 Peter Wright
// ESP32 LED link

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tokio_serial::SerialStream;
use tracing::{debug, info, warn};

use crate::config::LinkConfig;
use crate::error::{LinkError, Result};
use crate::event::{event_channel, EventReceiver, EventSender, LinkEvent};
use crate::periodic::PeriodicSender;
use crate::protocol::{Color, Command, Response, UpdateAction};
use crate::state::{transition, ConnectionState, DeviceEvent};
use crate::transport::command::CommandLink;
use crate::transport::discovery::{self, DeviceInfo};
use crate::transport::{serial, Transport};
use crate::visualizer::{beat_command, BeatSource};

/// The main public API for driving an LED controller over a serial link.
///
/// # Example
///
/// ```no_run
/// use ledlink::{Color, ConnectionState, LedController, LinkConfig};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let controller = LedController::new(LinkConfig::default());
///
///     let mut events = controller.subscribe();
///     tokio::spawn(async move {
///         while let Ok(event) = events.recv().await {
///             println!("Event: {:?}", event);
///         }
///     });
///
///     if controller.connect().await? == ConnectionState::Connected {
///         controller.set_color(Color::Red).await?;
///         controller.set_brightness(200).await?;
///     }
///
///     controller.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct LedController<T: Transport> {
    config: LinkConfig,
    link: Arc<CommandLink<T>>,
    state: RwLock<ConnectionState>,
    event_tx: EventSender,
    music: Mutex<Option<PeriodicSender>>,
    keepalive: Mutex<Option<PeriodicSender>>,
}

impl<T: Transport> LedController<T> {
    pub fn new(config: LinkConfig) -> Self {
        let (event_tx, _event_rx) = event_channel(config.event_capacity.max(1));
        let link = Arc::new(CommandLink::new(&config));
        Self {
            config,
            link,
            state: RwLock::new(ConnectionState::Disconnected),
            event_tx,
            music: Mutex::new(None),
            keepalive: Mutex::new(None),
        }
    }

    /// Subscribe to controller events.
    pub fn subscribe(&self) -> EventReceiver {
        self.event_tx.subscribe()
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Shared handle to the underlying link.
    pub fn link(&self) -> Arc<CommandLink<T>> {
        self.link.clone()
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Connected with a transport in hand. `connect` is a no-op while true.
    pub async fn is_connected(&self) -> bool {
        self.state().await == ConnectionState::Connected && self.link.is_open().await
    }

    // --- Connection lifecycle ---

    /// Feed a device-presence or permission event into the state machine.
    ///
    /// Entering `Disconnected` stops the periodic producers and releases the
    /// transport.
    pub async fn handle_event(&self, event: DeviceEvent) -> ConnectionState {
        let (old, new, status) = {
            let mut state = self.state.write().await;
            let old = *state;
            let t = transition(old, &event);
            *state = t.state;
            (old, t.state, t.status)
        };
        debug!("Device event {:?}: {} -> {}", event, old, new);

        if old != new {
            let _ = self.event_tx.send(LinkEvent::StateChanged { old, new });
        }
        if let Some(text) = status {
            self.publish_status(text);
        }

        if new == ConnectionState::Disconnected && old != ConnectionState::Disconnected {
            self.stop_producers().await;
            self.link.close().await;
        }
        new
    }

    /// Hand an opened transport to the link and mark the device connected.
    pub async fn attach(&self, transport: T) -> ConnectionState {
        if self.state().await == ConnectionState::Disconnected {
            self.handle_event(DeviceEvent::DeviceFound {
                port: "attached".to_string(),
            })
            .await;
        }
        self.link.open(transport).await;
        let state = self.handle_event(DeviceEvent::PermissionGranted).await;
        if state != ConnectionState::Connected {
            return state;
        }

        if let Some(period) = self.config.keepalive_interval() {
            let keepalive = PeriodicSender::spawn("keepalive", self.link.clone(), period, || Command::Ping);
            let previous = self.keepalive.lock().await.replace(keepalive);
            if let Some(previous) = previous {
                previous.stop().await;
            }
        }

        if self.config.query_status_on_connect {
            // Failures are already reported as status; the link stays up.
            let _ = self.request_status().await;
        }
        state
    }

    /// The device went away.
    pub async fn detach(&self) -> ConnectionState {
        self.handle_event(DeviceEvent::DeviceLost).await
    }

    /// Stop producers, close the transport and return to `Disconnected`.
    pub async fn shutdown(&self) {
        info!("Shutting down controller");
        self.stop_producers().await;
        self.link.close().await;
        let mut state = self.state.write().await;
        let old = *state;
        *state = ConnectionState::Disconnected;
        if old != ConnectionState::Disconnected {
            let _ = self.event_tx.send(LinkEvent::StateChanged {
                old,
                new: ConnectionState::Disconnected,
            });
        }
    }

    // --- Commands ---

    /// Send a command and report the outcome on the status channel.
    ///
    /// Errors are published as status text and returned; nothing is retried.
    pub async fn send(&self, command: &Command) -> Result<Option<Response>> {
        match self.link.send(command).await {
            Ok(reply) => {
                if let Some(ref resp) = reply {
                    let _ = self.event_tx.send(LinkEvent::Reply(resp.clone()));
                    match resp.status() {
                        Some(status) => self.publish_status(status.to_string()),
                        None => debug!("Unsurfaced reply: {}", resp.raw()),
                    }
                }
                Ok(reply)
            }
            Err(e) => {
                self.publish_status(e.to_string());
                if matches!(e, LinkError::TransportWrite(_)) && !self.link.is_open().await {
                    // The link dropped the transport after a partial write.
                    self.handle_event(DeviceEvent::DeviceLost).await;
                }
                Err(e)
            }
        }
    }

    /// Parse wire text (e.g. `"brightness:128"`) and send it.
    pub async fn send_text(&self, text: &str) -> Result<Option<Response>> {
        let command = match text.trim().parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                self.publish_status(e.to_string());
                return Err(e);
            }
        };
        self.send(&command).await
    }

    pub async fn off(&self) -> Result<Option<Response>> {
        self.send(&Command::Off).await
    }

    pub async fn rainbow(&self) -> Result<Option<Response>> {
        self.send(&Command::Rainbow).await
    }

    pub async fn solid(&self) -> Result<Option<Response>> {
        self.send(&Command::Solid).await
    }

    pub async fn music_mode(&self) -> Result<Option<Response>> {
        self.send(&Command::Music).await
    }

    /// Switch to solid mode, then set the color. The firmware only paints the
    /// color immediately while in solid mode.
    pub async fn set_color(&self, color: Color) -> Result<Option<Response>> {
        self.send(&Command::Solid).await?;
        self.send(&Command::Color(color)).await
    }

    /// Set strip brightness. Values outside 0-255 are rejected without I/O.
    pub async fn set_brightness(&self, value: i64) -> Result<Option<Response>> {
        let command = match Command::brightness(value) {
            Ok(command) => command,
            Err(e) => {
                warn!("Rejected brightness {}", value);
                self.publish_status(e.to_string());
                return Err(e);
            }
        };
        self.send(&command).await
    }

    pub async fn led_on(&self) -> Result<Option<Response>> {
        self.send(&Command::LedOn).await
    }

    pub async fn led_off(&self) -> Result<Option<Response>> {
        self.send(&Command::LedOff).await
    }

    pub async fn toggle_led(&self) -> Result<Option<Response>> {
        self.send(&Command::Toggle).await
    }

    pub async fn request_status(&self) -> Result<Option<Response>> {
        self.send(&Command::Status).await
    }

    pub async fn info(&self) -> Result<Option<Response>> {
        self.send(&Command::Info).await
    }

    pub async fn ping(&self) -> Result<Option<Response>> {
        self.send(&Command::Ping).await
    }

    pub async fn update(&self, action: UpdateAction) -> Result<Option<Response>> {
        self.send(&Command::Update(action)).await
    }

    // --- Music stream ---

    /// Start pushing beat samples every `music_interval_ms`. A stream that
    /// is already running is stopped first.
    pub async fn start_music<S: BeatSource>(&self, mut source: S) -> Result<()> {
        if !self.link.is_open().await {
            self.publish_status(LinkError::NotConnected.to_string());
            return Err(LinkError::NotConnected);
        }

        let stream = PeriodicSender::spawn(
            "music stream",
            self.link.clone(),
            self.config.music_interval(),
            move || beat_command(source.next_intensity()),
        );
        let previous = self.music.lock().await.replace(stream);
        if let Some(previous) = previous {
            previous.stop().await;
        }
        info!("Music stream started");
        Ok(())
    }

    /// Stop the music stream. Returns how many samples it sent, or `None` if
    /// no stream was running.
    pub async fn stop_music(&self) -> Option<u64> {
        let stream = self.music.lock().await.take()?;
        let sent = stream.stop().await;
        info!("Music stream stopped after {} samples", sent);
        Some(sent)
    }

    pub async fn is_music_running(&self) -> bool {
        self.music.lock().await.as_ref().is_some_and(PeriodicSender::is_running)
    }

    async fn stop_producers(&self) {
        self.stop_music().await;
        if let Some(keepalive) = self.keepalive.lock().await.take() {
            keepalive.stop().await;
        }
    }

    fn publish_status(&self, text: String) {
        debug!("Status: {}", text);
        let _ = self.event_tx.send(LinkEvent::Status(text));
    }
}

impl LedController<SerialStream> {
    /// Find the device, open it and attach it.
    ///
    /// Uses the configured port when set, otherwise the first discovered
    /// device. A missing device, a refused permission or a failed open are
    /// normal outcomes reported through the returned state and the status
    /// channel; only a failure to enumerate ports is an error. Does nothing
    /// while already connected.
    pub async fn connect(&self) -> Result<ConnectionState> {
        if self.is_connected().await {
            debug!("Already connected");
            return Ok(ConnectionState::Connected);
        }

        let device = match &self.config.port {
            Some(port) => DeviceInfo::from_path(port.clone()),
            None => match discovery::find_device(self.config.usb_only)? {
                Some(device) => device,
                None => return Ok(self.handle_event(DeviceEvent::NoDevice).await),
            },
        };

        self.handle_event(DeviceEvent::DeviceFound {
            port: device.port_name.clone(),
        })
        .await;

        match serial::open(&device.port_name, &self.config) {
            Ok(stream) => Ok(self.attach(stream).await),
            Err(LinkError::PermissionDenied { .. }) => {
                Ok(self.handle_event(DeviceEvent::PermissionDenied).await)
            }
            Err(LinkError::DeviceNotFound) => Ok(self.handle_event(DeviceEvent::NoDevice).await),
            Err(LinkError::OpenFailed { reason, .. }) => {
                Ok(self.handle_event(DeviceEvent::OpenFailed { reason }).await)
            }
            Err(e) => Ok(self
                .handle_event(DeviceEvent::OpenFailed {
                    reason: e.to_string(),
                })
                .await),
        }
    }
}

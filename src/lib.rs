// MIT License - Copyright (c) 2026 Peter Wright
// ESP32 LED link
//
//! # ledlink
//!
//! Host side of a line-oriented command link to an ESP32 LED strip
//! controller attached over USB serial (115200 8-N-1).
//!
//! Commands such as `off`, `rainbow` or `brightness:128` are written as
//! single `\n`-terminated lines. After each write the link makes one bounded
//! read and hands back whatever arrived; lines starting with `RESPONSE:` are
//! meant for the status display, anything else is device log output.
//!
//! ## Quick Start
//!
//! ```no_run
//! use ledlink::{Color, LedController, LinkConfig, LinkEvent, RandomBeats};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = LinkConfig::builder()
//!         .port("/dev/ttyUSB0")
//!         .build();
//!
//!     let controller = LedController::new(config);
//!     let mut events = controller.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             if let LinkEvent::Status(text) = event {
//!                 println!("{text}");
//!             }
//!         }
//!     });
//!
//!     controller.connect().await?;
//!     controller.set_color(Color::Blue).await?;
//!
//!     controller.music_mode().await?;
//!     controller.start_music(RandomBeats::new()).await?;
//!     tokio::signal::ctrl_c().await?;
//!     controller.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod constants;
pub mod controller;
pub mod error;
pub mod event;
pub mod periodic;
pub mod protocol;
pub mod state;
pub mod transport;
pub mod visualizer;

// Re-exports for convenience
pub use config::{LinkConfig, LinkConfigBuilder};
pub use controller::LedController;
pub use error::{LinkError, Result};
pub use event::{EventReceiver, LinkEvent};
pub use periodic::PeriodicSender;
pub use protocol::{Color, Command, DeviceNotice, RawToken, Response, UpdateAction};
pub use state::{ConnectionState, DeviceEvent};
pub use transport::command::CommandLink;
pub use transport::discovery::DeviceInfo;
pub use transport::Transport;
pub use visualizer::{BeatSource, RandomBeats};

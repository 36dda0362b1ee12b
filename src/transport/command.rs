// MIT License - Copyright (c) 2026 Peter Wright
// ESP32 LED link

use std::io;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, error, info, trace, warn};

use crate::config::LinkConfig;
use crate::error::{LinkError, Result};
use crate::protocol::{Command, Response};
use crate::transport::Transport;

/// Writes command lines to the device and reads back whatever comes next.
///
/// The link exclusively owns at most one transport. The transport lock is
/// held across each write+read pair, so commands from concurrent callers
/// reach the wire as whole lines, one after another.
pub struct CommandLink<T> {
    port: Mutex<Option<T>>,
    write_timeout: Duration,
    read_timeout: Duration,
    read_buffer_size: usize,
}

impl<T: Transport> CommandLink<T> {
    pub fn new(config: &LinkConfig) -> Self {
        Self {
            port: Mutex::new(None),
            write_timeout: config.write_timeout(),
            read_timeout: config.read_timeout(),
            read_buffer_size: config.read_buffer_size.max(1),
        }
    }

    /// Take ownership of an open transport. Any transport already held is
    /// shut down first.
    pub async fn open(&self, transport: T) {
        let mut port = self.port.lock().await;
        if let Some(mut previous) = port.take() {
            warn!("Replacing an already open transport");
            shutdown(&mut previous).await;
        }
        *port = Some(transport);
        info!("Transport opened");
    }

    /// Shut down and release the transport. Returns whether one was open.
    pub async fn close(&self) -> bool {
        let taken = self.port.lock().await.take();
        match taken {
            Some(mut transport) => {
                shutdown(&mut transport).await;
                info!("Transport closed");
                true
            }
            None => false,
        }
    }

    pub async fn is_open(&self) -> bool {
        self.port.lock().await.is_some()
    }

    /// Write one command line, then make one bounded read attempt.
    ///
    /// Returns `Ok(None)` when nothing (or only whitespace) arrived within the
    /// read timeout. The reply is not matched to the command: it may answer an
    /// earlier command or be unrelated output.
    ///
    /// A failed or timed-out write may leave part of a line on the wire, so
    /// the transport is dropped and later sends fail with `NotConnected`
    /// until a new one is opened.
    pub async fn send(&self, command: &Command) -> Result<Option<Response>> {
        if let Err(e) = command.validate() {
            warn!("Refusing to send invalid command: {}", e);
            return Err(e);
        }

        let mut guard = self.port.lock().await;
        let port = match guard.as_mut() {
            Some(port) => port,
            None => {
                debug!("Not connected, dropping command: {}", command);
                return Err(LinkError::NotConnected);
            }
        };

        let frame = command.encode();
        let write = async {
            port.write_all(&frame).await?;
            port.flush().await
        };
        let write_error = match timeout(self.write_timeout, write).await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => {
                error!("Failed to write command {}: {}", command, e);
                Some(e)
            }
            Err(_) => {
                error!("Write timed out after {:?}: {}", self.write_timeout, command);
                Some(io::Error::new(io::ErrorKind::TimedOut, "write timed out"))
            }
        };
        if let Some(e) = write_error {
            if let Some(mut broken) = guard.take() {
                warn!("Dropping transport after failed write");
                if timeout(self.write_timeout, shutdown(&mut broken)).await.is_err() {
                    debug!("Transport shutdown timed out");
                }
            }
            return Err(LinkError::TransportWrite(e));
        }
        debug!("Sent: {}", command);

        let mut buf = vec![0u8; self.read_buffer_size];
        let len = match timeout(self.read_timeout, port.read(&mut buf)).await {
            Ok(Ok(n)) => n,
            Ok(Err(e)) if is_timeout(&e) => 0,
            Ok(Err(e)) => {
                error!("Failed to read reply: {}", e);
                return Err(LinkError::TransportRead(e));
            }
            Err(_) => {
                trace!("No reply within {:?}", self.read_timeout);
                0
            }
        };

        let response = Response::decode(&buf[..len]);
        if let Some(ref resp) = response {
            debug!("Response: {}", resp.raw());
        }
        Ok(response)
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}

async fn shutdown<T: Transport>(transport: &mut T) {
    if let Err(e) = transport.shutdown().await {
        debug!("Error shutting down transport: {}", e);
    }
}

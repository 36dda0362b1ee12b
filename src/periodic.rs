// MIT License - Copyright (c) 2026 Peter Wright
// ESP32 LED link

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace, warn};

use crate::error::LinkError;
use crate::protocol::Command;
use crate::transport::command::CommandLink;
use crate::transport::Transport;

/// A background task that sends one command per tick through a shared link.
///
/// Stopping interrupts the wait between ticks immediately. A command already
/// being written is allowed to finish so no partial line reaches the device.
pub struct PeriodicSender {
    name: &'static str,
    shutdown_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<u64>>,
}

impl PeriodicSender {
    /// Spawn the task. `next` is called once per tick to produce the command.
    pub fn spawn<T, F>(
        name: &'static str,
        link: Arc<CommandLink<T>>,
        period: Duration,
        mut next: F,
    ) -> Self
    where
        T: Transport,
        F: FnMut() -> Command + Send + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut sent: u64 = 0;

            debug!("{} started ({:?} period)", name, period);
            loop {
                tokio::select! {
                    biased;
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        let command = next();
                        match link.send(&command).await {
                            Ok(reply) => {
                                sent += 1;
                                if let Some(reply) = reply {
                                    trace!("{} reply: {}", name, reply.raw());
                                }
                            }
                            Err(LinkError::NotConnected) => {
                                trace!("{} tick skipped: not connected", name);
                            }
                            Err(e) => warn!("{} send failed: {}", name, e),
                        }
                    }
                }
            }
            debug!("{} stopped after {} command(s)", name, sent);
            sent
        });

        Self {
            name,
            shutdown_tx,
            handle: Some(handle),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signal the task to stop and wait for it. Returns how many commands
    /// were written.
    pub async fn stop(mut self) -> u64 {
        let _ = self.shutdown_tx.send(true);
        match self.handle.take() {
            Some(handle) => handle.await.unwrap_or_else(|e| {
                warn!("{} task ended abnormally: {}", self.name, e);
                0
            }),
            None => 0,
        }
    }
}

// No abort here: the task may be mid-write and exits on its own once signalled.
impl Drop for PeriodicSender {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Tells the controller that the console is alive and which mode it is in.

use std::{
    io,
    net::{SocketAddr, UdpSocket},
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
    time::Duration,
};

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{error, info, span, trace, warn, Level};

use crate::{
    lifecycle::{LifecycleError, Worker},
    protocol,
};

/// Consecutive unicast failures before heartbeats go back to broadcast.
pub const UNICAST_FAILURE_LIMIT: u32 = 3;

#[derive(Debug, Error)]
pub enum HeartbeatError {
    #[error("unable to send heartbeat to {target}: {source}")]
    Send {
        target: SocketAddr,
        #[source]
        source: io::Error,
    },
}

struct Target {
    broadcast: SocketAddr,
    unicast: Option<SocketAddr>,
    failures: u32,
}

struct Shared {
    socket: Arc<UdpSocket>,
    mode: AtomicU8,
    target: Mutex<Target>,
}

impl Shared {
    /// Sends one heartbeat. Unicast failures are tolerated up to the limit, after which the
    /// heartbeat falls back to broadcast. A failed broadcast is an error.
    fn send(&self) -> Result<(), HeartbeatError> {
        let mode = self.mode.load(Ordering::SeqCst);
        let datagram = protocol::encode_heartbeat(mode);
        let mut target = self.target.lock();

        if let Some(unicast) = target.unicast {
            match self.socket.send_to(&datagram, unicast) {
                Ok(_) => {
                    target.failures = 0;
                    trace!(%unicast, mode, "Heartbeat sent");
                    return Ok(());
                }
                Err(e) => {
                    target.failures += 1;
                    error!(
                        err = e.to_string(),
                        %unicast,
                        failures = target.failures,
                        "Error sending heartbeat"
                    );
                    if target.failures < UNICAST_FAILURE_LIMIT {
                        return Ok(());
                    }
                    warn!(%unicast, "Falling back to broadcast heartbeats");
                    target.unicast = None;
                    target.failures = 0;
                }
            }
        }

        let broadcast = target.broadcast;
        self.socket
            .send_to(&datagram, broadcast)
            .map_err(|source| HeartbeatError::Send {
                target: broadcast,
                source,
            })?;
        trace!(%broadcast, mode, "Heartbeat sent");
        Ok(())
    }
}

/// Sends a heartbeat on a fixed interval and whenever the console asks for one.
pub struct Heartbeat {
    shared: Arc<Shared>,
    worker: Worker,
}

impl Heartbeat {
    /// Starts the periodic heartbeat. If a periodic send fails, the error is reported on the
    /// fatal channel and the heartbeat stops.
    pub fn start(
        socket: Arc<UdpSocket>,
        broadcast: SocketAddr,
        interval: Duration,
        mode: u8,
        fatal: Sender<HeartbeatError>,
    ) -> Result<Heartbeat, LifecycleError> {
        let shared = Arc::new(Shared {
            socket,
            mode: AtomicU8::new(mode),
            target: Mutex::new(Target {
                broadcast,
                unicast: None,
                failures: 0,
            }),
        });

        let worker = {
            let shared = shared.clone();
            Worker::spawn("heartbeat", move |cancel_handle| {
                let span = span!(Level::INFO, "heartbeat");
                let _enter = span.enter();

                info!(%broadcast, ?interval, "Heartbeat started");
                loop {
                    if let Err(e) = shared.send() {
                        error!(err = e.to_string(), "Heartbeat failed");
                        let _ = fatal.send(e);
                        return;
                    }
                    if cancel_handle.wait_timeout(interval) {
                        break;
                    }
                }
                info!("Heartbeat stopped");
            })?
        };

        Ok(Heartbeat { shared, worker })
    }

    /// Records the mode and sends a heartbeat right away.
    pub fn beat(&self, mode: u8) -> Result<(), HeartbeatError> {
        self.shared.mode.store(mode, Ordering::SeqCst);
        self.shared.send()
    }

    /// Narrows heartbeats to the controller at the given address. The heartbeat keeps using the
    /// configured port.
    pub fn observe(&self, from: SocketAddr) {
        let mut target = self.shared.target.lock();
        let unicast = SocketAddr::new(from.ip(), target.broadcast.port());
        if target.unicast != Some(unicast) {
            info!(%unicast, "Controller found, heartbeats are now unicast");
            target.unicast = Some(unicast);
            target.failures = 0;
        }
    }

    /// Where the next heartbeat will go.
    #[cfg(test)]
    pub fn target(&self) -> SocketAddr {
        let target = self.shared.target.lock();
        target.unicast.unwrap_or(target.broadcast)
    }

    pub fn stop(mut self, timeout: Duration) -> Result<(), LifecycleError> {
        self.worker.stop(timeout)
    }
}

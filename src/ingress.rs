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
use std::{
    error::Error,
    io::ErrorKind,
    net::{SocketAddr, UdpSocket},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use crossbeam_channel::{SendTimeoutError, Sender};
use tracing::{debug, error, info, span, Level};

use crate::{
    lifecycle::{CancelHandle, LifecycleError, Worker},
    protocol::{self, Command, MAX_DATAGRAM},
};

/// Upper bound on a single blocking receive, so a stop never waits on a silent network.
pub const RECEIVE_TIMEOUT: Duration = Duration::from_millis(250);

/// How long a full queue is waited on before checking for cancellation again.
const ENQUEUE_TIMEOUT: Duration = Duration::from_millis(100);

/// Back off after an unexpected socket error.
const ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// A decoded command and where it came from.
#[derive(Debug, Clone)]
pub struct Received {
    pub command: Command,
    pub from: SocketAddr,
}

#[derive(Default)]
struct Stats {
    received: AtomicU64,
    rejected: AtomicU64,
}

/// Receives datagrams from the controller and queues the ones that decode.
pub struct Ingress {
    worker: Worker,
    stats: Arc<Stats>,
}

impl Ingress {
    pub fn start(
        socket: Arc<UdpSocket>,
        queue: Sender<Received>,
    ) -> Result<Ingress, Box<dyn Error>> {
        socket.set_read_timeout(Some(RECEIVE_TIMEOUT))?;

        let stats = Arc::new(Stats::default());
        let worker = {
            let stats = stats.clone();
            Worker::spawn("ingress", move |cancel_handle| {
                let span = span!(Level::INFO, "ingress");
                let _enter = span.enter();

                info!(addr = ?socket.local_addr().ok(), "Ingress started");
                receive_loop(&socket, &queue, &stats, &cancel_handle);
                info!(
                    received = stats.received.load(Ordering::Relaxed),
                    rejected = stats.rejected.load(Ordering::Relaxed),
                    "Ingress stopped"
                );
            })?
        };

        Ok(Ingress { worker, stats })
    }

    /// Datagrams that decoded.
    pub fn received(&self) -> u64 {
        self.stats.received.load(Ordering::Relaxed)
    }

    /// Datagrams that were dropped because they did not decode.
    pub fn rejected(&self) -> u64 {
        self.stats.rejected.load(Ordering::Relaxed)
    }

    pub fn stop(mut self, timeout: Duration) -> Result<(), LifecycleError> {
        self.worker.stop(timeout)
    }
}

fn receive_loop(
    socket: &UdpSocket,
    queue: &Sender<Received>,
    stats: &Stats,
    cancel_handle: &CancelHandle,
) {
    let mut buf = [0u8; MAX_DATAGRAM];

    while !cancel_handle.is_cancelled() {
        let (len, from) = match socket.recv_from(&mut buf) {
            Ok(result) => result,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => continue,
            Err(e) => {
                error!(err = e.to_string(), "Error receiving datagram");
                cancel_handle.wait_timeout(ERROR_BACKOFF);
                continue;
            }
        };

        match protocol::decode(&buf[..len]) {
            Ok(command) => {
                stats.received.fetch_add(1, Ordering::Relaxed);
                if !enqueue(queue, Received { command, from }, cancel_handle) {
                    return;
                }
            }
            Err(e) => {
                let rejected = stats.rejected.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(err = e.to_string(), %from, len, rejected, "Dropping datagram");
            }
        }
    }
}

/// Blocks while the queue is full. Returns false if the ingress should exit instead.
fn enqueue(queue: &Sender<Received>, received: Received, cancel_handle: &CancelHandle) -> bool {
    let mut received = received;
    loop {
        match queue.send_timeout(received, ENQUEUE_TIMEOUT) {
            Ok(()) => return true,
            Err(SendTimeoutError::Timeout(unsent)) => {
                if cancel_handle.is_cancelled() {
                    return false;
                }
                received = unsent;
            }
            Err(SendTimeoutError::Disconnected(_)) => {
                debug!("Command queue closed");
                return false;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::{io, time::Instant};

    use crossbeam_channel::bounded;

    use super::*;
    use crate::{
        protocol::{Action, Payload},
        testutil::eventually,
    };

    fn sockets() -> Result<(Arc<UdpSocket>, UdpSocket), io::Error> {
        let console = Arc::new(UdpSocket::bind("127.0.0.1:0")?);
        let controller = UdpSocket::bind("127.0.0.1:0")?;
        Ok((console, controller))
    }

    #[test]
    fn test_queues_valid_and_drops_malformed() -> Result<(), Box<dyn Error>> {
        let (console, controller) = sockets()?;
        let (tx, rx) = bounded(8);
        let ingress = Ingress::start(console.clone(), tx)?;
        let target = console.local_addr()?;

        controller.send_to(b"not a command", target)?;
        controller.send_to(&Command::user_action(Action::B1, 1).encode(), target)?;
        controller.send_to(&protocol::MAGIC, target)?;

        let received = rx.recv_timeout(Duration::from_secs(5))?;
        assert_eq!(received.command.payload, Payload::UserAction(0x02));
        assert_eq!(received.from, controller.local_addr()?);

        eventually(
            || ingress.rejected() == 2,
            "Malformed datagrams were not counted",
        );
        assert_eq!(ingress.received(), 1);
        assert!(rx.try_recv().is_err());

        ingress.stop(Duration::from_secs(2))?;
        Ok(())
    }

    #[test]
    fn test_preserves_order() -> Result<(), Box<dyn Error>> {
        let (console, controller) = sockets()?;
        let (tx, rx) = bounded(16);
        let ingress = Ingress::start(console.clone(), tx)?;
        let target = console.local_addr()?;

        let actions = [Action::Left, Action::Right, Action::Up, Action::Down];
        for action in actions {
            controller.send_to(&Command::user_action(action, 1).encode(), target)?;
        }

        let mut seen = Vec::new();
        for _ in actions {
            seen.push(rx.recv_timeout(Duration::from_secs(5))?.command.action());
        }
        assert_eq!(seen, actions.map(Some).to_vec());

        ingress.stop(Duration::from_secs(2))?;
        Ok(())
    }

    #[test]
    fn test_stops_while_idle_or_blocked() -> Result<(), Box<dyn Error>> {
        let (console, controller) = sockets()?;

        // Nothing received at all.
        let (tx, _rx) = bounded(1);
        let ingress = Ingress::start(console.clone(), tx)?;
        let start = Instant::now();
        ingress.stop(Duration::from_secs(2))?;
        assert!(start.elapsed() < Duration::from_secs(1));

        // A full queue nobody is draining.
        let (tx, rx) = bounded(1);
        let ingress = Ingress::start(console.clone(), tx)?;
        let target = console.local_addr()?;
        for _ in 0..3 {
            controller.send_to(&Command::user_action(Action::Up, 1).encode(), target)?;
        }
        eventually(
            || ingress.received() >= 2,
            "Ingress never blocked on the queue",
        );
        ingress.stop(Duration::from_secs(2))?;
        assert_eq!(rx.len(), 1);
        Ok(())
    }
}

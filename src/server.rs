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
    net::{SocketAddr, UdpSocket},
    sync::Arc,
    time::Duration,
};

use crossbeam_channel::{bounded, never, select, Receiver};
use tracing::{debug, info, span, trace, Level};

use crate::{
    config,
    console::Console,
    dmx,
    heartbeat::{Heartbeat, HeartbeatError},
    ingress::{Ingress, Received},
    lifecycle::LifecycleError,
    operator::Request,
    protocol::PacketKind,
    scenes::{FileScenes, MemoryScenes, SceneStore},
};

/// How long the console waits for a command before checking in again.
const IDLE_WAIT: Duration = Duration::from_secs(1);

/// Builds everything the configuration describes and runs the console until the operator quits
/// or something fatal happens.
pub fn run(
    config: &config::Console,
    requests: Option<Receiver<Request>>,
) -> Result<(), Box<dyn Error>> {
    let fixtures = config.fixtures()?;
    for fixture in fixtures.iter() {
        debug!(%fixture, "Fixture");
    }

    let sink = dmx::create_sink(config.output())?;
    let scenes: Box<dyn SceneStore> = match config.scene_file() {
        Some(path) => Box::new(FileScenes::load(path)?),
        None => Box::new(MemoryScenes::new()),
    };
    info!(
        fixtures = fixtures.len(),
        scenes = scenes.count(),
        "Console configured"
    );

    let console = Console::new(
        fixtures,
        sink,
        scenes,
        config.chase_delay()?,
        config.stop_timeout()?,
    );

    let bind_address = config.bind_address()?;
    let socket = UdpSocket::bind(bind_address)?;
    socket.set_broadcast(true)?;
    info!(%bind_address, "Listening for the controller");

    serve(
        Arc::new(socket),
        config.broadcast_address()?,
        console,
        config,
        requests,
    )
}

/// Runs the console on an already bound socket. Heartbeats go to the broadcast address until a
/// controller is heard from.
fn serve(
    socket: Arc<UdpSocket>,
    broadcast: SocketAddr,
    mut console: Console,
    config: &config::Console,
    requests: Option<Receiver<Request>>,
) -> Result<(), Box<dyn Error>> {
    let span = span!(Level::INFO, "console");
    let _enter = span.enter();

    let stop_timeout = config.stop_timeout()?;
    let (queue_tx, queue) = bounded::<Received>(config.queue_capacity());
    let (fatal_tx, fatal) = bounded::<HeartbeatError>(1);

    let ingress = Ingress::start(socket.clone(), queue_tx)?;
    let heartbeat = Heartbeat::start(
        socket.clone(),
        broadcast,
        config.heartbeat_interval()?,
        console.mode().code(),
        fatal_tx,
    )?;

    let result = serve_loop(
        &mut console,
        &heartbeat,
        &queue,
        &fatal,
        requests.unwrap_or_else(never),
    );

    info!(
        received = ingress.received(),
        rejected = ingress.rejected(),
        "Shutting down"
    );
    let stopped = shutdown(ingress, heartbeat, &mut console, stop_timeout);
    drop(socket);

    result?;
    stopped?;
    info!("Console stopped");
    Ok(())
}

fn serve_loop(
    console: &mut Console,
    heartbeat: &Heartbeat,
    queue: &Receiver<Received>,
    fatal: &Receiver<HeartbeatError>,
    requests: Receiver<Request>,
) -> Result<(), Box<dyn Error>> {
    let closed = never::<Request>();
    let mut operator_open = true;

    loop {
        let operator = if operator_open { &requests } else { &closed };

        select! {
            recv(queue) -> received => {
                let received = received.map_err(|_| "ingress stopped unexpectedly")?;
                if matches!(received.command.kind, PacketKind::Data | PacketKind::PollReply) {
                    heartbeat.observe(received.from);
                }
                trace!(command = %received.command, from = %received.from, "Command");

                if console.handle(&received.command)? {
                    heartbeat.beat(console.mode().code())?;
                }
            }
            recv(fatal) -> error => {
                return Err(match error {
                    Ok(e) => e.into(),
                    Err(_) => "heartbeat stopped unexpectedly".into(),
                });
            }
            recv(operator) -> request => match request {
                Ok(Request::Status) => console.log_status(),
                Ok(Request::Quit) => {
                    info!("Quit requested");
                    return Ok(());
                }
                Err(_) => {
                    debug!("Operator console closed");
                    operator_open = false;
                }
            },
            default(IDLE_WAIT) => trace!("No commands"),
        }
    }
}

/// Stops the components in order: ingress, heartbeat, then the running effect. Every stop is
/// attempted and the first failure is returned.
fn shutdown(
    ingress: Ingress,
    heartbeat: Heartbeat,
    console: &mut Console,
    timeout: Duration,
) -> Result<(), LifecycleError> {
    let ingress = ingress.stop(timeout);
    let heartbeat = heartbeat.stop(timeout);
    let effect = console.shutdown();
    ingress.and(heartbeat).and(effect)
}

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
mod color;
mod config;
mod console;
mod dmx;
mod effects;
mod fixture;
mod heartbeat;
mod ingress;
mod lifecycle;
mod operator;
mod protocol;
mod scenes;
mod server;
#[cfg(test)]
mod testutil;

use std::error::Error;
use std::net::{SocketAddr, UdpSocket};
use std::path::Path;

use clap::{crate_version, Parser, Subcommand};
use crossbeam_channel::unbounded;
use tracing_subscriber::EnvFilter;

use crate::protocol::{Action, Command};

const SYSTEMD_SERVICE: &str = r#"
[Unit]
Description=wireless lighting console
After=network-online.target olad.service

[Service]
Type=simple
Restart=on-failure
EnvironmentFile=-/etc/default/lightdeck
ExecStart=/usr/local/bin/lightdeck start "$LIGHTDECK_CONFIG"

[Install]
WantedBy=multi-user.target
Alias=lightdeck.service
"#;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A lighting console driven by a wireless controller."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start runs the console until the operator quits.
    Start {
        /// The path to the console config.
        config_path: String,
    },
    /// Validates the fixtures in the console config and lists them.
    Fixtures {
        /// The path to the console config.
        config_path: String,
        /// Print the resolved fixtures as YAML instead of a table.
        #[arg(long)]
        yaml: bool,
    },
    /// Sends a single controller action to a running console.
    Send {
        /// The console address, e.g. 192.168.1.20:6454.
        target: String,
        /// One of up, down, left, right, ps2, ps2-long, b1, b2, b12, konami, rev-konami,
        /// semi-konami.
        action: String,
        /// The mode byte to echo.
        #[arg(short, long, default_value_t = 1)]
        mode: u8,
    },
    /// Prints a systemd service definition to stdout.
    Systemd {},
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start { config_path } => {
            let config = config::Console::deserialize(Path::new(&config_path))?;
            let (requests_tx, requests_rx) = unbounded();
            operator::start(requests_tx)?;
            server::run(&config, Some(requests_rx))?;
        }
        Commands::Fixtures { config_path, yaml } => {
            let config = config::Console::deserialize(Path::new(&config_path))?;
            let fixtures = config.fixtures()?;

            if fixtures.is_empty() {
                println!("No fixtures configured.");
                return Ok(());
            }

            if yaml {
                let resolved: Vec<config::Fixture> =
                    fixtures.iter().map(config::Fixture::from).collect();
                print!("{}", serde_yml::to_string(&resolved)?);
                return Ok(());
            }

            println!("Fixtures (count: {}):", fixtures.len());
            for fixture in fixtures.iter() {
                let default_color = fixture
                    .default_color_offset()
                    .map(|offset| fixture.channels()[offset].as_str())
                    .unwrap_or("none");
                println!("- {} (default color: {})", fixture, default_color);
            }
        }
        Commands::Send {
            target,
            action,
            mode,
        } => {
            let target: SocketAddr = target.parse()?;
            let Some(action) = Action::from_name(&action) else {
                return Err(format!("unknown action {}", action).into());
            };

            let bind: SocketAddr = if target.is_ipv4() {
                "0.0.0.0:0".parse()?
            } else {
                "[::]:0".parse()?
            };
            let socket = UdpSocket::bind(bind)?;
            socket.set_broadcast(true)?;
            socket.send_to(&Command::user_action(action, mode).encode(), target)?;
            println!("Sent {:?} to {}.", action, target);
        }
        Commands::Systemd {} => {
            println!("{}", SYSTEMD_SERVICE);
        }
    }

    Ok(())
}

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
    collections::HashSet,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
    time::Duration,
};

use config::{Config, Environment, File};
use duration_string::DurationString;
use serde::Deserialize;

use crate::{effects, fixture, protocol};

mod error;
mod fixtures;
mod output;

pub use error::ConfigError;
pub use fixtures::Fixture;
pub use output::Output;

pub const DEFAULT_BIND_ADDRESS: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
pub const DEFAULT_BROADCAST_ADDRESS: IpAddr = IpAddr::V4(Ipv4Addr::BROADCAST);
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_CHASE_DELAY: Duration = Duration::from_millis(100);

/// A YAML representation of the console configuration.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Console {
    /// The UDP port shared with the controller.
    port: Option<u16>,

    /// The local address to listen on.
    bind_address: Option<String>,

    /// Where heartbeats go until a controller has been heard from.
    broadcast_address: Option<String>,

    heartbeat_interval: Option<String>,

    /// How many decoded commands may wait for the console.
    queue_capacity: Option<usize>,

    /// How long any component gets to shut down.
    stop_timeout: Option<String>,

    /// The starting delay between scenes in a chase.
    chase_delay: Option<String>,

    /// Saved scenes are kept here. Scenes are forgotten on exit if unset.
    scene_file: Option<PathBuf>,

    #[serde(default)]
    output: Output,

    #[serde(default)]
    fixtures: Vec<Fixture>,
}

fn parse_duration(
    key: &'static str,
    value: &Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    value.as_ref().map_or(Ok(default), |duration| {
        Ok(DurationString::from_string(duration.clone())
            .map_err(|e| ConfigError::Duration {
                key,
                message: e.to_string(),
            })?
            .into())
    })
}

fn parse_address(
    key: &'static str,
    value: &Option<String>,
    default: IpAddr,
) -> Result<IpAddr, ConfigError> {
    value.as_ref().map_or(Ok(default), |address| {
        address.parse().map_err(|_| ConfigError::Address {
            key,
            value: address.clone(),
        })
    })
}

impl Console {
    /// Parses the configuration from a YAML file. Top-level keys may be overridden with
    /// LIGHTDECK_ prefixed environment variables.
    pub fn deserialize(path: &Path) -> Result<Console, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .add_source(Environment::with_prefix("LIGHTDECK").try_parsing(true))
            .build()?
            .try_deserialize::<Console>()?)
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(protocol::DEFAULT_PORT)
    }

    /// The socket address to bind.
    pub fn bind_address(&self) -> Result<SocketAddr, ConfigError> {
        Ok(SocketAddr::new(
            parse_address("bind_address", &self.bind_address, DEFAULT_BIND_ADDRESS)?,
            self.port(),
        ))
    }

    /// The socket address heartbeats are broadcast to.
    pub fn broadcast_address(&self) -> Result<SocketAddr, ConfigError> {
        Ok(SocketAddr::new(
            parse_address(
                "broadcast_address",
                &self.broadcast_address,
                DEFAULT_BROADCAST_ADDRESS,
            )?,
            self.port(),
        ))
    }

    pub fn heartbeat_interval(&self) -> Result<Duration, ConfigError> {
        parse_duration(
            "heartbeat_interval",
            &self.heartbeat_interval,
            DEFAULT_HEARTBEAT_INTERVAL,
        )
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY).max(1)
    }

    pub fn stop_timeout(&self) -> Result<Duration, ConfigError> {
        parse_duration("stop_timeout", &self.stop_timeout, DEFAULT_STOP_TIMEOUT)
    }

    /// The chase delay, clamped to what the console allows.
    pub fn chase_delay(&self) -> Result<Duration, ConfigError> {
        Ok(
            parse_duration("chase_delay", &self.chase_delay, DEFAULT_CHASE_DELAY)?
                .clamp(effects::MIN_CHASE_DELAY, effects::MAX_CHASE_DELAY),
        )
    }

    pub fn scene_file(&self) -> Option<&Path> {
        self.scene_file.as_deref()
    }

    pub fn output(&self) -> &Output {
        &self.output
    }

    /// Validates every fixture and returns them ordered by address. No two fixtures may share a
    /// channel.
    pub fn fixtures(&self) -> Result<Vec<fixture::Fixture>, ConfigError> {
        let mut names = HashSet::new();
        let mut fixtures = self
            .fixtures
            .iter()
            .map(|fixture| {
                let fixture = fixture.to_fixture()?;
                if !names.insert(fixture.name().to_string()) {
                    return Err(ConfigError::DuplicateFixture(fixture.name().to_string()));
                }
                Ok(fixture)
            })
            .collect::<Result<Vec<fixture::Fixture>, ConfigError>>()?;

        fixtures.sort_by_key(|fixture| fixture.address());
        for pair in fixtures.windows(2) {
            let (first, second) = (&pair[0], &pair[1]);
            let first_end = usize::from(first.address()) + first.channel_count();
            if first_end > usize::from(second.address()) {
                return Err(fixture::FixtureError::Overlap {
                    name: second.name().to_string(),
                    address: second.address(),
                    other: first.name().to_string(),
                }
                .into());
            }
        }
        Ok(fixtures)
    }
}

#[cfg(test)]
mod test {
    use std::{error::Error, fs};

    use config::{Config, File, FileFormat};

    use super::*;

    fn parse(yaml: &str) -> Console {
        Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults() -> Result<(), Box<dyn Error>> {
        let config = parse("{}");
        assert_eq!(config.port(), 6454);
        assert_eq!(
            config.bind_address()?,
            "0.0.0.0:6454".parse::<SocketAddr>()?
        );
        assert_eq!(
            config.broadcast_address()?,
            "255.255.255.255:6454".parse::<SocketAddr>()?
        );
        assert_eq!(config.heartbeat_interval()?, Duration::from_secs(3));
        assert_eq!(config.queue_capacity(), 64);
        assert_eq!(config.stop_timeout()?, Duration::from_secs(2));
        assert_eq!(config.chase_delay()?, Duration::from_millis(100));
        assert_eq!(config.scene_file(), None);
        assert_eq!(config.output(), &Output::Dummy);
        assert!(config.fixtures()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_full_config() -> Result<(), Box<dyn Error>> {
        let config = parse(
            r#"
            port: 7000
            broadcast_address: 10.0.0.255
            heartbeat_interval: 500ms
            chase_delay: 1m
            scene_file: /var/lib/lightdeck/scenes.json
            output:
              kind: ola
              universe: 2
            fixtures:
              - name: stage right
                address: 20
                template: exa
              - name: stage left
                address: 1
                channels: [dimmer, red, green, blue]
            "#,
        );

        assert_eq!(
            config.broadcast_address()?,
            "10.0.0.255:7000".parse::<SocketAddr>()?
        );
        assert_eq!(config.heartbeat_interval()?, Duration::from_millis(500));
        assert_eq!(config.chase_delay()?, effects::MAX_CHASE_DELAY);
        assert_eq!(
            config.scene_file(),
            Some(Path::new("/var/lib/lightdeck/scenes.json"))
        );
        match config.output() {
            Output::Ola(ola) => {
                assert_eq!(ola.universe(), 2);
                assert_eq!(ola.port(), 9010);
            }
            other => panic!("unexpected output {:?}", other),
        }

        let fixtures = config.fixtures()?;
        assert_eq!(fixtures[0].name(), "stage left");
        assert_eq!(fixtures[1].name(), "stage right");
        assert_eq!(fixtures[1].channel_count(), 12);
        Ok(())
    }

    #[test]
    fn test_invalid_values() {
        let config = parse("heartbeat_interval: soon\nbroadcast_address: nowhere");
        assert!(matches!(
            config.heartbeat_interval(),
            Err(ConfigError::Duration {
                key: "heartbeat_interval",
                ..
            })
        ));
        assert!(matches!(
            config.broadcast_address(),
            Err(ConfigError::Address { .. })
        ));

        let config = parse(
            r#"
            fixtures:
              - name: par
                address: 1
                template: moving-head
            "#,
        );
        assert!(matches!(
            config.fixtures(),
            Err(ConfigError::UnknownTemplate { .. })
        ));

        let config = parse(
            r#"
            fixtures:
              - name: par
                address: 1
                channels: [dimmer]
              - name: par
                address: 2
                channels: [dimmer]
            "#,
        );
        assert!(matches!(
            config.fixtures(),
            Err(ConfigError::DuplicateFixture(_))
        ));

        let config = parse(
            r#"
            fixtures:
              - name: par
                address: 1
            "#,
        );
        assert!(matches!(
            config.fixtures(),
            Err(ConfigError::MissingChannels { .. })
        ));

        let config = parse(
            r#"
            fixtures:
              - name: par
                address: 510
                channels: [dimmer, red, green, blue]
            "#,
        );
        assert!(matches!(config.fixtures(), Err(ConfigError::Fixture(_))));
    }

    #[test]
    fn test_overlapping_fixtures() -> Result<(), Box<dyn Error>> {
        let config = parse(
            r#"
            fixtures:
              - name: right
                address: 4
                channels: [dimmer, red]
              - name: left
                address: 1
                channels: [dimmer, red, green, blue]
            "#,
        );
        match config.fixtures() {
            Err(ConfigError::Fixture(fixture::FixtureError::Overlap {
                name,
                address,
                other,
            })) => {
                assert_eq!(name, "right");
                assert_eq!(address, 4);
                assert_eq!(other, "left");
            }
            result => panic!("expected an overlap, got {:?}", result),
        }

        // Touching ranges are fine.
        let config = parse(
            r#"
            fixtures:
              - name: right
                address: 5
                channels: [dimmer, red]
              - name: left
                address: 1
                channels: [dimmer, red, green, blue]
            "#,
        );
        let names: Vec<String> = config
            .fixtures()?
            .iter()
            .map(|fixture| fixture.name().to_string())
            .collect();
        assert_eq!(names, vec!["left", "right"]);
        Ok(())
    }

    #[test]
    fn test_deserialize_file() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("lightdeck.yaml");
        fs::write(
            &path,
            "queue_capacity: 8\nfixtures:\n  - name: wash\n    address: 100\n    template: zoom\n",
        )?;

        let config = Console::deserialize(&path)?;
        assert_eq!(config.queue_capacity(), 8);
        assert_eq!(config.fixtures()?[0].address(), 100);

        assert!(matches!(
            Console::deserialize(&dir.path().join("missing.yaml")),
            Err(ConfigError::Load(_))
        ));
        Ok(())
    }
}

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
use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use crate::fixture;

/// A YAML representation of a fixture.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Fixture {
    /// The name shown to the operator.
    name: String,

    /// The first DMX channel, 1-indexed.
    address: u16,

    /// Channel names in order. Takes precedence over the template.
    #[serde(skip_serializing_if = "Option::is_none")]
    channels: Option<Vec<String>>,

    /// A built-in channel layout.
    #[serde(skip_serializing_if = "Option::is_none")]
    template: Option<String>,
}

impl Fixture {
    /// Validates the fixture and resolves its channel layout.
    pub fn to_fixture(&self) -> Result<fixture::Fixture, ConfigError> {
        let channels = match (&self.channels, &self.template) {
            (Some(channels), _) => channels.clone(),
            (None, Some(template)) => fixture::template(template)
                .ok_or_else(|| ConfigError::UnknownTemplate {
                    name: self.name.clone(),
                    template: template.clone(),
                })?
                .iter()
                .map(|channel| channel.to_string())
                .collect(),
            (None, None) => {
                return Err(ConfigError::MissingChannels {
                    name: self.name.clone(),
                })
            }
        };

        Ok(fixture::Fixture::new(&self.name, self.address, channels)?)
    }
}

/// The resolved form, with every channel spelled out.
impl From<&fixture::Fixture> for Fixture {
    fn from(fixture: &fixture::Fixture) -> Self {
        Fixture {
            name: fixture.name().to_string(),
            address: fixture.address(),
            channels: Some(fixture.channels().to_vec()),
            template: None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_template_and_channels() -> Result<(), ConfigError> {
        let templated = Fixture {
            name: "wash".to_string(),
            address: 30,
            channels: None,
            template: Some("Zoom".to_string()),
        };
        let fixture = templated.to_fixture()?;
        assert_eq!(fixture.channel_count(), 11);
        assert_eq!(fixture.offset("zoom"), Some(7));

        // Resolving spells the template out.
        let resolved = Fixture::from(&fixture);
        assert_eq!(resolved.channels.as_ref().map(Vec::len), Some(11));
        assert_eq!(resolved.template, None);
        assert_eq!(resolved.to_fixture()?, fixture);

        let explicit = Fixture {
            channels: Some(vec!["dimmer".to_string()]),
            ..templated
        };
        assert_eq!(explicit.to_fixture()?.channel_count(), 1);
        Ok(())
    }
}

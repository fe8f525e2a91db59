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

use crate::fixture::FixtureError;

/// Typed error for config load/parse failures so callers can distinguish
/// e.g. file-not-found from parse errors without string matching.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config load/parse error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid duration for {key}: {message}")]
    Duration { key: &'static str, message: String },

    #[error("invalid address for {key}: {value}")]
    Address { key: &'static str, value: String },

    #[error("fixture {name} must list channels or name a template")]
    MissingChannels { name: String },

    #[error("fixture {name} uses unknown template {template}")]
    UnknownTemplate { name: String, template: String },

    #[error("fixture name {0} is used more than once")]
    DuplicateFixture(String),

    #[error(transparent)]
    Fixture(#[from] FixtureError),
}

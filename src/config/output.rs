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
use serde::Deserialize;

pub const DEFAULT_OLA_UNIVERSE: u32 = 1;
pub const DEFAULT_OLA_PORT: u16 = 9010;

/// Where DMX goes.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Output {
    /// Keep the array in memory only.
    #[default]
    Dummy,
    Ola(Ola),
}

/// An OLA daemon universe.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Ola {
    universe: Option<u32>,
    port: Option<u16>,
}

impl Ola {
    pub fn universe(&self) -> u32 {
        self.universe.unwrap_or(DEFAULT_OLA_UNIVERSE)
    }

    /// The olad RPC port.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_OLA_PORT)
    }
}

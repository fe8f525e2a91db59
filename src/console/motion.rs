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
use rand::Rng;

use crate::color::{self, Color};

/// Shaking the controller harder brightens the lights.
const PARTY: [(u32, u8); 12] = [
    (300, 10),
    (350, 30),
    (400, 45),
    (600, 90),
    (670, 100),
    (900, 120),
    (950, 175),
    (1000, 200),
    (1100, 225),
    (1400, 240),
    (1700, 250),
    (2000, 255),
];

/// Holding still keeps the lights up, any movement sends them toward black.
const SCARY: [(u32, u8); 12] = [
    (300, 230),
    (320, 220),
    (340, 200),
    (360, 170),
    (370, 130),
    (390, 110),
    (410, 100),
    (420, 70),
    (450, 50),
    (460, 33),
    (465, 20),
    (477, 3),
];

const SCARY_REST: u8 = 247;

/// The value of the highest threshold the magnitude exceeds.
fn lookup(table: &[(u32, u8)], magnitude: u32, rest: u8) -> u8 {
    table
        .iter()
        .rev()
        .find(|(threshold, _)| magnitude > *threshold)
        .map_or(rest, |(_, value)| *value)
}

pub fn party_dimmer(magnitude: u32) -> u8 {
    lookup(&PARTY, magnitude, 0)
}

pub fn scary_dimmer(magnitude: u32) -> u8 {
    lookup(&SCARY, magnitude, SCARY_REST)
}

pub fn party_color(rng: &mut impl Rng) -> Color {
    Color::new(rng.gen(), rng.gen(), rng.gen())
}

pub fn scary_color() -> Color {
    color::WHITE
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_party_table() {
        assert_eq!(party_dimmer(0), 0);
        assert_eq!(party_dimmer(300), 0);
        assert_eq!(party_dimmer(301), 10);
        assert_eq!(party_dimmer(650), 90);
        assert_eq!(party_dimmer(2000), 250);
        assert_eq!(party_dimmer(3072), 255);
    }

    #[test]
    fn test_scary_table() {
        assert_eq!(scary_dimmer(0), 247);
        assert_eq!(scary_dimmer(301), 230);
        assert_eq!(scary_dimmer(415), 100);
        assert_eq!(scary_dimmer(478), 3);
        assert_eq!(scary_dimmer(3072), 3);
    }
}

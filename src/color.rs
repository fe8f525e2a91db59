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

/// An RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

pub const WHITE: Color = Color::new(255, 255, 255);
pub const RED: Color = Color::new(255, 0, 0);
pub const YELLOW: Color = Color::new(255, 255, 0);
pub const GREEN: Color = Color::new(0, 255, 0);
pub const CYAN: Color = Color::new(0, 255, 255);
pub const BLUE: Color = Color::new(0, 0, 255);
pub const MAGENTA: Color = Color::new(255, 0, 255);
pub const BLACK: Color = Color::new(0, 0, 0);

/// The palette stepped through by the preset loop and preset mode.
pub const PRESETS: [Color; 8] = [WHITE, RED, YELLOW, GREEN, CYAN, BLUE, MAGENTA, BLACK];

/// Number of steps in each ramp of the rainbow sweep.
pub const RAINBOW_RESOLUTION: u32 = 100;

/// Joystick axes report values in [0, JOYSTICK_RANGE).
pub const JOYSTICK_RANGE: i32 = 4096;

const JOYSTICK_SCALE: i32 = 4;
const WHEEL_RADIUS: i32 = JOYSTICK_RANGE / JOYSTICK_SCALE / 2;
const WHEEL_WHITE_RADIUS: i32 = WHEEL_RADIUS / 16;

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn from_hsv(h: f64, s: f64, v: f64) -> Self {
        let h = h.rem_euclid(360.0);
        let c = v * s;
        let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
        let m = v - c;

        let sector = (h / 60.0).floor() as u8 % 6;
        let (r, g, b) = match sector {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };

        Self {
            r: ((r + m) * 255.0).round() as u8,
            g: ((g + m) * 255.0).round() as u8,
            b: ((b + m) * 255.0).round() as u8,
        }
    }
}

fn ramp(step: u32) -> u8 {
    (step * 255 / RAINBOW_RESOLUTION) as u8
}

/// The hue sweep played by the rainbow loop: six linear ramps around the color wheel.
pub fn rainbow() -> Vec<Color> {
    let up = 0..RAINBOW_RESOLUTION;
    let down = (1..=RAINBOW_RESOLUTION).rev();

    let mut sweep = Vec::with_capacity(6 * RAINBOW_RESOLUTION as usize + 1);
    sweep.extend(up.clone().map(|r| Color::new(ramp(r), 255, 0)));
    sweep.extend(down.clone().map(|g| Color::new(255, ramp(g), 0)));
    sweep.extend(up.clone().map(|b| Color::new(255, 0, ramp(b))));
    sweep.extend(down.clone().map(|r| Color::new(ramp(r), 0, 255)));
    sweep.extend(up.map(|g| Color::new(0, ramp(g), 255)));
    sweep.extend(down.map(|b| Color::new(0, 255, ramp(b))));
    sweep.push(GREEN);
    sweep
}

/// Maps a joystick position onto a color wheel. The angle picks the hue, the distance from the
/// center picks the saturation, a small pocket around the center is white and anything past the
/// rim is black.
pub fn wheel(x: i32, y: i32) -> Color {
    let x = x.clamp(0, JOYSTICK_RANGE - 1) / JOYSTICK_SCALE - WHEEL_RADIUS;
    let y = y.clamp(0, JOYSTICK_RANGE - 1) / JOYSTICK_SCALE - WHEEL_RADIUS;

    let distance = f64::from(x * x + y * y).sqrt();
    if distance > f64::from(WHEEL_RADIUS) {
        return BLACK;
    }
    if distance < f64::from(WHEEL_WHITE_RADIUS) {
        return WHITE;
    }

    let angle = f64::from(x).atan2(f64::from(y)).to_degrees();
    Color::from_hsv(angle, distance / f64::from(WHEEL_RADIUS), 1.0)
}

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

//! The wire protocol spoken between the handheld controller and the console.
//!
//! Every datagram starts with an 8 byte magic identifier followed by a packet kind and the
//! controller's idea of the current mode. Data packets carry one of three payload variants.

use std::fmt;

use thiserror::Error;

/// Identifies datagrams that belong to this protocol.
pub const MAGIC: [u8; 8] = [b'J', b'E', 0x10, b'M', b'K', 0x03, b'C', b'K'];

/// The well known UDP port used by both ends of the link.
pub const DEFAULT_PORT: u16 = 6454;

/// The largest datagram we bother reading.
pub const MAX_DATAGRAM: usize = 1024;

/// Length of a heartbeat datagram: magic, kind, mode.
pub const HEARTBEAT_LEN: usize = 10;

const KIND_OFFSET: usize = 8;
const MODE_OFFSET: usize = 9;
const VARIANT_OFFSET: usize = 10;
const ACTION_OFFSET: usize = 11;
const JOYSTICK_X_OFFSET: usize = 12;
const JOYSTICK_Y_OFFSET: usize = 16;
const GYRO_OFFSET: usize = 14;
const BATTERY_OFFSET: usize = 10;
const ERROR_CODE_OFFSET: usize = 14;
const MESSAGE_LEN_OFFSET: usize = 15;
const MESSAGE_OFFSET: usize = 16;

/// Scales the summed gyro deviation into the range used by the motion threshold tables.
pub const GYRO_MAGNITUDE_SCALE: u32 = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("datagram truncated: needed {needed} bytes, got {len}")]
    Truncated { needed: usize, len: usize },

    #[error("bad magic identifier")]
    BadMagic,

    #[error("unknown packet kind 0x{0:02x}")]
    UnknownKind(u8),

    #[error("unknown data variant 0x{0:02x}")]
    UnknownVariant(u8),
}

/// The packet kind in byte 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    Data,
    Poll,
    PollReply,
}

impl PacketKind {
    pub fn code(&self) -> u8 {
        match self {
            PacketKind::Data => 0x33,
            PacketKind::Poll => 0x87,
            PacketKind::PollReply => 0x1E,
        }
    }
}

impl TryFrom<u8> for PacketKind {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x33 => Ok(PacketKind::Data),
            0x87 => Ok(PacketKind::Poll),
            0x1E => Ok(PacketKind::PollReply),
            other => Err(DecodeError::UnknownKind(other)),
        }
    }
}

const USER_ACTION_VARIANT: u8 = 0x13;
const JOYSTICK_VARIANT: u8 = 0x23;
const GYRO_VARIANT: u8 = 0x33;

/// Discrete button and direction codes sent in user action payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
    Ps2,
    Ps2Long,
    B1,
    B2,
    B12,
    Konami,
    ReverseKonami,
    SemiKonami,
}

impl Action {
    pub const ALL: [Action; 12] = [
        Action::Up,
        Action::Down,
        Action::Left,
        Action::Right,
        Action::Ps2,
        Action::Ps2Long,
        Action::B1,
        Action::B2,
        Action::B12,
        Action::Konami,
        Action::ReverseKonami,
        Action::SemiKonami,
    ];

    pub fn code(&self) -> u8 {
        match self {
            Action::Up => 0x11,
            Action::Down => 0x12,
            Action::Left => 0x13,
            Action::Right => 0x14,
            Action::Ps2 => 0x01,
            Action::Ps2Long => 0x41,
            Action::B1 => 0x02,
            Action::B2 => 0x03,
            Action::B12 => 0x04,
            Action::Konami => 0x31,
            Action::ReverseKonami => 0x32,
            Action::SemiKonami => 0x33,
        }
    }

    pub fn from_code(code: u8) -> Option<Action> {
        Action::ALL.into_iter().find(|action| action.code() == code)
    }

    /// Parses the names accepted on the command line.
    pub fn from_name(name: &str) -> Option<Action> {
        match name.to_lowercase().as_str() {
            "up" => Some(Action::Up),
            "down" => Some(Action::Down),
            "left" => Some(Action::Left),
            "right" => Some(Action::Right),
            "ps2" => Some(Action::Ps2),
            "ps2-long" => Some(Action::Ps2Long),
            "b1" => Some(Action::B1),
            "b2" => Some(Action::B2),
            "b12" => Some(Action::B12),
            "konami" => Some(Action::Konami),
            "rev-konami" => Some(Action::ReverseKonami),
            "semi-konami" => Some(Action::SemiKonami),
            _ => None,
        }
    }
}

/// Battery and error state reported by the controller in reply to a poll.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerStatus {
    pub battery: f32,
    pub error_code: u8,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    UserAction(u8),
    Joystick { x: i32, y: i32 },
    Gyro { x: i8, y: i8, z: i8 },
    Status(ControllerStatus),
    Empty,
}

/// A fully decoded datagram.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub kind: PacketKind,
    pub mode_echo: u8,
    pub payload: Payload,
}

impl Command {
    /// Builds a data command carrying a user action.
    pub fn user_action(action: Action, mode_echo: u8) -> Command {
        Command {
            kind: PacketKind::Data,
            mode_echo,
            payload: Payload::UserAction(action.code()),
        }
    }

    /// The user action carried by this command, if it is one we know.
    pub fn action(&self) -> Option<Action> {
        match self.payload {
            Payload::UserAction(code) => Action::from_code(code),
            _ => None,
        }
    }

    /// Encodes the command the way the controller firmware lays it out.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(MAX_DATAGRAM);
        buf.extend_from_slice(&MAGIC);
        buf.push(self.kind.code());
        buf.push(self.mode_echo);

        match &self.payload {
            Payload::UserAction(code) => {
                buf.extend_from_slice(&[USER_ACTION_VARIANT, *code]);
            }
            Payload::Joystick { x, y } => {
                buf.extend_from_slice(&[JOYSTICK_VARIANT, 0]);
                buf.extend_from_slice(&x.to_le_bytes());
                buf.extend_from_slice(&y.to_le_bytes());
            }
            Payload::Gyro { x, y, z } => {
                buf.extend_from_slice(&[GYRO_VARIANT, 0, 0, 0]);
                buf.extend_from_slice(&[*x as u8, *y as u8, *z as u8]);
            }
            Payload::Status(status) => {
                let message = status.message.as_bytes();
                let len = message.len().min(u8::MAX as usize);
                buf.extend_from_slice(&status.battery.to_le_bytes());
                buf.push(status.error_code);
                buf.push(len as u8);
                buf.extend_from_slice(&message[..len]);
            }
            Payload::Empty => {}
        }

        buf
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.payload, self.action()) {
            (Payload::UserAction(_), Some(action)) => write!(f, "{:?}", action),
            (Payload::UserAction(code), None) => write!(f, "UserAction(0x{:02x})", code),
            (payload, _) => write!(f, "{:?}", payload),
        }
    }
}

fn require(buf: &[u8], needed: usize) -> Result<(), DecodeError> {
    if buf.len() < needed {
        return Err(DecodeError::Truncated {
            needed,
            len: buf.len(),
        });
    }
    Ok(())
}

fn le_i32(buf: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

/// Decodes a datagram. Never reads past the end of the buffer and has no side effects.
pub fn decode(buf: &[u8]) -> Result<Command, DecodeError> {
    require(buf, MAGIC.len())?;
    if buf[..MAGIC.len()] != MAGIC {
        return Err(DecodeError::BadMagic);
    }

    require(buf, KIND_OFFSET + 1)?;
    let kind = PacketKind::try_from(buf[KIND_OFFSET])?;

    require(buf, MODE_OFFSET + 1)?;
    let mode_echo = buf[MODE_OFFSET];

    let payload = match kind {
        PacketKind::Data => {
            require(buf, VARIANT_OFFSET + 1)?;
            match buf[VARIANT_OFFSET] {
                USER_ACTION_VARIANT => {
                    require(buf, ACTION_OFFSET + 1)?;
                    Payload::UserAction(buf[ACTION_OFFSET])
                }
                JOYSTICK_VARIANT => {
                    require(buf, JOYSTICK_Y_OFFSET + 4)?;
                    Payload::Joystick {
                        x: le_i32(buf, JOYSTICK_X_OFFSET),
                        y: le_i32(buf, JOYSTICK_Y_OFFSET),
                    }
                }
                GYRO_VARIANT => {
                    require(buf, GYRO_OFFSET + 3)?;
                    Payload::Gyro {
                        x: buf[GYRO_OFFSET] as i8,
                        y: buf[GYRO_OFFSET + 1] as i8,
                        z: buf[GYRO_OFFSET + 2] as i8,
                    }
                }
                other => return Err(DecodeError::UnknownVariant(other)),
            }
        }
        PacketKind::PollReply => {
            require(buf, MESSAGE_OFFSET)?;
            let len = buf[MESSAGE_LEN_OFFSET] as usize;
            require(buf, MESSAGE_OFFSET + len)?;
            Payload::Status(ControllerStatus {
                battery: f32::from_le_bytes([
                    buf[BATTERY_OFFSET],
                    buf[BATTERY_OFFSET + 1],
                    buf[BATTERY_OFFSET + 2],
                    buf[BATTERY_OFFSET + 3],
                ]),
                error_code: buf[ERROR_CODE_OFFSET],
                message: String::from_utf8_lossy(&buf[MESSAGE_OFFSET..MESSAGE_OFFSET + len])
                    .into_owned(),
            })
        }
        PacketKind::Poll => Payload::Empty,
    };

    Ok(Command {
        kind,
        mode_echo,
        payload,
    })
}

/// Encodes the heartbeat announcing the console's current mode.
pub fn encode_heartbeat(mode: u8) -> [u8; HEARTBEAT_LEN] {
    let mut buf = [0u8; HEARTBEAT_LEN];
    buf[..MAGIC.len()].copy_from_slice(&MAGIC);
    buf[KIND_OFFSET] = PacketKind::Poll.code();
    buf[MODE_OFFSET] = mode;
    buf
}

/// Sum of the absolute gyro deviations, scaled for the motion tables.
pub fn gyro_magnitude(x: i8, y: i8, z: i8) -> u32 {
    (x.unsigned_abs() as u32 + y.unsigned_abs() as u32 + z.unsigned_abs() as u32)
        * GYRO_MAGNITUDE_SCALE
}

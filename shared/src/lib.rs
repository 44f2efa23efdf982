//! Types shared between the pong server and client: world constants, player
//! roles, input masks, the wire protocol and the deterministic simulation.
//!
//! Both binaries must agree on everything in this crate — the protocol layout
//! is the wire compatibility contract and the simulation constants feed both
//! the authoritative server world and client-side prediction.

use std::fmt;

pub mod protocol;
pub mod sim;

pub const WINDOW_WIDTH: f32 = 800.0;
pub const WINDOW_HEIGHT: f32 = 600.0;
pub const PADDLE_WIDTH: f32 = 20.0;
pub const PADDLE_HEIGHT: f32 = 100.0;
pub const BALL_SIZE: f32 = 20.0;
pub const PADDLE_SPEED: f32 = 400.0;
pub const BALL_SPEED: f32 = 300.0;

/// Fixed timestep of one authoritative simulation step.
pub const TICK_DT: f32 = 1.0 / 60.0;

/// Input mask bit: move this player's paddle up.
pub const MASK_UP: u8 = 1 << 0;
/// Input mask bit: move this player's paddle down.
pub const MASK_DOWN: u8 = 1 << 1;

/// A player role inside one match. Assigned by the server at pairing time
/// and fixed for the lifetime of the session; it identifies a side of the
/// field, not a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerId {
    One,
    Two,
}

impl PlayerId {
    pub fn opposite(self) -> Self {
        match self {
            PlayerId::One => PlayerId::Two,
            PlayerId::Two => PlayerId::One,
        }
    }

    /// Index into per-player arrays.
    pub fn index(self) -> usize {
        match self {
            PlayerId::One => 0,
            PlayerId::Two => 1,
        }
    }

    pub fn to_wire(self) -> u8 {
        match self {
            PlayerId::One => 0,
            PlayerId::Two => 1,
        }
    }

    pub fn from_wire(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(PlayerId::One),
            1 => Some(PlayerId::Two),
            _ => None,
        }
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerId::One => write!(f, "player 1"),
            PlayerId::Two => write!(f, "player 2"),
        }
    }
}

/// One player's movement intent for a frame. The wire carries this as a
/// two-bit mask (`MASK_UP`/`MASK_DOWN`); everything else works with the
/// structured form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaddleInput {
    pub up: bool,
    pub down: bool,
}

impl PaddleInput {
    pub fn mask(self) -> u8 {
        let mut mask = 0;
        if self.up {
            mask |= MASK_UP;
        }
        if self.down {
            mask |= MASK_DOWN;
        }
        mask
    }

    pub fn from_mask(mask: u8) -> Self {
        Self {
            up: mask & MASK_UP != 0,
            down: mask & MASK_DOWN != 0,
        }
    }
}

//! Keyboard sampling and input send pacing
//!
//! The netcode core never touches the keyboard API; it consumes the
//! immutable per-frame [`InputSnapshot`] produced here.

use macroquad::input::{is_key_down, KeyCode};
use shared::{PaddleInput, PlayerId};
use std::time::{Duration, Instant};

/// Immutable per-frame keyboard snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    pub up: bool,
    pub down: bool,
    pub up2: bool,
    pub down2: bool,
    pub quit: bool,
}

/// Samples the keyboard once for this frame.
pub fn sample() -> InputSnapshot {
    InputSnapshot {
        up: is_key_down(KeyCode::W),
        down: is_key_down(KeyCode::S),
        up2: is_key_down(KeyCode::Up),
        down2: is_key_down(KeyCode::Down),
        quit: is_key_down(KeyCode::Escape),
    }
}

impl InputSnapshot {
    /// The W/S side of the keyboard.
    pub fn primary(&self) -> PaddleInput {
        PaddleInput {
            up: self.up,
            down: self.down,
        }
    }

    /// The arrow-key side of the keyboard.
    pub fn secondary(&self) -> PaddleInput {
        PaddleInput {
            up: self.up2,
            down: self.down2,
        }
    }

    /// The keys a role plays with online: player 1 on W/S, player 2 on the
    /// arrows.
    pub fn for_role(&self, role: PlayerId) -> PaddleInput {
        match role {
            PlayerId::One => self.primary(),
            PlayerId::Two => self.secondary(),
        }
    }
}

/// Decides when the current mask goes on the wire: immediately on change,
/// otherwise at a bounded keep-alive rate so the server keeps stepping.
pub struct InputPacer {
    last_mask: Option<u8>,
    last_send: Instant,
    keep_alive: Duration,
}

impl InputPacer {
    pub fn new() -> Self {
        Self::with_keep_alive(Duration::from_millis(16))
    }

    pub fn with_keep_alive(keep_alive: Duration) -> Self {
        Self {
            last_mask: None,
            last_send: Instant::now(),
            keep_alive,
        }
    }

    pub fn should_send(&mut self, mask: u8) -> bool {
        let changed = self.last_mask != Some(mask);
        if changed || self.last_send.elapsed() >= self.keep_alive {
            self.last_mask = Some(mask);
            self.last_send = Instant::now();
            true
        } else {
            false
        }
    }
}

impl Default for InputPacer {
    fn default() -> Self {
        Self::new()
    }
}

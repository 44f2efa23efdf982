//! Authoritative per-pair simulation driving.
//!
//! One `ServerGame` exists per matched pair and is advanced exactly once
//! per input received from either side of the pair. The world itself lives
//! in `shared::sim` so the client's offline mode runs the same arithmetic.

use log::debug;
use rand::Rng;
use shared::protocol::Message;
use shared::sim::World;
use shared::{PlayerId, TICK_DT};

/// One pair's authoritative world plus snapshot building.
#[derive(Debug, Clone)]
pub struct ServerGame {
    world: World,
}

impl ServerGame {
    /// Fresh world with a randomized serve direction.
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();
        let dir_x = if rng.gen::<bool>() { 1.0 } else { -1.0 };
        let dir_y = if rng.gen::<bool>() { 1.0 } else { -1.0 };
        Self::with_serve(dir_x, dir_y)
    }

    /// Deterministic construction for tests.
    pub fn with_serve(dir_x: f32, dir_y: f32) -> Self {
        let mut world = World::new();
        world.serve(dir_x, dir_y);
        Self { world }
    }

    pub fn tick(&self) -> u32 {
        self.world.tick
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Carries over input masks seen before the pair formed.
    pub fn seed_masks(&mut self, p1_mask: u8, p2_mask: u8) {
        self.world.set_mask(PlayerId::One, p1_mask);
        self.world.set_mask(PlayerId::Two, p2_mask);
    }

    /// Advances the world one step for a received input and builds the
    /// snapshot to broadcast. The sender's timestamp is echoed back
    /// unchanged so the client can measure its round trip.
    pub fn apply_input(&mut self, id: PlayerId, mask: u8, client_time_ms: u32) -> Message {
        self.world.step(id, mask, TICK_DT);
        debug!("tick {}: {} mask {:#04b}", self.world.tick, id, mask);
        Message::GameState {
            tick: self.world.tick,
            echo_client_time_ms: client_time_ms,
            ball_x: self.world.ball_x,
            ball_y: self.world.ball_y,
            p1_y: self.world.p1_y,
            p2_y: self.world.p2_y,
        }
    }
}

impl Default for ServerGame {
    fn default() -> Self {
        Self::new()
    }
}

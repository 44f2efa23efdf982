//! Deterministic pong world.
//!
//! The server runs one `World` per matched pair; the client reuses the same
//! stepping for its offline mode and the paddle helpers for local
//! prediction. Stepping is pure arithmetic over the struct fields — given
//! the same starting state and the same ordered inputs, two runs produce
//! bit-identical results.

use crate::{
    PaddleInput, PlayerId, BALL_SIZE, BALL_SPEED, PADDLE_HEIGHT, PADDLE_SPEED, PADDLE_WIDTH,
    WINDOW_HEIGHT, WINDOW_WIDTH,
};

/// Axis-aligned rectangle in window coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && self.x + self.w > other.x
            && self.y < other.y + other.h
            && self.y + self.h > other.y
    }
}

/// Full simulation state for one match: ball, both paddles, the raw input
/// masks last seen for each player, and the tick counter.
#[derive(Debug, Clone, PartialEq)]
pub struct World {
    pub ball_x: f32,
    pub ball_y: f32,
    pub ball_vx: f32,
    pub ball_vy: f32,
    pub p1_y: f32,
    pub p2_y: f32,
    pub masks: [u8; 2],
    pub tick: u32,
    // set while the ball overlaps a paddle so one contact reflects once
    paddle_contact: bool,
}

impl World {
    pub fn new() -> Self {
        Self {
            ball_x: (WINDOW_WIDTH - BALL_SIZE) / 2.0,
            ball_y: (WINDOW_HEIGHT - BALL_SIZE) / 2.0,
            ball_vx: -BALL_SPEED,
            ball_vy: -BALL_SPEED,
            p1_y: (WINDOW_HEIGHT - PADDLE_HEIGHT) / 2.0,
            p2_y: (WINDOW_HEIGHT - PADDLE_HEIGHT) / 2.0,
            masks: [0; 2],
            tick: 0,
            paddle_contact: false,
        }
    }

    /// Points the ball along the given direction signs without changing its
    /// speed. Zero components keep their current sign.
    pub fn serve(&mut self, dir_x: f32, dir_y: f32) {
        if dir_x != 0.0 {
            self.ball_vx = BALL_SPEED * dir_x.signum();
        }
        if dir_y != 0.0 {
            self.ball_vy = BALL_SPEED * dir_y.signum();
        }
    }

    pub fn paddle_y(&self, id: PlayerId) -> f32 {
        match id {
            PlayerId::One => self.p1_y,
            PlayerId::Two => self.p2_y,
        }
    }

    pub fn mask(&self, id: PlayerId) -> u8 {
        self.masks[id.index()]
    }

    pub fn set_mask(&mut self, id: PlayerId, mask: u8) {
        self.masks[id.index()] = mask;
    }

    pub fn paddle_rect(&self, id: PlayerId) -> Rect {
        let x = match id {
            PlayerId::One => 0.0,
            PlayerId::Two => WINDOW_WIDTH - PADDLE_WIDTH,
        };
        Rect {
            x,
            y: self.paddle_y(id),
            w: PADDLE_WIDTH,
            h: PADDLE_HEIGHT,
        }
    }

    pub fn ball_rect(&self) -> Rect {
        Rect {
            x: self.ball_x,
            y: self.ball_y,
            w: BALL_SIZE,
            h: BALL_SIZE,
        }
    }

    /// One authoritative step, driven by a just-received input from `id`.
    ///
    /// The sender's paddle integrates from the new mask, both paddles are
    /// clamped into the field, then the ball advances and the tick counts
    /// up. Only the sender's paddle moves this step; the partner's moves
    /// when its own inputs arrive.
    pub fn step(&mut self, id: PlayerId, mask: u8, dt: f32) {
        self.masks[id.index()] = mask;
        let moved = integrate_paddle(self.paddle_y(id), PaddleInput::from_mask(mask), dt);
        match id {
            PlayerId::One => self.p1_y = moved,
            PlayerId::Two => self.p2_y = moved,
        }
        self.p1_y = clamp_paddle(self.p1_y);
        self.p2_y = clamp_paddle(self.p2_y);
        self.advance_ball(dt);
        self.tick = self.tick.wrapping_add(1);
    }

    /// One offline step: both paddles driven from one keyboard.
    pub fn step_local(&mut self, p1: PaddleInput, p2: PaddleInput, dt: f32) {
        self.masks = [p1.mask(), p2.mask()];
        self.p1_y = clamp_paddle(integrate_paddle(self.p1_y, p1, dt));
        self.p2_y = clamp_paddle(integrate_paddle(self.p2_y, p2, dt));
        self.advance_ball(dt);
        self.tick = self.tick.wrapping_add(1);
    }

    fn advance_ball(&mut self, dt: f32) {
        self.ball_x += self.ball_vx * dt;
        self.ball_y += self.ball_vy * dt;

        // Paddle hit reflects X once per contact; player 1 wins if the ball
        // somehow overlaps both in the same step.
        let ball = self.ball_rect();
        let hit = ball.overlaps(&self.paddle_rect(PlayerId::One))
            || ball.overlaps(&self.paddle_rect(PlayerId::Two));
        if hit {
            if !self.paddle_contact {
                self.ball_vx = -self.ball_vx;
                self.paddle_contact = true;
            }
        } else {
            self.paddle_contact = false;
        }

        // Walls push the ball back into the field.
        if self.ball_x < 0.0 {
            self.ball_x = 0.0;
            self.ball_vx = self.ball_vx.abs();
        } else if self.ball_x > WINDOW_WIDTH - BALL_SIZE {
            self.ball_x = WINDOW_WIDTH - BALL_SIZE;
            self.ball_vx = -self.ball_vx.abs();
        }
        if self.ball_y < 0.0 {
            self.ball_y = 0.0;
            self.ball_vy = self.ball_vy.abs();
        } else if self.ball_y > WINDOW_HEIGHT - BALL_SIZE {
            self.ball_y = WINDOW_HEIGHT - BALL_SIZE;
            self.ball_vy = -self.ball_vy.abs();
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Moves a paddle by its speed from a frame's input; does not clamp.
pub fn integrate_paddle(y: f32, input: PaddleInput, dt: f32) -> f32 {
    let mut y = y;
    if input.up {
        y -= PADDLE_SPEED * dt;
    }
    if input.down {
        y += PADDLE_SPEED * dt;
    }
    y
}

/// Clamps a paddle's Y into the playable range.
pub fn clamp_paddle(y: f32) -> f32 {
    y.clamp(0.0, WINDOW_HEIGHT - PADDLE_HEIGHT)
}

//! Client-side game state
//!
//! Online, two independent contributions are recomputed every render frame:
//! the locally controlled paddle moves immediately from the sampled input
//! (prediction — never delayed by the network), while the ball and the
//! opponent ease toward the latest authoritative snapshot (smoothing). At
//! most one snapshot is ever buffered; a newer one simply replaces an
//! unprocessed older one.
//!
//! Offline, the full shared world is stepped locally with both paddles on
//! one keyboard.

use log::{info, warn};
use shared::protocol::Message;
use shared::sim::{clamp_paddle, integrate_paddle, Rect, World};
use shared::{
    PaddleInput, PlayerId, BALL_SIZE, PADDLE_HEIGHT, PADDLE_WIDTH, WINDOW_WIDTH,
};

/// Per-frame easing factor toward the latest snapshot. Tunable; higher
/// tracks the server harder, lower hides jitter better.
const SMOOTH: f32 = 0.32;

/// The single buffered authoritative snapshot.
#[derive(Debug, Clone, Copy)]
struct Snapshot {
    ball_x: f32,
    ball_y: f32,
    p1_y: f32,
    p2_y: f32,
}

/// Positions handed to the render collaborator each frame.
#[derive(Debug, Clone, Copy)]
pub struct RenderState {
    pub ball: Rect,
    pub p1: Rect,
    pub p2: Rect,
}

pub struct OnlineGame {
    role: Option<PlayerId>,
    /// predicted Y of the locally controlled paddle
    own_y: f32,
    latest: Option<Snapshot>,
    render_ball_x: f32,
    render_ball_y: f32,
    render_p1_y: f32,
    render_p2_y: f32,
    last_server_tick: u32,
    rtt_ms: u32,
}

impl OnlineGame {
    pub fn new() -> Self {
        // starting positions mirror the server's fresh world
        let world = World::new();
        Self {
            role: None,
            own_y: world.p1_y,
            latest: None,
            render_ball_x: world.ball_x,
            render_ball_y: world.ball_y,
            render_p1_y: world.p1_y,
            render_p2_y: world.p2_y,
            last_server_tick: 0,
            rtt_ms: 0,
        }
    }

    pub fn role(&self) -> Option<PlayerId> {
        self.role
    }

    /// Latest round-trip estimate, from the most recent snapshot's echo.
    pub fn rtt_ms(&self) -> u32 {
        self.rtt_ms
    }

    /// Most recent tick seen from the server; echoed back with inputs.
    pub fn last_server_tick(&self) -> u32 {
        self.last_server_tick
    }

    /// Applies one decoded message. `now_ms` is the client clock reading at
    /// receipt, used for the round-trip estimate.
    pub fn handle_message(&mut self, msg: Message, now_ms: u32) {
        match msg {
            Message::Init { tick, player_id } => {
                match player_id {
                    PlayerId::One => info!("you are player 1 (left side), W/S to move"),
                    PlayerId::Two => info!("you are player 2 (right side), Up/Down to move"),
                }
                self.role = Some(player_id);
                self.last_server_tick = tick;
            }
            Message::GameState {
                tick,
                echo_client_time_ms,
                ball_x,
                ball_y,
                p1_y,
                p2_y,
            } => {
                self.last_server_tick = tick;
                self.rtt_ms = now_ms.saturating_sub(echo_client_time_ms);
                self.latest = Some(Snapshot {
                    ball_x,
                    ball_y,
                    p1_y,
                    p2_y,
                });
            }
            other => warn!("unexpected {:?} record from server", other.kind()),
        }
    }

    /// One frame: integrate the local paddle from the sampled input, then
    /// ease the rendered ball and paddles toward the buffered snapshot.
    pub fn advance(&mut self, input: PaddleInput, frame_dt: f32) {
        self.own_y = clamp_paddle(integrate_paddle(self.own_y, input, frame_dt));

        if let Some(snapshot) = self.latest {
            self.render_ball_x = lerp(self.render_ball_x, snapshot.ball_x, SMOOTH);
            self.render_ball_y = lerp(self.render_ball_y, snapshot.ball_y, SMOOTH);
            self.render_p1_y = lerp(self.render_p1_y, snapshot.p1_y, SMOOTH);
            self.render_p2_y = lerp(self.render_p2_y, snapshot.p2_y, SMOOTH);
        }
    }

    /// Positions for this frame: the local paddle from prediction, the
    /// opponent and ball from the smoothed server trail.
    pub fn render_state(&self) -> RenderState {
        let mut p1_y = self.render_p1_y;
        let mut p2_y = self.render_p2_y;
        match self.role {
            Some(PlayerId::One) => p1_y = self.own_y,
            Some(PlayerId::Two) => p2_y = self.own_y,
            None => {}
        }
        paddles_and_ball(self.render_ball_x, self.render_ball_y, p1_y, p2_y)
    }
}

impl Default for OnlineGame {
    fn default() -> Self {
        Self::new()
    }
}

/// Offline game: both paddles on one keyboard, the full world stepped
/// locally with the render frame's dt.
pub struct OfflineGame {
    world: World,
}

impl OfflineGame {
    pub fn new() -> Self {
        Self {
            world: World::new(),
        }
    }

    pub fn advance(&mut self, p1: PaddleInput, p2: PaddleInput, frame_dt: f32) {
        self.world.step_local(p1, p2, frame_dt);
    }

    pub fn render_state(&self) -> RenderState {
        paddles_and_ball(
            self.world.ball_x,
            self.world.ball_y,
            self.world.p1_y,
            self.world.p2_y,
        )
    }
}

impl Default for OfflineGame {
    fn default() -> Self {
        Self::new()
    }
}

fn paddles_and_ball(ball_x: f32, ball_y: f32, p1_y: f32, p2_y: f32) -> RenderState {
    RenderState {
        ball: Rect {
            x: ball_x,
            y: ball_y,
            w: BALL_SIZE,
            h: BALL_SIZE,
        },
        p1: Rect {
            x: 0.0,
            y: p1_y,
            w: PADDLE_WIDTH,
            h: PADDLE_HEIGHT,
        },
        p2: Rect {
            x: WINDOW_WIDTH - PADDLE_WIDTH,
            y: p2_y,
            w: PADDLE_WIDTH,
            h: PADDLE_HEIGHT,
        },
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

//! Rectangle drawing and the on-screen HUD
//!
//! The netcode core hands positions over as a [`RenderState`]; everything
//! macroquad stays behind this module.

use crate::game::RenderState;
use macroquad::color::{Color, BLACK, GREEN, WHITE};
use macroquad::shapes::draw_rectangle;
use macroquad::text::draw_text;
use macroquad::window::clear_background;
use shared::PlayerId;

const LOCAL_PADDLE_COLOR: Color = GREEN;

/// Draws one frame from the given positions. The paddle the local player
/// controls is highlighted once the role is known.
pub fn draw(state: &RenderState, local_role: Option<PlayerId>, hud: &str) {
    clear_background(BLACK);

    let p1_color = if local_role == Some(PlayerId::One) {
        LOCAL_PADDLE_COLOR
    } else {
        WHITE
    };
    let p2_color = if local_role == Some(PlayerId::Two) {
        LOCAL_PADDLE_COLOR
    } else {
        WHITE
    };

    draw_rectangle(state.ball.x, state.ball.y, state.ball.w, state.ball.h, WHITE);
    draw_rectangle(state.p1.x, state.p1.y, state.p1.w, state.p1.h, p1_color);
    draw_rectangle(state.p2.x, state.p2.y, state.p2.w, state.p2.h, p2_color);

    draw_text(hud, 10.0, 20.0, 20.0, WHITE);
}

/// One status line for the corner of the screen.
pub fn hud_line(fps: i32, rtt_ms: Option<u32>) -> String {
    match rtt_ms {
        Some(rtt) => format!("fps: {}  rtt: {} ms", fps, rtt),
        None => format!("fps: {}  offline", fps),
    }
}

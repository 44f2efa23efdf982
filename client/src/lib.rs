//! # Pong Client Library
//!
//! Client side of two-player networked pong. The client never waits for the
//! server before moving the player's own paddle: input is applied locally
//! the same frame it is sampled (prediction), while the ball and the
//! opponent are eased toward the latest authoritative snapshot (smoothing).
//! The round trip is measured from the timestamp each input carries and the
//! server echoes back in its snapshot.
//!
//! ## Frame pipeline
//!
//! Each render frame, in order: drain every queued server message, apply
//! prediction and smoothing, send the current input mask (on change or
//! keep-alive), draw. The transport runs on its own runtime in the
//! background; the render loop only ever touches the message queue.
//!
//! ## Modules
//!
//! - [`game`] — prediction, snapshot smoothing, RTT, and the offline game.
//! - [`input`] — keyboard snapshot and send pacing.
//! - [`network`] — connect with timeout, reader/writer tasks, message queue.
//! - [`rendering`] — rect drawing and the HUD.

pub mod game;
pub mod input;
pub mod network;
pub mod rendering;

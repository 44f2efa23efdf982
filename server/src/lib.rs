//! # Pong Server Library
//!
//! Authoritative server for two-player networked pong. The server owns the
//! only trusted copy of every match's world: clients send raw input masks,
//! the server steps the paired world once per received input and broadcasts
//! the resulting snapshot to both members of the pair.
//!
//! ## Architecture
//!
//! Transport tasks (accept, per-connection read/write) communicate with the
//! rest of the server exclusively through one event channel; the main loop
//! in [`run`] is the single consumer and the only code that touches the
//! session table and the worlds. That keeps matchmaking and simulation
//! free of locks and of socket error handling — transport failures arrive
//! as ordinary [`network::NetEvent`]s.
//!
//! ## Modules
//!
//! - [`network`] — TCP listener, record framing, connection identity.
//! - [`session`] — role assignment, pairing, per-pair world ownership.
//! - [`game`] — authoritative stepping and snapshot building.

pub mod game;
pub mod network;
pub mod session;

use log::{info, warn};
use network::{Listener, NetEvent};
use session::SessionTable;
use shared::protocol::Message;

/// Drives the accept/input/disconnect event loop until the transport shuts
/// down.
pub async fn run(mut listener: Listener) {
    let mut sessions = SessionTable::new();

    while let Some(event) = listener.next_event().await {
        match event {
            NetEvent::Connected { id, addr, tx } => {
                info!("{} connected from {}", id, addr);
                sessions.admit(id, tx);
            }
            NetEvent::Message { id, msg } => match msg {
                Message::PlayerInput {
                    client_time_ms,
                    input_mask,
                    player_id,
                    ..
                } => sessions.handle_input(id, input_mask, client_time_ms, player_id),
                other => warn!("{}: unexpected {:?} record from client", id, other.kind()),
            },
            NetEvent::Disconnected { id } => sessions.remove(id),
        }
    }
}

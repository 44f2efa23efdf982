//! Session and matchmaking state for the server's main loop
//!
//! The table tracks every live connection's role and partner, pairs new
//! arrivals with the first waiting connection, and owns one authoritative
//! world per pair. It is mutated only by the single consumer of the
//! transport event channel, so none of this needs locking.
//!
//! Pairing rules: a newly admitted connection gets a provisional role from
//! the parity of its admission number (even = player 1, odd = player 2).
//! If any entry is waiting without a partner, the newcomer is linked to it
//! and its role is overridden to the opposite of its partner's, so a pair
//! is always one player 1 and one player 2 no matter the arrival order.
//! Either side disconnecting tears the pair down symmetrically; the
//! survivor waits for a future arrival and a fresh world.

use crate::game::ServerGame;
use crate::network::{ConnectionId, ConnectionTx};
use log::{info, warn};
use shared::protocol::Message;
use shared::PlayerId;
use std::collections::{BTreeMap, HashMap};

/// Identity of one running match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchId(u64);

#[derive(Debug)]
struct Entry {
    role: PlayerId,
    peer: Option<ConnectionId>,
    match_id: Option<MatchId>,
    // last input mask seen, kept even while unmatched so a forming pair
    // starts from the sender's current intent
    last_mask: u8,
    tx: ConnectionTx,
}

/// Server-side session table: connection roles, pairing, and the worlds
/// the pairs play in.
pub struct SessionTable {
    // keyed by monotonically assigned ids, so iteration is admission order
    entries: BTreeMap<ConnectionId, Entry>,
    worlds: HashMap<MatchId, ServerGame>,
    admitted: u64,
    next_match: u64,
}

impl SessionTable {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            worlds: HashMap::new(),
            admitted: 0,
            next_match: 0,
        }
    }

    /// Admits a connection, pairing it with the first waiting entry if one
    /// exists, and sends its `Init` handshake.
    pub fn admit(&mut self, id: ConnectionId, tx: ConnectionTx) {
        let provisional = if self.admitted % 2 == 0 {
            PlayerId::One
        } else {
            PlayerId::Two
        };
        self.admitted += 1;

        let partner = self
            .entries
            .iter()
            .find(|(_, entry)| entry.peer.is_none())
            .map(|(&partner_id, _)| partner_id);

        let (role, match_id) = match partner {
            Some(partner_id) => {
                let match_id = MatchId(self.next_match);
                self.next_match += 1;

                let mut role = provisional;
                let mut game = ServerGame::new();
                // link both directions before inserting the newcomer so the
                // pair is never observable half-formed
                if let Some(partner_entry) = self.entries.get_mut(&partner_id) {
                    partner_entry.peer = Some(id);
                    partner_entry.match_id = Some(match_id);
                    role = partner_entry.role.opposite();
                    match partner_entry.role {
                        PlayerId::One => game.seed_masks(partner_entry.last_mask, 0),
                        PlayerId::Two => game.seed_masks(0, partner_entry.last_mask),
                    }
                }
                self.worlds.insert(match_id, game);

                info!("{} paired with {}; {} plays as {}", id, partner_id, id, role);
                (role, Some(match_id))
            }
            None => (provisional, None),
        };

        let tick = match_id
            .and_then(|m| self.worlds.get(&m))
            .map(|game| game.tick())
            .unwrap_or(0);
        if !tx.send(&Message::Init {
            tick,
            player_id: role,
        }) {
            warn!("{}: could not queue init handshake", id);
        }
        info!("{} admitted as {}", id, role);

        self.entries.insert(
            id,
            Entry {
                role,
                peer: partner,
                match_id,
                last_mask: 0,
                tx,
            },
        );
    }

    /// Routes one received input: steps the sender's world and broadcasts
    /// the snapshot to both sides of its pair. Input from an unmatched
    /// connection only updates its stored mask — there is no one to send a
    /// snapshot to.
    pub fn handle_input(
        &mut self,
        id: ConnectionId,
        mask: u8,
        client_time_ms: u32,
        claimed: PlayerId,
    ) {
        let Some(entry) = self.entries.get_mut(&id) else {
            warn!("{}: input from unknown connection", id);
            return;
        };
        if claimed != entry.role {
            // the session role is authoritative
            warn!("{}: claims {} but is {}", id, claimed, entry.role);
        }
        let role = entry.role;
        entry.last_mask = mask;

        let (Some(peer_id), Some(match_id)) = (entry.peer, entry.match_id) else {
            return;
        };
        let Some(game) = self.worlds.get_mut(&match_id) else {
            warn!("{}: paired but its match is missing", id);
            return;
        };

        let snapshot = game.apply_input(role, mask, client_time_ms);

        // best effort to both sides; one failed send must not starve the other
        for target in [id, peer_id] {
            if let Some(target_entry) = self.entries.get(&target) {
                if !target_entry.tx.send(&snapshot) {
                    warn!("{}: could not queue snapshot", target);
                }
            }
        }
    }

    /// Removes a departed connection and resets its partner, if any, to
    /// unmatched. The partner keeps its role and waits for a new arrival.
    pub fn remove(&mut self, id: ConnectionId) {
        let Some(entry) = self.entries.remove(&id) else {
            return;
        };
        info!("{} ({}) disconnected", id, entry.role);

        if let Some(match_id) = entry.match_id {
            self.worlds.remove(&match_id);
        }
        if let Some(peer_id) = entry.peer {
            if let Some(peer) = self.entries.get_mut(&peer_id) {
                peer.peer = None;
                peer.match_id = None;
                info!("{} is waiting for a new opponent", peer_id);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of fully formed pairs.
    pub fn pair_count(&self) -> usize {
        self.worlds.len()
    }

    pub fn role_of(&self, id: ConnectionId) -> Option<PlayerId> {
        self.entries.get(&id).map(|entry| entry.role)
    }

    pub fn peer_of(&self, id: ConnectionId) -> Option<ConnectionId> {
        self.entries.get(&id).and_then(|entry| entry.peer)
    }

    pub fn game_of(&self, id: ConnectionId) -> Option<&ServerGame> {
        self.entries
            .get(&id)
            .and_then(|entry| entry.match_id)
            .and_then(|match_id| self.worlds.get(&match_id))
    }
}

impl Default for SessionTable {
    fn default() -> Self {
        Self::new()
    }
}

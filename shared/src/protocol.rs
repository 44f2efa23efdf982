//! Wire protocol: three fixed-width binary record kinds, first byte = kind
//! tag, all multi-byte fields little-endian.
//!
//! The layout is the compatibility contract between server and client; any
//! change here breaks the wire instantly, so field order and widths are
//! fixed for the lifetime of the protocol:
//!
//! | kind        | layout                                                        | size |
//! |-------------|---------------------------------------------------------------|------|
//! | Init        | tag, tick:u32, player_id:u8                                   |    6 |
//! | PlayerInput | tag, tick:u32, client_time_ms:u32, input_mask:u8, player_id:u8 |  11 |
//! | GameState   | tag, tick:u32, echo_client_time_ms:u32, ball_x:f32, ball_y:f32, p1_y:f32, p2_y:f32 | 25 |
//!
//! Every record has a fixed width, so a receiver can frame a byte stream
//! from the tag byte alone via [`MessageKind::wire_len`].

use crate::PlayerId;
use std::error::Error;
use std::fmt;

/// Width of the widest record; receive scratch buffers are sized to this.
pub const MAX_WIRE_LEN: usize = MessageKind::GameState.wire_len();

/// Record kind, as carried in the leading tag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Init,
    PlayerInput,
    GameState,
}

impl MessageKind {
    pub const fn tag(self) -> u8 {
        match self {
            MessageKind::Init => 0,
            MessageKind::PlayerInput => 1,
            MessageKind::GameState => 2,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(MessageKind::Init),
            1 => Some(MessageKind::PlayerInput),
            2 => Some(MessageKind::GameState),
            _ => None,
        }
    }

    /// Total encoded size of a record of this kind, tag byte included.
    pub const fn wire_len(self) -> usize {
        match self {
            MessageKind::Init => 6,
            MessageKind::PlayerInput => 11,
            MessageKind::GameState => 25,
        }
    }
}

/// A decoded protocol message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Message {
    /// Server → client handshake, sent once per accepted connection.
    Init { tick: u32, player_id: PlayerId },
    /// Client → server, the sender's current input mask.
    PlayerInput {
        tick: u32,
        client_time_ms: u32,
        input_mask: u8,
        player_id: PlayerId,
    },
    /// Server → client, the full authoritative snapshot for one pair.
    GameState {
        tick: u32,
        echo_client_time_ms: u32,
        ball_x: f32,
        ball_y: f32,
        p1_y: f32,
        p2_y: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// Zero bytes: there is no tag to inspect.
    Empty,
    /// The tag byte does not name any known record kind.
    UnknownKind(u8),
    /// The buffer is shorter than the kind's fixed width.
    Truncated {
        kind: MessageKind,
        expected: usize,
        len: usize,
    },
    /// The player id byte is not a valid role.
    BadPlayerId(u8),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Empty => write!(f, "empty record"),
            ProtocolError::UnknownKind(tag) => write!(f, "unknown message tag {}", tag),
            ProtocolError::Truncated {
                kind,
                expected,
                len,
            } => write!(
                f,
                "truncated {:?} record: got {} of {} bytes",
                kind, len, expected
            ),
            ProtocolError::BadPlayerId(byte) => write!(f, "invalid player id byte {}", byte),
        }
    }
}

impl Error for ProtocolError {}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Init { .. } => MessageKind::Init,
            Message::PlayerInput { .. } => MessageKind::PlayerInput,
            Message::GameState { .. } => MessageKind::GameState,
        }
    }

    /// Encodes into the kind's fixed-width record.
    pub fn encode(&self) -> Vec<u8> {
        let kind = self.kind();
        let mut buf = Vec::with_capacity(kind.wire_len());
        buf.push(kind.tag());
        match *self {
            Message::Init { tick, player_id } => {
                buf.extend_from_slice(&tick.to_le_bytes());
                buf.push(player_id.to_wire());
            }
            Message::PlayerInput {
                tick,
                client_time_ms,
                input_mask,
                player_id,
            } => {
                buf.extend_from_slice(&tick.to_le_bytes());
                buf.extend_from_slice(&client_time_ms.to_le_bytes());
                buf.push(input_mask);
                buf.push(player_id.to_wire());
            }
            Message::GameState {
                tick,
                echo_client_time_ms,
                ball_x,
                ball_y,
                p1_y,
                p2_y,
            } => {
                buf.extend_from_slice(&tick.to_le_bytes());
                buf.extend_from_slice(&echo_client_time_ms.to_le_bytes());
                buf.extend_from_slice(&ball_x.to_le_bytes());
                buf.extend_from_slice(&ball_y.to_le_bytes());
                buf.extend_from_slice(&p1_y.to_le_bytes());
                buf.extend_from_slice(&p2_y.to_le_bytes());
            }
        }
        debug_assert_eq!(buf.len(), kind.wire_len());
        buf
    }

    /// Decodes one record. The tag byte is inspected first; a record is
    /// never reinterpreted as a different kind on size mismatch.
    pub fn decode(bytes: &[u8]) -> Result<Message, ProtocolError> {
        let tag = *bytes.first().ok_or(ProtocolError::Empty)?;
        let kind = MessageKind::from_tag(tag).ok_or(ProtocolError::UnknownKind(tag))?;
        if bytes.len() < kind.wire_len() {
            return Err(ProtocolError::Truncated {
                kind,
                expected: kind.wire_len(),
                len: bytes.len(),
            });
        }

        let msg = match kind {
            MessageKind::Init => Message::Init {
                tick: read_u32(bytes, 1),
                player_id: read_player_id(bytes, 5)?,
            },
            MessageKind::PlayerInput => Message::PlayerInput {
                tick: read_u32(bytes, 1),
                client_time_ms: read_u32(bytes, 5),
                input_mask: bytes[9],
                player_id: read_player_id(bytes, 10)?,
            },
            MessageKind::GameState => Message::GameState {
                tick: read_u32(bytes, 1),
                echo_client_time_ms: read_u32(bytes, 5),
                ball_x: read_f32(bytes, 9),
                ball_y: read_f32(bytes, 13),
                p1_y: read_f32(bytes, 17),
                p2_y: read_f32(bytes, 21),
            },
        };
        Ok(msg)
    }
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn read_f32(bytes: &[u8], at: usize) -> f32 {
    f32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn read_player_id(bytes: &[u8], at: usize) -> Result<PlayerId, ProtocolError> {
    PlayerId::from_wire(bytes[at]).ok_or(ProtocolError::BadPlayerId(bytes[at]))
}

//! Integration tests for the netcode stack
//!
//! These tests validate cross-component interactions and real network
//! behavior: the wire protocol, matchmaking, the authoritative simulation
//! and the full client/server loop over localhost TCP.

use shared::protocol::{Message, MessageKind};
use shared::{PlayerId, MASK_UP, PADDLE_HEIGHT, PADDLE_SPEED, TICK_DT, WINDOW_HEIGHT};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Reads one complete record off a stream, or panics after five seconds.
async fn read_message(stream: &mut TcpStream) -> Message {
    tokio::time::timeout(Duration::from_secs(5), async {
        let mut tag = [0u8; 1];
        stream.read_exact(&mut tag).await.expect("read tag");
        let kind = MessageKind::from_tag(tag[0]).expect("known tag");
        let mut record = vec![0u8; kind.wire_len()];
        record[0] = tag[0];
        stream.read_exact(&mut record[1..]).await.expect("read body");
        Message::decode(&record).expect("decode record")
    })
    .await
    .expect("timed out waiting for a record")
}

/// True if no record arrives within the window.
async fn stays_silent(stream: &mut TcpStream, window: Duration) -> bool {
    let mut tag = [0u8; 1];
    tokio::time::timeout(window, stream.read_exact(&mut tag))
        .await
        .is_err()
}

async fn send_message(stream: &mut TcpStream, msg: &Message) {
    stream.write_all(&msg.encode()).await.expect("send record");
}

async fn spawn_server() -> std::net::SocketAddr {
    let listener = server::network::Listener::bind("127.0.0.1:0")
        .await
        .expect("bind test server");
    let addr = listener.local_addr();
    tokio::spawn(server::run(listener));
    addr
}

fn player_input(tick: u32, client_time_ms: u32, mask: u8, player_id: PlayerId) -> Message {
    Message::PlayerInput {
        tick,
        client_time_ms,
        input_mask: mask,
        player_id,
    }
}

/// NETWORK PROTOCOL TESTS
mod protocol_tests {
    use super::*;

    /// Round-trips every kind through the real byte layout
    #[test]
    fn record_roundtrip() {
        let messages = vec![
            Message::Init {
                tick: u32::MAX,
                player_id: PlayerId::Two,
            },
            player_input(5, 123, MASK_UP, PlayerId::One),
            Message::GameState {
                tick: 9,
                echo_client_time_ms: 77,
                ball_x: 390.0,
                ball_y: 290.0,
                p1_y: 250.0,
                p2_y: 250.0,
            },
        ];

        for msg in messages {
            let bytes = msg.encode();
            assert_eq!(bytes.len(), msg.kind().wire_len());
            assert_eq!(bytes[0], msg.kind().tag());
            assert_eq!(Message::decode(&bytes), Ok(msg));
        }
    }

    /// A record cut short decodes to an error, never to a different kind
    #[test]
    fn truncation_is_rejected() {
        let bytes = player_input(1, 2, 3, PlayerId::One).encode();
        for len in 1..bytes.len() {
            assert!(Message::decode(&bytes[..len]).is_err());
        }
    }
}

/// MATCHMAKING TESTS
mod matchmaking_tests {
    use super::*;
    use server::network::{ConnectionId, ConnectionTx};
    use server::session::SessionTable;
    use tokio::sync::mpsc;

    fn stub(raw: u64) -> (ConnectionId, ConnectionTx) {
        let id = ConnectionId(raw);
        let (tx, rx) = mpsc::unbounded_channel();
        // the stub's outbound bytes are not inspected here
        std::mem::forget(rx);
        (id, ConnectionTx::new(id, tx))
    }

    /// N admits produce N/2 symmetric pairs
    #[test]
    fn even_admits_pair_up_completely() {
        let mut table = SessionTable::new();
        let mut ids = Vec::new();
        for raw in 0..8 {
            let (id, tx) = stub(raw);
            table.admit(id, tx);
            ids.push(id);
        }

        assert_eq!(table.pair_count(), 4);
        for pair in ids.chunks(2) {
            assert_eq!(table.peer_of(pair[0]), Some(pair[1]));
            assert_eq!(table.peer_of(pair[1]), Some(pair[0]));
            // exactly one player 1 and one player 2 per pair
            assert_eq!(
                table.role_of(pair[0]).map(PlayerId::opposite),
                table.role_of(pair[1])
            );
        }
    }

    /// A disconnect unmatches both sides exactly once, leaving no
    /// one-directional link behind
    #[test]
    fn disconnect_is_symmetric() {
        let mut table = SessionTable::new();
        let (a, a_tx) = stub(0);
        let (b, b_tx) = stub(1);
        table.admit(a, a_tx);
        table.admit(b, b_tx);

        table.remove(a);
        assert_eq!(table.role_of(a), None);
        assert_eq!(table.peer_of(b), None);
        assert_eq!(table.pair_count(), 0);

        // the survivor pairs again with the next arrival
        let (c, c_tx) = stub(2);
        table.admit(c, c_tx);
        assert_eq!(table.peer_of(b), Some(c));
        assert_eq!(table.peer_of(c), Some(b));
        assert_eq!(
            table.role_of(c),
            table.role_of(b).map(PlayerId::opposite)
        );
    }
}

/// SIMULATION TESTS
mod simulation_tests {
    use super::*;
    use server::game::ServerGame;

    /// Two servers fed the same ordered inputs broadcast identical snapshots
    #[test]
    fn stepping_is_deterministic() {
        let script = [
            (PlayerId::One, MASK_UP),
            (PlayerId::Two, 0),
            (PlayerId::One, 0),
            (PlayerId::Two, MASK_UP),
        ];

        let mut a = ServerGame::with_serve(1.0, -1.0);
        let mut b = ServerGame::with_serve(1.0, -1.0);
        for round in 0..200 {
            for &(id, mask) in &script {
                let snap_a = a.apply_input(id, mask, round);
                let snap_b = b.apply_input(id, mask, round);
                assert_eq!(snap_a, snap_b);
            }
        }
        assert_eq!(a.world(), b.world());
    }
}

/// END-TO-END TESTS over localhost TCP
mod end_to_end_tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    /// Two clients connect, receive complementary roles, and an input from
    /// one produces a stepped snapshot at both — echoing the input's
    /// timestamp unchanged
    #[tokio::test]
    async fn pair_plays_one_authoritative_world() {
        let addr = spawn_server().await;

        let mut c1 = TcpStream::connect(addr).await.unwrap();
        let init1 = read_message(&mut c1).await;
        let mut c2 = TcpStream::connect(addr).await.unwrap();
        let init2 = read_message(&mut c2).await;

        let (role1, role2) = match (init1, init2) {
            (
                Message::Init {
                    tick: 0,
                    player_id: role1,
                },
                Message::Init {
                    tick: 0,
                    player_id: role2,
                },
            ) => (role1, role2),
            other => panic!("expected two Init records, got {:?}", other),
        };
        assert_eq!(role2, role1.opposite());

        send_message(&mut c1, &player_input(5, 0xBEEF, MASK_UP, role1)).await;

        for stream in [&mut c1, &mut c2] {
            match read_message(stream).await {
                Message::GameState {
                    tick,
                    echo_client_time_ms,
                    p1_y,
                    p2_y,
                    ..
                } => {
                    assert_eq!(tick, 1);
                    assert_eq!(echo_client_time_ms, 0xBEEF);
                    let center = (WINDOW_HEIGHT - PADDLE_HEIGHT) / 2.0;
                    let moved = center - PADDLE_SPEED * TICK_DT;
                    match role1 {
                        PlayerId::One => {
                            assert_approx_eq!(p1_y, moved, 1e-3);
                            assert_approx_eq!(p2_y, center, 1e-3);
                        }
                        PlayerId::Two => {
                            assert_approx_eq!(p2_y, moved, 1e-3);
                            assert_approx_eq!(p1_y, center, 1e-3);
                        }
                    }
                }
                other => panic!("expected GameState, got {:?}", other),
            }
        }
    }

    /// The client-side pipeline computes RTT from the echoed send time
    #[tokio::test]
    async fn rtt_comes_from_the_echo() {
        let addr = spawn_server().await;

        let mut c1 = TcpStream::connect(addr).await.unwrap();
        let init1 = read_message(&mut c1).await;
        let mut c2 = TcpStream::connect(addr).await.unwrap();
        let _init2 = read_message(&mut c2).await;

        let mut game = client::game::OnlineGame::new();
        game.handle_message(init1, 0);
        let role = game.role().expect("init assigns the role");

        let sent_at_ms = 1_000;
        send_message(&mut c1, &player_input(0, sent_at_ms, 0, role)).await;
        let snapshot = read_message(&mut c1).await;

        // pretend 48ms of wall clock passed between send and receipt
        game.handle_message(snapshot, sent_at_ms + 48);
        assert_eq!(game.rtt_ms(), 48);
        assert_eq!(game.last_server_tick(), 1);
    }

    /// When one side of a pair leaves, the survivor gets no further
    /// snapshots until a new connection is matched to it
    #[tokio::test]
    async fn disconnect_mid_pair_silences_the_survivor() {
        let addr = spawn_server().await;

        let mut c1 = TcpStream::connect(addr).await.unwrap();
        let init1 = read_message(&mut c1).await;
        let role1 = match init1 {
            Message::Init { player_id, .. } => player_id,
            other => panic!("expected Init, got {:?}", other),
        };
        let c2 = TcpStream::connect(addr).await.unwrap();

        // let the pair form, then drop the partner and let the server
        // process the disconnect
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(c2);
        tokio::time::sleep(Duration::from_millis(200)).await;

        send_message(&mut c1, &player_input(0, 1, MASK_UP, role1)).await;
        assert!(stays_silent(&mut c1, Duration::from_millis(300)).await);

        // a fresh arrival re-pairs the survivor and play resumes
        let mut c3 = TcpStream::connect(addr).await.unwrap();
        match read_message(&mut c3).await {
            Message::Init { player_id, .. } => assert_eq!(player_id, role1.opposite()),
            other => panic!("expected Init, got {:?}", other),
        }

        send_message(&mut c1, &player_input(0, 2, MASK_UP, role1)).await;
        match read_message(&mut c1).await {
            Message::GameState { tick, .. } => assert_eq!(tick, 1),
            other => panic!("expected GameState, got {:?}", other),
        }
    }

    /// Garbage on the wire closes that connection without taking the
    /// server down
    #[tokio::test]
    async fn unknown_tag_only_hurts_the_sender() {
        let addr = spawn_server().await;

        let mut bad = TcpStream::connect(addr).await.unwrap();
        let _init = read_message(&mut bad).await;
        bad.write_all(&[0xFF, 0, 0, 0]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        // the server still accepts and serves new connections
        let mut c1 = TcpStream::connect(addr).await.unwrap();
        match read_message(&mut c1).await {
            Message::Init { .. } => {}
            other => panic!("expected Init, got {:?}", other),
        }
    }
}

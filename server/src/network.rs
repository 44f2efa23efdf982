//! Server transport: TCP listener plus per-connection reader and writer tasks
//!
//! Every accepted socket gets a stable [`ConnectionId`], one reader task and
//! one writer task. The reader frames the byte stream by fixed record size
//! (tag byte first, then the remainder of that kind's width), so records
//! that coalesce or split across TCP reads are reassembled correctly. All
//! events funnel through one channel into the main loop; no session or
//! simulation code ever runs on a transport task.

use log::{error, warn};
use shared::protocol::{Message, MessageKind, MAX_WIRE_LEN};
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Stable identity of one accepted connection.
///
/// Ids are assigned monotonically and never reused, so an id held by the
/// session table stays valid no matter which other connections come or go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// Events delivered from the transport tasks to the main loop.
#[derive(Debug)]
pub enum NetEvent {
    Connected {
        id: ConnectionId,
        addr: SocketAddr,
        tx: ConnectionTx,
    },
    Message {
        id: ConnectionId,
        msg: Message,
    },
    Disconnected {
        id: ConnectionId,
    },
}

/// Best-effort outbound handle for one connection.
///
/// `send` enqueues onto the connection's writer task and reports whether the
/// queue accepted the record; a send to a closed connection returns false
/// and is otherwise a no-op. Write failures are handled inside the writer
/// task, never surfaced to callers.
#[derive(Debug, Clone)]
pub struct ConnectionTx {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl ConnectionTx {
    pub fn new(id: ConnectionId, tx: mpsc::UnboundedSender<Vec<u8>>) -> Self {
        Self { id, tx }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn send(&self, msg: &Message) -> bool {
        self.tx.send(msg.encode()).is_ok()
    }
}

/// Listening transport endpoint. Binding spawns the accept task; events are
/// consumed with [`Listener::next_event`] from a single consumer.
pub struct Listener {
    local_addr: SocketAddr,
    events: mpsc::UnboundedReceiver<NetEvent>,
}

impl Listener {
    pub async fn bind(addr: &str) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let (events_tx, events) = mpsc::unbounded_channel();
        tokio::spawn(accept_loop(listener, events_tx));
        Ok(Self { local_addr, events })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Next transport event; `None` once the transport has shut down.
    pub async fn next_event(&mut self) -> Option<NetEvent> {
        self.events.recv().await
    }
}

async fn accept_loop(listener: TcpListener, events: mpsc::UnboundedSender<NetEvent>) {
    let mut next_id = 0u64;

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let id = ConnectionId(next_id);
                next_id += 1;

                let _ = stream.set_nodelay(true);
                let (rd, wr) = stream.into_split();
                let (out_tx, out_rx) = mpsc::unbounded_channel();
                tokio::spawn(write_records(id, wr, out_rx));
                tokio::spawn(read_records(id, rd, events.clone()));

                let connected = NetEvent::Connected {
                    id,
                    addr,
                    tx: ConnectionTx::new(id, out_tx),
                };
                if events.send(connected).is_err() {
                    return; // main loop is gone
                }
            }
            Err(e) => {
                error!("accept failed: {}", e);
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
    }
}

/// Reads fixed-width records until EOF or error, then reports the
/// disconnect. Zero-length and failed reads are both disconnects, never
/// retried.
async fn read_records(
    id: ConnectionId,
    mut rd: OwnedReadHalf,
    events: mpsc::UnboundedSender<NetEvent>,
) {
    let mut record = [0u8; MAX_WIRE_LEN];

    loop {
        // The tag byte tells us how many more bytes complete the record.
        if rd.read_exact(&mut record[..1]).await.is_err() {
            break;
        }
        let Some(kind) = MessageKind::from_tag(record[0]) else {
            // an unknown tag makes the stream unframeable
            warn!("{}: unknown message tag {}, closing", id, record[0]);
            break;
        };
        let len = kind.wire_len();
        if rd.read_exact(&mut record[1..len]).await.is_err() {
            break;
        }

        match Message::decode(&record[..len]) {
            Ok(msg) => {
                if events.send(NetEvent::Message { id, msg }).is_err() {
                    return;
                }
            }
            Err(e) => warn!("{}: dropping malformed record: {}", id, e),
        }
    }

    let _ = events.send(NetEvent::Disconnected { id });
}

/// Drains the outbound queue into the socket. A failed write ends the task;
/// the peer's reader side will observe the close and report the disconnect.
async fn write_records(
    id: ConnectionId,
    mut wr: OwnedWriteHalf,
    mut rx: mpsc::UnboundedReceiver<Vec<u8>>,
) {
    while let Some(bytes) = rx.recv().await {
        if let Err(e) = wr.write_all(&bytes).await {
            error!("{}: write failed: {}", id, e);
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::PlayerId;
    use tokio::net::TcpStream;

    async fn expect_connected(listener: &mut Listener) -> (ConnectionId, ConnectionTx) {
        match listener.next_event().await {
            Some(NetEvent::Connected { id, tx, .. }) => (id, tx),
            other => panic!("expected Connected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_accept_assigns_monotonic_ids() {
        let mut listener = Listener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr();

        let _c1 = TcpStream::connect(addr).await.unwrap();
        let _c2 = TcpStream::connect(addr).await.unwrap();

        let (id1, _) = expect_connected(&mut listener).await;
        let (id2, _) = expect_connected(&mut listener).await;
        assert!(id2 > id1);
    }

    #[tokio::test]
    async fn test_coalesced_records_are_split() {
        let mut listener = Listener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr();

        let mut client = TcpStream::connect(addr).await.unwrap();
        let (id, _tx) = expect_connected(&mut listener).await;

        // two records in one write
        let first = Message::PlayerInput {
            tick: 1,
            client_time_ms: 10,
            input_mask: 1,
            player_id: PlayerId::One,
        };
        let second = Message::PlayerInput {
            tick: 2,
            client_time_ms: 20,
            input_mask: 2,
            player_id: PlayerId::One,
        };
        let mut bytes = first.encode();
        bytes.extend_from_slice(&second.encode());
        client.write_all(&bytes).await.unwrap();

        for expected in [first, second] {
            match listener.next_event().await {
                Some(NetEvent::Message { id: got, msg }) => {
                    assert_eq!(got, id);
                    assert_eq!(msg, expected);
                }
                other => panic!("expected Message, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_split_record_is_reassembled() {
        let mut listener = Listener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr();

        let mut client = TcpStream::connect(addr).await.unwrap();
        let (_, _tx) = expect_connected(&mut listener).await;

        let msg = Message::PlayerInput {
            tick: 7,
            client_time_ms: 70,
            input_mask: 3,
            player_id: PlayerId::Two,
        };
        let bytes = msg.encode();
        client.write_all(&bytes[..4]).await.unwrap();
        client.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        client.write_all(&bytes[4..]).await.unwrap();

        match listener.next_event().await {
            Some(NetEvent::Message { msg: got, .. }) => assert_eq!(got, msg),
            other => panic!("expected Message, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_client_close_reports_disconnect() {
        let mut listener = Listener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr();

        let client = TcpStream::connect(addr).await.unwrap();
        let (id, _tx) = expect_connected(&mut listener).await;
        drop(client);

        match listener.next_event().await {
            Some(NetEvent::Disconnected { id: got }) => assert_eq!(got, id),
            other => panic!("expected Disconnected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_tag_closes_connection() {
        let mut listener = Listener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr();

        let mut client = TcpStream::connect(addr).await.unwrap();
        let (id, _tx) = expect_connected(&mut listener).await;

        client.write_all(&[0xFF]).await.unwrap();

        match listener.next_event().await {
            Some(NetEvent::Disconnected { id: got }) => assert_eq!(got, id),
            other => panic!("expected Disconnected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connection_tx_reaches_the_socket() {
        let mut listener = Listener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr();

        let mut client = TcpStream::connect(addr).await.unwrap();
        let (_, tx) = expect_connected(&mut listener).await;

        let msg = Message::Init {
            tick: 0,
            player_id: PlayerId::Two,
        };
        assert!(tx.send(&msg));

        let mut buf = vec![0u8; MessageKind::Init.wire_len()];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(Message::decode(&buf), Ok(msg));
    }
}

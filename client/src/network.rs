//! Client transport: connect with timeout, background reader and writer
//! tasks, and a message queue the render loop drains once per frame.
//!
//! The render loop belongs to the window library and is synchronous, so the
//! connection handle owns a small tokio runtime of its own; decoded
//! messages and outgoing records cross between the two worlds over
//! unbounded channels. Nothing network-facing ever runs on the render
//! thread.

use log::{error, info, warn};
use shared::protocol::{Message, MessageKind, MAX_WIRE_LEN};
use std::error::Error;
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

/// Failure establishing or running the connection.
#[derive(Debug)]
pub enum NetError {
    /// The transport runtime could not be built.
    Runtime(io::Error),
    /// Resolve/connect failed. Fatal to this attempt only; the caller
    /// decides whether to retry or play offline.
    Connect(io::Error),
    /// The connect attempt did not finish within the timeout.
    ConnectTimeout(Duration),
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetError::Runtime(e) => write!(f, "transport runtime: {}", e),
            NetError::Connect(e) => write!(f, "connect: {}", e),
            NetError::ConnectTimeout(timeout) => {
                write!(f, "connect timed out after {:?}", timeout)
            }
        }
    }
}

impl Error for NetError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            NetError::Runtime(e) | NetError::Connect(e) => Some(e),
            NetError::ConnectTimeout(_) => None,
        }
    }
}

/// Handle to the client's single server connection.
pub struct NetClient {
    runtime: Runtime,
    inbound: mpsc::UnboundedReceiver<Message>,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    connected: Arc<AtomicBool>,
}

impl NetClient {
    /// Resolves and connects, spawning the background tasks on success.
    /// `fake_lag` delays every received and sent record by that much, to
    /// exercise prediction and smoothing under simulated latency.
    pub fn connect(addr: &str, timeout: Duration, fake_lag: Duration) -> Result<Self, NetError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .map_err(NetError::Runtime)?;

        let stream = runtime
            .block_on(async { tokio::time::timeout(timeout, TcpStream::connect(addr)).await })
            .map_err(|_| NetError::ConnectTimeout(timeout))?
            .map_err(NetError::Connect)?;
        let _ = stream.set_nodelay(true);
        info!("connected to {}", addr);

        let (rd, wr) = stream.into_split();
        let (in_tx, inbound) = mpsc::unbounded_channel();
        let (outbound, out_rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(true));

        runtime.spawn(read_records(rd, in_tx, Arc::clone(&connected), fake_lag));
        runtime.spawn(write_records(wr, out_rx, Arc::clone(&connected), fake_lag));

        Ok(Self {
            runtime,
            inbound,
            outbound,
            connected,
        })
    }

    /// Pops one decoded message; `None` once the queue is empty this frame.
    pub fn try_recv(&mut self) -> Option<Message> {
        self.inbound.try_recv().ok()
    }

    /// Queues a record for the writer task. Returns false once the
    /// connection is gone; the record is dropped, never retried.
    pub fn send(&self, msg: &Message) -> bool {
        if !self.is_connected() {
            return false;
        }
        self.outbound.send(msg.encode()).is_ok()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Closes both channels, then gives the background tasks a bounded
    /// window to observe the closure before the runtime is torn down.
    pub fn shutdown(self) {
        let Self {
            runtime,
            inbound,
            outbound,
            ..
        } = self;
        drop(inbound);
        drop(outbound);
        runtime.shutdown_timeout(Duration::from_millis(250));
    }
}

/// Reads fixed-width records until EOF or error; either one marks the
/// connection dead. The render loop sees messages only through the queue.
async fn read_records(
    mut rd: OwnedReadHalf,
    tx: mpsc::UnboundedSender<Message>,
    connected: Arc<AtomicBool>,
    fake_lag: Duration,
) {
    let mut record = [0u8; MAX_WIRE_LEN];

    loop {
        if rd.read_exact(&mut record[..1]).await.is_err() {
            break;
        }
        let Some(kind) = MessageKind::from_tag(record[0]) else {
            warn!("unknown message tag {} from server, closing", record[0]);
            break;
        };
        let len = kind.wire_len();
        if rd.read_exact(&mut record[1..len]).await.is_err() {
            break;
        }

        match Message::decode(&record[..len]) {
            Ok(msg) => {
                if !fake_lag.is_zero() {
                    tokio::time::sleep(fake_lag).await;
                }
                if tx.send(msg).is_err() {
                    break; // render loop is gone
                }
            }
            Err(e) => warn!("dropping malformed record: {}", e),
        }
    }

    connected.store(false, Ordering::Relaxed);
    info!("server connection closed");
}

/// Drains the outbound queue into the socket; a failed write marks the
/// connection dead and drops everything still queued.
async fn write_records(
    mut wr: OwnedWriteHalf,
    mut rx: mpsc::UnboundedReceiver<Vec<u8>>,
    connected: Arc<AtomicBool>,
    fake_lag: Duration,
) {
    while let Some(bytes) = rx.recv().await {
        if !fake_lag.is_zero() {
            tokio::time::sleep(fake_lag).await;
        }
        if let Err(e) = wr.write_all(&bytes).await {
            error!("send failed: {}", e);
            break;
        }
    }
    connected.store(false, Ordering::Relaxed);
}

use session::ConnectionKey;
use tokio::sync::{mpsc, oneshot};

/// Socket events reported by per-connection tasks to the connection set.
#[derive(Debug)]
pub enum NetEvent {
    /// A TCP connection was accepted and its tasks are running.
    Accepted {
        key: ConnectionKey,
        write_tx: WriteTx,
        /// Dropping or firing this stops the connection's reader.
        stop_tx: oneshot::Sender<()>,
    },
    /// One complete line arrived from the peer.
    Payload { key: ConnectionKey, line: String },
    /// The peer went away or the reader failed.
    Closed { key: ConnectionKey },
}

/// Sender from connection tasks to the tick loop.
pub type NetTx = mpsc::UnboundedSender<NetEvent>;
/// Receiver owned by the connection set.
pub type NetRx = mpsc::UnboundedReceiver<NetEvent>;

/// Bounded per-connection write queue (tick loop -> writer task).
pub type WriteTx = mpsc::Sender<String>;
pub type WriteRx = mpsc::Receiver<String>;

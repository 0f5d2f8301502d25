use std::io;

use session::ConnectionKey;

/// Listener-level failures. Only raised while setting up a server.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Per-connection failures. The caller closes the connection; they never
/// abort the tick loop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("write queue for {key} still full after {retries} retries")]
    WouldBlock { key: ConnectionKey, retries: u32 },

    #[error("connection {0} is closed")]
    Closed(ConnectionKey),

    #[error("no connection {0}")]
    UnknownConnection(ConnectionKey),
}

impl TransportError {
    pub fn key(&self) -> ConnectionKey {
        match self {
            Self::WouldBlock { key, .. } => *key,
            Self::Closed(key) | Self::UnknownConnection(key) => *key,
        }
    }
}

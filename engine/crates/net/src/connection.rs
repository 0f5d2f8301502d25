use std::collections::VecDeque;
use std::net::IpAddr;

use session::ConnectionKey;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::oneshot;

use crate::channels::WriteTx;
use crate::error::TransportError;

/// One peer, owned by the `ConnectionSet`.
#[derive(Debug)]
pub struct Connection {
    key: ConnectionKey,
    pub(crate) is_new: bool,
    pub(crate) read_pending: bool,
    pub(crate) close_pending: bool,
    kicked: bool,
    inbound: VecDeque<String>,
    write_tx: WriteTx,
    stop_tx: Option<oneshot::Sender<()>>,
}

impl Connection {
    pub(crate) fn new(key: ConnectionKey, write_tx: WriteTx, stop_tx: oneshot::Sender<()>) -> Self {
        Self {
            key,
            is_new: true,
            read_pending: false,
            close_pending: false,
            kicked: false,
            inbound: VecDeque::new(),
            write_tx,
            stop_tx: Some(stop_tx),
        }
    }

    pub fn key(&self) -> ConnectionKey {
        self.key
    }

    /// Display name, `address:port`.
    pub fn name(&self) -> String {
        self.key.to_string()
    }

    pub fn address(&self) -> IpAddr {
        self.key.addr().ip()
    }

    pub fn port(&self) -> u16 {
        self.key.addr().port()
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn has_pending_reads(&self) -> bool {
        self.read_pending
    }

    pub fn is_closing(&self) -> bool {
        self.close_pending
    }

    /// Closed by the server rather than the peer. Kicked connections never
    /// hand out input again.
    pub fn is_kicked(&self) -> bool {
        self.kicked
    }

    /// Payloads received but not yet handed out.
    pub fn buffered(&self) -> usize {
        self.inbound.len()
    }

    pub(crate) fn push_inbound(&mut self, line: String) {
        self.inbound.push_back(line);
        self.read_pending = true;
    }

    pub(crate) fn pop_inbound(&mut self) -> Option<String> {
        self.inbound.pop_front()
    }

    /// The peer hung up. Payloads it sent before that stay readable until
    /// the connection is removed.
    pub(crate) fn mark_peer_closed(&mut self) {
        self.close_pending = true;
        self.read_pending = !self.kicked && !self.inbound.is_empty();
    }

    /// Queue one payload for the writer task.
    ///
    /// A full queue is retried `retries` times before giving up.
    pub(crate) fn send(&self, payload: String, retries: u32) -> Result<(), TransportError> {
        if self.kicked {
            return Err(TransportError::Closed(self.key));
        }

        let mut payload = payload;
        for attempt in 0..=retries {
            match self.write_tx.try_send(payload) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Full(returned)) => {
                    payload = returned;
                    if attempt < retries {
                        std::thread::yield_now();
                    }
                }
                Err(TrySendError::Closed(_)) => return Err(TransportError::Closed(self.key)),
            }
        }

        Err(TransportError::WouldBlock {
            key: self.key,
            retries,
        })
    }

    /// Mark for close and stop the reader. Safe to call repeatedly.
    pub(crate) fn kick(&mut self) {
        self.close_pending = true;
        self.kicked = true;
        self.read_pending = false;
        self.inbound.clear();
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
    }
}

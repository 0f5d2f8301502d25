use std::net::SocketAddr;
use std::time::Duration;

use session::ConnectionKey;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::channels::{NetEvent, NetRx, NetTx};
use crate::connection::Connection;
use crate::error::{NetError, TransportError};
use crate::framing::DEFAULT_MAX_LINE_LEN;
use crate::rate_limiter::{ConnectionLimiter, ConnectionLimits};
use crate::server::run_acceptor;
use crate::Outbox;

/// Tuning for the connection set and its socket tasks.
#[derive(Debug, Clone)]
pub struct NetSettings {
    pub max_line_length: usize,
    /// Attempts after the first when a write queue is full.
    pub send_retries: u32,
    /// Capacity of each connection's write queue.
    pub write_queue: usize,
    pub limits: ConnectionLimits,
}

impl Default for NetSettings {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LEN,
            send_retries: 10,
            write_queue: 64,
            limits: ConnectionLimits::default(),
        }
    }
}

/// All live connections of one listener.
///
/// Socket I/O happens in per-connection tasks; the set itself is owned by a
/// single tick loop and learns about readiness through one event channel.
/// Within a tick callers observe new connections, then readable ones, then
/// closes.
pub struct ConnectionSet {
    connections: Vec<Connection>,
    events_rx: NetRx,
    events_tx: NetTx,
    acceptor: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
    settings: NetSettings,
}

impl ConnectionSet {
    /// Bind `addr` and start accepting connections.
    pub async fn open(addr: &str, settings: NetSettings) -> Result<Self, NetError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| NetError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        let mut set = Self::detached(settings);
        let limiter = ConnectionLimiter::shared(set.settings.limits.clone());
        set.acceptor = Some(tokio::spawn(run_acceptor(
            listener,
            set.events_tx.clone(),
            limiter,
            set.settings.clone(),
        )));
        set.local_addr = Some(local_addr);

        tracing::info!(%local_addr, "Game server listening");
        Ok(set)
    }

    /// A set without a listener. Connections only appear through events
    /// pushed on `event_sender`.
    pub fn detached(settings: NetSettings) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            connections: Vec::new(),
            events_rx,
            events_tx,
            acceptor: None,
            local_addr: None,
            settings,
        }
    }

    pub fn event_sender(&self) -> NetTx {
        self.events_tx.clone()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn settings(&self) -> &NetSettings {
        &self.settings
    }

    /// Wait up to `timeout` for socket activity, then take everything queued.
    ///
    /// Returns without waiting when some connection still has buffered
    /// payloads. Returns the number of events applied.
    pub async fn poll(&mut self, timeout: Duration) -> usize {
        let wait = if self.connections.iter().any(|c| !c.close_pending && c.buffered() > 0) {
            Duration::ZERO
        } else {
            timeout
        };

        let mut applied = 0;
        if let Ok(Some(event)) = tokio::time::timeout(wait, self.events_rx.recv()).await {
            self.apply(event);
            applied += 1;
        }
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply(event);
            applied += 1;
        }

        for conn in &mut self.connections {
            if !conn.close_pending && conn.buffered() > 0 {
                conn.read_pending = true;
            }
        }

        applied
    }

    fn apply(&mut self, event: NetEvent) {
        match event {
            NetEvent::Accepted {
                key,
                write_tx,
                stop_tx,
            } => {
                if self.index_of(&key).is_some() {
                    // Dropping the handles stops the duplicate's tasks.
                    tracing::warn!(%key, "duplicate connection key, rejecting");
                    return;
                }
                self.connections.push(Connection::new(key, write_tx, stop_tx));
            }
            NetEvent::Payload { key, line } => match self.get_mut(&key) {
                Some(conn) if !conn.close_pending => conn.push_inbound(line),
                Some(_) => tracing::trace!(%key, "payload after close dropped"),
                None => tracing::trace!(%key, "payload for unknown connection dropped"),
            },
            NetEvent::Closed { key } => {
                if let Some(conn) = self.get_mut(&key) {
                    conn.mark_peer_closed();
                }
            }
        }
    }

    /// Newly accepted connections. Each is yielded once for its lifetime.
    pub fn drain_new(&mut self) -> std::vec::IntoIter<ConnectionKey> {
        let mut keys = Vec::new();
        for conn in &mut self.connections {
            if conn.is_new {
                conn.is_new = false;
                keys.push(conn.key());
            }
        }
        keys.into_iter()
    }

    /// Connections with pending payloads. Each is yielded once per poll;
    /// connections left with buffered payloads are re-armed by the next poll.
    /// A connection the peer closed is still yielded for what it sent first.
    pub fn drain_readable(&mut self) -> std::vec::IntoIter<ConnectionKey> {
        let mut keys = Vec::new();
        for conn in &mut self.connections {
            if conn.read_pending && !conn.is_kicked() {
                conn.read_pending = false;
                keys.push(conn.key());
            }
        }
        keys.into_iter()
    }

    /// Remove every connection marked for close, calling `on_close` on each
    /// first. Returns how many were removed.
    pub fn drain_closed<F>(&mut self, mut on_close: F) -> usize
    where
        F: FnMut(&Connection),
    {
        let mut removed = 0;
        for conn in self.connections.iter().filter(|c| c.close_pending) {
            on_close(conn);
            removed += 1;
        }
        if removed > 0 {
            self.connections.retain(|c| !c.close_pending);
        }
        removed
    }

    /// Queue `payload` on a connection's write queue.
    pub fn send(&self, key: &ConnectionKey, payload: impl Into<String>) -> Result<(), TransportError> {
        let conn = self
            .get(key)
            .ok_or(TransportError::UnknownConnection(*key))?;
        conn.send(payload.into(), self.settings.send_retries)
    }

    /// Take the next buffered payload, `Ok(None)` when there is none.
    pub fn receive(&mut self, key: &ConnectionKey) -> Result<Option<String>, TransportError> {
        let conn = self
            .get_mut(key)
            .ok_or(TransportError::UnknownConnection(*key))?;
        if conn.is_kicked() {
            return Err(TransportError::Closed(*key));
        }
        Ok(conn.pop_inbound())
    }

    /// Mark a connection for close. Returns false when the key is unknown.
    pub fn kick(&mut self, key: &ConnectionKey) -> bool {
        match self.get_mut(key) {
            Some(conn) => {
                conn.kick();
                true
            }
            None => false,
        }
    }

    /// Mark every connection for close, returning how many there were.
    pub fn kick_all(&mut self) -> usize {
        for conn in &mut self.connections {
            conn.kick();
        }
        self.connections.len()
    }

    /// Stop accepting new connections.
    pub fn stop_accepting(&mut self) {
        if let Some(acceptor) = self.acceptor.take() {
            acceptor.abort();
            tracing::info!("Game server stopped accepting connections");
        }
    }

    pub fn get(&self, key: &ConnectionKey) -> Option<&Connection> {
        self.connections.iter().find(|c| c.key() == *key)
    }

    fn get_mut(&mut self, key: &ConnectionKey) -> Option<&mut Connection> {
        self.connections.iter_mut().find(|c| c.key() == *key)
    }

    fn index_of(&self, key: &ConnectionKey) -> Option<usize> {
        self.connections.iter().position(|c| c.key() == *key)
    }

    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl Drop for ConnectionSet {
    fn drop(&mut self) {
        if let Some(acceptor) = self.acceptor.take() {
            acceptor.abort();
        }
    }
}

impl Outbox for ConnectionSet {
    fn send(&mut self, key: ConnectionKey, payload: String) -> Result<(), TransportError> {
        ConnectionSet::send(self, &key, payload)
    }

    fn kick(&mut self, key: ConnectionKey) {
        ConnectionSet::kick(self, &key);
    }
}

use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;

/// Transport-level identity of a connection: the peer's address and port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionKey(pub SocketAddr);

impl ConnectionKey {
    pub fn addr(&self) -> SocketAddr {
        self.0
    }
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.0.ip(), self.0.port())
    }
}

impl From<SocketAddr> for ConnectionKey {
    fn from(addr: SocketAddr) -> Self {
        Self(addr)
    }
}

/// Maps connections to the player names they logged in with.
///
/// Holds keys only; the connection itself may already be gone when a lookup
/// happens, so every query returns an `Option`.
#[derive(Debug, Default)]
pub struct SessionDirectory {
    players: BTreeMap<ConnectionKey, String>,
}

impl SessionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a player name for a connection, returning the name it replaced.
    pub fn register(&mut self, key: ConnectionKey, name: impl Into<String>) -> Option<String> {
        self.players.insert(key, name.into())
    }

    /// Forget a connection's player, returning the name that was registered.
    pub fn unregister(&mut self, key: &ConnectionKey) -> Option<String> {
        self.players.remove(key)
    }

    pub fn name_for(&self, key: &ConnectionKey) -> Option<&str> {
        self.players.get(key).map(String::as_str)
    }

    /// Reverse lookup used to find where to deliver a message for a player.
    pub fn connection_for(&self, name: &str) -> Option<ConnectionKey> {
        self.players
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(key, _)| *key)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn clear(&mut self) {
        self.players.clear();
    }
}

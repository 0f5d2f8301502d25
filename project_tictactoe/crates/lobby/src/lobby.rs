use std::fmt;

/// Stable lobby identifier, assigned sequentially from 0 at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LobbyId(pub u32);

impl fmt::Display for LobbyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two seats of a lobby. X is always filled first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seat {
    X,
    O,
}

/// A two-seat matchmaking slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lobby {
    id: LobbyId,
    player_x: Option<String>,
    player_o: Option<String>,
}

impl Lobby {
    pub fn new(id: LobbyId) -> Self {
        Self {
            id,
            player_x: None,
            player_o: None,
        }
    }

    pub fn id(&self) -> LobbyId {
        self.id
    }

    pub fn player_x(&self) -> Option<&str> {
        self.player_x.as_deref()
    }

    pub fn player_o(&self) -> Option<&str> {
        self.player_o.as_deref()
    }

    pub fn is_full(&self) -> bool {
        self.player_x.is_some() && self.player_o.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.player_x.is_none() && self.player_o.is_none()
    }

    pub fn is_in_lobby(&self, name: &str) -> bool {
        self.seat_of(name).is_some()
    }

    pub fn seat_of(&self, name: &str) -> Option<Seat> {
        if self.player_x.as_deref() == Some(name) {
            Some(Seat::X)
        } else if self.player_o.as_deref() == Some(name) {
            Some(Seat::O)
        } else {
            None
        }
    }

    /// The other seated player, if `name` is seated and the lobby is full.
    pub fn opponent_of(&self, name: &str) -> Option<&str> {
        match self.seat_of(name)? {
            Seat::X => self.player_o(),
            Seat::O => self.player_x(),
        }
    }

    /// Seated names, X first.
    pub fn players(&self) -> impl Iterator<Item = &str> {
        self.player_x().into_iter().chain(self.player_o())
    }

    /// Take the first open seat. Callers check fullness first.
    pub(crate) fn seat(&mut self, name: String) -> Option<Seat> {
        if self.player_x.is_none() {
            self.player_x = Some(name);
            Some(Seat::X)
        } else if self.player_o.is_none() {
            self.player_o = Some(name);
            Some(Seat::O)
        } else {
            None
        }
    }

    pub(crate) fn unseat(&mut self, name: &str) -> Option<Seat> {
        let seat = self.seat_of(name)?;
        match seat {
            Seat::X => self.player_x = None,
            Seat::O => self.player_o = None,
        }
        Some(seat)
    }

    pub(crate) fn clear(&mut self) {
        self.player_x = None;
        self.player_o = None;
    }
}

use std::collections::BTreeMap;

use crate::error::LobbyError;
use crate::lobby::{Lobby, LobbyId, Seat};

/// Bookkeeping for a lobby whose game has started.
///
/// Refers to its lobby by id only; resolve through `LobbyManager::find`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSession {
    lobby: LobbyId,
    starter: Option<String>,
    turn: Option<String>,
    moves_relayed: u64,
}

impl GameSession {
    fn new(lobby: LobbyId) -> Self {
        Self {
            lobby,
            starter: None,
            turn: None,
            moves_relayed: 0,
        }
    }

    pub fn lobby(&self) -> LobbyId {
        self.lobby
    }

    /// The player chosen to move first, once the handshake has run.
    pub fn starter(&self) -> Option<&str> {
        self.starter.as_deref()
    }

    /// The player whose move is expected next. Never enforced.
    pub fn turn(&self) -> Option<&str> {
        self.turn.as_deref()
    }

    pub fn moves_relayed(&self) -> u64 {
        self.moves_relayed
    }

    pub fn set_starter(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.turn = Some(name.clone());
        self.starter = Some(name);
    }

    /// Record a relayed move; `next` is expected to move after it.
    pub fn record_move(&mut self, next: impl Into<String>) {
        self.turn = Some(next.into());
        self.moves_relayed += 1;
    }
}

/// What `LobbyManager::reset` released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetSummary {
    pub sessions_ended: usize,
    pub lobbies_cleared: usize,
}

/// Fixed pool of lobbies plus the sessions of the ones that have started.
#[derive(Debug)]
pub struct LobbyManager {
    lobbies: Box<[Lobby]>,
    sessions: BTreeMap<LobbyId, GameSession>,
}

impl LobbyManager {
    /// Create `count` empty lobbies with ids `0..count`.
    pub fn new(count: u32) -> Self {
        Self {
            lobbies: (0..count).map(|i| Lobby::new(LobbyId(i))).collect(),
            sessions: BTreeMap::new(),
        }
    }

    pub fn find(&self, id: LobbyId) -> Option<&Lobby> {
        self.lobbies.get(id.0 as usize)
    }

    fn find_mut(&mut self, id: LobbyId) -> Option<&mut Lobby> {
        self.lobbies.get_mut(id.0 as usize)
    }

    pub fn lobbies(&self) -> &[Lobby] {
        &self.lobbies
    }

    /// The lobby `name` is seated in, if any.
    pub fn lobby_of(&self, name: &str) -> Option<LobbyId> {
        self.lobbies
            .iter()
            .find(|lobby| lobby.is_in_lobby(name))
            .map(Lobby::id)
    }

    pub fn is_in_any_lobby(&self, name: &str) -> bool {
        self.lobby_of(name).is_some()
    }

    /// Seat `name` in lobby `id`. Starts the lobby's session when this fills it.
    pub fn add_player(&mut self, id: LobbyId, name: &str) -> Result<Seat, LobbyError> {
        if self.find(id).is_none() {
            return Err(LobbyError::NotFound(id));
        }
        if let Some(lobby) = self.lobby_of(name) {
            return Err(LobbyError::AlreadySeated {
                name: name.to_string(),
                lobby,
            });
        }

        let lobby = self.find_mut(id).ok_or(LobbyError::NotFound(id))?;
        let seat = lobby.seat(name.to_string()).ok_or(LobbyError::Full(id))?;
        let now_full = lobby.is_full();

        if now_full && !self.sessions.contains_key(&id) {
            self.sessions.insert(id, GameSession::new(id));
            tracing::info!(lobby = %id, "game started");
        }
        Ok(seat)
    }

    /// Free `name`'s seat in lobby `id`. Retires the session when the lobby empties.
    pub fn remove_player(&mut self, id: LobbyId, name: &str) -> Result<Seat, LobbyError> {
        let lobby = self.find_mut(id).ok_or(LobbyError::NotFound(id))?;
        let seat = lobby.unseat(name).ok_or_else(|| LobbyError::NotSeated {
            name: name.to_string(),
            lobby: id,
        })?;
        let now_empty = lobby.is_empty();

        if now_empty && self.sessions.remove(&id).is_some() {
            tracing::info!(lobby = %id, "game ended");
        }
        Ok(seat)
    }

    /// Remove `name` from whichever lobby holds it.
    pub fn evict(&mut self, name: &str) -> Option<LobbyId> {
        let id = self.lobby_of(name)?;
        self.remove_player(id, name).ok().map(|_| id)
    }

    pub fn session(&self, id: LobbyId) -> Option<&GameSession> {
        self.sessions.get(&id)
    }

    pub fn session_mut(&mut self, id: LobbyId) -> Option<&mut GameSession> {
        self.sessions.get_mut(&id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// End every session and empty every lobby. The pool itself is kept.
    pub fn reset(&mut self) -> ResetSummary {
        let sessions_ended = self.sessions.len();
        self.sessions.clear();

        let mut lobbies_cleared = 0;
        for lobby in self.lobbies.iter_mut().filter(|l| !l.is_empty()) {
            lobby.clear();
            lobbies_cleared += 1;
        }

        ResetSummary {
            sessions_ended,
            lobbies_cleared,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const L0: LobbyId = LobbyId(0);
    const L1: LobbyId = LobbyId(1);

    #[test]
    fn pool_ids_are_sequential() {
        let mgr = LobbyManager::new(3);
        let ids: Vec<_> = mgr.lobbies().iter().map(Lobby::id).collect();
        assert_eq!(ids, vec![LobbyId(0), LobbyId(1), LobbyId(2)]);
        assert!(mgr.find(LobbyId(3)).is_none());
    }

    #[test]
    fn filling_a_lobby_starts_a_session() {
        let mut mgr = LobbyManager::new(3);
        assert_eq!(mgr.add_player(L0, "Ann"), Ok(Seat::X));
        assert!(mgr.session(L0).is_none());
        assert_eq!(mgr.add_player(L0, "Bo"), Ok(Seat::O));
        assert!(mgr.find(L0).unwrap().is_full());
        assert_eq!(mgr.session(L0).map(GameSession::lobby), Some(L0));
        assert_eq!(mgr.session_count(), 1);
    }

    #[test]
    fn join_rejections_leave_state_unchanged() {
        let mut mgr = LobbyManager::new(2);
        mgr.add_player(L0, "Ann").unwrap();
        mgr.add_player(L0, "Bo").unwrap();

        assert_eq!(mgr.add_player(L0, "Cy"), Err(LobbyError::Full(L0)));
        assert_eq!(
            mgr.add_player(L0, "Ann"),
            Err(LobbyError::AlreadySeated {
                name: "Ann".into(),
                lobby: L0
            })
        );
        // Seated elsewhere counts too: one lobby per name across the pool.
        assert_eq!(
            mgr.add_player(L1, "Bo"),
            Err(LobbyError::AlreadySeated {
                name: "Bo".into(),
                lobby: L0
            })
        );
        assert_eq!(mgr.add_player(LobbyId(9), "Cy"), Err(LobbyError::NotFound(LobbyId(9))));

        assert!(mgr.find(L1).unwrap().is_empty());
        assert_eq!(mgr.find(L0).unwrap().players().collect::<Vec<_>>(), vec!["Ann", "Bo"]);
    }

    #[test]
    fn session_survives_until_lobby_empties() {
        let mut mgr = LobbyManager::new(3);
        mgr.add_player(L0, "Ann").unwrap();
        mgr.add_player(L0, "Bo").unwrap();

        assert_eq!(mgr.remove_player(L0, "Ann"), Ok(Seat::X));
        assert!(mgr.session(L0).is_some());

        // Refill does not replace the running session.
        mgr.session_mut(L0).unwrap().set_starter("Bo");
        mgr.add_player(L0, "Cy").unwrap();
        assert_eq!(mgr.session(L0).unwrap().starter(), Some("Bo"));

        mgr.remove_player(L0, "Cy").unwrap();
        mgr.remove_player(L0, "Bo").unwrap();
        assert!(mgr.session(L0).is_none());
        assert_eq!(mgr.session_count(), 0);
    }

    #[test]
    fn remove_non_member_is_rejected() {
        let mut mgr = LobbyManager::new(3);
        mgr.add_player(L0, "Ann").unwrap();
        assert_eq!(
            mgr.remove_player(L0, "Bo"),
            Err(LobbyError::NotSeated {
                name: "Bo".into(),
                lobby: L0
            })
        );
        assert_eq!(mgr.remove_player(LobbyId(7), "Ann"), Err(LobbyError::NotFound(LobbyId(7))));
        assert!(mgr.find(L0).unwrap().is_in_lobby("Ann"));
    }

    #[test]
    fn evict_finds_the_lobby() {
        let mut mgr = LobbyManager::new(3);
        mgr.add_player(L1, "Ann").unwrap();
        assert_eq!(mgr.evict("Ann"), Some(L1));
        assert_eq!(mgr.evict("Ann"), None);
        assert!(!mgr.is_in_any_lobby("Ann"));
    }

    #[test]
    fn turn_bookkeeping() {
        let mut mgr = LobbyManager::new(1);
        mgr.add_player(L0, "Ann").unwrap();
        mgr.add_player(L0, "Bo").unwrap();
        let session = mgr.session_mut(L0).unwrap();
        assert_eq!(session.turn(), None);
        session.set_starter("Ann");
        assert_eq!(session.turn(), Some("Ann"));
        session.record_move("Bo");
        assert_eq!(session.turn(), Some("Bo"));
        assert_eq!(session.starter(), Some("Ann"));
        assert_eq!(session.moves_relayed(), 1);
    }

    #[test]
    fn reset_clears_everything_but_the_pool() {
        let mut mgr = LobbyManager::new(3);
        mgr.add_player(L0, "Ann").unwrap();
        mgr.add_player(L0, "Bo").unwrap();
        mgr.add_player(L1, "Cy").unwrap();

        let summary = mgr.reset();
        assert_eq!(
            summary,
            ResetSummary {
                sessions_ended: 1,
                lobbies_cleared: 2
            }
        );
        assert_eq!(mgr.lobbies().len(), 3);
        assert!(mgr.lobbies().iter().all(Lobby::is_empty));
        assert_eq!(mgr.session_count(), 0);
    }

    #[test]
    fn fullness_invariant_over_join_leave_sequence() {
        let mut mgr = LobbyManager::new(3);
        let names = ["Ann", "Bo", "Cy", "Di"];
        let mut step = 0u32;
        for round in 0..40u32 {
            let name = names[(round % 4) as usize];
            let id = LobbyId(round * 7 % 3);
            if round % 3 == 0 {
                let _ = mgr.evict(name);
            } else {
                let _ = mgr.add_player(id, name);
            }
            step += 1;

            for lobby in mgr.lobbies() {
                let seated = lobby.players().count();
                assert_eq!(lobby.is_full(), seated == 2, "step {step}");
                assert_eq!(lobby.is_empty(), seated == 0, "step {step}");
                if lobby.is_empty() {
                    assert!(mgr.session(lobby.id()).is_none(), "step {step}");
                }
            }
            for name in names {
                let count = mgr.lobbies().iter().filter(|l| l.is_in_lobby(name)).count();
                assert!(count <= 1, "{name} seated twice at step {step}");
            }
        }
    }
}

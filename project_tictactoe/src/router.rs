use lobby::{LobbyError, LobbyId, LobbyManager, ResetSummary};
use net::{ClientMessage, LobbyWire, Outbox, ServerMessage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use session::{ConnectionKey, SessionDirectory};

/// Decodes client payloads and applies them to the directory and lobby pool.
///
/// Every handler runs to completion on the tick task. Nothing here is ever
/// reported back to the sender as an error; failures are logged and dropped.
pub struct MessageRouter {
    directory: SessionDirectory,
    lobbies: LobbyManager,
    rng: StdRng,
}

impl MessageRouter {
    pub fn new(lobby_count: u32) -> Self {
        Self::with_rng(lobby_count, StdRng::from_entropy())
    }

    /// Router whose starter picks are reproducible.
    pub fn with_seed(lobby_count: u32, seed: u64) -> Self {
        Self::with_rng(lobby_count, StdRng::seed_from_u64(seed))
    }

    fn with_rng(lobby_count: u32, rng: StdRng) -> Self {
        Self {
            directory: SessionDirectory::new(),
            lobbies: LobbyManager::new(lobby_count),
            rng,
        }
    }

    pub fn directory(&self) -> &SessionDirectory {
        &self.directory
    }

    pub fn lobbies(&self) -> &LobbyManager {
        &self.lobbies
    }

    /// Handle one inbound payload from `sender`.
    pub fn dispatch<O: Outbox>(&mut self, out: &mut O, sender: ConnectionKey, raw: &str) {
        let msg = match ClientMessage::decode(raw) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!(%sender, error = %e, "dropping payload");
                return;
            }
        };
        tracing::trace!(%sender, kind = msg.kind(), "dispatch");

        match msg {
            ClientMessage::Login { user_name } => self.login(sender, user_name),
            ClientMessage::GetLobbyList => {
                tracing::debug!(%sender, "sending lobby list");
                self.send_roster(out, sender);
            }
            ClientMessage::JoinLobby { id } => self.join_lobby(out, sender, LobbyId(id)),
            ClientMessage::LeaveLobby { id, .. } => self.leave_lobby(sender, LobbyId(id)),
            ClientMessage::IsLobbyFull { id } => self.is_lobby_full(out, LobbyId(id)),
            ClientMessage::OpponentMove { id, .. } => self.relay_move(out, sender, LobbyId(id), raw),
        }
    }

    fn login(&mut self, sender: ConnectionKey, user_name: String) {
        if user_name.trim().is_empty() {
            tracing::warn!(%sender, "login with empty name ignored");
            return;
        }
        match self.directory.register(sender, user_name.clone()) {
            Some(previous) if previous != user_name => {
                tracing::info!(%sender, player = %user_name, %previous, "player renamed");
                // Nothing can reach a seat held under the old name any more.
                if self.directory.connection_for(&previous).is_none() {
                    if let Some(id) = self.lobbies.evict(&previous) {
                        tracing::info!(player = %previous, lobby = %id, "evicted renamed player");
                    }
                }
            }
            _ => tracing::info!(%sender, player = %user_name, "registered player"),
        }
    }

    fn join_lobby<O: Outbox>(&mut self, out: &mut O, sender: ConnectionKey, id: LobbyId) {
        match self.directory.name_for(&sender).map(str::to_string) {
            None => tracing::warn!(%sender, lobby = %id, "join from connection without login"),
            Some(name) => match self.lobbies.add_player(id, &name) {
                Ok(seat) => {
                    tracing::info!(player = %name, lobby = %id, ?seat, "player joined lobby");
                    send_message(
                        out,
                        sender,
                        &ServerMessage::IsInLobby {
                            current_lobby_id: id.0,
                        },
                    );
                }
                Err(e) => log_rejected(&e),
            },
        }
        // The roster goes out whether or not the join succeeded.
        self.send_roster(out, sender);
    }

    fn leave_lobby(&mut self, sender: ConnectionKey, id: LobbyId) {
        let Some(name) = self.directory.name_for(&sender).map(str::to_string) else {
            tracing::debug!(%sender, lobby = %id, "leave from connection without login");
            return;
        };
        match self.lobbies.remove_player(id, &name) {
            Ok(_) => {
                self.directory.unregister(&sender);
                tracing::info!(player = %name, lobby = %id, "player left lobby");
            }
            Err(e) => log_rejected(&e),
        }
    }

    fn is_lobby_full<O: Outbox>(&mut self, out: &mut O, id: LobbyId) {
        let Some(lobby) = self.lobbies.find(id) else {
            log_rejected(&LobbyError::NotFound(id));
            return;
        };
        let (Some(player_x), Some(player_o)) = (lobby.player_x(), lobby.player_o()) else {
            tracing::trace!(lobby = %id, "lobby not full yet");
            return;
        };
        let (player_x, player_o) = (player_x.to_string(), player_o.to_string());

        let starter = if self.rng.gen_bool(0.5) {
            player_x.clone()
        } else {
            player_o.clone()
        };
        if let Some(session) = self.lobbies.session_mut(id) {
            session.set_starter(starter.clone());
        }

        let shape = ServerMessage::SetPlayerShape {
            player_x: player_x.clone(),
            player_o: player_o.clone(),
            starter: starter.clone(),
        };
        for name in [&player_x, &player_o] {
            match self.directory.connection_for(name) {
                Some(key) => {
                    if send_message(out, key, &shape) {
                        tracing::debug!(player = %name, lobby = %id, "lobby full confirmation sent");
                    }
                }
                None => tracing::debug!(player = %name, lobby = %id, "seated player has no connection"),
            }
        }
        tracing::info!(lobby = %id, %starter, "turn order assigned");
    }

    fn relay_move<O: Outbox>(&mut self, out: &mut O, sender: ConnectionKey, id: LobbyId, raw: &str) {
        if self.lobbies.session(id).is_none() {
            tracing::debug!(%sender, lobby = %id, "move for lobby without a started game");
            return;
        }
        let Some(name) = self.directory.name_for(&sender) else {
            tracing::debug!(%sender, lobby = %id, "move from connection without login");
            return;
        };
        let Some(opponent) = self.lobbies.find(id).and_then(|l| l.opponent_of(name)) else {
            tracing::debug!(player = %name, lobby = %id, "no opponent to relay to");
            return;
        };
        let opponent = opponent.to_string();
        let Some(opponent_key) = self.directory.connection_for(&opponent) else {
            tracing::debug!(player = %opponent, lobby = %id, "opponent has no connection");
            return;
        };

        if !send_raw(out, opponent_key, raw.to_string()) {
            return;
        }
        tracing::info!(player = %name, lobby = %id, "move relayed");
        if let Some(session) = self.lobbies.session_mut(id) {
            session.record_move(opponent);
        }
    }

    fn send_roster<O: Outbox>(&self, out: &mut O, key: ConnectionKey) {
        let roster = ServerMessage::Lobby {
            lobbies: self
                .lobbies
                .lobbies()
                .iter()
                .map(|lobby| LobbyWire {
                    id: lobby.id().0,
                    player_x: lobby.player_x().unwrap_or_default().to_string(),
                    player_o: lobby.player_o().unwrap_or_default().to_string(),
                })
                .collect(),
        };
        send_message(out, key, &roster);
    }

    /// Forget a closed connection. Its player leaves their lobby unless
    /// another live connection still uses the same name.
    pub fn disconnect(&mut self, key: ConnectionKey) -> Option<String> {
        let name = self.directory.unregister(&key)?;
        if self.directory.connection_for(&name).is_none() {
            if let Some(id) = self.lobbies.evict(&name) {
                tracing::info!(player = %name, lobby = %id, "evicted disconnected player");
            }
        }
        Some(name)
    }

    /// Drop every player, session, and seat. The lobby pool is kept.
    pub fn reset(&mut self) -> (usize, ResetSummary) {
        let players = self.directory.len();
        self.directory.clear();
        (players, self.lobbies.reset())
    }
}

fn log_rejected(e: &LobbyError) {
    tracing::debug!(error = %e, "lobby request ignored");
}

/// Encode and queue `msg`. A failed send closes the connection.
fn send_message<O: Outbox>(out: &mut O, key: ConnectionKey, msg: &ServerMessage) -> bool {
    match msg.encode() {
        Ok(payload) => send_raw(out, key, payload),
        Err(e) => {
            tracing::error!(%key, error = %e, "failed to encode message");
            false
        }
    }
}

fn send_raw<O: Outbox>(out: &mut O, key: ConnectionKey, payload: String) -> bool {
    match out.send(key, payload) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(%key, error = %e, "send failed, closing connection");
            out.kick(key);
            false
        }
    }
}

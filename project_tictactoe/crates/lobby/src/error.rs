use thiserror::Error;

use crate::LobbyId;

/// Rejected lobby state changes. None of these are reported to clients.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LobbyError {
    #[error("lobby not found: {0}")]
    NotFound(LobbyId),

    #[error("lobby {0} is full")]
    Full(LobbyId),

    #[error("player {name} is already seated in lobby {lobby}")]
    AlreadySeated { name: String, lobby: LobbyId },

    #[error("player {name} is not seated in lobby {lobby}")]
    NotSeated { name: String, lobby: LobbyId },
}

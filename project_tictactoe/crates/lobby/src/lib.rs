pub mod error;
pub mod lobby;
pub mod manager;

pub use error::LobbyError;
pub use lobby::{Lobby, LobbyId, Seat};
pub use manager::{GameSession, LobbyManager, ResetSummary};

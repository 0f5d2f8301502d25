pub mod game;
pub mod router;

pub use game::GameServer;
pub use router::MessageRouter;

use engine_core::TickHandler;
use net::{Connection, ConnectionSet};
use session::ConnectionKey;

use crate::router::MessageRouter;

/// Tick handler for the tic-tac-toe lobby server.
pub struct GameServer {
    router: MessageRouter,
}

impl GameServer {
    pub fn new(router: MessageRouter) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &MessageRouter {
        &self.router
    }
}

impl TickHandler for GameServer {
    fn on_readable(&mut self, connections: &mut ConnectionSet, key: ConnectionKey) -> usize {
        let mut handled = 0;
        loop {
            match connections.receive(&key) {
                Ok(Some(payload)) => {
                    self.router.dispatch(connections, key, &payload);
                    handled += 1;
                }
                Ok(None) => break,
                Err(e) => {
                    // The sender was kicked by a failed reply.
                    tracing::debug!(%key, error = %e, "stop reading");
                    break;
                }
            }
        }
        handled
    }

    fn on_close(&mut self, connection: &Connection) {
        self.router.disconnect(connection.key());
    }

    fn on_shutdown(&mut self) {
        let (players, summary) = self.router.reset();
        tracing::info!(
            players,
            games_ended = summary.sessions_ended,
            lobbies_reset = summary.lobbies_cleared,
            "Game state cleared"
        );
    }
}

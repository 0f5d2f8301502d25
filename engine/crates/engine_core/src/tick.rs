use std::time::{Duration, Instant};

use net::{Connection, ConnectionSet};
use session::ConnectionKey;
use tokio::sync::watch;

/// Tick loop configuration.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Longest a tick waits for socket activity.
    pub poll_timeout: Duration,
    /// Ticks slower than this are logged as warnings.
    pub budget_us: u128,
    /// Maximum ticks to run (0 = unlimited).
    pub max_ticks: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_millis(10),
            budget_us: 5_000,
            max_ticks: 0,
        }
    }
}

/// Game logic driven by the tick loop. Every callback runs to completion
/// on the tick task.
pub trait TickHandler {
    /// A connection was accepted. Called once per connection.
    fn on_connect(&mut self, _connections: &mut ConnectionSet, _key: ConnectionKey) {}

    /// A connection has buffered payloads. Returns how many were handled.
    fn on_readable(&mut self, connections: &mut ConnectionSet, key: ConnectionKey) -> usize;

    /// A connection is about to be removed from the set.
    fn on_close(&mut self, connection: &Connection);

    /// Every connection has been closed; release remaining state.
    fn on_shutdown(&mut self) {}
}

/// Owns the connection set and the handler, and advances them one tick at a time.
pub struct TickLoop<H: TickHandler> {
    pub connections: ConnectionSet,
    pub handler: H,
    pub config: TickConfig,
    pub current_tick: u64,
    shut_down: bool,
}

impl<H: TickHandler> TickLoop<H> {
    pub fn new(config: TickConfig, connections: ConnectionSet, handler: H) -> Self {
        Self {
            connections,
            handler,
            config,
            current_tick: 0,
            shut_down: false,
        }
    }

    /// Execute a single tick: poll → new → readable → closed → metrics.
    pub async fn step(&mut self) -> observability::TickMetrics {
        self.connections.poll(self.config.poll_timeout).await;
        let start = Instant::now();

        let mut accepted = 0;
        let new_keys: Vec<_> = self.connections.drain_new().collect();
        for key in new_keys {
            tracing::info!(%key, "client connected");
            self.handler.on_connect(&mut self.connections, key);
            accepted += 1;
        }

        let mut dispatched = 0;
        let readable: Vec<_> = self.connections.drain_readable().collect();
        for key in readable {
            dispatched += self.handler.on_readable(&mut self.connections, key);
        }

        let handler = &mut self.handler;
        let closed = self.connections.drain_closed(|conn| {
            tracing::info!(key = %conn.key(), "client disconnected");
            handler.on_close(conn);
        });

        self.current_tick += 1;

        observability::TickMetrics {
            tick_number: self.current_tick,
            duration_us: start.elapsed().as_micros(),
            accepted,
            dispatched,
            closed,
            connection_count: self.connections.len(),
        }
    }

    /// Run until `shutdown` flips to true (or `max_ticks` is reached), then
    /// shut down. Returns the number of ticks run.
    pub async fn run(&mut self, shutdown: watch::Receiver<bool>) -> u64 {
        let first_tick = self.current_tick;

        loop {
            if *shutdown.borrow() {
                tracing::info!("Shutdown signal received, stopping tick loop");
                break;
            }
            if self.config.max_ticks > 0 && self.current_tick >= self.config.max_ticks {
                break;
            }

            let metrics = self.step().await;
            metrics.log(self.config.budget_us);
        }

        self.shutdown();
        self.current_tick - first_tick
    }

    /// Close every connection and release handler state. Safe to call more
    /// than once; later calls do nothing and return 0.
    pub fn shutdown(&mut self) -> usize {
        if self.shut_down {
            return 0;
        }
        self.shut_down = true;

        self.connections.stop_accepting();
        self.connections.kick_all();
        let handler = &mut self.handler;
        let closed = self.connections.drain_closed(|conn| handler.on_close(conn));
        self.handler.on_shutdown();

        tracing::info!(closed, "Closed client connections");
        closed
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }
}

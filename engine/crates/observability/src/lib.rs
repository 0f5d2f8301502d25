use tracing_subscriber::{fmt, EnvFilter};

pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

#[derive(Debug, Clone, Default)]
pub struct TickMetrics {
    pub tick_number: u64,
    pub duration_us: u128,
    /// Connections reported as new during this tick.
    pub accepted: usize,
    /// Payloads handed to the dispatcher during this tick.
    pub dispatched: usize,
    /// Connections finalized as closed during this tick.
    pub closed: usize,
    pub connection_count: usize,
}

impl TickMetrics {
    pub fn is_idle(&self) -> bool {
        self.accepted == 0 && self.dispatched == 0 && self.closed == 0
    }

    /// Log the tick. Idle ticks stay at trace level since they run at poll cadence.
    pub fn log(&self, budget_us: u128) {
        if self.duration_us > budget_us {
            tracing::warn!(
                tick = self.tick_number,
                duration_us = self.duration_us,
                accepted = self.accepted,
                dispatched = self.dispatched,
                closed = self.closed,
                connections = self.connection_count,
                "tick exceeded budget ({}us > {}us)",
                self.duration_us,
                budget_us
            );
        } else if self.is_idle() {
            tracing::trace!(tick = self.tick_number, "idle tick");
        } else {
            tracing::debug!(
                tick = self.tick_number,
                duration_us = self.duration_us,
                accepted = self.accepted,
                dispatched = self.dispatched,
                closed = self.closed,
                connections = self.connection_count,
                "tick completed"
            );
        }
    }
}

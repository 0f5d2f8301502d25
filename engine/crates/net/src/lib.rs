pub mod channels;
pub mod connection;
pub mod connection_set;
pub mod error;
pub mod framing;
pub mod protocol;
pub mod rate_limiter;
mod server;
pub mod status_page;

pub use connection::Connection;
pub use connection_set::{ConnectionSet, NetSettings};
pub use error::{NetError, TransportError};
pub use protocol::{ClientMessage, LobbyWire, ProtocolError, ServerMessage};
pub use rate_limiter::ConnectionLimits;

use session::ConnectionKey;

/// Outbound side of the transport as seen by message handlers.
///
/// Handlers are synchronous; implementations must not block beyond a
/// bounded retry.
pub trait Outbox {
    /// Queue one payload for `key`.
    fn send(&mut self, key: ConnectionKey, payload: String) -> Result<(), TransportError>;

    /// Mark `key` for close. Unknown keys are ignored.
    fn kick(&mut self, key: ConnectionKey);
}

//! Paired TCP/UDP transport for the game server.
//!
//! One [`Endpoint`] owns a non-blocking listener, a shared UDP socket, and every live link. It
//! runs on a single I/O thread: `service` polls, drains whatever is ready, and returns without
//! blocking past its timeout. TCP frames are 4-byte big-endian length-prefixed; UDP carries one
//! packet per datagram with no retransmission.

mod endpoint;
mod error;
mod link;

pub use endpoint::{Channel, Endpoint, NetEvent, Outbound, SessionId};
pub use error::{ErrorKind, ErrorUtils, NetworkError};

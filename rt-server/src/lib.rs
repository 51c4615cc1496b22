//! Wires the I/O thread and the simulation thread together into a running game server.
//!
//! Split into a library so integration tests can spin up a real [`server::run`] instance bound to
//! an ephemeral port, rather than shelling out to the binary.

pub mod config;
pub mod error;
pub mod logging;
pub mod server;

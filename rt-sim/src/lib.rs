//! Fixed-timestep game simulation: owns the ECS, session table, and room manager, and turns
//! inbound [`rt_net::NetEvent`]s into opcode-dispatched state changes plus outbound packets.

mod components;
mod error;
mod simulation;
mod systems;

pub use components::{
    BoundingBox, Damage, EntityKind, Health, Lifetime, NetId, OwnedBy, Position, RoomId, Velocity, Weapon,
};
pub use error::SimError;
pub use simulation::{Simulation, BASE_SPEED};

//! Client-side mirror ECS: applies inbound packets on a local [`rt_ecs::Registry`] and exposes
//! scene-level accessors (login state, room list, chat history, HUD fields).

mod components;
mod state;
mod sync;

pub use components::{Rotation, SpriteSize};
pub use state::{AmmoStatus, ChatHistory, ChatLine, ClientState};
pub use sync::{build_ping, ClientSync};

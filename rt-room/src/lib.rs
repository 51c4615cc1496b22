//! Room and matchmaking state machine: a singleton lobby, public rooms, ready-gating, and
//! per-room ban lists.

mod error;
mod room;
mod room_manager;

pub use error::RoomError;
pub use room::{Room, RoomState, RoomType};
pub use room_manager::{CreateRoomParams, JoinOutcome, RoomManager, LOBBY_ID};

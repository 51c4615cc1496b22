//! Binary wire protocol for the game server: header framing, opcodes, and payload structs.
//!
//! A [`Packet`] is a [`Header`] plus a mutable body buffer and a read cursor. Header integers are
//! big-endian on the wire; body payload fields are little-endian POD, with length-prefixed
//! strings and vectors for variable-size data.

mod error;
mod header;
mod opcode;
mod packet;
mod payload;

pub use error::CodecError;
pub use header::{Header, HEADER_SIZE, MAGIC_NUMBER};
pub use opcode::OpCode;
pub use packet::{Packet, Pod, MAX_BODY_SIZE, MAX_STRING_SIZE, MAX_VECTOR_SIZE};
pub use payload::{
    AmmoUpdatePayload, BooleanPayload, ConnectPayload, CreateRoomPayload, DebugModePayload,
    EntityDeathPayload, EntitySnapshotPayload, EntitySpawnPayload, InputPayload, JoinRoomPayload,
    LoginPayload, LoginResponsePayload, Payload, PingPayload, RegisterPayload,
    RegisterResponsePayload, RoomChatPayload, RoomChatReceivedPayload, RoomInfo,
    RoomSnapshotPayload, SetReadyPayload, Vec2,
};

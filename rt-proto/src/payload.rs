use crate::error::CodecError;
use crate::packet::Packet;

/// 2D vector with `f32` components, written as two consecutive little-endian floats.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Vec2 {
        Vec2 { x, y }
    }

    fn write(self, p: &mut Packet) {
        p.write_pod(self.x).write_pod(self.y);
    }

    fn read(p: &mut Packet) -> Result<Vec2, CodecError> {
        Ok(Vec2 { x: p.read_pod()?, y: p.read_pod()? })
    }
}

/// A payload type that can serialize itself into / out of a packet body.
pub trait Payload: Sized {
    fn encode(&self, p: &mut Packet) -> Result<(), CodecError>;
    fn decode(p: &mut Packet) -> Result<Self, CodecError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectPayload {
    pub session_id: u32,
}

impl Payload for ConnectPayload {
    fn encode(&self, p: &mut Packet) -> Result<(), CodecError> {
        p.write_pod(self.session_id);
        Ok(())
    }
    fn decode(p: &mut Packet) -> Result<Self, CodecError> {
        Ok(ConnectPayload { session_id: p.read_pod()? })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BooleanPayload {
    pub status: u8,
}

impl Payload for BooleanPayload {
    fn encode(&self, p: &mut Packet) -> Result<(), CodecError> {
        p.write_pod(self.status);
        Ok(())
    }
    fn decode(p: &mut Packet) -> Result<Self, CodecError> {
        Ok(BooleanPayload { status: p.read_pod()? })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoginPayload {
    pub username: String,
    pub password: String,
}

impl Payload for LoginPayload {
    fn encode(&self, p: &mut Packet) -> Result<(), CodecError> {
        p.write_fixed_str(&self.username, 32);
        p.write_fixed_str(&self.password, 32);
        Ok(())
    }
    fn decode(p: &mut Packet) -> Result<Self, CodecError> {
        Ok(LoginPayload { username: p.read_fixed_str(32)?, password: p.read_fixed_str(32)? })
    }
}

pub type RegisterPayload = LoginPayload;

#[derive(Debug, Clone, PartialEq)]
pub struct LoginResponsePayload {
    pub success: u8,
    pub username: String,
}

impl Payload for LoginResponsePayload {
    fn encode(&self, p: &mut Packet) -> Result<(), CodecError> {
        p.write_pod(self.success);
        p.write_fixed_str(&self.username, 32);
        Ok(())
    }
    fn decode(p: &mut Packet) -> Result<Self, CodecError> {
        Ok(LoginResponsePayload { success: p.read_pod()?, username: p.read_fixed_str(32)? })
    }
}

pub type RegisterResponsePayload = LoginResponsePayload;

#[derive(Debug, Clone, PartialEq)]
pub struct RoomInfo {
    pub room_id: u32,
    pub room_name: String,
    pub current_players: u32,
    pub max_players: u32,
    pub in_game: u8,
    pub difficulty: f32,
    pub speed: f32,
    pub duration: u32,
    pub seed: u32,
    pub level_id: u32,
}

impl Payload for RoomInfo {
    fn encode(&self, p: &mut Packet) -> Result<(), CodecError> {
        p.write_pod(self.room_id);
        p.write_fixed_str(&self.room_name, 64);
        p.write_pod(self.current_players);
        p.write_pod(self.max_players);
        p.write_pod(self.in_game);
        p.write_pod(self.difficulty);
        p.write_pod(self.speed);
        p.write_pod(self.duration);
        p.write_pod(self.seed);
        p.write_pod(self.level_id);
        Ok(())
    }
    fn decode(p: &mut Packet) -> Result<Self, CodecError> {
        Ok(RoomInfo {
            room_id: p.read_pod()?,
            room_name: p.read_fixed_str(64)?,
            current_players: p.read_pod()?,
            max_players: p.read_pod()?,
            in_game: p.read_pod()?,
            difficulty: p.read_pod()?,
            speed: p.read_pod()?,
            duration: p.read_pod()?,
            seed: p.read_pod()?,
            level_id: p.read_pod()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateRoomPayload {
    pub room_name: String,
    pub max_players: u32,
    pub difficulty: f32,
    pub speed: f32,
    pub level_id: u32,
    pub seed: u32,
    pub duration: u32,
}

impl Payload for CreateRoomPayload {
    fn encode(&self, p: &mut Packet) -> Result<(), CodecError> {
        p.write_fixed_str(&self.room_name, 64);
        p.write_pod(self.max_players);
        p.write_pod(self.difficulty);
        p.write_pod(self.speed);
        p.write_pod(self.level_id);
        p.write_pod(self.seed);
        p.write_pod(self.duration);
        Ok(())
    }
    fn decode(p: &mut Packet) -> Result<Self, CodecError> {
        Ok(CreateRoomPayload {
            room_name: p.read_fixed_str(64)?,
            max_players: p.read_pod()?,
            difficulty: p.read_pod()?,
            speed: p.read_pod()?,
            level_id: p.read_pod()?,
            seed: p.read_pod()?,
            duration: p.read_pod()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoinRoomPayload {
    pub room_id: u32,
    pub is_spectator: u8,
}

impl Payload for JoinRoomPayload {
    fn encode(&self, p: &mut Packet) -> Result<(), CodecError> {
        p.write_pod(self.room_id);
        p.write_pod(self.is_spectator);
        Ok(())
    }
    fn decode(p: &mut Packet) -> Result<Self, CodecError> {
        Ok(JoinRoomPayload { room_id: p.read_pod()?, is_spectator: p.read_pod()? })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoomSnapshotPayload {
    pub room_id: u32,
    pub current_players: u32,
    pub server_tick: u32,
    pub entity_count: u16,
    pub in_game: u8,
}

impl Payload for RoomSnapshotPayload {
    fn encode(&self, p: &mut Packet) -> Result<(), CodecError> {
        p.write_pod(self.room_id);
        p.write_pod(self.current_players);
        p.write_pod(self.server_tick);
        p.write_pod(self.entity_count);
        p.write_pod(self.in_game);
        Ok(())
    }
    fn decode(p: &mut Packet) -> Result<Self, CodecError> {
        Ok(RoomSnapshotPayload {
            room_id: p.read_pod()?,
            current_players: p.read_pod()?,
            server_tick: p.read_pod()?,
            entity_count: p.read_pod()?,
            in_game: p.read_pod()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetReadyPayload {
    pub is_ready: u8,
}

impl Payload for SetReadyPayload {
    fn encode(&self, p: &mut Packet) -> Result<(), CodecError> {
        p.write_pod(self.is_ready);
        Ok(())
    }
    fn decode(p: &mut Packet) -> Result<Self, CodecError> {
        Ok(SetReadyPayload { is_ready: p.read_pod()? })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoomChatPayload {
    pub message: String,
}

impl Payload for RoomChatPayload {
    fn encode(&self, p: &mut Packet) -> Result<(), CodecError> {
        p.write_fixed_str(&self.message, 256);
        Ok(())
    }
    fn decode(p: &mut Packet) -> Result<Self, CodecError> {
        Ok(RoomChatPayload { message: p.read_fixed_str(256)? })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoomChatReceivedPayload {
    pub session_id: u32,
    pub username: String,
    pub message: String,
}

impl Payload for RoomChatReceivedPayload {
    fn encode(&self, p: &mut Packet) -> Result<(), CodecError> {
        p.write_pod(self.session_id);
        p.write_fixed_str(&self.username, 32);
        p.write_fixed_str(&self.message, 256);
        Ok(())
    }
    fn decode(p: &mut Packet) -> Result<Self, CodecError> {
        Ok(RoomChatReceivedPayload {
            session_id: p.read_pod()?,
            username: p.read_fixed_str(32)?,
            message: p.read_fixed_str(256)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntitySnapshotPayload {
    pub net_id: u32,
    pub position: Vec2,
    pub velocity: Vec2,
    pub rotation: f32,
}

impl Payload for EntitySnapshotPayload {
    fn encode(&self, p: &mut Packet) -> Result<(), CodecError> {
        p.write_pod(self.net_id);
        self.position.write(p);
        self.velocity.write(p);
        p.write_pod(self.rotation);
        Ok(())
    }
    fn decode(p: &mut Packet) -> Result<Self, CodecError> {
        Ok(EntitySnapshotPayload {
            net_id: p.read_pod()?,
            position: Vec2::read(p)?,
            velocity: Vec2::read(p)?,
            rotation: p.read_pod()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntitySpawnPayload {
    pub net_id: u32,
    pub entity_type: u8,
    pub pos_x: f32,
    pub pos_y: f32,
    pub size_x: f32,
    pub size_y: f32,
}

impl Payload for EntitySpawnPayload {
    fn encode(&self, p: &mut Packet) -> Result<(), CodecError> {
        p.write_pod(self.net_id);
        p.write_pod(self.entity_type);
        p.write_pod(self.pos_x);
        p.write_pod(self.pos_y);
        p.write_pod(self.size_x);
        p.write_pod(self.size_y);
        Ok(())
    }
    fn decode(p: &mut Packet) -> Result<Self, CodecError> {
        Ok(EntitySpawnPayload {
            net_id: p.read_pod()?,
            entity_type: p.read_pod()?,
            pos_x: p.read_pod()?,
            pos_y: p.read_pod()?,
            size_x: p.read_pod()?,
            size_y: p.read_pod()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityDeathPayload {
    pub net_id: u32,
    pub entity_type: u8,
    pub position: Vec2,
}

impl Payload for EntityDeathPayload {
    fn encode(&self, p: &mut Packet) -> Result<(), CodecError> {
        p.write_pod(self.net_id);
        p.write_pod(self.entity_type);
        self.position.write(p);
        Ok(())
    }
    fn decode(p: &mut Packet) -> Result<Self, CodecError> {
        Ok(EntityDeathPayload {
            net_id: p.read_pod()?,
            entity_type: p.read_pod()?,
            position: Vec2::read(p)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmmoUpdatePayload {
    pub current: u16,
    pub max: u16,
    pub is_reloading: u8,
    pub cooldown_remaining: f32,
}

impl Payload for AmmoUpdatePayload {
    fn encode(&self, p: &mut Packet) -> Result<(), CodecError> {
        p.write_pod(self.current);
        p.write_pod(self.max);
        p.write_pod(self.is_reloading);
        p.write_pod(self.cooldown_remaining);
        Ok(())
    }
    fn decode(p: &mut Packet) -> Result<Self, CodecError> {
        Ok(AmmoUpdatePayload {
            current: p.read_pod()?,
            max: p.read_pod()?,
            is_reloading: p.read_pod()?,
            cooldown_remaining: p.read_pod()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PingPayload {
    pub client_time_ms: u64,
}

impl Payload for PingPayload {
    fn encode(&self, p: &mut Packet) -> Result<(), CodecError> {
        p.write_pod(self.client_time_ms);
        Ok(())
    }
    fn decode(p: &mut Packet) -> Result<Self, CodecError> {
        Ok(PingPayload { client_time_ms: p.read_pod()? })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugModePayload {
    pub enabled: u8,
}

impl Payload for DebugModePayload {
    fn encode(&self, p: &mut Packet) -> Result<(), CodecError> {
        p.write_pod(self.enabled);
        Ok(())
    }
    fn decode(p: &mut Packet) -> Result<Self, CodecError> {
        Ok(DebugModePayload { enabled: p.read_pod()? })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputPayload {
    pub input_mask: u8,
}

impl InputPayload {
    pub const UP: u8 = 1 << 0;
    pub const DOWN: u8 = 1 << 1;
    pub const LEFT: u8 = 1 << 2;
    pub const RIGHT: u8 = 1 << 3;
    pub const SHOOT: u8 = 1 << 4;
}

impl Payload for InputPayload {
    fn encode(&self, p: &mut Packet) -> Result<(), CodecError> {
        p.write_pod(self.input_mask);
        Ok(())
    }
    fn decode(p: &mut Packet) -> Result<Self, CodecError> {
        Ok(InputPayload { input_mask: p.read_pod()? })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::OpCode;

    fn round_trip<T: Payload + PartialEq + std::fmt::Debug>(op: OpCode, value: T) {
        let mut p = Packet::new(op);
        value.encode(&mut p).unwrap();
        let bytes = p.serialize();
        let mut back = Packet::deserialize(&bytes).unwrap();
        assert_eq!(T::decode(&mut back).unwrap(), value);
    }

    #[test]
    fn login_payload_round_trip() {
        round_trip(
            OpCode::LoginRequest,
            LoginPayload { username: "bob".into(), password: "hunter2".into() },
        );
    }

    #[test]
    fn room_snapshot_round_trip() {
        round_trip(
            OpCode::RoomUpdate,
            RoomSnapshotPayload {
                room_id: 3,
                current_players: 2,
                server_tick: 900,
                entity_count: 2,
                in_game: 1,
            },
        );
    }

    #[test]
    fn entity_snapshot_round_trip() {
        round_trip(
            OpCode::EntitySpawn,
            EntitySnapshotPayload {
                net_id: 5,
                position: Vec2::new(1.0, 2.0),
                velocity: Vec2::new(0.5, -0.5),
                rotation: 90.0,
            },
        );
    }

    #[test]
    fn input_mask_bits() {
        let up_right = InputPayload::UP | InputPayload::RIGHT;
        round_trip(OpCode::InputTick, InputPayload { input_mask: up_right });
    }
}

use crate::error::CodecError;

/// One byte identifying the kind of packet body that follows the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    None = 0x00,

    Hello = 0x01,
    Welcome = 0x02,
    Disconnect = 0x03,

    ListRooms = 0x04,
    RoomList = 0x05,
    CreateRoom = 0x06,
    JoinRoom = 0x07,
    LeaveRoom = 0x08,
    RoomUpdate = 0x09,
    SetReady = 0x0A,
    RoomChatSent = 0x0B,
    RoomChatReceived = 0x0C,
    StartGame = 0x0D,

    InputTick = 0x10,

    LoginRequest = 0x1A,
    RegisterRequest = 0x1B,

    EntitySpawn = 0x21,
    EntityDeath = 0x22,
    AmmoUpdate = 0x23,
    Ping = 0x24,
    Pong = 0x25,
    DebugModeUpdate = 0x26,
    Kicked = 0x27,

    LoginResponse = 0x9A,
    RegisterResponse = 0x9B,
}

impl OpCode {
    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for OpCode {
    type Error = CodecError;

    fn try_from(byte: u8) -> Result<OpCode, CodecError> {
        use OpCode::*;
        Ok(match byte {
            0x00 => None,
            0x01 => Hello,
            0x02 => Welcome,
            0x03 => Disconnect,
            0x04 => ListRooms,
            0x05 => RoomList,
            0x06 => CreateRoom,
            0x07 => JoinRoom,
            0x08 => LeaveRoom,
            0x09 => RoomUpdate,
            0x0A => SetReady,
            0x0B => RoomChatSent,
            0x0C => RoomChatReceived,
            0x0D => StartGame,
            0x10 => InputTick,
            0x1A => LoginRequest,
            0x1B => RegisterRequest,
            0x21 => EntitySpawn,
            0x22 => EntityDeath,
            0x23 => AmmoUpdate,
            0x24 => Ping,
            0x25 => Pong,
            0x26 => DebugModeUpdate,
            0x27 => Kicked,
            0x9A => LoginResponse,
            0x9B => RegisterResponse,
            other => return Err(CodecError::OpCodeUnknown(other)),
        })
    }
}

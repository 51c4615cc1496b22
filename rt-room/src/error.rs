use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum RoomError {
    #[error("room not found")]
    RoomNotFound,
    #[error("room is full")]
    RoomFull,
    #[error("room already in game")]
    RoomAlreadyInGame,
    #[error("session is banned from this room")]
    SessionBanned,
}

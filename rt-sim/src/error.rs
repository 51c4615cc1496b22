use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Auth(#[from] rt_session::AuthError),
    #[error(transparent)]
    Room(#[from] rt_room::RoomError),
    #[error(transparent)]
    Codec(#[from] rt_proto::CodecError),
}

use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum CodecError {
    #[error("bad magic number")]
    InvalidMagic,
    #[error("body exceeds maximum size")]
    BodyTooLarge,
    #[error("string exceeds maximum size")]
    StringTooLarge,
    #[error("vector exceeds maximum size")]
    VectorTooLarge,
    #[error("read past end of body")]
    OutOfBounds,
    #[error("unknown opcode {0:#04x}")]
    OpCodeUnknown(u8),
}

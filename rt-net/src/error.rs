use thiserror::Error;

/// Transport-level failure. `Wait` means "no progress right now, not an error" and should never
/// be logged as a failure; `Fatal` carries an [`ErrorKind`] worth surfacing.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("would block")]
    Wait,
    #[error("{0}")]
    Fatal(#[from] ErrorKind),
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("failed to bind socket: {0}")]
    SocketBindFailed(std::io::Error),
    #[error("failed to accept connection: {0}")]
    SocketAcceptFailed(std::io::Error),
    #[error("unknown session {0}")]
    SessionNotFound(u32),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub trait ErrorUtils {
    fn has_failed(&self) -> bool;
}

impl<T> ErrorUtils for Result<T, NetworkError> {
    fn has_failed(&self) -> bool {
        matches!(self, Err(NetworkError::Fatal(_)))
    }
}

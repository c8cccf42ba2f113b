use thiserror::Error;

use crate::rooms::{ConnId, RoomId};

pub type RoomResult<T> = Result<T, RoomError>;

/// Failures of the room manager. None of these are fatal to the process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error("room {0} does not exist")]
    RoomNotFound(RoomId),
    #[error("room name {0:?} already exists")]
    DuplicateName(String),
    #[error("invalid password")]
    InvalidPassword,
    /// The recipient's socket side is gone. Reported per recipient and skipped.
    #[error("failed to send to connection {0}")]
    SendFailed(ConnId),
}

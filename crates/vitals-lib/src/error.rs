use crate::channel::ChannelId;
use thiserror::Error;

/// Recoverable engine errors. A failed operation leaves all session
/// state unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid signal buffer: {0}")]
    InvalidBuffer(&'static str),
    #[error("no channel with id {0}")]
    ChannelNotFound(ChannelId),
    #[error("channel name {0:?} already in use")]
    DuplicateName(String),
    #[error("no session selected")]
    NoSessionSelected,
}

pub type Result<T> = std::result::Result<T, EngineError>;

use std::path::PathBuf;

use crate::channel::ChannelState;

/// Errors raised when talking to the realtime channel
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// `send` was called while the channel was connecting or already closed
    #[error("WebSocket is not open ({state})")]
    NotOpen { state: ChannelState },
    /// The transport task dropped its end of the link
    #[error("WebSocket transport has shut down")]
    TransportGone,
}

/// Errors that fail a single upload
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The selected file could not be read from disk
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The request never produced a response
    #[error("upload request failed: {0}")]
    Transport(String),
    /// The endpoint answered with a non-success status
    #[error("upload endpoint returned status {0}")]
    Status(u16),
    /// The response body was not a usable reply
    #[error("could not decode upload response: {0}")]
    Decode(String),
}

/// Errors surfaced by [`crate::SessionHandle`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("session actor is gone")]
    ActorGone,
    #[error("session actor didn't respond")]
    NoResponse,
}

use tokio::sync::mpsc;

use crate::error::UploadError;
use crate::protocol::AgentReply;
use crate::upload::UploadId;

/// Lifecycle and data events reported by a channel transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Handshake completed
    Opened,
    /// One inbound text frame, in arrival order
    Frame(String),
    /// The connection ended, or never opened
    Closed,
}

/// Everything that can reach the controller from outside a user action
#[derive(Debug)]
pub enum SessionEvent {
    Channel(ChannelEvent),
    UploadFinished {
        id: UploadId,
        outcome: Result<AgentReply, UploadError>,
    },
}

impl From<ChannelEvent> for SessionEvent {
    fn from(event: ChannelEvent) -> Self {
        SessionEvent::Channel(event)
    }
}

/// Queue feeding the single writer of the message log
pub type EventSender = mpsc::UnboundedSender<SessionEvent>;

use std::fmt;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::ChannelError;
use crate::event::{ChannelEvent, EventSender};
use crate::log::Notice;
use crate::protocol::{OutboundFrame, frame_text};

/// Lifecycle of one channel instance. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelState {
    Connecting,
    Open,
    Closed,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelState::Connecting => write!(f, "connecting"),
            ChannelState::Open => write!(f, "open"),
            ChannelState::Closed => write!(f, "closed"),
        }
    }
}

/// Commands the session sends to the transport task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelCommand {
    /// Transmit one serialized text frame
    Send(String),
    /// Close the connection and release the socket
    Close,
}

/// Outbound half of a channel; the transport holds the matching receiver
#[derive(Debug, Clone)]
pub struct ChannelLink {
    sender: mpsc::UnboundedSender<ChannelCommand>,
}

impl ChannelLink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ChannelCommand>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

/// Opens a realtime channel.
///
/// Implementations start connecting in the background, report
/// [`ChannelEvent`]s on `events` (exactly one `Closed` at the end, whether
/// or not the handshake succeeded) and act on the commands arriving through
/// the returned link.
pub trait Connector {
    fn connect(&self, events: EventSender) -> ChannelLink;
}

/// Session-side view of the realtime channel
#[derive(Debug)]
pub struct ChannelSession {
    state: ChannelState,
    link: ChannelLink,
}

impl ChannelSession {
    /// Initiate the channel. The session starts out `Connecting`.
    pub fn open(connector: &dyn Connector, events: EventSender) -> Self {
        let link = connector.connect(events);
        debug!("channel connecting");
        Self {
            state: ChannelState::Connecting,
            link,
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn handle(&mut self, event: ChannelEvent) -> Option<Notice> {
        match event {
            ChannelEvent::Opened => self.on_open(),
            ChannelEvent::Frame(raw) => self.on_message(&raw),
            ChannelEvent::Closed => self.on_close(),
        }
    }

    pub fn on_open(&mut self) -> Option<Notice> {
        if self.state != ChannelState::Connecting {
            debug!(state = %self.state, "ignoring open event");
            return None;
        }
        self.state = ChannelState::Open;
        info!("channel open");
        Some(Notice::system("WebSocket connected"))
    }

    pub fn on_message(&mut self, raw: &str) -> Option<Notice> {
        if self.state != ChannelState::Open {
            debug!(state = %self.state, bytes = raw.len(), "ignoring frame outside open state");
            return None;
        }
        Some(Notice::agent(frame_text(raw)))
    }

    pub fn on_close(&mut self) -> Option<Notice> {
        if self.state == ChannelState::Closed {
            return None;
        }
        self.state = ChannelState::Closed;
        info!("channel closed");
        Some(Notice::system("WebSocket disconnected"))
    }

    /// Serialize `content` as an outbound frame and queue it for the transport.
    pub fn send(&self, content: &str) -> Result<(), ChannelError> {
        if self.state != ChannelState::Open {
            return Err(ChannelError::NotOpen { state: self.state });
        }
        let json = OutboundFrame::new(content).to_json();
        self.link
            .sender
            .send(ChannelCommand::Send(json))
            .map_err(|_| ChannelError::TransportGone)
    }

    /// Ask the transport to close. The state moves once it reports `Closed`.
    pub fn close(&self) {
        if self.state == ChannelState::Closed {
            return;
        }
        debug!(state = %self.state, "requesting channel close");
        let _ = self.link.sender.send(ChannelCommand::Close);
    }
}

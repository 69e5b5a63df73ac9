//! In-memory stand-ins for the channel and upload transports.

use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::{mpsc, oneshot};

use crate::channel::{ChannelCommand, ChannelLink, Connector};
use crate::error::UploadError;
use crate::event::{ChannelEvent, EventSender};
use crate::log::LogEntry;
use crate::protocol::AgentReply;
use crate::upload::{UploadFile, Uploader};

#[derive(Default)]
struct FakeChannel {
    commands: Option<mpsc::UnboundedReceiver<ChannelCommand>>,
    events: Option<EventSender>,
    connects: usize,
}

/// Connector that never touches the network. Tests play the server side:
/// `emit` injects transport events and `try_next_command` reads what the
/// session asked the transport to do.
#[derive(Default)]
pub struct FakeConnector {
    inner: Mutex<FakeChannel>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect_count(&self) -> usize {
        self.inner.lock().unwrap().connects
    }

    pub fn emit(&self, event: ChannelEvent) {
        let inner = self.inner.lock().unwrap();
        inner
            .events
            .as_ref()
            .expect("connect() not called")
            .send(event.into())
            .expect("event receiver dropped");
    }

    pub fn try_next_command(&mut self) -> Option<ChannelCommand> {
        self.inner
            .get_mut()
            .unwrap()
            .commands
            .as_mut()?
            .try_recv()
            .ok()
    }
}

impl Connector for FakeConnector {
    fn connect(&self, events: EventSender) -> ChannelLink {
        let (link, commands) = ChannelLink::new();
        let mut inner = self.inner.lock().unwrap();
        inner.commands = Some(commands);
        inner.events = Some(events);
        inner.connects += 1;
        link
    }
}

type Outcome = Result<AgentReply, UploadError>;

/// Uploader whose exchanges finish only when the test releases them.
#[derive(Default)]
pub struct GatedUploader {
    gates: Mutex<HashMap<String, oneshot::Receiver<Outcome>>>,
}

impl GatedUploader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the outcome channel for uploads of `file_name`.
    pub fn gate(&self, file_name: &str) -> oneshot::Sender<Outcome> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(file_name.to_string(), rx);
        tx
    }
}

impl Uploader for GatedUploader {
    fn upload(&self, file: UploadFile) -> BoxFuture<'static, Outcome> {
        let gate = self.gates.lock().unwrap().remove(&file.name);
        Box::pin(async move {
            match gate {
                Some(rx) => rx
                    .await
                    .unwrap_or_else(|_| Err(UploadError::Transport("gate dropped".into()))),
                None => Err(UploadError::Transport(format!("no gate for {}", file.name))),
            }
        })
    }
}

pub fn texts(entries: &[LogEntry]) -> Vec<String> {
    entries.iter().map(|e| e.text.clone()).collect()
}

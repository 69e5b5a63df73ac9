use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::channel::{ChannelSession, ChannelState, Connector};
use crate::event::{EventSender, SessionEvent};
use crate::log::{MessageLog, Notice, Origin, Snapshot};
use crate::upload::{UploadFile, UploadId, UploadTask, Uploader};

/// What a renderer needs to draw the session
#[derive(Debug, Clone)]
pub struct SessionView {
    pub entries: Snapshot,
    pub channel_state: ChannelState,
}

impl Default for SessionView {
    fn default() -> Self {
        Self {
            entries: Arc::from(Vec::new()),
            channel_state: ChannelState::Connecting,
        }
    }
}

/// Owns the message log and is its only writer.
///
/// User actions and transport events both end up here; every change is
/// published to [`SessionController::subscribe`] observers.
pub struct SessionController {
    log: MessageLog,
    channel: ChannelSession,
    uploads: BTreeMap<UploadId, UploadTask>,
    uploader: Arc<dyn Uploader>,
    events: EventSender,
    next_upload_id: u64,
    view_tx: watch::Sender<SessionView>,
}

impl SessionController {
    /// Create the controller and open its channel.
    ///
    /// Transport events must be fed back through [`Self::handle_event`] from
    /// the receiving end of `events`.
    pub fn new(
        connector: &dyn Connector,
        uploader: Arc<dyn Uploader>,
        events: EventSender,
    ) -> Self {
        let channel = ChannelSession::open(connector, events.clone());
        let (view_tx, _) = watch::channel(SessionView::default());
        Self {
            log: MessageLog::new(),
            channel,
            uploads: BTreeMap::new(),
            uploader,
            events,
            next_upload_id: 0,
            view_tx,
        }
    }

    /// Echo the trimmed text locally, then send it over the channel.
    ///
    /// Blank input is ignored. The echo stays in the log even if the send
    /// fails; the failure is logged as a system entry after it.
    pub fn submit_text(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        self.log.append(Origin::User, format!("You: {text}"));
        if let Err(e) = self.channel.send(text) {
            warn!(error = %e, "message not sent");
            self.log.append(Origin::System, format!("Message not sent: {e}"));
        }
        self.publish();
    }

    /// Start uploading `file`. `None` (nothing selected) is ignored.
    pub fn submit_file(&mut self, file: Option<UploadFile>) {
        let Some(file) = file else {
            return;
        };
        let id = UploadId(self.next_upload_id);
        self.next_upload_id += 1;

        let (task, notice) = UploadTask::start(id, file, &self.uploader, &self.events);
        self.uploads.insert(id, task);
        self.append(notice);
        self.publish();
    }

    pub fn handle_event(&mut self, event: SessionEvent) {
        let notice = match event {
            SessionEvent::Channel(event) => self.channel.handle(event),
            SessionEvent::UploadFinished { id, outcome } => match self.uploads.remove(&id) {
                Some(mut task) => Some(task.resolve(outcome)),
                None => {
                    debug!(upload_id = %id, "completion for unknown upload");
                    None
                }
            },
        };
        if let Some(notice) = notice {
            self.append(notice);
        }
        self.publish();
    }

    pub fn snapshot(&self) -> Snapshot {
        self.log.snapshot()
    }

    pub fn channel_state(&self) -> ChannelState {
        self.channel.state()
    }

    /// Uploads still waiting for a response, in submission order
    pub fn pending_uploads(&self) -> impl Iterator<Item = &UploadTask> {
        self.uploads.values()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view_tx.subscribe()
    }

    /// Release the channel. Further events are still accepted until it
    /// reports closed.
    pub fn shutdown(&mut self) {
        self.channel.close();
    }

    fn append(&mut self, notice: Notice) {
        self.log.append(notice.origin, notice.text);
    }

    fn publish(&self) {
        self.view_tx.send_replace(SessionView {
            entries: self.log.snapshot(),
            channel_state: self.channel.state(),
        });
    }
}

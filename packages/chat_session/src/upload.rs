use futures::future::BoxFuture;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::UploadError;
use crate::event::{EventSender, SessionEvent};
use crate::log::Notice;
use crate::protocol::AgentReply;

/// Identifies one in-flight upload within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UploadId(pub u64);

impl fmt::Display for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "upload-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Pending,
    Succeeded,
    Failed,
}

/// A file the user picked for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub path: PathBuf,
}

impl UploadFile {
    /// Build from a path, using its final component as the file name.
    ///
    /// Returns `None` for paths without a file name (`/`, `..`, empty).
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let name = path.file_name()?.to_string_lossy().into_owned();
        Some(Self { name, path })
    }
}

/// Performs one upload exchange against the agent server
pub trait Uploader: Send + Sync + 'static {
    fn upload(&self, file: UploadFile) -> BoxFuture<'static, Result<AgentReply, UploadError>>;
}

/// One file transfer, from submission until its outcome is logged
#[derive(Debug, Clone, PartialEq)]
pub struct UploadTask {
    pub id: UploadId,
    pub file_name: String,
    pub state: UploadState,
    pub result: Option<String>,
}

impl UploadTask {
    /// Begin an upload without waiting for it.
    ///
    /// Returns the pending task together with the "Uploading" notice, which
    /// the caller must log before it processes any further events. The
    /// outcome arrives later as [`SessionEvent::UploadFinished`].
    pub fn start(
        id: UploadId,
        file: UploadFile,
        uploader: &Arc<dyn Uploader>,
        events: &EventSender,
    ) -> (Self, Notice) {
        let task = UploadTask {
            id,
            file_name: file.name.clone(),
            state: UploadState::Pending,
            result: None,
        };
        let notice = Notice::system(format!("Uploading: {}", file.name));

        debug!(upload_id = %id, file = %file.name, "starting upload");
        let uploader = Arc::clone(uploader);
        let events = events.clone();
        tokio::spawn(async move {
            let outcome = uploader.upload(file).await;
            if events
                .send(SessionEvent::UploadFinished { id, outcome })
                .is_err()
            {
                debug!(upload_id = %id, "session gone before upload finished");
            }
        });

        (task, notice)
    }

    /// Settle the task and produce the entry describing its outcome.
    pub fn resolve(&mut self, outcome: Result<AgentReply, UploadError>) -> Notice {
        let reply_text = outcome.and_then(|reply| {
            reply
                .text()
                .ok_or_else(|| UploadError::Decode("reply has neither result nor message".into()))
        });
        match reply_text {
            Ok(text) => {
                debug!(upload_id = %self.id, file = %self.file_name, "upload succeeded");
                self.state = UploadState::Succeeded;
                self.result = Some(text.clone());
                Notice::agent(text)
            }
            Err(e) => {
                warn!(upload_id = %self.id, file = %self.file_name, error = %e, "upload failed");
                self.state = UploadState::Failed;
                Notice::system("Upload failed")
            }
        }
    }
}

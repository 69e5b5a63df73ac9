//! Chat Session - client-side state for a single agent conversation
//!
//! This crate owns the ordered message log and the lifecycle of the realtime
//! channel, and folds file-upload completions into the same log. It has no
//! socket or HTTP code: transports plug in through [`Connector`] and
//! [`Uploader`], and renderers observe [`SessionView`] snapshots.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use chat_session::{SessionActor, SessionOptions, Connector, Uploader};
//!
//! async fn run(connector: impl Connector, uploader: Arc<dyn Uploader>) {
//!     let handle = SessionActor::spawn(&connector, uploader, SessionOptions::default());
//!
//!     let mut view = handle.subscribe();
//!     handle.submit_text("hello").await.unwrap();
//!
//!     while view.changed().await.is_ok() {
//!         for entry in view.borrow_and_update().entries.iter() {
//!             println!("{}", entry.text);
//!         }
//!     }
//! }
//! ```

mod actor;
mod channel;
mod controller;
mod error;
mod event;
mod log;
pub mod protocol;
mod render;
#[cfg(test)]
mod test_support;
mod upload;

pub use actor::{SessionActor, SessionHandle, SessionOptions};
pub use channel::{ChannelCommand, ChannelLink, ChannelSession, ChannelState, Connector};
pub use controller::{SessionController, SessionView};
pub use error::{ChannelError, SessionError, UploadError};
pub use event::{ChannelEvent, EventSender, SessionEvent};
pub use log::{EntryId, LogEntry, MessageLog, Notice, Origin, Snapshot};
pub use protocol::{AgentReply, OutboundFrame};
pub use render::{Renderer, render_loop};
pub use upload::{UploadFile, UploadId, UploadState, UploadTask, Uploader};

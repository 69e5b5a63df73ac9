use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

use crate::channel::{ChannelState, Connector};
use crate::controller::{SessionController, SessionView};
use crate::error::SessionError;
use crate::event::SessionEvent;
use crate::log::Snapshot;
use crate::upload::{UploadFile, Uploader};

/// Commands that can be sent to the session actor
#[derive(Debug)]
enum SessionCommand {
    SubmitText {
        text: String,
        respond_to: oneshot::Sender<()>,
    },
    SubmitFile {
        file: Option<UploadFile>,
        respond_to: oneshot::Sender<()>,
    },
    Snapshot {
        respond_to: oneshot::Sender<Snapshot>,
    },
    ChannelState {
        respond_to: oneshot::Sender<ChannelState>,
    },
    Shutdown {
        respond_to: oneshot::Sender<()>,
    },
}

/// Options for spawning a session actor
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Capacity of the user command queue
    pub command_capacity: usize,
    /// How long shutdown waits for the transport to confirm the close
    pub shutdown_grace: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            command_capacity: 32,
            shutdown_grace: Duration::from_millis(500),
        }
    }
}

/// Handle to communicate with a session actor
#[derive(Clone)]
pub struct SessionHandle {
    sender: mpsc::Sender<SessionCommand>,
    view: watch::Receiver<SessionView>,
}

impl SessionHandle {
    /// Returns once the local echo is in the log; does not wait for the network.
    pub async fn submit_text(&self, text: &str) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.request(SessionCommand::SubmitText {
            text: text.to_string(),
            respond_to: tx,
        })
        .await?;
        rx.await.map_err(|_| SessionError::NoResponse)
    }

    /// Returns once the upload is announced in the log.
    pub async fn submit_file(&self, file: Option<UploadFile>) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.request(SessionCommand::SubmitFile {
            file,
            respond_to: tx,
        })
        .await?;
        rx.await.map_err(|_| SessionError::NoResponse)
    }

    pub async fn snapshot(&self) -> Result<Snapshot, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.request(SessionCommand::Snapshot { respond_to: tx })
            .await?;
        rx.await.map_err(|_| SessionError::NoResponse)
    }

    pub async fn channel_state(&self) -> Result<ChannelState, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.request(SessionCommand::ChannelState { respond_to: tx })
            .await?;
        rx.await.map_err(|_| SessionError::NoResponse)
    }

    /// Close the channel and stop the actor.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.request(SessionCommand::Shutdown { respond_to: tx })
            .await?;
        rx.await.map_err(|_| SessionError::NoResponse)
    }

    /// Observe every published view. The stream ends when the actor stops.
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    async fn request(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| SessionError::ActorGone)
    }
}

/// Runs a [`SessionController`] on its own task.
///
/// User commands and transport events are handled one at a time, which
/// makes this task the single point where the log is appended to.
pub struct SessionActor {
    controller: SessionController,
    commands: mpsc::Receiver<SessionCommand>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    shutdown_grace: Duration,
}

impl SessionActor {
    /// Open the channel, spawn the actor and return its handle
    pub fn spawn(
        connector: &dyn Connector,
        uploader: Arc<dyn Uploader>,
        opts: SessionOptions,
    ) -> SessionHandle {
        let (event_tx, events) = mpsc::unbounded_channel();
        let controller = SessionController::new(connector, uploader, event_tx);
        let view = controller.subscribe();

        let (sender, commands) = mpsc::channel(opts.command_capacity);
        let actor = SessionActor {
            controller,
            commands,
            events,
            shutdown_grace: opts.shutdown_grace,
        };

        tokio::spawn(async move {
            actor.run().await;
        });

        SessionHandle { sender, view }
    }

    async fn run(mut self) {
        debug!("Session actor started");
        let mut shutdown_ack = None;

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        // Every handle is gone; nobody can observe the session any more.
                        self.controller.shutdown();
                        break;
                    };
                    if let Some(respond_to) = self.handle_command(command) {
                        self.drain_until_closed().await;
                        shutdown_ack = Some(respond_to);
                        break;
                    }
                }

                Some(event) = self.events.recv() => {
                    self.controller.handle_event(event);
                }
            }
        }

        // Refuse new commands before acknowledging, so callers racing the
        // shutdown see `ActorGone`.
        self.commands.close();
        if let Some(respond_to) = shutdown_ack {
            let _ = respond_to.send(());
        }
        debug!("Session actor stopped");
    }

    /// Apply one command. Returns the responder when the command was a shutdown.
    fn handle_command(&mut self, command: SessionCommand) -> Option<oneshot::Sender<()>> {
        match command {
            SessionCommand::SubmitText { text, respond_to } => {
                self.controller.submit_text(&text);
                let _ = respond_to.send(());
            }

            SessionCommand::SubmitFile { file, respond_to } => {
                self.controller.submit_file(file);
                let _ = respond_to.send(());
            }

            SessionCommand::Snapshot { respond_to } => {
                let _ = respond_to.send(self.controller.snapshot());
            }

            SessionCommand::ChannelState { respond_to } => {
                let _ = respond_to.send(self.controller.channel_state());
            }

            SessionCommand::Shutdown { respond_to } => {
                debug!("Shutting down session");
                self.controller.shutdown();
                return Some(respond_to);
            }
        }
        None
    }

    /// Keep applying transport events until the channel reports closed or
    /// the grace period runs out.
    async fn drain_until_closed(&mut self) {
        let deadline = tokio::time::sleep(self.shutdown_grace);
        tokio::pin!(deadline);

        while self.controller.channel_state() != ChannelState::Closed {
            tokio::select! {
                Some(event) = self.events.recv() => {
                    self.controller.handle_event(event);
                }
                () = &mut deadline => {
                    debug!("channel did not confirm close within grace period");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelCommand;
    use crate::event::ChannelEvent;
    use crate::log::Origin;
    use crate::protocol::AgentReply;
    use crate::test_support::{FakeConnector, GatedUploader, texts};

    const WAIT: Duration = Duration::from_secs(5);

    fn spawn_session() -> (SessionHandle, FakeConnector, Arc<GatedUploader>) {
        let connector = FakeConnector::new();
        let uploader = Arc::new(GatedUploader::new());
        let handle = SessionActor::spawn(&connector, uploader.clone(), SessionOptions::default());
        (handle, connector, uploader)
    }

    async fn wait_for_entries(view: &mut watch::Receiver<SessionView>, count: usize) {
        tokio::time::timeout(WAIT, view.wait_for(|v| v.entries.len() >= count))
            .await
            .expect("timed out waiting for entries")
            .expect("session stopped");
    }

    async fn next_command(connector: &mut FakeConnector) -> ChannelCommand {
        tokio::time::timeout(WAIT, async {
            loop {
                if let Some(command) = connector.try_next_command() {
                    return command;
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("timed out waiting for a channel command")
    }

    #[tokio::test]
    async fn test_submit_text_echo_is_synchronous() {
        let (handle, connector, _uploader) = spawn_session();
        let mut view = handle.subscribe();
        connector.emit(ChannelEvent::Opened);
        wait_for_entries(&mut view, 1).await;

        handle.submit_text("hello").await.unwrap();

        // The echo is visible as soon as submit_text returns.
        let snapshot = handle.snapshot().await.unwrap();
        let last = snapshot.last().unwrap();
        assert_eq!(last.origin, Origin::User);
        assert_eq!(last.text, "You: hello");
        assert_eq!(handle.channel_state().await.unwrap(), ChannelState::Open);
    }

    #[tokio::test]
    async fn test_blank_text_never_sent() {
        let (handle, mut connector, _uploader) = spawn_session();
        let mut view = handle.subscribe();
        connector.emit(ChannelEvent::Opened);
        wait_for_entries(&mut view, 1).await;

        handle.submit_text("   ").await.unwrap();

        assert_eq!(handle.snapshot().await.unwrap().len(), 1);
        assert_eq!(connector.try_next_command(), None);
    }

    #[tokio::test]
    async fn test_events_and_uploads_share_one_log() {
        let (handle, connector, uploader) = spawn_session();
        let mut view = handle.subscribe();
        let gate = uploader.gate("a.txt");

        connector.emit(ChannelEvent::Opened);
        wait_for_entries(&mut view, 1).await;

        handle
            .submit_file(UploadFile::from_path("a.txt"))
            .await
            .unwrap();
        connector.emit(ChannelEvent::Frame(r#"{"message":"thinking"}"#.into()));
        wait_for_entries(&mut view, 3).await;

        gate.send(Ok(AgentReply::from_result("done"))).unwrap();
        wait_for_entries(&mut view, 4).await;

        assert_eq!(
            texts(&handle.snapshot().await.unwrap()),
            vec![
                "WebSocket connected",
                "Uploading: a.txt",
                "thinking",
                "done"
            ]
        );
    }

    #[tokio::test]
    async fn test_shutdown_closes_channel_and_stops_actor() {
        let (handle, mut connector, _uploader) = spawn_session();
        let mut view = handle.subscribe();
        connector.emit(ChannelEvent::Opened);
        wait_for_entries(&mut view, 1).await;

        let shutdown = tokio::spawn({
            let handle = handle.clone();
            async move { handle.shutdown().await }
        });
        assert_eq!(next_command(&mut connector).await, ChannelCommand::Close);
        connector.emit(ChannelEvent::Closed);
        shutdown.await.unwrap().unwrap();

        let last = view.borrow().entries.last().cloned().unwrap();
        assert_eq!(last.text, "WebSocket disconnected");
        assert_eq!(view.borrow().channel_state, ChannelState::Closed);
        assert_eq!(
            handle.submit_text("after").await,
            Err(SessionError::ActorGone)
        );
    }

    #[tokio::test]
    async fn test_shutdown_gives_up_after_grace_period() {
        let connector = FakeConnector::new();
        let uploader = Arc::new(GatedUploader::new());
        let opts = SessionOptions {
            shutdown_grace: Duration::from_millis(20),
            ..Default::default()
        };
        let handle = SessionActor::spawn(&connector, uploader, opts);

        tokio::time::timeout(WAIT, handle.shutdown())
            .await
            .expect("shutdown hung")
            .unwrap();
        assert!(handle.snapshot().await.is_err());
    }
}

//! WebSocket transport for the chat channel.
//!
//! One background task owns the socket: it performs the handshake, forwards
//! inbound text frames to the session in arrival order and writes the
//! frames the session queues on its [`ChannelLink`].

use chat_session::{ChannelCommand, ChannelEvent, ChannelLink, Connector, EventSender};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tracing::{debug, info, warn};

/// Opens the chat channel at a `ws://` or `wss://` URL
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Connector for WsConnector {
    fn connect(&self, events: EventSender) -> ChannelLink {
        let (link, commands) = ChannelLink::new();
        let url = self.url.clone();
        tokio::spawn(async move {
            run_channel(&url, &events, commands).await;
            // Exactly one Closed per connection, including failed handshakes.
            let _ = events.send(ChannelEvent::Closed.into());
        });
        link
    }
}

async fn run_channel(
    url: &str,
    events: &EventSender,
    mut commands: mpsc::UnboundedReceiver<ChannelCommand>,
) {
    debug!(%url, "connecting websocket");
    let ws_stream = match tokio_tungstenite::connect_async(url).await {
        Ok((stream, _response)) => stream,
        Err(err) => {
            warn!(%url, error = %err, "websocket handshake failed");
            return;
        }
    };

    info!(%url, "websocket connected");
    if events.send(ChannelEvent::Opened.into()).is_err() {
        return;
    }

    let (mut ws_write, mut ws_read) = ws_stream.split();

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(ChannelCommand::Send(json)) => {
                    if let Err(e) = ws_write.send(tungstenite::Message::Text(json.into())).await {
                        warn!(error = %e, "failed to send frame");
                        break;
                    }
                }
                Some(ChannelCommand::Close) | None => {
                    debug!("closing websocket");
                    let _ = ws_write.send(tungstenite::Message::Close(None)).await;
                    break;
                }
            },

            frame = ws_read.next() => match frame {
                Some(Ok(tungstenite::Message::Text(text))) => {
                    if events.send(ChannelEvent::Frame(text.as_str().to_owned()).into()).is_err() {
                        break;
                    }
                }
                Some(Ok(tungstenite::Message::Binary(data))) => {
                    let text = String::from_utf8_lossy(&data).into_owned();
                    if events.send(ChannelEvent::Frame(text).into()).is_err() {
                        break;
                    }
                }
                Some(Ok(tungstenite::Message::Close(frame))) => {
                    debug!(?frame, "server closed websocket");
                    break;
                }
                Some(Ok(_)) => {
                    // Ping/pong are answered by tungstenite itself
                }
                Some(Err(e)) => {
                    warn!(error = %e, "websocket read failed");
                    break;
                }
                None => break,
            },
        }
    }

    info!(%url, "websocket disconnected");
}

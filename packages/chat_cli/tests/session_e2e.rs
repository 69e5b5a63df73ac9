//! End-to-end session tests: a real axum agent server on a random port,
//! driven through the WebSocket connector and HTTP uploader.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Multipart;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chat_session::{
    ChannelState, Origin, SessionActor, SessionHandle, SessionOptions, SessionView, UploadFile,
};
use serde_json::{Value, json};
use tokio::sync::watch;
use tokio::time::timeout;

use chat_cli::health::check_health;
use chat_cli::{HttpUploader, WsConnector};

/// Timeout for each async operation in tests.
const TEST_TIMEOUT: Duration = Duration::from_secs(10);

async fn echo_socket(mut socket: WebSocket) {
    while let Some(Ok(msg)) = socket.recv().await {
        let Message::Text(text) = msg else {
            continue;
        };
        let reply = match serde_json::from_str::<Value>(text.as_str()) {
            Ok(frame) => json!({
                "result": format!("echo: {}", frame["content"].as_str().unwrap_or_default())
            })
            .to_string(),
            Err(_) => "plain text reply".to_string(),
        };
        if socket.send(Message::Text(reply.into())).await.is_err() {
            break;
        }
    }
}

async fn ws_handler(ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(echo_socket)
}

async fn upload_handler(mut multipart: Multipart) -> Json<Value> {
    while let Some(field) = multipart.next_field().await.unwrap() {
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await.unwrap();
        return Json(json!({ "result": format!("stored {name} ({} bytes)", data.len()) }));
    }
    Json(json!({ "message": "no file" }))
}

async fn broken_upload_handler() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Start the fake agent server on a random port.
async fn start_server() -> SocketAddr {
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/upload", post(upload_handler))
        .route("/broken", post(broken_upload_handler))
        .route("/health", get(health_handler));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn spawn_session(addr: SocketAddr, upload_path: &str) -> SessionHandle {
    let connector = WsConnector::new(format!("ws://{addr}/ws"));
    let uploader = Arc::new(HttpUploader::new(
        reqwest::Client::new(),
        format!("http://{addr}{upload_path}"),
    ));
    SessionActor::spawn(&connector, uploader, SessionOptions::default())
}

async fn wait_until(
    view: &mut watch::Receiver<SessionView>,
    what: &str,
    f: impl FnMut(&SessionView) -> bool,
) {
    timeout(TEST_TIMEOUT, view.wait_for(f))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {what}"))
        .expect("session stopped");
}

fn has_entry(view: &SessionView, origin: Origin, text: &str) -> bool {
    view.entries
        .iter()
        .any(|e| e.origin == origin && e.text == text)
}

#[tokio::test]
async fn test_chat_round_trip() {
    let addr = start_server().await;
    let session = spawn_session(addr, "/upload");
    let mut view = session.subscribe();

    wait_until(&mut view, "open", |v| v.channel_state == ChannelState::Open).await;

    session.submit_text("hello").await.unwrap();
    wait_until(&mut view, "echo", |v| has_entry(v, Origin::Agent, "echo: hello")).await;

    let texts: Vec<String> = session
        .snapshot()
        .await
        .unwrap()
        .iter()
        .map(|e| e.text.clone())
        .collect();
    assert_eq!(texts, vec!["WebSocket connected", "You: hello", "echo: hello"]);

    session.shutdown().await.unwrap();
    let last = view.borrow().entries.last().cloned().unwrap();
    assert_eq!(last.text, "WebSocket disconnected");
    assert_eq!(last.origin, Origin::System);
}

#[tokio::test]
async fn test_upload_round_trip() {
    let addr = start_server().await;
    let session = spawn_session(addr, "/upload");
    let mut view = session.subscribe();

    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("a.txt");
    std::fs::write(&path, "hello").unwrap();

    session
        .submit_file(UploadFile::from_path(&path))
        .await
        .unwrap();
    wait_until(&mut view, "upload reply", |v| {
        has_entry(v, Origin::Agent, "stored a.txt (5 bytes)")
    })
    .await;

    let snapshot = session.snapshot().await.unwrap();
    let uploading = snapshot
        .iter()
        .position(|e| e.text == "Uploading: a.txt")
        .unwrap();
    let stored = snapshot
        .iter()
        .position(|e| e.text == "stored a.txt (5 bytes)")
        .unwrap();
    assert!(uploading < stored);
    assert_eq!(snapshot[uploading].origin, Origin::System);

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_failed_upload_is_logged() {
    let addr = start_server().await;
    let session = spawn_session(addr, "/broken");
    let mut view = session.subscribe();

    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("b.txt");
    std::fs::write(&path, "data").unwrap();

    session
        .submit_file(UploadFile::from_path(&path))
        .await
        .unwrap();
    wait_until(&mut view, "upload failure", |v| {
        has_entry(v, Origin::System, "Upload failed")
    })
    .await;

    // A missing file fails the same way, without touching the server.
    session
        .submit_file(UploadFile::from_path(tmp.path().join("missing.txt")))
        .await
        .unwrap();
    wait_until(&mut view, "second failure", |v| {
        v.entries.iter().filter(|e| e.text == "Upload failed").count() == 2
    })
    .await;

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unreachable_server_closes_channel() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let session = spawn_session(addr, "/upload");
    let mut view = session.subscribe();
    wait_until(&mut view, "closed", |v| v.channel_state == ChannelState::Closed).await;

    session.submit_text("anyone?").await.unwrap();
    let texts: Vec<String> = session
        .snapshot()
        .await
        .unwrap()
        .iter()
        .map(|e| e.text.clone())
        .collect();
    assert_eq!(
        texts,
        vec![
            "WebSocket disconnected",
            "You: anyone?",
            "Message not sent: WebSocket is not open (closed)",
        ]
    );
}

#[tokio::test]
async fn test_health_probe() {
    let addr = start_server().await;
    let status = check_health(&reqwest::Client::new(), &format!("http://{addr}/health"))
        .await
        .unwrap();
    assert!(status.is_ok());
}

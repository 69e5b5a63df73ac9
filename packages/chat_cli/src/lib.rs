// Library interface for the chat client
// Exposes the concrete transports and terminal front end so they can be
// driven from integration tests as well as from the `chat` binary.

pub mod config;
pub mod error;
pub mod health;
pub mod input;
pub mod render;
pub mod transport;
pub mod upload;

pub use config::{ClientConfig, FileConfig, load_config};
pub use error::ConnectError;
pub use render::TranscriptPrinter;
pub use transport::WsConnector;
pub use upload::HttpUploader;

use chat_session::{SessionHandle, UploadFile};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

use crate::error::InputError;

/// What one line of user input asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    Text(String),
    /// `/upload <path>`; `None` when no usable path was given
    Upload(Option<UploadFile>),
    Quit,
}

pub fn parse_line(line: &str) -> InputAction {
    let trimmed = line.trim();
    if trimmed == "/quit" {
        return InputAction::Quit;
    }
    if trimmed == "/upload" {
        return InputAction::Upload(None);
    }
    if let Some(path) = trimmed.strip_prefix("/upload ") {
        let path = path.trim();
        if path.is_empty() {
            return InputAction::Upload(None);
        }
        return InputAction::Upload(UploadFile::from_path(path));
    }
    InputAction::Text(line.to_string())
}

/// Feed lines from `reader` into the session until `/quit` or end of input.
///
/// A read failure ends the loop with an error rather than as a quit.
pub async fn input_loop<R>(reader: R, session: &SessionHandle) -> Result<(), InputError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        let Some(line) = lines.next_line().await? else {
            debug!("input closed");
            return Ok(());
        };

        match parse_line(&line) {
            InputAction::Text(text) => session.submit_text(&text).await?,
            InputAction::Upload(file) => session.submit_file(file).await?,
            InputAction::Quit => return Ok(()),
        }
    }
}

use chat_session::SessionError;

/// Why a request to the agent server got no usable answer
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("agent server at {url} is not accepting connections")]
    Unavailable { url: String },

    #[error("agent server at {url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ConnectError {
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_connect() {
            return Self::Unavailable {
                url: url.to_string(),
            };
        }
        match err.status() {
            Some(status) => Self::Status {
                url: url.to_string(),
                status: status.as_u16(),
            },
            None => {
                Self::Other(anyhow::Error::new(err).context(format!("request to {url} failed")))
            }
        }
    }

    /// Exit code for `chat health`: 2 when nothing listens, 3 when the
    /// server answers with an error status, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Unavailable { .. } => 2,
            Self::Status { .. } => 3,
            Self::Other(_) => 1,
        }
    }
}

/// Why the interactive input loop stopped early
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("failed to read input: {0}")]
    Read(#[from] std::io::Error),

    #[error(transparent)]
    Session(#[from] SessionError),
}

use thiserror::Error;

/// Client-side failures. The `Display` text is what ends up after "Client error: ".
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("failed to read clipboard item: {0}")]
    Read(String),

    #[error("invalid image data: {0}")]
    Encoding(String),

    #[error("{0}")]
    Transport(String),

    #[error("unknown language '{0}'")]
    UnknownLanguage(String),

    #[error("clipboard unavailable: {0}")]
    Clipboard(String),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<reqwest::Error> for WorkflowError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() {
            WorkflowError::Transport(format!("could not reach recognition endpoint ({})", error))
        } else if error.is_timeout() {
            WorkflowError::Transport(format!("recognition endpoint timed out ({})", error))
        } else {
            WorkflowError::Transport(error.to_string())
        }
    }
}

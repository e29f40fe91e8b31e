use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum PanelError {
    #[error("Device returned HTTP {0}")]
    HttpStatus(u16),

    #[error("Event stream closed by device")]
    StreamClosed,

    #[error("Event stream stalled: no data for {0} ms")]
    StreamStalled(u64),

    #[error("No successful read from any channel for {0} ms")]
    StaleData(u64),

    #[error("Device rejected command: {0}")]
    CommandRejected(String),

    #[error(transparent)]
    HttpError(#[from] reqwest::Error),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PanelError>;

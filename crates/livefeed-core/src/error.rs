use thiserror::Error;

#[derive(Debug, Error)]
pub enum LivefeedError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },
}

impl LivefeedError {
    /// Short error code string for logs and JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            LivefeedError::Config(_) => "CONFIG_ERROR",
            LivefeedError::Io(_) => "IO_ERROR",
            LivefeedError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
        }
    }
}

pub type Result<T> = std::result::Result<T, LivefeedError>;

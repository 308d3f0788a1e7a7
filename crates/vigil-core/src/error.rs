use thiserror::Error;

/// VIGIL Core 统一错误类型
#[derive(Error, Debug)]
pub enum VigilError {
    #[error("EventBus error: {0}")]
    EventBus(String),

    #[error("Channel send error: {0}")]
    ChannelSend(String),

    #[error("Channel receive error: {0}")]
    ChannelReceive(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Rule error: {0}")]
    Rule(String),

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, VigilError>;

impl From<anyhow::Error> for VigilError {
    fn from(err: anyhow::Error) -> Self {
        VigilError::Internal(err.to_string())
    }
}

impl<T> From<tokio::sync::broadcast::error::SendError<T>> for VigilError {
    fn from(err: tokio::sync::broadcast::error::SendError<T>) -> Self {
        VigilError::ChannelSend(err.to_string())
    }
}

impl From<tokio::sync::broadcast::error::RecvError> for VigilError {
    fn from(err: tokio::sync::broadcast::error::RecvError) -> Self {
        VigilError::ChannelReceive(err.to_string())
    }
}

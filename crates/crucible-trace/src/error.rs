use thiserror::Error;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("trace writer already closed")]
    Closed,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

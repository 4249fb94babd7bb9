use thiserror::Error;

/// Errors raised while encoding or decoding authority messages.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Payload is not a JSON object.
    #[error("Malformed message: {0}")]
    Malformed(String),

    /// Payload is not valid JSON.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

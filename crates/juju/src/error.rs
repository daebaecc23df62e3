use thiserror::Error;

#[derive(Debug, Error)]
pub enum JujuError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("TLS setup failed: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("JSON serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("RPC {facade}.{request} failed: {message} ({code})")]
    Rpc {
        facade: String,
        request: String,
        code: String,
        message: String,
    },

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Connection closed")]
    Closed,
}

impl JujuError {
    /// True when the controller reported the requested entity as missing.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Rpc { code, .. } => code == "not found",
            Self::ModelNotFound(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, JujuError>;

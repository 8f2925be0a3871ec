use serde::Serialize;
use thiserror::Error;

/// Unified error type for pump lighting operations.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "kind", content = "message")]
pub enum GalahadError {
    #[error("Transport open failed: {0}")]
    TransportOpen(String),

    #[error("Transport write failed: {0}")]
    TransportWrite(String),

    #[error("Bring-up failed: {0}")]
    BringUp(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("HID error: {0}")]
    Hid(String),
}

/// Convenience Result type alias with `GalahadError`.
pub type Result<T> = std::result::Result<T, GalahadError>;

impl From<hidapi::HidError> for GalahadError {
    fn from(err: hidapi::HidError) -> Self {
        Self::Hid(err.to_string())
    }
}

impl From<GalahadError> for String {
    fn from(err: GalahadError) -> Self {
        err.to_string()
    }
}

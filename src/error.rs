//! Error types for scorecast
//!
//! A single crate-level error with conversions from the library errors the
//! pipeline and the network transport run into.

use std::fmt;
use std::io;

use crate::hub::HubError;
use crate::vision::source::FrameSourceError;

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-level error
#[derive(Debug)]
pub enum Error {
    /// I/O failure (sockets, files)
    Io(io::Error),
    /// JSON encoding or decoding failure
    Json(serde_json::Error),
    /// Image decoding failure
    Image(image::ImageError),
    /// Invalid configuration
    Config(String),
    /// Invalid reference template
    Template(String),
    /// Frame source failure
    FrameSource(FrameSourceError),
    /// Pipeline lifecycle misuse
    Pipeline(String),
    /// WebSocket transport failure
    WebSocket(tokio_tungstenite::tungstenite::Error),
    /// Broadcast hub unavailable
    Hub(HubError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Json(e) => write!(f, "JSON error: {}", e),
            Error::Image(e) => write!(f, "Image error: {}", e),
            Error::Config(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::Template(msg) => write!(f, "Invalid template: {}", msg),
            Error::FrameSource(e) => write!(f, "Frame source error: {}", e),
            Error::Pipeline(msg) => write!(f, "Pipeline error: {}", msg),
            Error::WebSocket(e) => write!(f, "WebSocket error: {}", e),
            Error::Hub(e) => write!(f, "Hub error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Json(e) => Some(e),
            Error::Image(e) => Some(e),
            Error::FrameSource(e) => Some(e),
            Error::WebSocket(e) => Some(e),
            Error::Hub(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Image(e)
    }
}

impl From<FrameSourceError> for Error {
    fn from(e: FrameSourceError) -> Self {
        Error::FrameSource(e)
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Error::WebSocket(e)
    }
}

impl From<HubError> for Error {
    fn from(e: HubError) -> Self {
        Error::Hub(e)
    }
}

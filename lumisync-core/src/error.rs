//! Error types for lumisync-core.

use thiserror::Error;

/// Main error type for the lumisync-core library.
#[derive(Error, Debug)]
pub enum Error {
    // Config errors
    #[error("Failed to load config '{0}': {1}")]
    ConfigLoad(String, String),

    #[error("Failed to parse config '{0}': {1}")]
    ConfigParse(String, String),

    #[error("Invalid configuration: {0}")]
    ConfigValidation(String),

    #[error("Missing credentials: set {0}")]
    MissingCredentials(&'static str),

    // Capture errors
    #[error("No capture backend available: {0}")]
    NoCaptureBackend(String),

    #[error("Only {expected}-band audio analysis is supported (got {got})")]
    UnsupportedBandCount { expected: usize, got: usize },

    #[error("Capture read failed: {0}")]
    CaptureRead(String),

    // Device errors
    #[error("Device not connected")]
    DeviceNotConnected,

    #[error("Device IP address is required for audio sync")]
    MissingDeviceAddress,

    #[error("Device request failed: {0}")]
    Device(#[from] tapo::Error),

    #[error("Device not found. Enter its IP and try again.")]
    DeviceNotFound,

    // Generic errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Returns true for per-tick capture failures that the engine loops
    /// absorb with a short back-off instead of terminating.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::CaptureRead(_))
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

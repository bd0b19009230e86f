use thiserror::Error;

/// Capture pipeline errors.
///
/// Rejected graph configuration is deliberately absent: the controller logs
/// it and leaves the graph unchanged.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no capture device available: {0}")]
    DeviceUnavailable(String),

    #[error("output already has a live subscriber: {0}")]
    AlreadySubscribed(String),

    #[error("capture failed: {0}")]
    CaptureFailed(String),

    #[error("{0} is no longer running")]
    Closed(&'static str),

    #[error("worker spawn failed: {0}")]
    Worker(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, CaptureError>;

//! Error types for hasta-bridge

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// hasta-bridge error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed command line (recovered locally, command skipped)
    #[error("Syntax error: {0}")]
    Syntax(String),

    /// Peer is not ready to take more bytes (previous message still draining)
    #[error("Peer not ready")]
    PeerNotReady,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Motion or speech call failed
    #[error("Actuator fault: {0}")]
    Actuator(String),

    /// Camera call failed
    #[error("Camera error: {0}")]
    Camera(String),

    /// Listening socket could not be bound
    #[error("Failed to bind to {address}: {source}")]
    Bind {
        /// Address the bind was attempted on
        address: String,
        /// Underlying socket error
        source: std::io::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unknown device type in configuration
    #[error("Unknown device type: {0}")]
    UnknownDevice(String),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Illegal connection state transition
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Outbound message exceeds the length-prefixed framing limit
    #[error("Message too large: {0} bytes")]
    MessageTooLarge(usize),

    /// Operation not supported
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// Image encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl Error {
    /// Whether this error means the peer is temporarily unable to take data
    pub fn is_transient(&self) -> bool {
        match self {
            Error::PeerNotReady => true,
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }
}

use thiserror::Error;

/// Main error type for wsduplex
#[derive(Error, Debug)]
pub enum WsDuplexError {
    /// Dial, handshake or upgrade failure, surfaced synchronously from
    /// `Client::start`
    #[error("cannot connect: {0}")]
    Connect(String),

    /// A read failed while no shutdown was requested
    #[error("cannot read message: {0}")]
    Read(String),

    /// A write failed while no shutdown was requested
    #[error("cannot send message: {0}")]
    Write(String),

    /// The stream ended while no shutdown was requested
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// `Client::start` was called on a client that is already running
    #[error("client already started")]
    AlreadyStarted,
}

/// Result type for wsduplex operations
pub type Result<T> = std::result::Result<T, WsDuplexError>;

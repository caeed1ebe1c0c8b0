//! Common error types for the OSC gateway

use thiserror::Error;

/// Common result type for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the gateway crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Outbound OSC encoding or UDP transport failure.
    ///
    /// Name resolution and socket errors are collapsed into this one
    /// variant; the send is not retried and the datapool mutation that
    /// triggered it stands.
    #[error("OSC transport error: {0}")]
    Transport(String),
}

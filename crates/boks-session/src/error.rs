//! Error types for the session layer.

use boks_core::{EncodeError, RejectionReason};
use thiserror::Error;

/// Errors reported by a [`crate::Transport`] implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// An operation was attempted before `connect` or after `disconnect`.
    #[error("transport is not connected")]
    NotConnected,

    /// The underlying BLE stack reported a failure.
    #[error("transport I/O error: {0}")]
    Io(String),

    /// The link dropped while the operation was in flight.
    #[error("link dropped by the device")]
    Disconnected,
}

/// Errors returned by [`crate::BoksSession`] operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The session has no live connection.
    #[error("session is not connected")]
    NotConnected,

    /// The connection dropped before the awaited reply arrived.
    #[error("connection lost while waiting for a reply")]
    ConnectionLost,

    /// A `connect` call is already in progress.
    #[error("a connection attempt is already in progress")]
    AlreadyConnecting,

    /// The command could not be laid out; nothing was sent.
    #[error("could not encode command: {0}")]
    Encode(#[from] EncodeError),

    /// The transport refused the operation.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The box answered with an error frame.
    #[error("command rejected by device: {reason}")]
    Rejected { reason: RejectionReason },

    /// A reply of the right kind carried an unexpected shape.
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),
}

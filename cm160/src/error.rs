//! Errors.

use thiserror::Error;

use crate::Reading;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors that end a session.
#[derive(Error, Debug)]
pub enum Error {
    #[error("device not found: {vendor:04x}:{product:04x}")]
    DeviceNotFound { vendor: u16, product: u16 },

    /// The transport reported the device as momentarily unavailable.
    #[error("transport busy: {0}")]
    TransportBusy(#[source] TransportError),

    #[error("transport error: {0}")]
    Transport(#[source] TransportError),

    #[error("unable to store reading: {0}")]
    Sink(#[from] std::io::Error),
}

/// Failures reported by a [`crate::Transport`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("resource busy")]
    Busy,

    #[error("timed out")]
    Timeout,

    #[error("device disconnected")]
    Disconnected,

    #[error("{0}")]
    Io(String),
}

impl TransportError {
    /// Is this the transient "try again later" class of error.  The bridge reports an idle link
    /// as a read timeout, so that counts as well.
    pub fn is_busy(&self) -> bool {
        matches!(self, TransportError::Busy | TransportError::Timeout)
    }
}

/// Problems with a single data frame.  None of these end the session.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("unknown frame kind {0:#04x}")]
    UnknownFrameKind(u8),

    /// The checksum didn't match.  The frame is still decoded, as the device is trusted, but the
    /// fields haven't been verified.
    #[error("checksum mismatch: expected {expected:#04x}, found {found:#04x}")]
    ChecksumMismatch {
        expected: u8,
        found: u8,
        reading: Reading,
    },
}

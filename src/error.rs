//! # Error Types
//!
//! This module defines the error taxonomy used throughout the rotulo library.
//!
//! Every failure carries a human-readable detail string so callers can show
//! a useful status message ("no device found" vs. "connection lost"). The
//! session manager consults [`Error::is_retryable`] to decide whether a print
//! failure is worth its single automatic reconnect-and-replay attempt.

use thiserror::Error;

/// Main error type for rotulo operations
#[derive(Debug, Error)]
pub enum Error {
    /// The platform cannot do Bluetooth at all: no GATT API, no secure
    /// context, or an OS family with no Web Bluetooth support. Never retried.
    #[error("Bluetooth unavailable: {0}")]
    CapabilityUnavailable(String),

    /// No candidate printer found after exhausting every discovery tier.
    /// Retryable only by another user action.
    #[error("No printer found: {0}")]
    DiscoveryFailed(String),

    /// The connect call itself failed (device off, out of range, busy)
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Connected, but no usable service/characteristic even after full
    /// enumeration. Terminal for that device.
    #[error("No usable printer service: {0}")]
    ServiceResolution(String),

    /// A chunk failed to send or the link dropped mid-stream
    #[error("Write failed: {0}")]
    Write(String),

    /// Caller-side misuse, e.g. a barcode value that doesn't fit the
    /// command's one-byte length field. Caught before any bytes are sent.
    #[error("Invalid print data: {0}")]
    Validation(String),

    /// I/O error wrapper (classic serial transport)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether a print operation may retry once after this failure.
    ///
    /// Only transport-level faults qualify: a failed write or a connection
    /// that died mid-job. Everything else is either terminal for the device
    /// or a caller bug.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Write(_) | Error::Connection(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(Error::Write("chunk 3".into()).is_retryable());
        assert!(Error::Connection("gatt".into()).is_retryable());
    }

    #[test]
    fn test_terminal_kinds() {
        assert!(!Error::CapabilityUnavailable("no bluetooth".into()).is_retryable());
        assert!(!Error::DiscoveryFailed("no devices".into()).is_retryable());
        assert!(!Error::ServiceResolution("no characteristic".into()).is_retryable());
        assert!(!Error::Validation("barcode too long".into()).is_retryable());
    }

    #[test]
    fn test_display_carries_detail() {
        let err = Error::DiscoveryFailed("no devices matched filters".into());
        assert_eq!(
            err.to_string(),
            "No printer found: no devices matched filters"
        );
    }
}

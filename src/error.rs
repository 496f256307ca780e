//! Error types for PLC communication.

use std::io;
use thiserror::Error;

/// Result type alias for PLC operations.
pub type Result<T> = std::result::Result<T, PlcError>;

/// Errors that can occur while talking to a PLC.
#[derive(Debug, Error)]
pub enum PlcError {
    /// `connect` was called on a session that is already connected.
    #[error("Already connected")]
    AlreadyConnected,

    /// An operation needed a live connection and there was none.
    #[error("Not connected")]
    NotConnected,

    /// The session was torn down while a request was waiting for its reply.
    #[error("Session disconnected")]
    SessionDisconnected,

    /// The health monitor exhausted its reconnect attempts.
    #[error("PLC reconnection failed : {reason}")]
    ReconnectFailed {
        /// Last underlying failure plus a hint for the operator.
        reason: String,
    },

    /// A reply frame did not have the expected shape.
    #[error("Framing error: {reason}")]
    Framing {
        /// Description of what did not match.
        reason: String,
    },

    /// The PLC answered with a non-zero end code or a NAK.
    #[error("PLC returned error code {code}")]
    NegativeAcknowledgement {
        /// Error code as reported on the wire (hex text).
        code: String,
    },

    /// A value could not be encoded for the target device.
    #[error("Invalid data format: {reason}")]
    InvalidDataFormat {
        /// Description of the unsupported value.
        reason: String,
    },

    /// A batch carried more items than the one-byte count field allows.
    #[error("Too much send messages at once ({count} items, limit 255)")]
    TooManyMessages {
        /// Running item count that exceeded the limit.
        count: usize,
    },

    /// Device code or address not usable for the requested operation.
    #[error("Invalid addressing: {reason}")]
    InvalidAddressing {
        /// Description of the addressing error.
        reason: String,
    },

    /// Invalid parameter provided.
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// Name of the invalid parameter.
        parameter: String,
        /// Description of why the parameter is invalid.
        reason: String,
    },

    /// No reply arrived before the configured timeout.
    #[error("Communication timeout")]
    Timeout,

    /// I/O error during communication.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serial port driver error.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Settings file could not be encoded or decoded.
    #[error("Settings error: {0}")]
    Settings(#[from] serde_json::Error),
}

impl PlcError {
    /// Creates a new `ReconnectFailed` error.
    pub fn reconnect_failed(reason: impl Into<String>) -> Self {
        Self::ReconnectFailed {
            reason: reason.into(),
        }
    }

    /// Creates a new `Framing` error.
    ///
    /// # Example
    ///
    /// ```
    /// use plc_link::PlcError;
    ///
    /// let err = PlcError::framing("header mismatch");
    /// assert_eq!(err.to_string(), "Framing error: header mismatch");
    /// ```
    pub fn framing(reason: impl Into<String>) -> Self {
        Self::Framing {
            reason: reason.into(),
        }
    }

    /// Creates a new `NegativeAcknowledgement` error.
    pub fn nak(code: impl Into<String>) -> Self {
        Self::NegativeAcknowledgement { code: code.into() }
    }

    /// Creates a new `InvalidDataFormat` error.
    pub fn invalid_data(reason: impl Into<String>) -> Self {
        Self::InvalidDataFormat {
            reason: reason.into(),
        }
    }

    /// Creates a new `InvalidAddressing` error.
    ///
    /// # Example
    ///
    /// ```
    /// use plc_link::PlcError;
    ///
    /// let err = PlcError::invalid_addressing("device not valid for ASCII frames");
    /// ```
    pub fn invalid_addressing(reason: impl Into<String>) -> Self {
        Self::InvalidAddressing {
            reason: reason.into(),
        }
    }

    /// Creates a new `InvalidParameter` error.
    pub fn invalid_parameter(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for errors the health monitor may recover from by reconnecting.
    ///
    /// I/O failures are included since a dropped cable surfaces as one.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::AlreadyConnected
                | Self::NotConnected
                | Self::SessionDisconnected
                | Self::ReconnectFailed { .. }
                | Self::Io(_)
                | Self::Serial(_)
        )
    }
}

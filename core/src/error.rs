// core/src/error.rs
use nix::errno::Errno;
use std::fmt;
use std::io;
use std::str::Utf8Error;
use thiserror::Error;

/// Failures of the byte stream itself. Always fatal for the connection.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("stream closed by daemon")]
    Eof,

    #[error("stream closed after {received} of {expected} bytes")]
    Truncated { expected: usize, received: usize },

    #[error("negative length prefix: {0}")]
    NegativeLength(i32),

    #[error("length prefix {0} exceeds the frame size limit")]
    FrameTooLarge(usize),

    #[error("string is not valid UTF-8: {0}")]
    InvalidUtf8(#[source] Utf8Error),

    #[error("failed to encode message: {0}")]
    Encode(String),

    #[error("failed to decode message: {0}")]
    Decode(String),

    #[error("socket I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// The fixed set of conditions that end a connection at the protocol level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureReason {
    DaemonNotRunning,
    SignatureCheckFail,
    InterfaceNotSupported,
    VersionTooOld,
    ProtocolError,
}

impl FailureReason {
    /// Whether replacing the daemon binary and reconnecting may fix this.
    pub fn is_recoverable_by_replacement(self) -> bool {
        matches!(self, Self::InterfaceNotSupported | Self::VersionTooOld)
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::DaemonNotRunning => "daemon is not running",
            Self::SignatureCheckFail => "daemon rejected the client signature",
            Self::InterfaceNotSupported => "daemon does not support the requested interface",
            Self::VersionTooOld => "daemon version is too old",
            Self::ProtocolError => "protocol error",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Error)]
#[error("{reason}: {detail}")]
pub struct ProtocolFailure {
    pub reason: FailureReason,
    pub detail: String,
}

impl ProtocolFailure {
    pub fn new(reason: FailureReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }
}

/// A single call failed; the connection stays usable.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum OperationError {
    #[error("{op} failed: {message} (errno {errno}: {})", describe(.errno))]
    Errno {
        op: &'static str,
        errno: i32,
        message: String,
    },

    #[error("{op} is not supported by this daemon")]
    Unsupported { op: &'static str },

    #[error("daemon rejected {op} as an invalid request")]
    InvalidRequest { op: &'static str },

    #[error("{op} reported failure")]
    Failed { op: &'static str },
}

impl OperationError {
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::Errno { errno, .. } => Some(*errno),
            _ => None,
        }
    }
}

pub fn errno_description(errno: i32) -> &'static str {
    Errno::from_raw(errno).desc()
}

fn describe(errno: &i32) -> &'static str {
    errno_description(*errno)
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolFailure),

    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error("connection is closed after an earlier fatal failure")]
    ConnectionClosed,

    #[error("daemon calls must not be made from the foreground thread")]
    ForegroundCall,

    #[error("streaming call abandoned before completion")]
    Abandoned,
}

impl Error {
    pub(crate) fn protocol(reason: FailureReason, detail: impl Into<String>) -> Self {
        Self::Protocol(ProtocolFailure::new(reason, detail))
    }

    /// Fatal errors leave the connection unusable.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Operation(_) | Self::ForegroundCall)
    }

    pub fn reason(&self) -> Option<FailureReason> {
        match self {
            Self::Protocol(failure) => Some(failure.reason),
            _ => None,
        }
    }

    pub fn operation_error(&self) -> Option<&OperationError> {
        match self {
            Self::Operation(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_message_carries_the_number() {
        let err = OperationError::Errno {
            op: "path_delete",
            errno: 13,
            message: "/system/app".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("13"), "{}", text);
        assert!(text.contains("/system/app"), "{}", text);
        assert!(text.contains("Permission denied"), "{}", text);
    }

    #[test]
    fn only_two_reasons_are_recoverable() {
        use FailureReason::*;
        assert!(InterfaceNotSupported.is_recoverable_by_replacement());
        assert!(VersionTooOld.is_recoverable_by_replacement());
        for reason in [DaemonNotRunning, SignatureCheckFail, ProtocolError] {
            assert!(!reason.is_recoverable_by_replacement());
        }
    }

    #[test]
    fn operation_errors_are_not_fatal() {
        assert!(!Error::from(OperationError::Unsupported { op: "file_open" }).is_fatal());
        assert!(Error::from(TransportError::Eof).is_fatal());
        assert!(Error::protocol(FailureReason::ProtocolError, "bad tag").is_fatal());
    }
}

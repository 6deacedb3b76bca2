//! Wire-level error codes and the crate's error type.

use std::fmt;

/// The small, fixed set of error codes carried on the wire as a single
/// byte after an `Err:`/`NOK:` tag.
///
/// `PositionInvalid` is pinned to `26`, matching `OPDI_POSITION_INVALID`
/// in the original C reference implementation — the one numeric value
/// the spec's own wire example (`1:sSP:S1:5` -> `1:NOK:26`) pins down.
/// The retrieved source did not include the original's full numeric
/// status-code table, so the remaining codes keep this crate's own
/// sequential numbering rather than guessed `OPDI_*` values (see
/// `DESIGN.md`).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum ErrorCode {
    /// Reserved; never sent on the wire.
    Ok = 0,
    /// The peer closed the connection. Not an error.
    Disconnected = 1,
    /// `receive` timed out with no activity to blame it on.
    Timeout = 2,
    /// Handshake or control-channel framing was violated.
    ProtocolError = 3,
    /// Checksum, terminator, or overflow violation in a frame.
    MalformedMessage = 4,
    /// Referenced port ID does not exist in the registry.
    PortUnknown = 5,
    /// Operation tag does not match the port's type.
    WrongPortType = 6,
    /// Mutation requested on a readonly port.
    PortAccessDenied = 7,
    /// Port-defined failure.
    PortError = 8,
    /// Channel number is not valid for the requested operation.
    ChannelInvalid = 9,
    /// Streaming bind requested on an already-bound channel.
    TooManyBindings = 10,
    /// Authentication credentials did not match.
    AuthFailed = 11,
    /// Payload contained a literal message terminator byte.
    TerminatorInPayload = 12,
    /// Payload or part count exceeded the configured maximum.
    PayloadOverflow = 13,
    /// The transport's send/receive call failed.
    DeviceError = 14,
    /// The transport reported a network-level failure.
    NetworkError = 15,
    /// `setPosition` argument is out of range or step-misaligned.
    PositionInvalid = 26,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The crate's error type.
///
/// Every fallible operation in `portwire` resolves to one of these three
/// shapes, matching the session-fatal/request-local/disconnect taxonomy
/// in SPEC_FULL.md §7.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Ends the session. Reported as `Err:<code>[:msg]` on channel 0.
    #[error("fatal error {0}{}", msg_suffix(.1))]
    Fatal(ErrorCode, Option<String>),

    /// Does not end the session. Reported as `NOK:<code>[:msg]` on the
    /// originating channel.
    #[error("request error {0}{}", msg_suffix(.1))]
    RequestLocal(ErrorCode, Option<String>),

    /// The peer disconnected cleanly; not a failure.
    #[error("disconnected")]
    Disconnected,
}

fn msg_suffix(msg: &Option<String>) -> String {
    match msg {
        Some(m) => format!(": {}", m),
        None => String::new(),
    }
}

impl Error {
    /// Constructs a fatal error with no attached message.
    pub fn fatal(code: ErrorCode) -> Self {
        Error::Fatal(code, None)
    }

    /// Constructs a fatal error with an attached message part.
    pub fn fatal_msg(code: ErrorCode, msg: impl Into<String>) -> Self {
        Error::Fatal(code, Some(msg.into()))
    }

    /// Constructs a request-local error with no attached message.
    pub fn request(code: ErrorCode) -> Self {
        Error::RequestLocal(code, None)
    }

    /// Constructs a request-local error with an attached message part.
    pub fn request_msg(code: ErrorCode, msg: impl Into<String>) -> Self {
        Error::RequestLocal(code, Some(msg.into()))
    }

    /// The wire code for this error, if it has one (`Disconnected` does
    /// not — it is not an error).
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Error::Fatal(c, _) => Some(*c),
            Error::RequestLocal(c, _) => Some(*c),
            Error::Disconnected => None,
        }
    }

    /// `true` if this error should end the session.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::RequestLocal(..))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::fatal_msg(ErrorCode::DeviceError, e.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_is_fatal() {
        assert!(Error::fatal(ErrorCode::ProtocolError).is_fatal());
    }

    #[test]
    fn request_local_is_not_fatal() {
        assert!(!Error::request(ErrorCode::PositionInvalid).is_fatal());
    }

    #[test]
    fn disconnected_has_no_code() {
        assert_eq!(Error::Disconnected.code(), None);
    }
}

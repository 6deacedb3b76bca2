//! The byte I/O boundary (C1): supplied by the host, consumed by the
//! framing and session layers.

/// What a single blocking receive attempt produced.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReceiveOutcome {
    /// One byte was read from the transport.
    Byte(u8),
    /// No byte arrived within the requested timeout.
    Timeout,
    /// The peer closed the connection.
    Disconnected,
}

/// The work-tick callback a session hands to `Transport::receive` so the
/// transport can opportunistically drive outgoing streaming/refresh work
/// while it is otherwise idle waiting on bytes.
///
/// Returning `Err` aborts the session with that error on the next poll.
pub type WorkTick<'a> = dyn FnMut() -> crate::error::Result<()> + 'a;

/// A reliable, message-preserving byte transport (TCP, serial, pipe).
///
/// Implementations must not return partial bytes from `receive`, and
/// `send` must write all bytes or fail — the core treats any I/O error
/// as fatal for the current session (SPEC_FULL.md §4.1).
pub trait Transport {
    /// Blocks up to `timeout_ms` for a single byte.
    ///
    /// When `work` is `Some`, an implementation *may* opportunistically
    /// call it while waiting, so that streaming producers and refresh
    /// logic keep advancing even though the session is blocked in
    /// `receive`. Implementations that cannot do this (e.g. a dumb
    /// blocking read) may simply ignore `work`.
    fn receive(
        &mut self,
        timeout_ms: u32,
        work: Option<&mut WorkTick<'_>>,
    ) -> std::io::Result<ReceiveOutcome>;

    /// Writes `bytes` to the transport in full.
    fn send(&mut self, bytes: &[u8]) -> std::io::Result<()>;
}

use std::io::{ErrorKind, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use portwire::io::{ReceiveOutcome, Transport, WorkTick};

/// A [`Transport`] over a connected [`TcpStream`], reading one byte at a
/// time with a per-call read timeout.
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    pub fn new(stream: TcpStream) -> std::io::Result<Self> {
        stream.set_nodelay(true)?;
        Ok(Self { stream })
    }
}

impl Transport for TcpTransport {
    fn receive(&mut self, timeout_ms: u32, _work: Option<&mut WorkTick<'_>>) -> std::io::Result<ReceiveOutcome> {
        self.stream
            .set_read_timeout(Some(Duration::from_millis(u64::from(timeout_ms.max(1)))))?;
        let mut byte = [0u8; 1];
        match self.stream.read(&mut byte) {
            Ok(0) => Ok(ReceiveOutcome::Disconnected),
            Ok(_) => Ok(ReceiveOutcome::Byte(byte[0])),
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => Ok(ReceiveOutcome::Timeout),
            Err(e) => Err(e),
        }
    }

    fn send(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.stream.write_all(bytes)
    }
}

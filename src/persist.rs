//! Optional persistent-state hook (C9/§6.3): the core never reads or
//! writes the key-value file itself, it only calls the host back after
//! an accepted mutation on a `persistent` port.

use crate::error::Result;
use crate::port::Port;

/// Implemented by hosts that want port values re-applied across
/// restarts. The core calls [`PersistenceSink::persist`] once per
/// accepted mutation on a port whose `PortMeta::persistent` flag is
/// set; it never parses or writes the file format itself, and never
/// re-applies persisted state during `prepare()` on the host's behalf.
pub trait PersistenceSink {
    /// Called with the port's identity and current state, after a
    /// mutation has already been applied in memory.
    fn persist(&mut self, port: &Port) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{Direction, DigitalMode, DigitalPort, Line, PortMeta};

    struct Recorder(Vec<String>);

    impl PersistenceSink for Recorder {
        fn persist(&mut self, port: &Port) -> Result<()> {
            self.0.push(port.id().to_string());
            Ok(())
        }
    }

    #[test]
    fn sink_receives_port_reference() {
        let port = Port::Digital(
            PortMeta::new("D1", "D1", Direction::Bidi),
            DigitalPort::new(DigitalMode::Output, Line::Low),
        );
        let mut sink = Recorder(Vec::new());
        sink.persist(&port).unwrap();
        assert_eq!(sink.0, vec!["D1".to_string()]);
    }
}

//! Streaming channel bindings (C10): maps channel numbers to streaming
//! ports and dispatches non-protocol frames straight to them.

use std::collections::HashMap;

use crate::error::{Error, ErrorCode, Result};
use crate::registry::PortRegistry;

/// Bidirectional channel↔port-id table enforcing one binding per channel
/// and one channel per port (SPEC_FULL.md §3, §9).
#[derive(Default)]
pub struct StreamingBindings {
    channel_to_port: HashMap<u16, String>,
    port_to_channel: HashMap<String, u16>,
}

impl StreamingBindings {
    /// Builds an empty binding table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `port_id` (which must name a registered streaming port) to
    /// `channel`. Channel 0 is reserved for control traffic and is
    /// rejected with `ChannelInvalid`; an already-bound channel or port
    /// is rejected with `TooManyBindings`, per the original's own
    /// inconsistency between the two codes, which SPEC_FULL.md §9
    /// preserves rather than resolves.
    pub fn bind(&mut self, registry: &mut PortRegistry, port_id: &str, channel: u16) -> Result<()> {
        if channel == crate::framing::Message::CONTROL {
            return Err(Error::request(ErrorCode::ChannelInvalid));
        }
        if self.channel_to_port.contains_key(&channel) || self.port_to_channel.contains_key(port_id) {
            return Err(Error::request(ErrorCode::TooManyBindings));
        }

        let port = registry
            .find_by_id_mut(port_id, true)
            .ok_or_else(|| Error::request(ErrorCode::PortUnknown))?;
        let streaming = match port {
            crate::port::Port::Streaming(_, s) => s,
            _ => return Err(Error::request(ErrorCode::WrongPortType)),
        };

        streaming.bind(channel);
        self.channel_to_port.insert(channel, port_id.to_string());
        self.port_to_channel.insert(port_id.to_string(), channel);
        Ok(())
    }

    /// Unbinds `port_id`. A no-op (not an error) if it was not bound.
    pub fn unbind(&mut self, registry: &mut PortRegistry, port_id: &str) -> Result<()> {
        if let Some(channel) = self.port_to_channel.remove(port_id) {
            self.channel_to_port.remove(&channel);
            if let Some(crate::port::Port::Streaming(_, s)) = registry.find_by_id_mut(port_id, true) {
                s.unbind();
            }
        }
        Ok(())
    }

    /// The channel `port_id` is currently bound to, if any.
    pub fn channel_for(&self, port_id: &str) -> Option<u16> {
        self.port_to_channel.get(port_id).copied()
    }

    /// The port ID bound to `channel`, if any.
    pub fn port_for(&self, channel: u16) -> Option<&str> {
        self.channel_to_port.get(&channel).map(String::as_str)
    }

    /// `true` if `channel` currently has a streaming port bound to it.
    pub fn is_bound(&self, channel: u16) -> bool {
        self.channel_to_port.contains_key(&channel)
    }

    /// Forwards `payload` to the port bound to `channel`. Returns
    /// `Ok(false)` if nothing is bound there, so the caller can fall
    /// through to the protocol dispatcher.
    pub fn dispatch(&self, registry: &mut PortRegistry, channel: u16, payload: &[u8]) -> Result<bool> {
        let Some(port_id) = self.channel_to_port.get(&channel) else {
            return Ok(false);
        };
        if let Some(crate::port::Port::Streaming(_, s)) = registry.find_by_id_mut(port_id, true) {
            s.dispatch(payload)?;
        }
        Ok(true)
    }

    /// Clears every binding without touching the ports themselves,
    /// called at the start of each new session (SPEC_FULL.md §3).
    pub fn clear(&mut self) {
        self.channel_to_port.clear();
        self.port_to_channel.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{Direction, Port, PortMeta, StreamingPort};

    fn registry_with_stream(id: &str) -> PortRegistry {
        let mut reg = PortRegistry::new();
        reg.add_port(Port::Streaming(
            PortMeta::new(id, id, Direction::Bidi),
            StreamingPort::new("driver", 0),
        ))
        .unwrap();
        reg
    }

    #[test]
    fn bind_rejects_control_channel() {
        let mut reg = registry_with_stream("sp1");
        let mut bindings = StreamingBindings::new();
        assert!(bindings.bind(&mut reg, "sp1", 0).is_err());
    }

    #[test]
    fn rebinding_channel_is_rejected() {
        let mut reg = registry_with_stream("sp1");
        reg.add_port(Port::Streaming(
            PortMeta::new("sp2", "sp2", Direction::Bidi),
            StreamingPort::new("driver", 0),
        ))
        .unwrap();
        let mut bindings = StreamingBindings::new();
        bindings.bind(&mut reg, "sp1", 5).unwrap();
        assert!(bindings.bind(&mut reg, "sp2", 5).is_err());
    }

    #[test]
    fn dispatch_only_for_bound_channel() {
        let mut reg = registry_with_stream("sp1");
        let mut bindings = StreamingBindings::new();
        bindings.bind(&mut reg, "sp1", 5).unwrap();
        assert!(bindings.dispatch(&mut reg, 5, b"x").unwrap());
        assert!(!bindings.dispatch(&mut reg, 6, b"x").unwrap());
    }

    #[test]
    fn unbind_frees_channel_and_port() {
        let mut reg = registry_with_stream("sp1");
        let mut bindings = StreamingBindings::new();
        bindings.bind(&mut reg, "sp1", 5).unwrap();
        bindings.unbind(&mut reg, "sp1").unwrap();
        assert!(!bindings.is_bound(5));
        bindings.bind(&mut reg, "sp1", 6).unwrap();
    }
}

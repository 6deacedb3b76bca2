//! Streaming ports: a free-form byte channel bound to a driver rather
//! than to a fixed value shape (C10).

use crate::error::Result;

/// Host-supplied callback for data arriving on a bound streaming port.
pub trait StreamingHooks {
    /// Called with the payload bytes of each message dispatched to this
    /// port's bound channel.
    fn data_received(&mut self, data: &[u8]) -> Result<()>;
}

/// Type-specific state for a streaming port.
#[allow(missing_docs)]
pub struct StreamingPort {
    pub driver_id: String,
    pub flags: u16,
    binding: Option<u16>,
    hooks: Option<Box<dyn StreamingHooks>>,
}

impl StreamingPort {
    /// Builds an unbound streaming port with no host callback attached.
    pub fn new(driver_id: impl Into<String>, flags: u16) -> Self {
        Self {
            driver_id: driver_id.into(),
            flags,
            binding: None,
            hooks: None,
        }
    }

    /// Attaches the host's data-received callback.
    pub fn with_hooks(mut self, hooks: Box<dyn StreamingHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// The channel this port is currently bound to, if any.
    pub fn binding(&self) -> Option<u16> {
        self.binding
    }

    /// `true` if this port is currently bound to a channel.
    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    /// Called by [`crate::bindings::StreamingBindings`] once a channel has
    /// been reserved for this port; ports themselves never claim a
    /// channel.
    pub fn bind(&mut self, channel: u16) {
        self.binding = Some(channel);
    }

    /// Clears this port's channel binding.
    pub fn unbind(&mut self) {
        self.binding = None;
    }

    /// Forwards payload bytes to the host hook, if any.
    pub fn dispatch(&mut self, data: &[u8]) -> Result<()> {
        if let Some(hooks) = self.hooks.as_mut() {
            hooks.data_received(data)
        } else {
            Ok(())
        }
    }

    /// `gDS`-equivalent for streaming ports: just the driver id and
    /// current binding, since there is no single scalar value.
    pub fn state_parts(&self) -> Vec<String> {
        vec![
            self.driver_id.clone(),
            match self.binding {
                Some(ch) => ch.to_string(),
                None => "-".to_string(),
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder(Vec<u8>);
    impl StreamingHooks for Recorder {
        fn data_received(&mut self, data: &[u8]) -> Result<()> {
            self.0.extend_from_slice(data);
            Ok(())
        }
    }

    #[test]
    fn bind_unbind_roundtrip() {
        let mut p = StreamingPort::new("serial", 0);
        assert!(!p.is_bound());
        p.bind(21);
        assert_eq!(p.binding(), Some(21));
        p.unbind();
        assert!(!p.is_bound());
    }

    #[test]
    fn dispatch_forwards_to_hooks() {
        let mut p = StreamingPort::new("serial", 0).with_hooks(Box::new(Recorder(Vec::new())));
        p.dispatch(b"abc").unwrap();
    }
}

//! The session loop (C9): runs the message loop after a successful
//! handshake, enforcing the idle timeout, driving streaming/control
//! dispatch, and ticking every port's cooperative work callback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::bindings::StreamingBindings;
use crate::cipher::{BlockCipher, NullCipher};
use crate::codec;
use crate::config::SlaveConfig;
use crate::dispatch;
use crate::error::{Error, ErrorCode, Result};
use crate::framing::{self, Deframer, Message};
use crate::handshake;
use crate::io::{ReceiveOutcome, Transport};
use crate::persist::PersistenceSink;
use crate::registry::PortRegistry;

const NULL_CIPHER: NullCipher = NullCipher;

/// Tags whose first argument is a port ID that was just mutated;
/// used to decide when to call the persistence hook (SPEC_FULL.md §6.3).
const SETTER_TAGS: &[&str] = &["sDL", "sDM", "sAV", "sAM", "sAR", "sARF", "sSP", "sDLP"];

/// Why a session ended. A graceful outcome; session-fatal failures are
/// reported as `Err` from [`Session::run`] instead.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionEnd {
    /// The master sent `Dis`, or the transport reported disconnection.
    Disconnected,
    /// The master sent `Err` on the control channel.
    RemoteError,
    /// A `shutdown()` request was observed at the top of a loop pass.
    Shutdown,
    /// `(now - last_activity) > idle_timeout`.
    IdleTimeout,
}

/// Which ports a [`Session::refresh`] call should name.
pub enum RefreshTarget<'a> {
    /// Request every port be re-read (empty `Ref` payload).
    All,
    /// Request only the named ports be re-read.
    Ports(&'a [&'a str]),
}

/// Host lifecycle hooks consulted by the session loop.
///
/// Both methods have defaults matching the base protocol's behavior:
/// only channels `>= 20` count as idle-resetting activity, and debug
/// text is dropped. Hosts override either independently.
pub trait SessionHooks {
    /// Decides whether handling a message on `channel` counts as
    /// activity that resets the idle timer (SPEC_FULL.md §4.9).
    fn message_handled(&mut self, channel: u16) -> bool {
        channel >= Message::USER_CHANNEL_MIN
    }

    /// Called with the text of a `Debug` message received from the
    /// master.
    fn debug(&mut self, _text: &str) {}
}

/// The default [`SessionHooks`] implementation, used when a host does
/// not supply its own.
#[derive(Default)]
pub struct DefaultHooks;

impl SessionHooks for DefaultHooks {}

/// A cooperative handle a host can use to request shutdown from
/// another thread or a signal handler without unsafe code.
#[derive(Clone)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    /// Requests that the session return `SessionEnd::Shutdown` at the
    /// start of its next loop pass.
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Runs one session: handshake through disconnect (SPEC_FULL.md §4.8,
/// §4.9). Owns no ports itself — it borrows the host's registry and
/// transport for the session's lifetime.
pub struct Session<'a> {
    transport: &'a mut dyn Transport,
    registry: &'a mut PortRegistry,
    config: SlaveConfig,
    cipher: Option<Box<dyn BlockCipher>>,
    hooks: Box<dyn SessionHooks>,
    persistence: Option<Box<dyn PersistenceSink>>,
    bindings: StreamingBindings,
    deframer: Deframer,
    shutdown: Arc<AtomicBool>,
    extended: bool,
    encrypted: bool,
    last_activity: Instant,
}

impl<'a> Session<'a> {
    /// Builds a session over a freshly-registered (already `prepare()`d)
    /// registry and a connected transport.
    pub fn new(config: SlaveConfig, registry: &'a mut PortRegistry, transport: &'a mut dyn Transport) -> Self {
        Self {
            transport,
            registry,
            config,
            cipher: None,
            hooks: Box::new(DefaultHooks),
            persistence: None,
            bindings: StreamingBindings::new(),
            deframer: Deframer::new(),
            shutdown: Arc::new(AtomicBool::new(false)),
            extended: false,
            encrypted: false,
            last_activity: Instant::now(),
        }
    }

    /// Supplies the device's block cipher candidate, offered during
    /// handshake negotiation (SPEC_FULL.md §4.8). Without one,
    /// encryption can never be negotiated regardless of what the master
    /// requests.
    pub fn with_cipher(mut self, cipher: Box<dyn BlockCipher>) -> Self {
        self.cipher = Some(cipher);
        self
    }

    /// Overrides the default idle-timer/debug hooks.
    pub fn with_hooks(mut self, hooks: Box<dyn SessionHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Enables persisted-value callbacks for `persistent` ports
    /// (SPEC_FULL.md §6.3).
    pub fn with_persistence(mut self, sink: Box<dyn PersistenceSink>) -> Self {
        self.persistence = Some(sink);
        self
    }

    /// A cloneable, thread-safe handle that can request this session
    /// shut down from outside the loop.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(self.shutdown.clone())
    }

    /// The cooperative work-tick entry point (SPEC_FULL.md §4.1, §4.9).
    ///
    /// A host whose `Transport::receive` implementation can call back
    /// into the session while blocked (e.g. one that holds its own
    /// shared handle to it) should invoke this once per such
    /// opportunity; wiring that callback is host integration glue and
    /// is out of this crate's scope (SPEC_FULL.md §1), so
    /// `receive_one_message` itself never threads a `WorkTick` through
    /// `Transport::receive` — doing so would require the session to
    /// alias itself across the call, which the borrow checker rightly
    /// refuses.
    pub fn waiting(&mut self, may_send: bool) -> Result<()> {
        self.drive_do_work(may_send)
    }

    /// Runs the handshake, then the message loop, until disconnect,
    /// shutdown, idle timeout, or a session-fatal error.
    pub fn run(&mut self) -> Result<SessionEnd> {
        self.bindings.clear();

        let outcome = handshake::run(self.transport, &mut self.deframer, &self.config, self.cipher.as_deref())?;
        self.extended = outcome.extended;
        self.encrypted = outcome.encrypted;
        self.last_activity = Instant::now();
        log::info!("session started for master {:?}", outcome.master_name);

        let idle = Duration::from_millis(u64::from(self.config.idle_timeout_ms()));

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                self.bindings.clear();
                return Ok(SessionEnd::Shutdown);
            }

            match self.receive_one_message() {
                Ok(Some(msg)) => match self.handle_message(&msg) {
                    Ok(Some(end)) => return Ok(end),
                    Ok(None) => {
                        if self.hooks.message_handled(msg.channel) {
                            self.last_activity = Instant::now();
                        }
                    }
                    Err(e) => {
                        let _ = self.send_fatal(&e);
                        return Err(e);
                    }
                },
                Ok(None) => {}
                Err(Error::Disconnected) => return Ok(SessionEnd::Disconnected),
                Err(e) => {
                    let _ = self.send_fatal(&e);
                    return Err(e);
                }
            }

            if self.last_activity.elapsed() > idle {
                let _ = self.send_debug("Idle timeout!");
                let _ = self.send_control(&["Dis"]);
                return Ok(SessionEnd::IdleTimeout);
            }

            if let Err(e) = self.drive_do_work(true) {
                let _ = self.send_fatal(&e);
                return Err(e);
            }
        }
    }

    /// Sends a `Ref:<id>[:<id>...]` (or bare `Ref`) control message.
    pub fn refresh(&mut self, target: RefreshTarget<'_>) -> Result<()> {
        match target {
            RefreshTarget::All => self.send_control(&["Ref"]),
            RefreshTarget::Ports(ids) => {
                let mut parts = vec!["Ref"];
                parts.extend_from_slice(ids);
                self.send_control(&parts)
            }
        }
    }

    /// Sends `Reconf`, telling the master its next `gDC` will see a
    /// changed port set.
    pub fn reconfigure(&mut self) -> Result<()> {
        self.send_control(&["Reconf"])
    }

    /// Sends `Debug:<text>` on the control channel.
    pub fn send_debug(&mut self, text: &str) -> Result<()> {
        self.send_control(&["Debug", text])
    }

    /// Sends `Dis` and marks the session as ended from the host's side;
    /// callers typically return the result of this directly.
    pub fn disconnect(&mut self) -> Result<()> {
        self.send_control(&["Dis"])
    }

    fn active_cipher(&self) -> &dyn BlockCipher {
        if self.encrypted {
            self.cipher
                .as_deref()
                .expect("Session::run only sets encrypted=true when a cipher was negotiated")
        } else {
            &NULL_CIPHER
        }
    }

    fn receive_one_message(&mut self) -> Result<Option<Message>> {
        loop {
            match self.transport.receive(self.config.idle_timeout_ms(), None)? {
                ReceiveOutcome::Byte(b) => {
                    // Field projections, not a call through `active_cipher`:
                    // the latter borrows all of `self` via `&self` and would
                    // conflict with the `&mut self.deframer` borrow below.
                    let cipher: &dyn BlockCipher = if self.encrypted {
                        self.cipher
                            .as_deref()
                            .expect("Session::run only sets encrypted=true when a cipher was negotiated")
                    } else {
                        &NULL_CIPHER
                    };
                    if let Some(msg) = self.deframer.push(b, cipher)? {
                        return Ok(Some(msg));
                    }
                }
                ReceiveOutcome::Timeout => return Ok(None),
                ReceiveOutcome::Disconnected => return Err(Error::Disconnected),
            }
        }
    }

    fn handle_message(&mut self, msg: &Message) -> Result<Option<SessionEnd>> {
        if msg.is_control() {
            return self.handle_control(msg);
        }

        match self.bindings.dispatch(self.registry, msg.channel, msg.payload.as_bytes()) {
            Ok(true) => return Ok(None),
            Ok(false) => {}
            Err(e) => return self.handle_request_error(msg.channel, e),
        }

        match dispatch::dispatch(self.registry, &mut self.bindings, &msg.payload, self.extended) {
            Ok(Some(reply_parts)) => {
                self.maybe_persist(&msg.payload);
                self.send_reply(msg.channel, &reply_parts)?;
                Ok(None)
            }
            Ok(None) => Ok(None),
            Err(e) => self.handle_request_error(msg.channel, e),
        }
    }

    fn handle_control(&mut self, msg: &Message) -> Result<Option<SessionEnd>> {
        let parts = codec::split(&msg.payload, ':', 8, true)?;
        let tag = parts.first().map(String::as_str).unwrap_or("");
        match tag {
            "Dis" => Ok(Some(SessionEnd::Disconnected)),
            "Err" => Ok(Some(SessionEnd::RemoteError)),
            "Debug" => {
                self.hooks.debug(parts.get(1).map(String::as_str).unwrap_or(""));
                Ok(None)
            }
            // idle-ping and any other reserved/unknown control tag: no
            // action, interop-tolerant (SPEC_FULL.md §4.6).
            _ => Ok(None),
        }
    }

    fn handle_request_error(&mut self, channel: u16, e: Error) -> Result<Option<SessionEnd>> {
        if e.is_fatal() {
            return Err(e);
        }
        self.send_request_error(channel, &e)?;
        Ok(None)
    }

    fn maybe_persist(&mut self, payload: &str) {
        let mut split = payload.splitn(3, ':');
        let tag = split.next().unwrap_or("");
        let id = split.next();
        if !SETTER_TAGS.contains(&tag) {
            return;
        }
        let Some(id) = id else { return };
        let Some(port) = self.registry.find_by_id(id, true) else {
            return;
        };
        if !port.meta().persistent {
            return;
        }
        if let Some(sink) = self.persistence.as_mut() {
            let _ = sink.persist(port);
        }
    }

    fn drive_do_work(&mut self, may_send: bool) -> Result<()> {
        let mut refresh_ids = Vec::new();
        for port in self.registry.iter_mut() {
            match port.do_work(may_send) {
                Ok(true) => refresh_ids.push(port.id().to_string()),
                Ok(false) => {}
                Err(e) => return Err(e),
            }
        }
        for id in refresh_ids {
            self.send_control(&["Ref", &id])?;
        }
        Ok(())
    }

    fn send_reply(&mut self, channel: u16, parts: &[String]) -> Result<()> {
        let payload = codec::join(parts, ':', self.config.max_payload_len)?;
        self.send_raw(channel, &payload)
    }

    fn send_request_error(&mut self, channel: u16, e: &Error) -> Result<()> {
        let Some(code) = e.code() else { return Ok(()) };
        let mut parts = vec!["NOK".to_string(), (code as u8).to_string()];
        if let Error::RequestLocal(_, Some(msg)) = e {
            parts.push(msg.clone());
        }
        let payload = codec::join(&parts, ':', self.config.max_payload_len)?;
        self.send_raw(channel, &payload)
    }

    fn send_fatal(&mut self, e: &Error) -> Result<()> {
        let Some(code) = e.code() else { return Ok(()) };
        let mut parts = vec!["Err".to_string(), (code as u8).to_string()];
        if let Error::Fatal(_, Some(msg)) = e {
            parts.push(msg.clone());
        }
        let payload = codec::join(&parts, ':', self.config.max_payload_len)?;
        self.send_raw(Message::CONTROL, &payload)
    }

    fn send_control(&mut self, parts: &[&str]) -> Result<()> {
        let payload = codec::join(parts, ':', self.config.max_payload_len)?;
        self.send_raw(Message::CONTROL, &payload)
    }

    fn send_raw(&mut self, channel: u16, payload: &str) -> Result<()> {
        let framed = framing::encode(channel, payload, self.active_cipher())?;
        self.transport.send(&framed)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{DigitalMode, DigitalPort, Direction, Line, Port, PortMeta};
    use std::collections::VecDeque;

    /// An in-memory transport that replays pre-framed inbound bytes and
    /// records everything sent, for driving a `Session` end to end
    /// without a real socket.
    struct ScriptedTransport {
        inbound: VecDeque<u8>,
        sent: Vec<u8>,
    }

    impl ScriptedTransport {
        fn new(inbound: Vec<u8>) -> Self {
            Self {
                inbound: inbound.into(),
                sent: Vec::new(),
            }
        }
    }

    impl Transport for ScriptedTransport {
        fn receive(
            &mut self,
            _timeout_ms: u32,
            _work: Option<&mut crate::io::WorkTick<'_>>,
        ) -> std::io::Result<ReceiveOutcome> {
            match self.inbound.pop_front() {
                Some(b) => Ok(ReceiveOutcome::Byte(b)),
                None => Ok(ReceiveOutcome::Disconnected),
            }
        }

        fn send(&mut self, bytes: &[u8]) -> std::io::Result<()> {
            self.sent.extend_from_slice(bytes);
            Ok(())
        }
    }

    fn frame(channel: u16, payload: &str) -> Vec<u8> {
        framing::encode(channel, payload, &NullCipher).unwrap()
    }

    fn registry_with_digital() -> PortRegistry {
        let mut reg = PortRegistry::new();
        reg.add_port(Port::Digital(
            PortMeta::new("D1", "D1", Direction::Bidi),
            DigitalPort::new(DigitalMode::Output, Line::Low),
        ))
        .unwrap();
        reg.prepare().unwrap();
        reg
    }

    #[test]
    fn full_session_handshake_request_and_disconnect() {
        let mut inbound = Vec::new();
        inbound.extend(frame(0, "OPDI:0.1:0:"));
        inbound.extend(frame(0, "BP:en_US:TestMaster"));
        inbound.extend(frame(1, "gDC"));
        inbound.extend(frame(0, "Dis"));

        let mut transport = ScriptedTransport::new(inbound);
        let mut registry = registry_with_digital();
        let config = SlaveConfig::new("TestSlave", 5_000);
        let mut session = Session::new(config, &mut registry, &mut transport);

        let end = session.run().unwrap();
        assert_eq!(end, SessionEnd::Disconnected);

        let sent = String::from_utf8(transport.sent).unwrap();
        assert!(sent.contains("OPDI:0.1:utf-8"));
        assert!(sent.contains("OK:TestSlave"));
        assert!(sent.contains("BDC:D1"));
    }

    #[test]
    fn disconnect_during_handshake_surfaces_as_error() {
        // No inbound bytes at all: the very first receive reports
        // Disconnected before a handshake completes, which `Session::run`
        // surfaces as `Err(Error::Disconnected)` rather than a graceful
        // `SessionEnd` (there is no session to end gracefully yet).
        let mut transport = ScriptedTransport::new(Vec::new());
        let mut registry = registry_with_digital();
        let config = SlaveConfig::new("TestSlave", 10);
        let mut session = Session::new(config, &mut registry, &mut transport);
        assert!(session.run().is_err());
    }

    #[test]
    fn unknown_control_tag_does_not_end_session() {
        let mut inbound = Vec::new();
        inbound.extend(frame(0, "OPDI:0.1:0:"));
        inbound.extend(frame(0, "BP:en_US:TestMaster"));
        inbound.extend(frame(0, "Ping"));
        inbound.extend(frame(0, "Dis"));

        let mut transport = ScriptedTransport::new(inbound);
        let mut registry = registry_with_digital();
        let config = SlaveConfig::new("TestSlave", 5_000);
        let mut session = Session::new(config, &mut registry, &mut transport);
        assert_eq!(session.run().unwrap(), SessionEnd::Disconnected);
    }
}

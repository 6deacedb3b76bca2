//! The handshake driver (C8): negotiates version, encoding, optional
//! encryption, protocol variant, and optional authentication before the
//! session loop starts (SPEC_FULL.md §4.8).

use crate::cipher::{BlockCipher, NullCipher};
use crate::codec;
use crate::config::{flags, SlaveConfig};
use crate::error::{Error, ErrorCode, Result};
use crate::framing::{self, Deframer, Message};
use crate::io::Transport;

const MAGIC: &str = "OPDI";
const VERSION: &str = "0.1";
const BASIC_PROTOCOL: &str = "BP";
const EXTENDED_PROTOCOL: &str = "EP";
const SUPPORTED_PROTOCOLS: &str = "BP,EP";

/// Extended timeout applied only while waiting for `Auth`, since a human
/// may need to type credentials (the original's
/// `OPDI_AUTHENTICATION_TIMEOUT` override of the normal idle timeout).
pub const DEFAULT_AUTH_TIMEOUT_MS: u32 = 60_000;

/// The outcome of a successful handshake, handed to the session loop.
pub struct HandshakeOutcome {
    /// The master's self-reported name, from the protocol-select message.
    pub master_name: String,
    /// `true` if the extended protocol (`EP`, adds `gAPS`) was selected;
    /// `false` falls back to the basic protocol.
    pub extended: bool,
    /// `true` if encryption was negotiated; the caller must switch its
    /// cipher in from this point on (not before: SPEC_FULL.md's testable
    /// property 3).
    pub encrypted: bool,
}

/// Drives the handshake state machine described in SPEC_FULL.md §4.8 to
/// completion, or fails with a session-fatal [`Error`].
///
/// `cipher` is the device's optional block cipher candidate; if `None`,
/// encryption can never be negotiated regardless of what the master
/// requests.
pub fn run(
    transport: &mut dyn Transport,
    deframer: &mut Deframer,
    config: &SlaveConfig,
    cipher: Option<&dyn BlockCipher>,
) -> Result<HandshakeOutcome> {
    let null = NullCipher;

    let opening = receive_control(transport, deframer, &null, config.idle_timeout_ms)?;
    let parts = codec::split(&opening.payload, ':', 4, true)?;
    if parts.len() != 4 {
        return Err(Error::fatal(ErrorCode::ProtocolError));
    }
    if parts[0] != MAGIC {
        return Err(Error::fatal(ErrorCode::ProtocolError));
    }
    if parts[1] != VERSION {
        return Err(Error::fatal(ErrorCode::ProtocolError));
    }
    let master_flags = codec::parse_i32(&parts[2])? as u32;
    let supported_encryptions: Vec<String> = codec::split(&parts[3], ',', 8, true)?
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect();

    let negotiation = negotiate_encryption(config, cipher, master_flags, &supported_encryptions);
    let (encrypted, chosen_name) = match negotiation {
        Ok(n) => n,
        Err(e) => {
            log::warn!("encryption negotiation failed (master flags {:#x})", master_flags);
            let code = (ErrorCode::ProtocolError as u8).to_string();
            send_control(transport, &null, &["NOK", &code])?;
            return Err(e);
        }
    };
    log::debug!("encryption negotiated: {} ({})", encrypted, chosen_name);

    send_control(
        transport,
        &null,
        &[
            MAGIC,
            VERSION,
            &config.encoding,
            chosen_name,
            &(config.device_flags).to_string(),
            SUPPORTED_PROTOCOLS,
        ],
    )?;

    let active_cipher: &dyn BlockCipher = if encrypted {
        cipher.expect("negotiate_encryption only returns encrypted=true when cipher.is_some()")
    } else {
        &null
    };

    let select = receive_control(transport, deframer, active_cipher, config.idle_timeout_ms)?;
    let select_parts = codec::split(&select.payload, ':', 3, true)?;
    if select_parts.len() != 3 {
        return Err(Error::fatal(ErrorCode::ProtocolError));
    }
    let extended = select_parts[0] == EXTENDED_PROTOCOL;
    let master_name = select_parts[2].clone();

    send_control(transport, active_cipher, &["OK", &config.slave_name])?;

    if config.requires_auth() {
        let auth_timeout = config.idle_timeout_ms.max(DEFAULT_AUTH_TIMEOUT_MS);
        let auth_msg = receive_control(transport, deframer, active_cipher, auth_timeout)?;
        let auth_parts = codec::split(&auth_msg.payload, ':', 3, false)?;
        if auth_parts.len() != 3 || auth_parts[0] != "Auth" {
            return Err(Error::fatal(ErrorCode::ProtocolError));
        }
        let expected_user = config.username.as_deref().unwrap_or("");
        let expected_pass = config.password.as_deref().unwrap_or("");
        let user_ok = auth_parts[1].eq_ignore_ascii_case(expected_user);
        let pass_ok = constant_time_eq(auth_parts[2].as_bytes(), expected_pass.as_bytes());
        if !user_ok || !pass_ok {
            log::warn!("auth failed for user {:?}", auth_parts[1]);
            let code = (ErrorCode::AuthFailed as u8).to_string();
            send_control(transport, active_cipher, &["NOK", &code])?;
            return Err(Error::fatal(ErrorCode::AuthFailed));
        }
        send_control(transport, active_cipher, &["OK"])?;
    }

    log::info!("handshake complete with master {:?} (extended={})", master_name, extended);
    Ok(HandshakeOutcome {
        master_name,
        extended,
        encrypted,
    })
}

/// Mirrors the original's three-way encryption-negotiation branch
/// (required by master / required by device / optional), returning
/// `(use_encryption, chosen_name)`.
fn negotiate_encryption<'a>(
    config: &SlaveConfig,
    cipher: Option<&'a dyn BlockCipher>,
    master_flags: u32,
    supported_by_master: &[String],
) -> Result<(bool, &'a str)> {
    let master_requires = master_flags & flags::ENCRYPT_REQUIRED != 0;
    let master_forbids = master_flags & flags::ENCRYPT_FORBIDDEN != 0;
    let device_requires = config.device_flags & flags::ENCRYPT_REQUIRED != 0;
    let device_forbids = config.device_flags & flags::ENCRYPT_FORBIDDEN != 0;

    let supports = |name: &str| supported_by_master.iter().any(|s| s == name);

    if master_requires {
        let name = cipher.map(BlockCipher::name).unwrap_or("");
        if device_forbids || cipher.is_none() || !supports(name) {
            return Err(Error::fatal(ErrorCode::ProtocolError));
        }
        return Ok((true, name));
    }

    if device_requires {
        let name = cipher.map(BlockCipher::name).unwrap_or("");
        if master_forbids || cipher.is_none() || !supports(name) {
            return Err(Error::fatal(ErrorCode::ProtocolError));
        }
        return Ok((true, name));
    }

    if !device_forbids {
        if let Some(c) = cipher {
            if supports(c.name()) {
                return Ok((true, c.name()));
            }
        }
    }

    Ok((false, ""))
}

fn receive_control(
    transport: &mut dyn Transport,
    deframer: &mut Deframer,
    cipher: &dyn BlockCipher,
    timeout_ms: u32,
) -> Result<Message> {
    loop {
        match transport.receive(timeout_ms, None)? {
            crate::io::ReceiveOutcome::Byte(b) => {
                if let Some(msg) = deframer.push(b, cipher)? {
                    if !msg.is_control() {
                        return Err(Error::fatal(ErrorCode::ProtocolError));
                    }
                    return Ok(msg);
                }
            }
            crate::io::ReceiveOutcome::Timeout => return Err(Error::fatal(ErrorCode::Timeout)),
            crate::io::ReceiveOutcome::Disconnected => return Err(Error::Disconnected),
        }
    }
}

fn send_control(transport: &mut dyn Transport, cipher: &dyn BlockCipher, parts: &[&str]) -> Result<()> {
    let payload = codec::join(parts, ':', 512)?;
    let framed = framing::encode(Message::CONTROL, &payload, cipher)?;
    transport.send(&framed)?;
    Ok(())
}

/// Compares two byte strings in time proportional to
/// `max(a.len(), b.len())` rather than short-circuiting at the first
/// differing byte, closing the timing side channel the original C
/// `TODO` left open (SPEC_FULL.md §4.8).
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let len = a.len().max(b.len());
    let mut diff: u8 = (a.len() != b.len()) as u8;
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_eq_matches_equal() {
        assert!(constant_time_eq(b"hunter2", b"hunter2"));
    }

    #[test]
    fn constant_time_eq_rejects_any_mismatch() {
        assert!(!constant_time_eq(b"hunter2", b"hunter3"));
        assert!(!constant_time_eq(b"hunter2", b"xunter2"));
        assert!(!constant_time_eq(b"hunter2", b"hunter22"));
        assert!(!constant_time_eq(b"", b"x"));
    }

    #[test]
    fn constant_time_eq_empty_equals_empty() {
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn negotiate_encryption_optional_picks_up_shared_cipher() {
        struct Stub;
        impl BlockCipher for Stub {
            fn block_size(&self) -> usize {
                16
            }
            fn encrypt_block(&self, _b: &mut [u8]) {}
            fn decrypt_block(&self, _b: &mut [u8]) {}
            fn name(&self) -> &str {
                "AES128"
            }
        }
        let cfg = SlaveConfig::new("Slave", 1000);
        let cipher = Stub;
        let (used, name) =
            negotiate_encryption(&cfg, Some(&cipher), 0, &["AES128".to_string()]).unwrap();
        assert!(used);
        assert_eq!(name, "AES128");
    }

    #[test]
    fn negotiate_encryption_required_without_cipher_fails() {
        let cfg = SlaveConfig::new("Slave", 1000);
        let err = negotiate_encryption(&cfg, None, flags::ENCRYPT_REQUIRED, &[]).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::ProtocolError));
    }
}

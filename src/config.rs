//! Embedding configuration (C12): the parameters a host supplies once,
//! before `start()`, via the `setup`/`set_*` calls of SPEC_FULL.md §6.2.

/// Handshake flag bits negotiated between master and slave
/// (SPEC_FULL.md §6.1).
pub mod flags {
    /// The master (or device) requires authentication before the
    /// session proceeds.
    pub const AUTH_REQUIRED: u32 = 1 << 0;
    /// Encryption is required; a peer without a matching cipher fails
    /// the handshake.
    pub const ENCRYPT_REQUIRED: u32 = 1 << 1;
    /// Encryption is forbidden even if both peers support it.
    pub const ENCRYPT_FORBIDDEN: u32 = 1 << 2;
}

/// The slave-side configuration a host sets up before calling
/// `Session::run`.
///
/// Mirrors the `opdi_setup`/`opdi_set_encoding`/`opdi_set_username`/
/// `opdi_set_password` family from the original source, collected into
/// one builder-style value rather than a handful of free functions
/// mutating process-wide globals (SPEC_FULL.md §9's "global buffers"
/// note applies equally to configuration state).
#[derive(Clone, Debug)]
pub struct SlaveConfig {
    pub(crate) slave_name: String,
    pub(crate) idle_timeout_ms: u32,
    pub(crate) encoding: String,
    pub(crate) languages: String,
    pub(crate) username: Option<String>,
    pub(crate) password: Option<String>,
    pub(crate) device_flags: u32,
    pub(crate) max_payload_len: usize,
}

impl SlaveConfig {
    /// Default payload length bound, within the 40-512 byte range
    /// SPEC_FULL.md §3 names as typical.
    pub const DEFAULT_MAX_PAYLOAD_LEN: usize = 256;

    /// Builds a config with `slave_name` and `idle_timeout_ms`; every
    /// other field takes a permissive default (no auth, no encryption
    /// requirement, `utf-8` encoding).
    pub fn new(slave_name: impl Into<String>, idle_timeout_ms: u32) -> Self {
        Self {
            slave_name: slave_name.into(),
            idle_timeout_ms,
            encoding: "utf-8".to_string(),
            languages: String::new(),
            username: None,
            password: None,
            device_flags: 0,
            max_payload_len: Self::DEFAULT_MAX_PAYLOAD_LEN,
        }
    }

    /// Sets the rendering charset name advertised to the master during
    /// handshake (`set_encoding`).
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    /// Sets the preferred-languages string passed through to the host's
    /// language-selection hook (`set_languages`).
    pub fn with_languages(mut self, languages: impl Into<String>) -> Self {
        self.languages = languages.into();
        self
    }

    /// Sets the expected username for `Auth` (`set_username`). Matched
    /// case-insensitively.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.device_flags |= flags::AUTH_REQUIRED;
        self
    }

    /// Sets the expected password for `Auth` (`set_password`). Matched
    /// case-sensitively, in constant time.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the handshake flags word advertised by this device (a
    /// combination of the [`flags`] bits).
    pub fn with_device_flags(mut self, device_flags: u32) -> Self {
        self.device_flags = device_flags;
        self
    }

    /// Overrides the maximum payload length accepted/produced
    /// (SPEC_FULL.md §3).
    pub fn with_max_payload_len(mut self, max_payload_len: usize) -> Self {
        self.max_payload_len = max_payload_len;
        self
    }

    /// The name advertised to the master during handshake.
    pub fn slave_name(&self) -> &str {
        &self.slave_name
    }

    /// The idle timeout, in milliseconds, configured for this slave.
    pub fn idle_timeout_ms(&self) -> u32 {
        self.idle_timeout_ms
    }

    /// `true` if `AUTH_REQUIRED` is set in this device's handshake flags.
    pub fn requires_auth(&self) -> bool {
        self.device_flags & flags::AUTH_REQUIRED != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_username_implies_auth_required() {
        let cfg = SlaveConfig::new("Slave", 5000).with_username("alice");
        assert!(cfg.requires_auth());
    }

    #[test]
    fn defaults_are_permissive() {
        let cfg = SlaveConfig::new("Slave", 5000);
        assert!(!cfg.requires_auth());
        assert_eq!(cfg.encoding, "utf-8");
    }
}

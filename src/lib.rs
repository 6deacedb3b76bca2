#![deny(missing_docs)]

//! `portwire`: framing, handshake, and typed port dispatch for a small,
//! device-oriented interaction protocol.
//!
//! A controlling peer (the "master") discovers, inspects, and mutates
//! typed ports exposed by this crate's embedder (the "slave") over any
//! reliable, message-preserving byte transport. This crate implements
//! the protocol's core: message framing ([`framing`]), the handshake
//! and session state machines ([`handshake`], [`session`]), and the
//! port model and dispatch layer ([`port`], [`dispatch`]). Binding ports
//! to real hardware, loading configuration files, and running a host
//! event loop are the embedder's job — see `demos/host-demo` for a
//! minimal example.

/// Streaming channel bindings (C10).
pub mod bindings;
/// Abstract block cipher hook (C2).
pub mod cipher;
/// Payload splitting/joining and fixed-width numeric parse/format (C4).
pub mod codec;
/// Embedding configuration (C12).
pub mod config;
/// The protocol dispatcher (C7).
pub mod dispatch;
/// Wire-level error codes and the crate's error type.
pub mod error;
/// Message framing and deframing (C3).
pub mod framing;
/// The handshake driver (C8).
pub mod handshake;
/// The byte I/O boundary (C1).
pub mod io;
/// Optional persistent-state hook.
pub mod persist;
/// The port model (C6).
pub mod port;
/// The port registry (C5).
pub mod registry;
/// The session loop (C9).
pub mod session;

/// The slave-side embedding configuration builder.
pub use config::SlaveConfig;
/// The crate's error type and wire error codes.
pub use error::{Error, ErrorCode, Result};
/// The in-memory port registry.
pub use registry::PortRegistry;
/// The session loop and its host-facing types.
pub use session::{Session, SessionEnd, SessionHooks};

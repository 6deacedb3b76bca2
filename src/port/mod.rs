//! The port model (C6): a closed family of typed, named endpoints a
//! master can inspect and (usually) mutate.
//!
//! Following the design note in SPEC_FULL.md §9, a port is represented
//! as a sum type rather than a tagged union or trait-object hierarchy:
//! the wire tags (`"0".."4"`) are a fixed, closed set, and an enum gives
//! exhaustiveness checking the original's tagged-union-plus-switch
//! pattern had to maintain by hand.

mod analog;
mod dial;
mod digital;
mod select;
mod streaming;

/// Analog port type and its mode/reference enums.
pub use analog::{AnalogMode, AnalogPort, Reference};
/// Dial port type.
pub use dial::DialPort;
/// Digital port type and its mode/line enums.
pub use digital::{DigitalMode, DigitalPort, Line};
/// Select port type.
pub use select::SelectPort;
/// Streaming port type and its host callback trait.
pub use streaming::{StreamingHooks, StreamingPort};

use crate::error::{Error, ErrorCode, Result};

/// The closed set of port types, discriminated on the wire by a single
/// ASCII digit (SPEC_FULL.md §6.1).
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PortKind {
    Digital,
    Analog,
    Select,
    Dial,
    Streaming,
}

impl PortKind {
    /// The wire tag sent as the first token of a `gPI` response.
    pub fn wire_tag(self) -> &'static str {
        match self {
            PortKind::Digital => "0",
            PortKind::Analog => "1",
            PortKind::Select => "2",
            PortKind::Dial => "3",
            PortKind::Streaming => "4",
        }
    }
}

/// A port's direction capability.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    Input,
    Output,
    Bidi,
}

impl Direction {
    /// The wire tag sent as the third token of a `gPI` response.
    pub fn wire_tag(self) -> &'static str {
        match self {
            Direction::Input => "0",
            Direction::Output => "1",
            Direction::Bidi => "2",
        }
    }
}

/// How a port asks the master to re-read its state.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RefreshMode {
    Off,
    Periodic { period_ms: u32 },
    OnChange,
}

/// A port's current error state (SPEC_FULL.md §3).
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PortErrorState {
    Ok,
    ValueExpired,
    ValueNotAvailable,
    PortError,
    AccessDenied,
}

/// Host-supplied lifecycle and work callbacks for one port.
///
/// All methods have no-op defaults so a host that only cares about, say,
/// `do_work` does not have to implement `prepare`/`release` too.
pub trait PortHooks {
    /// Called once, after registration, before the first session starts.
    /// May resolve cross-port references or acquire hardware.
    fn prepare(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called once per registry teardown, in reverse registration order.
    fn release(&mut self) {}

    /// Called on every session-loop pass. Returns whether the port wants
    /// a `Ref:<id>` control message sent on its behalf.
    fn do_work(&mut self, _may_send: bool) -> Result<bool> {
        Ok(false)
    }
}

/// Descriptive metadata shared by every port, regardless of type.
#[allow(missing_docs)]
pub struct PortMeta {
    pub id: String,
    pub label: String,
    pub group: Option<String>,
    pub icon: Option<String>,
    pub unit: Option<String>,
    pub tag: Option<String>,
    pub direction: Direction,
    pub flags: u16,
    pub readonly: bool,
    pub hidden: bool,
    pub persistent: bool,
    pub order_id: Option<u32>,
    pub refresh_mode: RefreshMode,
    pub error_state: PortErrorState,
    pub hooks: Option<Box<dyn PortHooks>>,
}

impl PortMeta {
    /// Builds metadata with every optional field unset and permissive
    /// defaults (writable, visible, non-persistent, no refresh).
    pub fn new(id: impl Into<String>, label: impl Into<String>, direction: Direction) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            group: None,
            icon: None,
            unit: None,
            tag: None,
            direction,
            flags: 0,
            readonly: false,
            hidden: false,
            persistent: false,
            order_id: None,
            refresh_mode: RefreshMode::Off,
            error_state: PortErrorState::Ok,
            hooks: None,
        }
    }

    /// Sets the purely-descriptive group ID.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Sets the purely-descriptive unit string (e.g. `"V"`, `"%"`).
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Sets the purely-descriptive icon identifier.
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Sets the purely-descriptive free-form tag string.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Marks this port readonly; mutating operations are then rejected
    /// with `PortAccessDenied`.
    pub fn with_readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }

    /// Marks this port's value as persisted across restarts
    /// (SPEC_FULL.md §6.3).
    pub fn with_persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    /// Sets an explicit display-order tiebreaker.
    pub fn with_order_id(mut self, order_id: u32) -> Self {
        self.order_id = Some(order_id);
        self
    }

    /// Attaches the host's lifecycle/work-tick callbacks.
    pub fn with_hooks(mut self, hooks: Box<dyn PortHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Returns `Err(PortAccessDenied)` if this port is readonly.
    pub fn require_writable(&self) -> Result<()> {
        if self.readonly {
            Err(Error::request(ErrorCode::PortAccessDenied))
        } else {
            Ok(())
        }
    }
}

/// A named group of ports, purely descriptive (used by masters for UI
/// grouping); the registry does not enforce that a port's `group`
/// refers to a registered `PortGroup`.
#[allow(missing_docs)]
pub struct PortGroup {
    pub id: String,
    pub label: String,
    pub parent: Option<String>,
    pub order_id: Option<u32>,
}

impl PortGroup {
    /// Builds a group with no parent and no explicit display order.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            parent: None,
            order_id: None,
        }
    }
}

/// A registered port: shared metadata plus exactly one type-specific
/// variant.
#[allow(missing_docs)]
pub enum Port {
    Digital(PortMeta, DigitalPort),
    Analog(PortMeta, AnalogPort),
    Select(PortMeta, SelectPort),
    Dial(PortMeta, DialPort),
    Streaming(PortMeta, StreamingPort),
}

impl Port {
    /// This port's type, discriminating which variant is active.
    pub fn kind(&self) -> PortKind {
        match self {
            Port::Digital(..) => PortKind::Digital,
            Port::Analog(..) => PortKind::Analog,
            Port::Select(..) => PortKind::Select,
            Port::Dial(..) => PortKind::Dial,
            Port::Streaming(..) => PortKind::Streaming,
        }
    }

    /// Shared metadata, regardless of type.
    pub fn meta(&self) -> &PortMeta {
        match self {
            Port::Digital(m, _)
            | Port::Analog(m, _)
            | Port::Select(m, _)
            | Port::Dial(m, _)
            | Port::Streaming(m, _) => m,
        }
    }

    /// Mutable access to shared metadata.
    pub fn meta_mut(&mut self) -> &mut PortMeta {
        match self {
            Port::Digital(m, _)
            | Port::Analog(m, _)
            | Port::Select(m, _)
            | Port::Dial(m, _)
            | Port::Streaming(m, _) => m,
        }
    }

    /// This port's opaque ID, unique within its registry.
    pub fn id(&self) -> &str {
        &self.meta().id
    }

    /// Runs `prepare` on the host hook, if any.
    pub fn prepare(&mut self) -> Result<()> {
        if let Some(hooks) = self.meta_mut().hooks.as_mut() {
            hooks.prepare()
        } else {
            Ok(())
        }
    }

    /// Runs `release` on the host hook, if any.
    pub fn release(&mut self) {
        if let Some(hooks) = self.meta_mut().hooks.as_mut() {
            hooks.release();
        }
    }

    /// Runs `do_work` on the host hook, if any; `Ok(false)` if there is
    /// none.
    pub fn do_work(&mut self, may_send: bool) -> Result<bool> {
        if let Some(hooks) = self.meta_mut().hooks.as_mut() {
            hooks.do_work(may_send)
        } else {
            Ok(false)
        }
    }

    /// The fixed-shape `gPI` response body for this port (without the
    /// leading `gPI`/port-id echo, which the dispatcher supplies).
    ///
    /// After the fixed per-type fields, carries the port's descriptive
    /// `unit`/`icon`/`tag` strings (empty when unset) per SPEC_FULL.md
    /// §4.6.1, mirroring `opdi_ports.h`'s per-type `caps` composition.
    ///
    /// A dial port additionally carries its `<min>:<max>:<step>` range
    /// here rather than in its state reply, matching the original's
    /// `send_dial_port_info` (range is descriptive, not state).
    pub fn info_parts(&self) -> Vec<String> {
        let meta = self.meta();
        let mut parts = vec![
            self.kind().wire_tag().to_string(),
            meta.label.clone(),
            meta.direction.wire_tag().to_string(),
        ];
        parts.extend(self.state_parts());
        if let Port::Dial(_, p) = self {
            parts.extend(p.range_parts());
        }
        parts.push(meta.unit.clone().unwrap_or_default());
        parts.push(meta.icon.clone().unwrap_or_default());
        parts.push(meta.tag.clone().unwrap_or_default());
        parts
    }

    /// The fixed-shape state body returned by this port's `g*S`
    /// operation (and embedded in `gPI`/`gAPS`).
    pub fn state_parts(&self) -> Vec<String> {
        match self {
            Port::Digital(_, p) => p.state_parts(),
            Port::Analog(_, p) => p.state_parts(),
            Port::Select(_, p) => p.state_parts(),
            Port::Dial(_, p) => p.state_parts(),
            Port::Streaming(_, p) => p.state_parts(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_parts_carries_descriptive_fields() {
        let meta = PortMeta::new("D1", "Status LED", Direction::Output)
            .with_unit("V")
            .with_icon("led")
            .with_tag("front-panel");
        let port = Port::Digital(meta, DigitalPort::new(DigitalMode::Output, Line::Low));
        let parts = port.info_parts();
        assert_eq!(parts[0], "0");
        assert_eq!(parts[1], "Status LED");
        assert_eq!(parts[2], "1");
        assert_eq!(&parts[parts.len() - 3..], &["V", "led", "front-panel"]);
    }

    #[test]
    fn info_parts_defaults_descriptive_fields_to_empty() {
        let meta = PortMeta::new("D1", "D1", Direction::Bidi);
        let port = Port::Digital(meta, DigitalPort::new(DigitalMode::Output, Line::Low));
        let parts = port.info_parts();
        assert_eq!(&parts[parts.len() - 3..], &["", "", ""]);
    }

    #[test]
    fn info_parts_carries_dial_range_after_position() {
        let meta = PortMeta::new("DL1", "DL1", Direction::Bidi);
        let port = Port::Dial(meta, DialPort::new(0, 100, 10).unwrap());
        let parts = port.info_parts();
        // tag, label, direction, position, min, max, step, unit, icon, tag
        assert_eq!(parts.len(), 10);
        assert_eq!(&parts[3..7], &["0", "0", "100", "10"]);
    }
}

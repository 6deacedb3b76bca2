//! The port registry (C5): an in-memory, insertion-ordered collection of
//! ports and groups with lookup by identifier.

use std::collections::HashMap;

use crate::error::{Error, ErrorCode, Result};
use crate::port::{Port, PortGroup};

/// Owns every port and group registered by the host before a session
/// starts.
///
/// Ports are kept in an insertion-ordered `Vec` plus a `HashMap` index for
/// O(1) [`PortRegistry::find_by_id`], replacing the original's intrusive
/// linked list and linear scan with a strict, behavior-preserving
/// improvement (SPEC_FULL.md §9).
pub struct PortRegistry {
    ports: Vec<Port>,
    index: HashMap<String, usize>,
    groups: Vec<PortGroup>,
    next_order_id: u32,
}

impl PortRegistry {
    /// Builds an empty registry.
    pub fn new() -> Self {
        Self {
            ports: Vec::new(),
            index: HashMap::new(),
            groups: Vec::new(),
            next_order_id: 0,
        }
    }

    /// Appends `port`, assigning it a display order if it has none.
    /// Returns `Err` if a port with the same ID is already registered.
    pub fn add_port(&mut self, mut port: Port) -> Result<()> {
        let id = port.id().to_string();
        if self.index.contains_key(&id) {
            return Err(Error::request_msg(ErrorCode::PortUnknown, format!("duplicate port id: {id}")));
        }
        if port.meta().order_id.is_none() {
            port.meta_mut().order_id = Some(self.next_order_id);
        }
        self.next_order_id += 1;

        self.index.insert(id, self.ports.len());
        self.ports.push(port);
        Ok(())
    }

    /// Appends a descriptive group. Groups are not indexed or validated
    /// against port references (SPEC_FULL.md §3).
    pub fn add_group(&mut self, group: PortGroup) {
        self.groups.push(group);
    }

    /// Every registered group, in insertion order.
    pub fn groups(&self) -> &[PortGroup] {
        &self.groups
    }

    /// Looks up a port by ID. `case_sensitive = false` falls back to an
    /// ASCII case-insensitive linear scan if the exact-case lookup misses.
    pub fn find_by_id(&self, id: &str, case_sensitive: bool) -> Option<&Port> {
        if let Some(&i) = self.index.get(id) {
            return self.ports.get(i);
        }
        if case_sensitive {
            return None;
        }
        self.ports.iter().find(|p| p.id().eq_ignore_ascii_case(id))
    }

    /// Mutable counterpart of [`PortRegistry::find_by_id`].
    pub fn find_by_id_mut(&mut self, id: &str, case_sensitive: bool) -> Option<&mut Port> {
        if let Some(&i) = self.index.get(id) {
            return self.ports.get_mut(i);
        }
        if case_sensitive {
            return None;
        }
        self.ports.iter_mut().find(|p| p.id().eq_ignore_ascii_case(id))
    }

    /// Ports in display order: explicit `order_id` wins; ties (including
    /// all-default order IDs) break by stable insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Port> {
        self.sorted_indices().into_iter().map(move |i| &self.ports[i])
    }

    /// Mutable iteration in insertion order (not display order, since
    /// that would require re-deriving indices after any reorder — callers
    /// needing display order for read-only enumeration should use
    /// [`PortRegistry::iter`]).
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Port> {
        self.ports.iter_mut()
    }

    /// The number of registered ports.
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    /// `true` if no ports are registered.
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    fn sorted_indices(&self) -> Vec<usize> {
        let mut idx: Vec<usize> = (0..self.ports.len()).collect();
        idx.sort_by_key(|&i| (self.ports[i].meta().order_id.unwrap_or(u32::MAX), i));
        idx
    }

    /// Runs `Port::prepare` on every registered port, in insertion order.
    /// Called once by the host before the first session starts.
    pub fn prepare(&mut self) -> Result<()> {
        for port in self.ports.iter_mut() {
            port.prepare()?;
        }
        self.sort();
        Ok(())
    }

    /// Part of the embedding interface (SPEC_FULL.md §6.2): a no-op
    /// here, since [`PortRegistry::iter`] already computes display
    /// order on demand from `order_id`/insertion-order ties rather than
    /// caching a reordered list. Kept as an explicit call so the host's
    /// `add_port* -> sort_ports() -> prepare()` sequence from the
    /// original source reads the same way in this crate.
    pub fn sort(&mut self) {}

    /// Releases every port in reverse registration order, matching the
    /// teardown order SPEC_FULL.md §3 specifies, then drops all
    /// bookkeeping. Hosts are responsible for actual hardware release
    /// inside their `PortHooks::release` implementations.
    pub fn clear(&mut self) {
        for port in self.ports.iter_mut().rev() {
            port.release();
        }
        self.ports.clear();
        self.index.clear();
        self.groups.clear();
    }
}

impl Default for PortRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{Direction, DigitalMode, DigitalPort, Line, PortMeta};

    fn digital(id: &str) -> Port {
        Port::Digital(
            PortMeta::new(id, id, Direction::Bidi),
            DigitalPort::new(DigitalMode::Output, Line::Low),
        )
    }

    #[test]
    fn insertion_order_is_stable_without_order_id() {
        let mut reg = PortRegistry::new();
        reg.add_port(digital("c")).unwrap();
        reg.add_port(digital("a")).unwrap();
        reg.add_port(digital("b")).unwrap();
        let ids: Vec<&str> = reg.iter().map(Port::id).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn explicit_order_id_wins() {
        let mut reg = PortRegistry::new();
        reg.add_port(digital("first")).unwrap();
        let mut second = digital("second");
        second.meta_mut().order_id = Some(0);
        reg.add_port(second).unwrap();
        let ids: Vec<&str> = reg.iter().map(Port::id).collect();
        assert_eq!(ids, vec!["second", "first"]);
    }

    #[test]
    fn rejects_duplicate_id() {
        let mut reg = PortRegistry::new();
        reg.add_port(digital("d1")).unwrap();
        assert!(reg.add_port(digital("d1")).is_err());
    }

    #[test]
    fn find_by_id_case_insensitive_fallback() {
        let mut reg = PortRegistry::new();
        reg.add_port(digital("D1")).unwrap();
        assert!(reg.find_by_id("d1", true).is_none());
        assert!(reg.find_by_id("d1", false).is_some());
    }

    #[test]
    fn clear_releases_in_reverse_order() {
        let mut reg = PortRegistry::new();
        reg.add_port(digital("a")).unwrap();
        reg.add_port(digital("b")).unwrap();
        reg.clear();
        assert!(reg.is_empty());
    }
}

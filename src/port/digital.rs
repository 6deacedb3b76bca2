//! Digital ports: a single line, either driven or sensed.

use crate::error::{Error, ErrorCode, Result};

/// A digital port's current pin mode.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DigitalMode {
    InputFloating,
    InputPullup,
    InputPulldown,
    Output,
}

impl DigitalMode {
    /// The wire tag for this mode (SPEC_FULL.md §6.1).
    pub fn wire_tag(self) -> &'static str {
        match self {
            DigitalMode::InputFloating => "0",
            DigitalMode::InputPullup => "1",
            DigitalMode::InputPulldown => "2",
            DigitalMode::Output => "3",
        }
    }

    /// Parses a mode from its wire tag.
    pub fn from_wire(tag: &str) -> Result<Self> {
        match tag {
            "0" => Ok(DigitalMode::InputFloating),
            "1" => Ok(DigitalMode::InputPullup),
            "2" => Ok(DigitalMode::InputPulldown),
            "3" => Ok(DigitalMode::Output),
            _ => Err(Error::request(ErrorCode::ProtocolError)),
        }
    }
}

/// A digital port's current line state.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Line {
    Low,
    High,
}

impl Line {
    /// The wire tag for this line state (SPEC_FULL.md §6.1).
    pub fn wire_tag(self) -> &'static str {
        match self {
            Line::Low => "0",
            Line::High => "1",
        }
    }

    /// Parses a line state from its wire tag.
    pub fn from_wire(tag: &str) -> Result<Self> {
        match tag {
            "0" => Ok(Line::Low),
            "1" => Ok(Line::High),
            _ => Err(Error::request(ErrorCode::ProtocolError)),
        }
    }
}

/// Type-specific state for a digital port.
#[allow(missing_docs)]
pub struct DigitalPort {
    pub mode: DigitalMode,
    pub line: Line,
}

impl DigitalPort {
    /// Builds a digital port with the given initial mode and line.
    pub fn new(mode: DigitalMode, line: Line) -> Self {
        Self { mode, line }
    }

    /// `gDS`: `<mode>:<line>`.
    pub fn state_parts(&self) -> Vec<String> {
        vec![self.mode.wire_tag().to_string(), self.line.wire_tag().to_string()]
    }

    /// `sDM`.
    pub fn set_mode(&mut self, mode: DigitalMode) {
        self.mode = mode;
    }

    /// `sDL`. Only meaningful while `mode == Output`, but the original
    /// protocol does not reject setting the line on an input-mode port
    /// (the master is expected to have set the mode first); this mirrors
    /// that permissiveness.
    pub fn set_line(&mut self, line: Line) {
        self.line = line;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_wire_roundtrip() {
        for m in [
            DigitalMode::InputFloating,
            DigitalMode::InputPullup,
            DigitalMode::InputPulldown,
            DigitalMode::Output,
        ] {
            assert_eq!(DigitalMode::from_wire(m.wire_tag()).unwrap(), m);
        }
    }

    #[test]
    fn set_line_updates_state() {
        let mut p = DigitalPort::new(DigitalMode::Output, Line::Low);
        p.set_line(Line::High);
        assert_eq!(p.state_parts(), vec!["3", "1"]);
    }
}

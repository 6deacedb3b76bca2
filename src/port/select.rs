//! Select ports: a fixed, ordered list of labels with one chosen
//! position.

use crate::error::{Error, ErrorCode, Result};

/// Type-specific state for a select port.
pub struct SelectPort {
    labels: Vec<String>,
    position: u16,
}

impl SelectPort {
    /// `labels` must be non-empty; the initial position is `0`.
    pub fn new(labels: Vec<String>) -> Result<Self> {
        if labels.is_empty() {
            return Err(Error::request(ErrorCode::PositionInvalid));
        }
        Ok(Self { labels, position: 0 })
    }

    /// The fixed, ordered position labels.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// The current position index, always within `0..labels().len()`.
    pub fn position(&self) -> u16 {
        self.position
    }

    /// `gSL`: the label at `position`, or `PositionInvalid` if out of
    /// range.
    pub fn label_at(&self, position: u16) -> Result<&str> {
        self.labels
            .get(position as usize)
            .map(String::as_str)
            .ok_or_else(|| Error::request(ErrorCode::PositionInvalid))
    }

    /// `gSS`: `<position>`.
    pub fn state_parts(&self) -> Vec<String> {
        vec![self.position.to_string()]
    }

    /// `sSP`.
    pub fn set_position(&mut self, position: u16) -> Result<()> {
        if position as usize >= self.labels.len() {
            return Err(Error::request(ErrorCode::PositionInvalid));
        }
        self.position = position;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_label_list() {
        assert!(SelectPort::new(Vec::new()).is_err());
    }

    #[test]
    fn rejects_out_of_range_position() {
        let mut p = SelectPort::new(vec!["a".into(), "b".into()]).unwrap();
        assert!(p.set_position(1).is_ok());
        assert!(p.set_position(2).is_err());
    }

    #[test]
    fn label_at_returns_requested_position() {
        let p = SelectPort::new(vec!["A".into(), "B".into(), "C".into()]).unwrap();
        assert_eq!(p.label_at(1).unwrap(), "B");
        assert!(p.label_at(3).is_err());
    }
}

//! Dial ports: a bounded, step-aligned integer position (e.g. a rotary
//! encoder or a slider).

use crate::error::{Error, ErrorCode, Result};

/// Type-specific state for a dial port.
pub struct DialPort {
    min: i64,
    max: i64,
    step: i64,
    position: i64,
}

impl DialPort {
    /// `min <= max`, `step >= 1`; the initial position is `min`.
    pub fn new(min: i64, max: i64, step: i64) -> Result<Self> {
        if min > max || step < 1 {
            return Err(Error::request(ErrorCode::PositionInvalid));
        }
        Ok(Self {
            min,
            max,
            step,
            position: min,
        })
    }

    /// The lower bound of this dial's range.
    pub fn min(&self) -> i64 {
        self.min
    }

    /// The upper bound of this dial's range.
    pub fn max(&self) -> i64 {
        self.max
    }

    /// The step a position must be reachable from `min` by.
    pub fn step(&self) -> i64 {
        self.step
    }

    /// The current position, always in range and step-aligned.
    pub fn position(&self) -> i64 {
        self.position
    }

    /// `gDLS`: `<position>` alone, matching the original's
    /// `get_dial_port_state`. Range and step are descriptive and carried
    /// in `gPI` (`send_dial_port_info`) instead, via [`Self::range_parts`].
    pub fn state_parts(&self) -> Vec<String> {
        vec![self.position.to_string()]
    }

    /// The `<min>:<max>:<step>` fields `gPI` embeds for a dial port,
    /// matching the original's `send_dial_port_info`.
    pub fn range_parts(&self) -> Vec<String> {
        vec![
            self.min.to_string(),
            self.max.to_string(),
            self.step.to_string(),
        ]
    }

    /// `sDLP`. Rejects positions outside `[min, max]` or not reachable
    /// from `min` in whole multiples of `step`.
    pub fn set_position(&mut self, position: i64) -> Result<()> {
        if position < self.min || position > self.max {
            return Err(Error::request(ErrorCode::PositionInvalid));
        }
        if (position - self.min) % self.step != 0 {
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
    fn rejects_out_of_bounds() {
        let mut p = DialPort::new(0, 100, 10).unwrap();
        assert!(p.set_position(-1).is_err());
        assert!(p.set_position(101).is_err());
    }

    #[test]
    fn rejects_step_misalignment() {
        let mut p = DialPort::new(0, 100, 10).unwrap();
        assert!(p.set_position(25).is_err());
        assert!(p.set_position(30).is_ok());
    }

    #[test]
    fn rejects_invalid_bounds() {
        assert!(DialPort::new(10, 0, 1).is_err());
        assert!(DialPort::new(0, 10, 0).is_err());
    }

    #[test]
    fn state_parts_carries_only_position() {
        let mut p = DialPort::new(0, 100, 10).unwrap();
        p.set_position(30).unwrap();
        assert_eq!(p.state_parts(), vec!["30".to_string()]);
    }

    #[test]
    fn range_parts_carries_min_max_step() {
        let p = DialPort::new(0, 100, 10).unwrap();
        assert_eq!(
            p.range_parts(),
            vec!["0".to_string(), "100".to_string(), "10".to_string()]
        );
    }
}

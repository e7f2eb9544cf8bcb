//! Simulation clock. Owns the step counter.

use crate::types::{RunId, Step};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimClock {
    pub run_id:       RunId,
    pub current_step: Step,
}

impl SimClock {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            current_step: 0,
        }
    }

    /// Advance one step. Returns the new step number.
    pub fn advance(&mut self) -> Step {
        self.current_step += 1;
        self.current_step
    }

    pub fn reset(&mut self) {
        self.current_step = 0;
    }

    /// Years and months elapsed, for display. One step = one month.
    pub fn calendar(&self) -> (u64, u64) {
        (self.current_step / 12, self.current_step % 12)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_and_reset() {
        let mut clock = SimClock::new("clock-test".into());
        assert_eq!(clock.advance(), 1);
        assert_eq!(clock.advance(), 2);
        clock.reset();
        assert_eq!(clock.current_step, 0);
    }

    #[test]
    fn calendar_counts_months() {
        let mut clock = SimClock::new("clock-test".into());
        for _ in 0..27 {
            clock.advance();
        }
        assert_eq!(clock.calendar(), (2, 3));
    }
}

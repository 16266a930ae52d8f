//! Wall-clock budget enforcement, checked at controller-defined boundaries
//! (after intent, after baseline, after light eval, after compare, before
//! and after deep eval, before justify, before explain).

use std::time::{Duration, Instant};

pub struct Budget {
    deadline: Instant,
    total_s: u64,
}

impl Budget {
    pub fn new(max_time_s: u64) -> Self {
        Self { deadline: Instant::now() + Duration::from_secs(max_time_s), total_s: max_time_s }
    }

    /// Baseline work is treated as "already done": the budget clock resets
    /// once it completes so the user-visible investigation gets the full
    /// window regardless of how long grounding took.
    pub fn reset(&mut self, max_time_s: u64) {
        self.deadline = Instant::now() + Duration::from_secs(max_time_s);
        self.total_s = max_time_s;
    }

    pub fn exceeded(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub fn elapsed_s(&self) -> f64 {
        let remaining = self.deadline.saturating_duration_since(Instant::now()).as_secs_f64();
        (self.total_s as f64 - remaining).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_budget_is_not_exceeded() {
        let budget = Budget::new(5);
        assert!(!budget.exceeded());
    }

    #[test]
    fn zero_budget_is_immediately_exceeded() {
        let budget = Budget::new(0);
        assert!(budget.exceeded());
    }
}

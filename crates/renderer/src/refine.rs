//! Debounce timer for the refinement pass.
//!
//! Every change restarts the quiescence period; the refinement fires only
//! once no change has arrived for the whole delay. The timer is generic
//! over the instant type so the same logic runs against `std::time` in
//! synchronous hosts and `tokio::time` (including paused test time) in
//! the async layer.

use std::ops::Add;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RefinementTimer<I = std::time::Instant> {
    delay: Duration,
    deadline: Option<I>,
}

impl<I> RefinementTimer<I>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// (Re)start the quiescence period at `now`, replacing any pending deadline.
    pub fn schedule(&mut self, now: I) -> I {
        let deadline = now + self.delay;
        self.deadline = Some(deadline);
        deadline
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<I> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// True (and disarmed) when the deadline has passed.
    pub fn fire_if_due(&mut self, now: I) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

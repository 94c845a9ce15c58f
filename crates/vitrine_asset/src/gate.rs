//! Completion gate - the state machine behind the one-shot ready signal
//!
//! Four independent triggers race to complete a load:
//! 1. natural completion: every fetch settled;
//! 2. grace window: progress observed at 100% but natural completion has
//!    not landed within a short window;
//! 3. safety ceiling: an absolute bound from load start, so a stuck fetch
//!    can never hang the load forever;
//! 4. empty fast path: a zero-asset manifest completes after a minimal
//!    delay, keeping the signal asynchronous with the load call.
//!
//! Whichever trigger fires first wins; every later trigger finds the gate
//! already complete and does nothing. Time is always passed in, never
//! sampled here, so tests can drive the clock.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    /// Load not started
    Idle,
    /// Load in flight, ready not yet signaled
    Pending,
    /// Terminal; ready has been signaled
    Complete,
}

/// One-shot completion state machine
#[derive(Debug)]
pub struct CompletionGate {
    grace: Duration,
    safety: Duration,
    empty_delay: Duration,

    state: GateState,
    total: usize,
    /// Safety ceiling, or the empty fast-path deadline when total is zero
    deadline: Option<Instant>,
    /// Armed the first time progress is observed at 100%
    grace_deadline: Option<Instant>,
}

impl CompletionGate {
    pub fn new(grace: Duration, safety: Duration, empty_delay: Duration) -> Self {
        Self {
            grace,
            safety,
            empty_delay,
            state: GateState::Idle,
            total: 0,
            deadline: None,
            grace_deadline: None,
        }
    }

    /// Arm the gate at load start. With zero units the deadline is the
    /// empty fast path; otherwise the safety ceiling.
    pub fn begin(&mut self, now: Instant, total: usize) {
        self.state = GateState::Pending;
        self.total = total;
        self.grace_deadline = None;
        self.deadline = Some(if total == 0 {
            now + self.empty_delay
        } else {
            now + self.safety
        });
    }

    /// Note that progress has reached 100%. Arms the grace window once;
    /// repeat observations keep the original deadline.
    pub fn note_full_progress(&mut self, now: Instant) {
        if self.state == GateState::Pending && self.grace_deadline.is_none() {
            self.grace_deadline = Some(now + self.grace);
        }
    }

    /// Evaluate every trigger. Returns true exactly once, on the
    /// transition to complete; all later calls return false.
    pub fn poll(&mut self, now: Instant, settled: usize) -> bool {
        if self.state != GateState::Pending {
            return false;
        }

        if self.total > 0 && settled >= self.total {
            log::debug!("load complete: all {} fetches settled", self.total);
            return self.fire();
        }

        if let Some(grace_deadline) = self.grace_deadline {
            if now >= grace_deadline {
                log::warn!("forcing completion: progress at 100% but completion signal stalled");
                return self.fire();
            }
        }

        if let Some(deadline) = self.deadline {
            if now >= deadline {
                if self.total == 0 {
                    log::debug!("empty manifest, completing load");
                } else {
                    log::warn!(
                        "load timeout reached with {}/{} fetches settled, forcing completion",
                        settled,
                        self.total
                    );
                }
                return self.fire();
            }
        }

        false
    }

    pub fn fired(&self) -> bool {
        self.state == GateState::Complete
    }

    fn fire(&mut self) -> bool {
        self.state = GateState::Complete;
        self.deadline = None;
        self.grace_deadline = None;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> CompletionGate {
        CompletionGate::new(
            Duration::from_secs(2),
            Duration::from_secs(30),
            Duration::from_secs(1),
        )
    }

    #[test]
    fn test_natural_completion_fires_once() {
        let t0 = Instant::now();
        let mut gate = gate();
        gate.begin(t0, 2);

        assert!(!gate.poll(t0, 1));
        assert!(gate.poll(t0, 2));
        assert!(gate.fired());
        assert!(!gate.poll(t0, 2));
        assert!(!gate.poll(t0 + Duration::from_secs(60), 2));
    }

    #[test]
    fn test_empty_fast_path_is_never_synchronous() {
        let t0 = Instant::now();
        let mut gate = gate();
        gate.begin(t0, 0);

        assert!(!gate.poll(t0, 0));
        assert!(!gate.poll(t0 + Duration::from_millis(500), 0));
        assert!(gate.poll(t0 + Duration::from_secs(1), 0));
        assert!(!gate.poll(t0 + Duration::from_secs(2), 0));
    }

    #[test]
    fn test_safety_ceiling() {
        let t0 = Instant::now();
        let mut gate = gate();
        gate.begin(t0, 3);

        assert!(!gate.poll(t0 + Duration::from_secs(29), 1));
        assert!(gate.poll(t0 + Duration::from_secs(30), 1));
        assert!(gate.fired());
    }

    #[test]
    fn test_grace_window_after_full_progress() {
        let t0 = Instant::now();
        let mut gate = gate();
        gate.begin(t0, 2);

        // Progress observed at 100% while the settled count disagrees:
        // the defensive window takes over.
        gate.note_full_progress(t0 + Duration::from_secs(5));
        assert!(!gate.poll(t0 + Duration::from_secs(6), 1));
        assert!(gate.poll(t0 + Duration::from_secs(7), 1));
    }

    #[test]
    fn test_grace_window_arms_once() {
        let t0 = Instant::now();
        let mut gate = gate();
        gate.begin(t0, 2);

        gate.note_full_progress(t0);
        gate.note_full_progress(t0 + Duration::from_secs(1));
        // Original deadline (t0 + 2s) holds
        assert!(gate.poll(t0 + Duration::from_secs(2), 1));
    }

    #[test]
    fn test_idle_gate_never_fires() {
        let t0 = Instant::now();
        let mut gate = gate();
        assert!(!gate.poll(t0 + Duration::from_secs(120), 0));
        assert!(!gate.fired());
    }
}

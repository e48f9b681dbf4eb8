use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::render::Surface;

/// Outcome of a single scheduled step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    /// Re-enter after the given delay. Headless drivers ignore the delay
    /// but accumulate it so embedders can replay the cadence.
    Pending { delay_ms: u64 },
    /// The phase has no further steps.
    Done,
}

/// Anything the scheduler loop can advance one step at a time.
pub trait Steppable {
    fn step(&mut self, surface: &mut dyn Surface) -> Tick;
}

/// Shared cancellation flag, checked at the top of every driver iteration.
/// Setting it halts further steps before their next tick.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RunReport {
    pub steps: usize,
    /// Total delay the steps asked for, in scheduled-time milliseconds.
    pub delay_ms: u64,
    pub done: bool,
    pub cancelled: bool,
}

/// Drive steps in scheduled order until the phase finishes, the step cap is
/// hit, the cancel flag is set, or `keep_going` says stop.
pub fn drive_while<S: Steppable>(
    sim: &mut S,
    surface: &mut dyn Surface,
    cancel: &CancelFlag,
    max_steps: usize,
    keep_going: impl Fn(&S) -> bool,
) -> RunReport {
    let mut report = RunReport::default();
    while report.steps < max_steps {
        if cancel.is_cancelled() {
            report.cancelled = true;
            return report;
        }
        if !keep_going(sim) {
            return report;
        }
        match sim.step(surface) {
            Tick::Pending { delay_ms } => {
                report.steps += 1;
                report.delay_ms += delay_ms;
            }
            Tick::Done => {
                report.steps += 1;
                report.done = true;
                return report;
            }
        }
    }
    report
}

/// Drive until done, cancelled, or capped.
pub fn drive<S: Steppable>(
    sim: &mut S,
    surface: &mut dyn Surface,
    cancel: &CancelFlag,
    max_steps: usize,
) -> RunReport {
    drive_while(sim, surface, cancel, max_steps, |_| true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::NullSurface;

    struct Countdown(usize);

    impl Steppable for Countdown {
        fn step(&mut self, _surface: &mut dyn Surface) -> Tick {
            if self.0 == 0 {
                return Tick::Done;
            }
            self.0 -= 1;
            Tick::Pending { delay_ms: 10 }
        }
    }

    #[test]
    fn runs_to_done_and_accumulates_delay() {
        let mut sim = Countdown(3);
        let report = drive(&mut sim, &mut NullSurface, &CancelFlag::new(), 100);
        assert!(report.done);
        assert_eq!(report.steps, 4);
        assert_eq!(report.delay_ms, 30);
    }

    #[test]
    fn step_cap_stops_early() {
        let mut sim = Countdown(1000);
        let report = drive(&mut sim, &mut NullSurface, &CancelFlag::new(), 5);
        assert!(!report.done);
        assert_eq!(report.steps, 5);
    }

    #[test]
    fn cancel_halts_before_next_step() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let mut sim = Countdown(1000);
        let report = drive(&mut sim, &mut NullSurface, &cancel, 100);
        assert!(report.cancelled);
        assert_eq!(report.steps, 0);
    }

    #[test]
    fn predicate_stops_without_consuming_a_step() {
        let mut sim = Countdown(10);
        let report = drive_while(&mut sim, &mut NullSurface, &CancelFlag::new(), 100, |s| {
            s.0 > 7
        });
        assert_eq!(report.steps, 3);
        assert!(!report.done);
    }
}

use std::collections::VecDeque;

use crate::core::smooth::Smoother;
use crate::core::timebase::Tick;

/// Typed handle into the graph's parameter table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ParamId(pub usize);

#[derive(Clone, Copy, Debug)]
enum PendingKind {
    /// New steady-state target (setters, modulation, scheduler).
    Steady,
    /// Macro override: temporary excursion that reverts to whatever the
    /// steady target is at revert time, so macros compose with toggles
    /// flipped mid-flight.
    Override { revert_at: Tick },
    /// Internal revert marker queued by an override.
    Revert,
}

#[derive(Clone, Copy, Debug)]
struct PendingSet {
    at_tick: Tick,
    value: f32,
    tau_sec: Option<f32>,
    kind: PendingKind,
}

/// One automatable parameter: a smoothed value plus a queue of scheduled
/// target changes applied sample-accurately during rendering.
#[derive(Clone, Debug)]
pub struct Param {
    smoother: Smoother,
    steady: f32,
    base_tau_sec: f32,
    lo: f32,
    hi: f32,
    override_active: bool,
    pending: VecDeque<PendingSet>,
}

impl Param {
    pub fn new(value: f32, tau_sec: f32, fs: f32, lo: f32, hi: f32) -> Self {
        let value = value.clamp(lo, hi);
        Self {
            smoother: Smoother::new(value, tau_sec, fs),
            steady: value,
            base_tau_sec: tau_sec,
            lo,
            hi,
            override_active: false,
            pending: VecDeque::new(),
        }
    }

    pub fn value(&self) -> f32 {
        self.smoother.value()
    }

    pub fn target(&self) -> f32 {
        self.smoother.target()
    }

    pub fn steady(&self) -> f32 {
        self.steady
    }

    /// Immediate steady-target write. While an override is in flight the
    /// steady value is recorded but the audible target is left to the
    /// override; the revert picks the new steady up.
    pub fn set_steady(&mut self, value: f32) {
        let value = value.clamp(self.lo, self.hi);
        self.steady = value;
        if !self.override_active {
            self.smoother.set_target(value);
        }
    }

    pub fn set_tau(&mut self, tau_sec: f32) {
        self.base_tau_sec = tau_sec;
        self.smoother.set_tau(tau_sec);
    }

    /// Jump without smoothing; only used before signal flows.
    pub fn reset(&mut self, value: f32) {
        let value = value.clamp(self.lo, self.hi);
        self.steady = value;
        self.smoother.reset(value);
        self.pending.clear();
        self.override_active = false;
    }

    /// Schedule a steady-target change at an absolute tick.
    pub fn schedule(&mut self, at_tick: Tick, value: f32, tau_sec: Option<f32>) {
        self.push(PendingSet {
            at_tick,
            value: value.clamp(self.lo, self.hi),
            tau_sec,
            kind: PendingKind::Steady,
        });
    }

    /// Schedule a self-reverting override.
    pub fn schedule_override(
        &mut self,
        at_tick: Tick,
        value: f32,
        tau_sec: Option<f32>,
        revert_at: Tick,
    ) {
        self.push(PendingSet {
            at_tick,
            value: value.clamp(self.lo, self.hi),
            tau_sec,
            kind: PendingKind::Override { revert_at },
        });
    }

    fn push(&mut self, set: PendingSet) {
        // Keep the queue time-ordered; same-tick entries keep push order so
        // the last write wins.
        let idx = self
            .pending
            .iter()
            .position(|p| p.at_tick > set.at_tick)
            .unwrap_or(self.pending.len());
        self.pending.insert(idx, set);
    }

    pub fn apply_due(&mut self, tick: Tick) {
        while let Some(front) = self.pending.front() {
            if front.at_tick > tick {
                break;
            }
            let Some(set) = self.pending.pop_front() else {
                break;
            };
            if let Some(tau) = set.tau_sec {
                self.smoother.set_tau(tau);
            }
            match set.kind {
                PendingKind::Steady => {
                    self.steady = set.value;
                    if !self.override_active {
                        self.smoother.set_target(set.value);
                    }
                }
                PendingKind::Override { revert_at } => {
                    self.override_active = true;
                    self.smoother.set_target(set.value);
                    self.push(PendingSet {
                        at_tick: revert_at.max(tick.saturating_add(1)),
                        value: 0.0,
                        tau_sec: None,
                        kind: PendingKind::Revert,
                    });
                }
                PendingKind::Revert => {
                    // Revert to the steady target current *now*, not the one
                    // captured when the override fired.
                    self.override_active = self
                        .pending
                        .iter()
                        .any(|p| matches!(p.kind, PendingKind::Revert));
                    if !self.override_active {
                        self.smoother.set_tau(self.base_tau_sec);
                        self.smoother.set_target(self.steady);
                    }
                }
            }
        }
    }

    pub fn tick(&mut self) -> f32 {
        self.smoother.tick()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(p: &mut Param, from: Tick, ticks: Tick) -> f32 {
        let mut v = p.value();
        for t in from..from + ticks {
            p.apply_due(t);
            v = p.tick();
        }
        v
    }

    #[test]
    fn scheduled_set_applies_on_its_tick() {
        let mut p = Param::new(0.0, 0.0, 1000.0, 0.0, 1.0);
        p.schedule(10, 1.0, None);
        run(&mut p, 0, 10);
        assert_eq!(p.target(), 0.0);
        run(&mut p, 10, 1);
        assert_eq!(p.target(), 1.0);
    }

    #[test]
    fn same_tick_last_write_wins() {
        let mut p = Param::new(0.0, 0.0, 1000.0, 0.0, 1.0);
        p.schedule(5, 0.3, None);
        p.schedule(5, 0.8, None);
        run(&mut p, 0, 6);
        assert_eq!(p.target(), 0.8);
    }

    #[test]
    fn override_reverts_to_current_steady() {
        let mut p = Param::new(0.2, 0.0, 1000.0, 0.0, 1.0);
        p.schedule_override(0, 0.9, None, 100);
        run(&mut p, 0, 50);
        assert_eq!(p.target(), 0.9);
        // Steady changes mid-override (a toggle flipped).
        p.set_steady(0.5);
        assert_eq!(p.target(), 0.9);
        run(&mut p, 50, 60);
        assert_eq!(p.target(), 0.5);
    }

    #[test]
    fn steady_write_during_override_does_not_preempt() {
        let mut p = Param::new(0.0, 0.0, 1000.0, 0.0, 1.0);
        p.schedule_override(0, 1.0, None, 1000);
        run(&mut p, 0, 10);
        p.set_steady(0.25);
        run(&mut p, 10, 10);
        assert_eq!(p.target(), 1.0);
    }

    #[test]
    fn targets_are_clamped_to_range() {
        let mut p = Param::new(0.0, 0.0, 1000.0, 0.0, 0.5);
        p.set_steady(2.0);
        assert_eq!(p.target(), 0.5);
        p.schedule(1, -3.0, None);
        run(&mut p, 0, 2);
        assert_eq!(p.target(), 0.0);
    }
}

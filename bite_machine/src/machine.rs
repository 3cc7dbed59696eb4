//! Debounced bite automaton.
//!
//! Fed one `near` sample per processed frame. A bite is counted only on the
//! `Idle → NearMouth` edge; a hand that lingers at the mouth is one bite, and
//! a hand that leaves and returns before the cooldown runs out is still the
//! same bite.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::{Clock, MonotonicClock};
use crate::limit::BiteLimit;
use crate::timer::{OneShotTimer, TimerHandle};

// ════════════════════════════════════════════════════════════════════════════
// BiteState
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BiteState {
    #[default]
    Idle,
    NearMouth,
    Cooldown,
}

impl fmt::Display for BiteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BiteState::Idle      => "idle",
            BiteState::NearMouth => "near mouth",
            BiteState::Cooldown  => "cooldown",
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MachineConfig / Bite
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Dwell time after the hand leaves before a new approach counts.
    pub cooldown_ms: u64,
}

impl Default for MachineConfig {
    fn default() -> Self {
        MachineConfig { cooldown_ms: 300 }
    }
}

impl MachineConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

/// Reported for every counted bite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bite {
    pub count:         u32,
    /// `count >= limit`. Set on every qualifying bite, not just the first;
    /// callers wanting a single alarm stop the session when they see it.
    pub limit_reached: bool,
}

// ════════════════════════════════════════════════════════════════════════════
// BiteStateMachine
// ════════════════════════════════════════════════════════════════════════════

pub struct BiteStateMachine<C: Clock = MonotonicClock> {
    clock:    C,
    cooldown: Duration,
    limit:    BiteLimit,
    state:    BiteState,
    count:    u32,
    timer:    OneShotTimer,
}

impl<C: Clock> BiteStateMachine<C> {
    pub fn new(config: MachineConfig, limit: BiteLimit, clock: C) -> Self {
        BiteStateMachine {
            clock,
            cooldown: config.cooldown(),
            limit,
            state:    BiteState::Idle,
            count:    0,
            timer:    OneShotTimer::new(),
        }
    }

    pub fn state(&self) -> BiteState { self.state }
    pub fn count(&self) -> u32       { self.count }
    pub fn limit(&self) -> BiteLimit { self.limit }

    /// Handle of the armed cooldown, if one is pending.
    pub fn pending_cooldown(&self) -> Option<TimerHandle> {
        self.timer.handle()
    }

    /// Feed one proximity sample. Returns the bite if this sample counted one.
    ///
    /// A cooldown whose deadline has already passed is honoured first, as if
    /// its timer had fired between frames.
    pub fn update(&mut self, near: bool) -> Option<Bite> {
        self.poll_cooldown();

        match (self.state, near) {
            (BiteState::Idle, true) => {
                self.count += 1;
                self.state = BiteState::NearMouth;
                let bite = Bite {
                    count:         self.count,
                    limit_reached: self.count >= self.limit.get(),
                };
                debug!(count = bite.count, limit = %self.limit, "bite");
                Some(bite)
            }

            (BiteState::NearMouth, false) => {
                let handle = self.timer.arm(self.clock.now(), self.cooldown);
                self.state = BiteState::Cooldown;
                debug!(?handle, cooldown_ms = self.cooldown.as_millis() as u64, "cooldown started");
                None
            }

            (BiteState::Cooldown, true) => {
                self.timer.cancel();
                self.state = BiteState::NearMouth;
                debug!("hand back before cooldown elapsed");
                None
            }

            (BiteState::Idle, false)
            | (BiteState::NearMouth, true)
            | (BiteState::Cooldown, false) => None,
        }
    }

    /// Fire the cooldown if its deadline has passed. Returns whether it did.
    pub fn poll_cooldown(&mut self) -> bool {
        match self.timer.take_elapsed(self.clock.now()) {
            Some(_) => {
                self.finish_cooldown();
                true
            }
            None => false,
        }
    }

    /// Deliver the elapse of `handle` directly.
    ///
    /// A handle from a timer that was since cancelled or replaced is a no-op.
    pub fn elapse(&mut self, handle: TimerHandle) -> bool {
        if self.timer.fire(handle) {
            self.finish_cooldown();
            true
        } else {
            false
        }
    }

    fn finish_cooldown(&mut self) {
        if self.state == BiteState::Cooldown {
            self.state = BiteState::Idle;
            debug!("cooldown elapsed");
        }
    }

    /// Back to `Idle` with a zero count, for a brand-new session.
    pub fn reset(&mut self) {
        self.reset_gesture();
        self.count = 0;
    }

    /// Back to `Idle` keeping the count, for when tracking is briefly lost.
    pub fn reset_gesture(&mut self) {
        self.state = BiteState::Idle;
        self.timer.cancel();
    }
}

impl<C: Clock> fmt::Debug for BiteStateMachine<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BiteStateMachine")
            .field("state", &self.state)
            .field("count", &self.count)
            .field("limit", &self.limit)
            .field("cooldown", &self.timer.due())
            .finish()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn make_machine(limit: u32) -> (BiteStateMachine<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let sm = BiteStateMachine::new(
            MachineConfig::default(),
            BiteLimit::new(limit).unwrap(),
            clock.clone(),
        );
        (sm, clock)
    }

    fn wait_cooldown(clock: &ManualClock) {
        clock.advance(Duration::from_millis(300));
    }

    #[test]
    fn starts_idle_with_no_bites() {
        let (sm, _) = make_machine(10);
        assert_eq!(sm.state(), BiteState::Idle);
        assert_eq!(sm.count(), 0);
        assert_eq!(sm.pending_cooldown(), None);
    }

    #[test]
    fn idle_to_near_mouth_counts_a_bite() {
        let (mut sm, _) = make_machine(10);
        let bite = sm.update(true);
        assert_eq!(bite, Some(Bite { count: 1, limit_reached: false }));
        assert_eq!(sm.state(), BiteState::NearMouth);
        assert_eq!(sm.count(), 1);
    }

    #[test]
    fn sustained_contact_is_one_bite() {
        let (mut sm, clock) = make_machine(10);
        assert!(sm.update(true).is_some());
        for _ in 0..500 {
            clock.advance(Duration::from_millis(16));
            assert_eq!(sm.update(true), None);
        }
        assert_eq!(sm.count(), 1);
        assert_eq!(sm.state(), BiteState::NearMouth);
    }

    #[test]
    fn withdrawal_starts_cooldown() {
        let (mut sm, _) = make_machine(10);
        sm.update(true);
        sm.update(false);
        assert_eq!(sm.state(), BiteState::Cooldown);
        assert!(sm.pending_cooldown().is_some());
    }

    #[test]
    fn cooldown_keeps_running_on_more_absence() {
        let (mut sm, clock) = make_machine(10);
        sm.update(true);
        sm.update(false);
        let handle = sm.pending_cooldown();
        clock.advance(Duration::from_millis(100));
        sm.update(false);
        assert_eq!(sm.state(), BiteState::Cooldown);
        assert_eq!(sm.pending_cooldown(), handle);
    }

    #[test]
    fn cooldown_elapses_back_to_idle() {
        let (mut sm, clock) = make_machine(10);
        sm.update(true);
        sm.update(false);
        clock.advance(Duration::from_millis(299));
        assert!(!sm.poll_cooldown());
        assert_eq!(sm.state(), BiteState::Cooldown);
        clock.advance(Duration::from_millis(1));
        assert!(sm.poll_cooldown());
        assert_eq!(sm.state(), BiteState::Idle);
        assert_eq!(sm.pending_cooldown(), None);
    }

    #[test]
    fn explicit_elapse_fires_the_cooldown() {
        let (mut sm, _) = make_machine(10);
        sm.update(true);
        sm.update(false);
        let handle = sm.pending_cooldown().unwrap();
        assert!(sm.elapse(handle));
        assert_eq!(sm.state(), BiteState::Idle);
        assert!(!sm.elapse(handle));
    }

    #[test]
    fn reentry_during_cooldown_does_not_double_count() {
        let (mut sm, _) = make_machine(10);
        sm.update(true);
        sm.update(false);
        assert_eq!(sm.update(true), None);
        assert_eq!(sm.state(), BiteState::NearMouth);
        assert_eq!(sm.count(), 1);
        assert_eq!(sm.pending_cooldown(), None);
    }

    #[test]
    fn second_bite_after_full_cycle() {
        let (mut sm, clock) = make_machine(10);
        sm.update(true);
        sm.update(false);
        wait_cooldown(&clock);
        let bite = sm.update(true);
        assert_eq!(bite.map(|b| b.count), Some(2));
        assert_eq!(sm.count(), 2);
    }

    #[test]
    fn limit_reached_on_the_bite_that_hits_it() {
        let (mut sm, clock) = make_machine(2);
        let first = sm.update(true).unwrap();
        assert!(!first.limit_reached);
        sm.update(false);
        wait_cooldown(&clock);
        let second = sm.update(true).unwrap();
        assert!(second.limit_reached);
        assert_eq!(second.count, 2);
    }

    #[test]
    fn limit_not_reached_early() {
        let (mut sm, _) = make_machine(5);
        assert!(!sm.update(true).unwrap().limit_reached);
    }

    #[test]
    fn limit_keeps_firing_past_the_limit() {
        let (mut sm, clock) = make_machine(1);
        for expected in 1..=3 {
            let bite = sm.update(true).unwrap();
            assert_eq!(bite.count, expected);
            assert!(bite.limit_reached);
            sm.update(false);
            wait_cooldown(&clock);
        }
    }

    #[test]
    fn absence_while_idle_never_counts() {
        let (mut sm, _) = make_machine(10);
        for _ in 0..3 {
            assert_eq!(sm.update(false), None);
        }
        assert_eq!(sm.count(), 0);
        assert_eq!(sm.state(), BiteState::Idle);
    }

    #[test]
    fn reset_clears_count_and_timer() {
        let (mut sm, clock) = make_machine(10);
        sm.update(true);
        sm.update(false);
        let stale = sm.pending_cooldown().unwrap();
        sm.reset();
        assert_eq!(sm.state(), BiteState::Idle);
        assert_eq!(sm.count(), 0);
        assert_eq!(sm.pending_cooldown(), None);

        // the old timer must not touch the new session
        sm.update(true);
        sm.update(false);
        assert!(!sm.elapse(stale));
        assert_eq!(sm.state(), BiteState::Cooldown);
        wait_cooldown(&clock);
        assert!(sm.poll_cooldown());
    }

    #[test]
    fn reset_gesture_keeps_count() {
        let (mut sm, _) = make_machine(10);
        sm.update(true);
        sm.reset_gesture();
        assert_eq!(sm.state(), BiteState::Idle);
        assert_eq!(sm.count(), 1);
    }

    #[test]
    fn reset_gesture_cancels_cooldown() {
        let (mut sm, _) = make_machine(10);
        sm.update(true);
        sm.update(false);
        let stale = sm.pending_cooldown().unwrap();
        sm.reset_gesture();
        assert_eq!(sm.pending_cooldown(), None);
        assert!(!sm.elapse(stale));
        assert_eq!(sm.update(true).map(|b| b.count), Some(2));
    }

    #[test]
    fn count_matches_idle_to_near_edges() {
        // pseudo-random walk over near/far with time jumps
        let (mut sm, clock) = make_machine(1_000);
        let mut seed: u32 = 0x2545_F491;
        let mut edges = 0;
        for _ in 0..2_000 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            let near = seed & 1 == 1;
            clock.advance(Duration::from_millis(u64::from(seed % 200)));
            sm.poll_cooldown();
            let was_idle = sm.state() == BiteState::Idle;
            let bite = sm.update(near);
            if was_idle && near {
                edges += 1;
                assert!(bite.is_some());
            } else {
                assert!(bite.is_none());
            }
        }
        assert_eq!(sm.count(), edges);
    }
}

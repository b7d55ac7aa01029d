//! Search time management: deadline timers and a simple time-budget planner.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::sync::StopFlag;

#[inline]
fn duration_until(deadline: Instant) -> Option<Duration> {
    let now = Instant::now();
    if deadline > now {
        Some(deadline - now)
    } else {
        None
    }
}

/// A timer that sets a `StopFlag` when a deadline elapses, running in a
/// background thread so the search loop only has to poll an atomic.
pub struct DeadlineTimer {
    handle: Option<JoinHandle<()>>,
    stop_flag: StopFlag,
}

impl DeadlineTimer {
    /// Start a timer that fires after `duration`. Returns `None` if
    /// `duration` is zero (nothing to schedule).
    #[must_use]
    pub fn start(duration: Duration, stop_flag: StopFlag) -> Option<Self> {
        if duration.is_zero() {
            return None;
        }
        let flag_clone = stop_flag.clone();
        let handle = thread::spawn(move || {
            thread::sleep(duration);
            flag_clone.stop();
        });
        Some(DeadlineTimer {
            handle: Some(handle),
            stop_flag,
        })
    }

    /// Start a timer firing at an absolute `deadline`. Stops immediately if
    /// the deadline has already passed.
    #[must_use]
    pub fn start_at(deadline: Option<Instant>, stop_flag: StopFlag) -> Option<Self> {
        let deadline = deadline?;
        match duration_until(deadline) {
            Some(duration) => Self::start(duration, stop_flag),
            None => {
                stop_flag.stop();
                None
            }
        }
    }

    pub fn cancel(mut self) {
        self.handle.take();
    }

    pub fn wait(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.stop_flag.is_stopped()
    }
}

/// How much of a position's remaining clock to spend on the next move.
/// There is no increment or byoyomi concept in Guard & Towers (spec.md
/// §6): `plan` only has to divide whatever time remains across a rough
/// estimate of the moves left in the game.
pub struct TimeCtl;

impl TimeCtl {
    /// Remaining-moves estimate used when the caller has no better guess.
    const DEFAULT_MOVES_TO_GO: u32 = 30;

    /// Budget, in milliseconds, for the next search given `remaining_ms` on
    /// the clock and `moves_played` so far this game. The assumed moves
    /// remaining shrinks as the game goes on, so the budget per move grows;
    /// a small safety margin is always reserved so the watchdog timer, not
    /// the clock, decides when search stops.
    #[must_use]
    pub fn plan(remaining_ms: u64, moves_played: u32) -> u64 {
        const SAFETY_MARGIN_MS: u64 = 50;
        let moves_to_go = Self::DEFAULT_MOVES_TO_GO.saturating_sub(moves_played.min(20)).max(5);
        let budget = remaining_ms / u64::from(moves_to_go);
        budget.saturating_sub(SAFETY_MARGIN_MS).max(10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_triggers_after_its_duration() {
        let flag = StopFlag::new();
        let timer = DeadlineTimer::start(Duration::from_millis(20), flag.clone());
        assert!(timer.is_some());
        thread::sleep(Duration::from_millis(60));
        assert!(flag.is_stopped());
    }

    #[test]
    fn zero_duration_starts_no_timer() {
        let flag = StopFlag::new();
        assert!(DeadlineTimer::start(Duration::ZERO, flag).is_none());
    }

    #[test]
    fn past_deadline_stops_immediately() {
        let flag = StopFlag::new();
        let past = Instant::now().checked_sub(Duration::from_secs(1)).unwrap();
        assert!(DeadlineTimer::start_at(Some(past), flag.clone()).is_none());
        assert!(flag.is_stopped());
    }

    #[test]
    fn plan_spends_less_per_move_as_the_game_goes_on() {
        let early = TimeCtl::plan(60_000, 0);
        let late = TimeCtl::plan(60_000, 20);
        assert!(late > early);
    }

    #[test]
    fn plan_never_returns_less_than_the_floor() {
        assert_eq!(TimeCtl::plan(0, 0), 10);
    }
}

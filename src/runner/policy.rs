// src/runner/policy.rs

//! Restart/backoff policy for supervised backends.
//!
//! This is the pure half of the supervision state machine: given how long a
//! run lasted, the current restart counter and whether the daemon still wants
//! the backend alive, [`SupervisionPolicy::assess`] says what happens next.
//! The async loop in [`super::exec`] only sleeps, launches, and reports.

use std::time::Duration;

/// Thresholds and delays that drive supervision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisionPolicy {
    /// Runs shorter than this are reported as "exits immediately".
    pub crash_floor: Duration,
    /// Runs longer than this reset the restart counter to 0.
    pub forgive_after: Duration,
    /// Highest restart counter value that still earns a retry.
    pub max_restarts: u32,
    /// Delay between a crash and the next launch.
    pub retry_backoff: Duration,
    /// Time between the graceful signal and the forced kill on stop.
    pub shutdown_grace: Duration,
    /// Pause between stop and start on restart.
    pub restart_cooldown: Duration,
}

impl Default for SupervisionPolicy {
    fn default() -> Self {
        Self {
            crash_floor: Duration::from_secs(3),
            forgive_after: Duration::from_secs(60),
            max_restarts: 3,
            retry_backoff: Duration::from_secs(5),
            shutdown_grace: Duration::from_secs(2),
            restart_cooldown: Duration::from_secs(2),
        }
    }
}

/// What the supervision loop does after a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    /// Sleep the backoff, bump the counter, launch again.
    Retry,
    /// Crash loop: report and stop supervising.
    GiveUp,
    /// Stop was requested: end quietly.
    Stopped,
}

/// Result of assessing one finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunAssessment {
    /// The run ended before `crash_floor`.
    pub exited_immediately: bool,
    /// Counter value after forgiveness was applied (before any retry bump).
    pub restart_count: u32,
    pub next: NextStep,
}

impl SupervisionPolicy {
    pub fn assess(&self, elapsed: Duration, restart_count: u32, supervising: bool) -> RunAssessment {
        let exited_immediately = elapsed < self.crash_floor;
        let restart_count = if elapsed > self.forgive_after {
            0
        } else {
            restart_count
        };

        let next = if restart_count <= self.max_restarts && supervising {
            NextStep::Retry
        } else if restart_count > self.max_restarts {
            NextStep::GiveUp
        } else {
            NextStep::Stopped
        };

        RunAssessment {
            exited_immediately,
            restart_count,
            next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn short_run_is_flagged_but_still_retried() {
        let p = SupervisionPolicy::default();
        let a = p.assess(secs(1), 1, true);
        assert!(a.exited_immediately);
        assert_eq!(a.restart_count, 1);
        assert_eq!(a.next, NextStep::Retry);
    }

    #[test]
    fn counter_above_max_gives_up() {
        let p = SupervisionPolicy::default();
        assert_eq!(p.assess(secs(10), 3, true).next, NextStep::Retry);
        assert_eq!(p.assess(secs(10), 4, true).next, NextStep::GiveUp);
        // Even a stop request does not hide a crash loop.
        assert_eq!(p.assess(secs(10), 4, false).next, NextStep::GiveUp);
    }

    #[test]
    fn long_run_forgives_history() {
        let p = SupervisionPolicy::default();
        let a = p.assess(secs(90), 4, true);
        assert!(!a.exited_immediately);
        assert_eq!(a.restart_count, 0);
        assert_eq!(a.next, NextStep::Retry);
    }

    #[test]
    fn exactly_at_thresholds_is_not_special() {
        let p = SupervisionPolicy::default();
        let a = p.assess(secs(3), 2, true);
        assert!(!a.exited_immediately);
        let b = p.assess(secs(60), 2, true);
        assert_eq!(b.restart_count, 2);
    }

    #[test]
    fn stop_request_ends_quietly() {
        let p = SupervisionPolicy::default();
        let a = p.assess(secs(30), 2, false);
        assert_eq!(a.next, NextStep::Stopped);
    }
}

// tests/policy_properties.rs

use std::time::Duration;

use proptest::prelude::*;
use sidecar::runner::{NextStep, SupervisionPolicy};

/// Replay a streak of crashes through the policy the way the supervision
/// loop does: assess, then bump the counter when retrying.
fn replay(policy: &SupervisionPolicy, runs: &[Duration]) -> (Vec<u32>, Option<NextStep>) {
    let mut count = 1;
    let mut seen = Vec::new();
    for run in runs {
        let a = policy.assess(*run, count, true);
        seen.push(a.restart_count);
        match a.next {
            NextStep::Retry => count = a.restart_count + 1,
            other => return (seen, Some(other)),
        }
    }
    (seen, None)
}

fn short_run() -> impl Strategy<Value = Duration> {
    (0u64..60_000).prop_map(Duration::from_millis)
}

proptest! {
    #[test]
    fn counter_climbs_by_one_within_a_streak(runs in proptest::collection::vec(short_run(), 1..10)) {
        let policy = SupervisionPolicy::default();
        let (seen, end) = replay(&policy, &runs);

        for (i, count) in seen.iter().enumerate() {
            prop_assert_eq!(*count, i as u32 + 1);
        }
        // Four short runs always exhaust the default policy.
        if runs.len() >= 4 {
            prop_assert_eq!(end, Some(NextStep::GiveUp));
            prop_assert_eq!(seen.len(), 4);
        } else {
            prop_assert_eq!(end, None);
        }
    }

    #[test]
    fn a_long_run_restores_first_crash_semantics(
        before in proptest::collection::vec(short_run(), 0..3),
        long_secs in 61u64..10_000,
        after in short_run(),
    ) {
        let policy = SupervisionPolicy::default();
        let mut runs = before.clone();
        runs.push(Duration::from_secs(long_secs));
        runs.push(after);

        let (seen, end) = replay(&policy, &runs);
        prop_assert_eq!(end, None);
        prop_assert_eq!(seen[before.len()], 0);
        prop_assert_eq!(seen[before.len() + 1], 1);
    }

    #[test]
    fn stop_request_never_retries(elapsed_ms in 0u64..200_000, count in 0u32..4) {
        let policy = SupervisionPolicy::default();
        let a = policy.assess(Duration::from_millis(elapsed_ms), count, false);
        prop_assert_ne!(a.next, NextStep::Retry);
    }
}

#[test]
fn ninety_second_run_then_ten_second_crash() {
    let policy = SupervisionPolicy::default();
    let (seen, end) = replay(&policy, &[Duration::from_secs(90), Duration::from_secs(10)]);
    assert_eq!(seen, vec![0, 1], "first crash forgiven, second is attempt 1 of 3");
    assert_eq!(end, None);
}

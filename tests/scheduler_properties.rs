// tests/scheduler_properties.rs

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use proptest::prelude::*;
use serde_json::Value;

use connector_cycle::config::ConnectorSpec;
use connector_cycle::outcome::Outcome;
use connector_cycle::schedule::Scheduler;

#[derive(Debug, Clone)]
enum Step {
    /// Advance the clock by this many milliseconds.
    Advance(u64),
    /// Launch every due connector.
    Dispatch,
    /// Complete the in-flight run of connector `idx % n` with an exit code.
    Complete(usize, i32),
    /// Give up the launch of connector `idx % n` (missing script etc).
    Defer(usize),
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0u64..3_000).prop_map(Step::Advance),
        Just(Step::Dispatch),
        (any::<usize>(), prop_oneof![Just(0), Just(1), Just(2), Just(7)])
            .prop_map(|(i, code)| Step::Complete(i, code)),
        any::<usize>().prop_map(Step::Defer),
    ]
}

fn spec(i: usize, interval_ms: u64) -> ConnectorSpec {
    ConnectorSpec {
        name: format!("c{i}"),
        run_interval: Duration::from_millis(interval_ms),
        script_path: Some(PathBuf::from(format!("c{i}.sh"))),
        output_dir: PathBuf::from(format!("out/c{i}")),
        params: Some(Default::default()),
        interpreter: None,
        timeout: None,
    }
}

fn outcome_for(code: i32) -> Outcome {
    match code {
        0 => Outcome::Success(Value::Null),
        1 => Outcome::RecoverableFailure("retry".into()),
        2 => Outcome::UnrecoverableFailure("gone".into()),
        _ => Outcome::UnknownFailure("odd".into()),
    }
}

proptest! {
    #[test]
    fn scheduler_keeps_its_guarantees(
        intervals in proptest::collection::vec(1u64..5_000, 1..6),
        steps in proptest::collection::vec(step_strategy(), 1..80),
    ) {
        let names: Vec<String> = (0..intervals.len()).map(|i| format!("c{i}")).collect();
        let mut sched = Scheduler::new(
            intervals.iter().enumerate().map(|(i, ms)| spec(i, *ms)),
        );

        let t0 = Instant::now();
        let mut now = t0;
        let mut running: HashSet<String> = HashSet::new();
        let mut last_sync: HashMap<String, Instant> = HashMap::new();
        let mut removed: HashSet<String> = HashSet::new();

        for step in steps {
            match step {
                Step::Advance(ms) => now += Duration::from_millis(ms),
                Step::Dispatch => {
                    for name in sched.due_connectors(now) {
                        // At most one live run per connector.
                        prop_assert!(!running.contains(&name), "{} due while running", name);
                        // Never relaunched before its interval elapsed.
                        if let Some(last) = last_sync.get(&name) {
                            let interval = sched.spec_of(&name).unwrap().run_interval;
                            prop_assert!(now.duration_since(*last) >= interval);
                        }
                        // Removed connectors never come back.
                        prop_assert!(!removed.contains(&name));

                        prop_assert!(sched.mark_in_flight(&name));
                        prop_assert!(!sched.mark_in_flight(&name));
                        running.insert(name);
                    }
                }
                Step::Complete(i, code) => {
                    let name = &names[i % names.len()];
                    if running.remove(name) {
                        let outcome = outcome_for(code);
                        let step = sched.record_completion(name, &outcome, now).unwrap();
                        prop_assert_eq!(step.removed, code == 2);
                        if step.removed {
                            removed.insert(name.clone());
                        } else {
                            last_sync.insert(name.clone(), now);
                        }
                    }
                }
                Step::Defer(i) => {
                    let name = &names[i % names.len()];
                    if !running.contains(name) && sched.contains(name) {
                        sched.defer(name, now);
                        last_sync.insert(name.clone(), now);
                    }
                }
            }

            prop_assert_eq!(sched.in_flight_count(), running.len());
            for name in &removed {
                prop_assert!(!sched.contains(name));
            }
        }
    }
}

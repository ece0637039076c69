//! Unit tests for listener dispatch and the built-in observers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use gauntlet_container::{ExecutionResult, Termination};
use mockall::Sequence;
use rstest::{fixture, rstest};

use super::*;
use crate::tests::{MockListener, MockSink};

#[derive(Debug, Default, Clone)]
struct RecordingSink {
    events: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    fn events(&self) -> Vec<String> {
        self.events.lock().expect("sink lock").clone()
    }
}

impl MetricsSink for RecordingSink {
    fn increment(&self, name: &str, tags: &[String]) {
        self.events
            .lock()
            .expect("sink lock")
            .push(format!("increment {name} {}", tags.join(",")));
    }

    fn timing(&self, name: &str, millis: u64, tags: &[String]) {
        self.events
            .lock()
            .expect("sink lock")
            .push(format!("timing {name} {millis} {}", tags.join(",")));
    }
}

#[fixture]
fn engine() -> EngineIdentity {
    EngineIdentity::new("structure", Some("stable".into()))
}

fn result(termination: Termination, status: i32) -> ExecutionResult {
    ExecutionResult::new("c", status, Duration::from_millis(1500), termination)
}

fn metric_names(events: &[String]) -> Vec<&str> {
    events
        .iter()
        .filter_map(|event| event.split(' ').nth(1))
        .collect()
}

// ---------------------------------------------------------------------------
// Metrics classification
// ---------------------------------------------------------------------------

#[rstest]
#[case::timeout(
    Termination::TimedOut,
    137,
    &["engines.result.error", "engines.result.error.timeout"]
)]
#[case::cancelled(
    Termination::Cancelled,
    143,
    &["engines.result.error", "engines.result.error.timeout"]
)]
#[case::output(
    Termination::OutputExceeded,
    143,
    &["engines.result.error", "engines.result.error.output_exceeded"]
)]
#[case::engine_failure(Termination::Exited, 2, &["engines.result.error"])]
#[case::success(Termination::Exited, 0, &["engines.result.success"])]
fn finished_emits_exactly_one_outcome(
    engine: EngineIdentity,
    #[case] termination: Termination,
    #[case] status: i32,
    #[case] outcome_metrics: &[&str],
) {
    let sink = RecordingSink::default();
    let listener = MetricsListener::new(sink.clone());
    listener.finished(&engine, &EngineDetails::new(), &result(termination, status));

    let events = sink.events();
    let names = metric_names(&events);
    let mut expected = vec!["engines.time", "engines.finished"];
    expected.extend_from_slice(outcome_metrics);
    assert_eq!(names, expected);
}

#[rstest]
fn timing_is_recorded_once_on_timeout(engine: EngineIdentity) {
    let sink = RecordingSink::default();
    MetricsListener::new(sink.clone()).finished(
        &engine,
        &EngineDetails::new(),
        &result(Termination::TimedOut, 143),
    );
    let timings = sink
        .events()
        .iter()
        .filter(|event| event.starts_with("timing"))
        .count();
    assert_eq!(timings, 1);
}

#[rstest]
fn tags_include_channel_and_repo(engine: EngineIdentity) {
    let sink = RecordingSink::default();
    MetricsListener::new(sink.clone())
        .with_repo_id(Some("repo-42".into()))
        .started(&engine, &EngineDetails::new());
    assert_eq!(
        sink.events(),
        ["increment engines.started engine:structure,channel:stable,repo_id:repo-42"]
    );
}

#[test]
fn tags_omit_missing_channel() {
    let sink = RecordingSink::default();
    MetricsListener::new(sink.clone())
        .started(&EngineIdentity::new("madeup", None), &EngineDetails::new());
    assert_eq!(sink.events(), ["increment engines.started engine:madeup"]);
}

#[rstest]
fn timing_reports_duration_in_millis(engine: EngineIdentity) {
    let mut sink = MockSink::new();
    let mut seq = Sequence::new();
    sink.expect_timing()
        .withf(|name, millis, _tags| name == "engines.time" && *millis == 1500)
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    sink.expect_increment()
        .withf(|name, _tags| name == "engines.finished")
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    sink.expect_increment()
        .withf(|name, _tags| name == "engines.result.success")
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());

    MetricsListener::new(sink).finished(
        &engine,
        &EngineDetails::new(),
        &result(Termination::Exited, 0),
    );
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

#[rstest]
fn dispatcher_notifies_in_registration_order(engine: EngineIdentity) {
    let mut seq = Sequence::new();
    let mut first = MockListener::new();
    let mut second = MockListener::new();
    first
        .expect_started()
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    second
        .expect_started()
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    first
        .expect_finished()
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    second
        .expect_finished()
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());

    let dispatcher = ListenerDispatcher::new()
        .with_listener(first)
        .with_listener(second);
    assert_eq!(dispatcher.len(), 2);

    let details = EngineDetails::new();
    dispatcher.started(&engine, &details);
    dispatcher.finished(&engine, &details, &result(Termination::Exited, 0));
}

#[test]
fn empty_dispatcher_is_a_no_op() {
    let dispatcher = ListenerDispatcher::new();
    assert!(dispatcher.is_empty());
    dispatcher.started(&EngineIdentity::new("x", None), &EngineDetails::new());
}

#[rstest]
#[case::timeout(Termination::TimedOut, 0, Outcome::TimedOut)]
#[case::output(Termination::OutputExceeded, 0, Outcome::OutputExceeded)]
#[case::failed(Termination::Exited, 1, Outcome::Failed)]
#[case::succeeded(Termination::Exited, 0, Outcome::Succeeded)]
fn outcome_classification(
    #[case] termination: Termination,
    #[case] status: i32,
    #[case] expected: Outcome,
) {
    assert_eq!(Outcome::classify(&result(termination, status)), expected);
}

// tests/end_to_end.rs
//
// Dispatcher and executor in one process, talking through the in-memory
// broker and real unix sockets, running real programs.

mod common;
use crate::common::{init_tracing, spawn_executor, with_timeout};

use std::sync::Arc;
use std::time::Duration;

use cmdpipe::broker::{Broker, ConsumeOptions, MemoryBroker, queue_name};
use cmdpipe::config::Settings;
use cmdpipe::dispatch::{DispatchOutcome, Dispatcher};
use cmdpipe::execute::{DeliveryOutcome, Executor};
use cmdpipe::status::UNKNOWN_STATUS;
use cmdpipe_test_utils::builders::{DescriptorBuilder, SettingsBuilder};
use cmdpipe_test_utils::capture::CapturedStdio;
use tempfile::{TempDir, tempdir};

struct Harness {
    _dir: TempDir,
    settings: Settings,
    broker: Arc<MemoryBroker>,
}

impl Harness {
    fn new() -> Self {
        Self::with_settings(|b| b)
    }

    fn with_settings(
        f: impl FnOnce(SettingsBuilder) -> SettingsBuilder,
    ) -> Self {
        init_tracing();
        let dir = tempdir().unwrap();
        let settings = f(SettingsBuilder::new(dir.path())).build();
        Self {
            _dir: dir,
            settings,
            broker: Arc::new(MemoryBroker::new()),
        }
    }

    fn dispatcher(&self) -> Dispatcher {
        let broker: Arc<dyn Broker> = self.broker.clone();
        Dispatcher::new(self.settings.clone(), broker)
    }

    async fn run(
        &self,
        allowed: &str,
        name: &str,
        params: &[&str],
        stdin: Option<&[u8]>,
    ) -> (DispatchOutcome, CapturedStdio) {
        let executor = spawn_executor(self.settings.clone(), self.broker.clone(), allowed);
        let (captured, stdio) = CapturedStdio::new(stdin);
        let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();

        let outcome = with_timeout(self.dispatcher().send(name, params, stdio))
            .await
            .unwrap();
        executor.abort();
        (outcome, captured)
    }
}

#[tokio::test]
async fn echo_prints_and_exits_zero() {
    let h = Harness::new();
    let (outcome, out) = h.run("echo", "echo", &["hi"], None).await;

    assert_eq!(out.stdout.text(), "hi\n");
    assert_eq!(out.stderr.text(), "");
    assert_eq!(outcome.status, 0);
    assert!(outcome.is_complete());
}

#[tokio::test]
async fn false_exits_one_silently() {
    let h = Harness::new();
    let (outcome, out) = h.run("false", "false", &[], None).await;

    assert_eq!(outcome.status, 1);
    assert!(out.stdout.contents().is_empty());
    assert!(out.stderr.contents().is_empty());
}

#[tokio::test]
async fn piped_stdin_round_trips_through_cat() {
    let h = Harness::new();
    let (outcome, out) = h.run("cat", "cat", &[], Some(b"payload")).await;

    assert_eq!(out.stdout.text(), "payload");
    assert_eq!(outcome.status, 0);
}

#[tokio::test]
async fn propagated_environment_reaches_the_program() {
    let h = Harness::with_settings(|b| b.propagate("FOO=bar"));
    let (outcome, out) = h
        .run("sh", "sh", &["-c", "printf %s \"$FOO\""], None)
        .await;

    assert_eq!(out.stdout.text(), "bar");
    assert_eq!(outcome.status, 0);
}

#[tokio::test]
async fn later_env_entries_win() {
    let h = Harness::with_settings(|b| b.propagate("FOO=first").propagate("FOO=second"));
    let (_outcome, out) = h
        .run("sh", "sh", &["-c", "printf %s \"$FOO\""], None)
        .await;

    assert_eq!(out.stdout.text(), "second");
}

#[tokio::test]
async fn stdout_stderr_and_status_are_kept_apart() {
    let h = Harness::new();
    let script = "head -c 70000 /dev/zero; printf oops >&2; exit 7";
    let (outcome, out) = h.run("sh", "sh", &["-c", script], None).await;

    assert_eq!(out.stdout.contents(), vec![0u8; 70000]);
    assert_eq!(out.stderr.text(), "oops");
    assert_eq!(outcome.status, 7);
}

#[tokio::test]
async fn program_killed_by_signal_reports_unknown_status() {
    let h = Harness::new();
    let (outcome, _out) = h.run("sh", "sh", &["-c", "kill -9 $$"], None).await;

    assert_eq!(outcome.status, UNKNOWN_STATUS);
    assert!(outcome.is_complete());
}

#[tokio::test]
async fn program_that_cannot_start_reports_unknown_status() {
    let h = Harness::new();
    let missing = "cmdpipe-no-such-program-on-path";
    let (outcome, out) = h.run(missing, missing, &[], None).await;

    assert_eq!(outcome.status, UNKNOWN_STATUS);
    assert!(outcome.is_complete());
    assert!(out.stdout.contents().is_empty());
}

#[tokio::test]
async fn unserved_command_never_receives_a_status() {
    let h = Harness::new();
    let executor = spawn_executor(h.settings.clone(), h.broker.clone(), "bar");
    let (_captured, stdio) = CapturedStdio::new(None);

    let dispatcher = h.dispatcher();
    let send = dispatcher.send("foo", vec![], stdio);
    let res = tokio::time::timeout(Duration::from_millis(300), send).await;
    assert!(res.is_err(), "dispatch to an unserved command must not complete");

    assert_eq!(h.broker.stats(&queue_name("foo")).ready, 1);
    assert_eq!(h.broker.stats(&queue_name("bar")).rejected, 0);
    executor.abort();
}

#[tokio::test]
async fn mismatched_descriptor_is_rejected_without_running() {
    let h = Harness::new();
    let marker = h.settings.tmp_dir.join("should-not-exist");
    let descriptor = DescriptorBuilder::new("touch")
        .param(marker.to_str().unwrap())
        .build();

    let queue = h.broker.open_queue(&queue_name("bar")).await.unwrap();
    queue.publish(descriptor.encode().unwrap()).await.unwrap();

    let mut consumer = queue
        .consume(ConsumeOptions::new(1, Duration::from_millis(5)))
        .await
        .unwrap();
    let delivery = with_timeout(consumer.next()).await.unwrap();

    let executor = Executor::new(h.settings.clone(), "bar");
    let outcome = executor.handle_delivery(delivery).await;

    assert_eq!(
        outcome,
        DeliveryOutcome::Rejected {
            name: "touch".to_string()
        }
    );
    assert!(!marker.exists());
    let stats = h.broker.stats(&queue_name("bar"));
    assert_eq!((stats.ready, stats.unacked, stats.rejected), (0, 0, 1));
}

#[tokio::test]
async fn malformed_payload_is_dropped_unacknowledged() {
    let h = Harness::new();
    let queue = h.broker.open_queue(&queue_name("echo")).await.unwrap();
    queue.publish(b"{ nope".to_vec()).await.unwrap();

    let mut consumer = queue
        .consume(ConsumeOptions::new(1, Duration::from_millis(5)))
        .await
        .unwrap();
    let delivery = with_timeout(consumer.next()).await.unwrap();

    let executor = Executor::new(h.settings.clone(), "echo");
    assert_eq!(
        executor.handle_delivery(delivery).await,
        DeliveryOutcome::Malformed
    );

    let stats = h.broker.stats(&queue_name("echo"));
    assert_eq!((stats.unacked, stats.rejected), (1, 0));
}

#[tokio::test]
async fn completed_deliveries_are_acknowledged() {
    let h = Harness::new();
    let executor = spawn_executor(h.settings.clone(), h.broker.clone(), "true");
    let (_captured, stdio) = CapturedStdio::new(None);

    let outcome = with_timeout(h.dispatcher().send("true", vec![], stdio))
        .await
        .unwrap();
    assert_eq!(outcome.status, 0);

    // The ack lands right after the status is written.
    with_timeout(async {
        while h.broker.stats(&queue_name("true")).unacked != 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    let stats = h.broker.stats(&queue_name("true"));
    assert_eq!((stats.ready, stats.rejected), (0, 0));
    executor.abort();
}

#[tokio::test]
async fn executor_handles_invocations_one_after_another() {
    let h = Harness::new();
    let executor = spawn_executor(h.settings.clone(), h.broker.clone(), "echo");

    for word in ["one", "two", "three"] {
        let (captured, stdio) = CapturedStdio::new(None);
        let outcome = with_timeout(h.dispatcher().send("echo", vec![word.to_string()], stdio))
            .await
            .unwrap();
        assert_eq!(outcome.status, 0);
        assert_eq!(captured.stdout.text(), format!("{word}\n"));
    }
    executor.abort();
}

#[tokio::test]
async fn second_executor_does_not_rerun_in_flight_work() {
    let h = Harness::new();
    let log = h.settings.tmp_dir.join("runs.log");
    let script = format!("echo run >> '{}'; sleep 0.3", log.display());

    let first = spawn_executor(h.settings.clone(), h.broker.clone(), "sh");
    let (_captured, stdio) = CapturedStdio::new(None);
    let dispatcher = h.dispatcher();
    let send = tokio::spawn(async move {
        dispatcher
            .send("sh", vec!["-c".to_string(), script], stdio)
            .await
    });

    // Wait until the first executor is running the job, then start another.
    with_timeout(async {
        while !log.exists() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    let second = spawn_executor(h.settings.clone(), h.broker.clone(), "sh");

    let outcome = with_timeout(send).await.unwrap().unwrap();
    assert_eq!(outcome.status, 0);
    tokio::time::sleep(Duration::from_millis(100)).await;

    let runs = std::fs::read_to_string(&log).unwrap();
    assert_eq!(runs.lines().count(), 1, "job ran more than once: {runs:?}");
    let stats = h.broker.stats(&queue_name("sh"));
    assert_eq!((stats.ready, stats.rejected), (0, 0));

    first.abort();
    second.abort();
}

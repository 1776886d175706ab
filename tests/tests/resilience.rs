//! Tests for failure handling in the poll loop.
//!
//! Rate limits, remote errors, a vanished downstream consumer, and restarts
//! against a persisted offset file.

use harvester_core::Error;
use integration_tests::{fixtures, setup::TestContext};
use poller::{CycleOutcome, PollState, RemoteErrorPolicy};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A throttled fetch ends the cycle; the loop sleeps and resumes from the
/// last persisted offset.
#[tokio::test(start_paused = true)]
async fn test_run_loop_survives_rate_limit() {
    let ctx = TestContext::new();
    ctx.source.push_page("/a", fixtures::events_at(&[100, 101]), Some("t1"));
    ctx.source.push_rate_limit("/a");
    ctx.source.push_page("/b", fixtures::events_at(&[200]), None);

    let mut poll_loop = ctx.poll_loop(ctx.config(&["/a", "/b"]));
    let cancel = CancellationToken::new();
    let stopper = cancel.clone();
    tokio::spawn(async move {
        // cycles run at t=0, 60 and 120
        tokio::time::sleep(Duration::from_secs(150)).await;
        stopper.cancel();
    });

    poll_loop.run(&cancel).await.unwrap();

    assert_eq!(poll_loop.state(), PollState::Stopped);

    let a: Vec<(i64, Option<String>)> = ctx
        .source
        .fetches_for("/a")
        .into_iter()
        .map(|f| (f.start_time, f.next_token))
        .collect();
    assert_eq!(
        a,
        vec![
            (0, None),
            (102, Some("t1".to_string())),
            (102, None),
            (102, None),
        ]
    );
    // /b was cut from the first cycle, then picked up by the next two
    assert_eq!(ctx.source.fetches_for("/b").len(), 2);

    assert_eq!(ctx.persisted_offsets().get("/a"), Some(&102));
    assert_eq!(ctx.persisted_offsets().get("/b"), Some(&201));
    assert_eq!(ctx.sink.record_count(), 3);
    assert!(telemetry::metrics().cycles_rate_limited.get() >= 1);
}

/// A rate-limited cycle reports what it skipped and persists what it finished.
#[tokio::test]
async fn test_rate_limited_cycle_report() {
    let ctx = TestContext::new();
    ctx.source.push_rate_limit("/a");

    let mut poll_loop = ctx.started(ctx.config(&["/a", "/b", "/c"])).await;
    let report = poll_loop.run_cycle().await.unwrap();

    assert_eq!(report.outcome, CycleOutcome::RateLimited);
    assert_eq!(report.stats.groups_polled, 0);
    assert_eq!(report.stats.groups_skipped, 3);
    assert!(ctx.source.fetches_for("/b").is_empty());
    assert_eq!(poll_loop.state(), PollState::Cycling);
    assert!(poll_loop.priority().is_empty());
}

/// A throttled listing at startup is deferred to the first cycle.
#[tokio::test]
async fn test_rate_limited_initial_resolve_is_deferred() {
    let ctx = TestContext::new();
    ctx.source.set_listing("/app/", &[&["/app/a"]]);
    ctx.source
        .fail_next_describe(Error::rate_limited("DescribeLogGroups", "Rate exceeded"));
    let mut config = ctx.config(&["/app/"]);
    config.log_group_prefix = true;

    let mut poll_loop = ctx.started(config).await;
    assert!(poll_loop.offsets().is_empty());
    assert_eq!(poll_loop.state(), PollState::Cycling);

    let report = poll_loop.run_cycle().await.unwrap();
    assert!(report.is_complete());
    assert_eq!(poll_loop.offsets().get("/app/a"), Some(&0));
}

/// Restarting with the same offset file resumes where the last run stopped.
#[tokio::test]
async fn test_restart_resumes_from_persisted_offsets() {
    let ctx = TestContext::new();
    ctx.source.push_page("/app", fixtures::events_at(&[500, 900]), None);

    let mut first = ctx.started(ctx.config(&["/app", "/other"])).await;
    first.run_cycle().await.unwrap();
    let before = first.offsets().clone();
    drop(first);

    let mut config = ctx.config(&["/app", "/other"]);
    // stored offsets win over the start position
    config.start_position = "end".to_string();
    let mut second = ctx.started(config).await;
    assert_eq!(*second.offsets(), before);

    second.run_cycle().await.unwrap();
    let fetches = ctx.source.fetches_for("/app");
    assert_eq!(fetches.last().unwrap().start_time, 901);
    assert_eq!(ctx.source.fetches_for("/other").last().unwrap().start_time, 0);
}

/// A corrupt offset file starts fresh instead of failing.
#[tokio::test]
async fn test_corrupt_offset_file_starts_fresh() {
    let ctx = TestContext::new();
    std::fs::write(ctx.sincedb_path(), "/app not-a-number\n").unwrap();

    let poll_loop = ctx.started(ctx.config(&["/app"])).await;

    assert_eq!(poll_loop.offsets().get("/app"), Some(&0));
}

#[tokio::test]
async fn test_remote_error_aborts_by_default() {
    let ctx = TestContext::new();
    ctx.source.push_error(
        "/gone",
        Error::remote("FilterLogEvents", "ResourceNotFoundException", "no such group"),
    );

    let mut poll_loop = ctx.started(ctx.config(&["/gone"])).await;
    let err = poll_loop.run_cycle().await.unwrap_err();

    assert!(matches!(err, Error::Remote { .. }));
    assert_eq!(poll_loop.state(), PollState::Stopped);
    assert!(poll_loop.run_cycle().await.is_err());
}

#[tokio::test]
async fn test_remote_error_skipped_by_policy() {
    let ctx = TestContext::new();
    ctx.source
        .push_error("/a", Error::transport("connection reset by peer"));
    ctx.source.push_page("/b", fixtures::events_at(&[7]), None);

    let mut config = ctx.config(&["/a", "/b"]);
    config.remote_error_policy = RemoteErrorPolicy::Skip;
    let mut poll_loop = ctx.started(config).await;

    let first = poll_loop.run_cycle().await.unwrap();
    assert!(matches!(first.outcome, CycleOutcome::Skipped(_)));
    assert_eq!(poll_loop.state(), PollState::Cycling);

    let second = poll_loop.run_cycle().await.unwrap();
    assert!(second.is_complete());
    assert_eq!(poll_loop.offsets().get("/b"), Some(&8));
}

/// A closed sink stops the loop whatever the remote error policy says.
#[tokio::test]
async fn test_closed_sink_stops_loop() {
    let ctx = TestContext::new();
    ctx.source.push_page("/app", fixtures::events_at(&[1, 2]), None);
    ctx.sink.close();

    let mut config = ctx.config(&["/app"]);
    config.remote_error_policy = RemoteErrorPolicy::Skip;
    let mut poll_loop = ctx.started(config).await;

    let err = poll_loop.run_cycle().await.unwrap_err();

    assert!(matches!(err, Error::SinkClosed));
    assert_eq!(poll_loop.state(), PollState::Stopped);
    // nothing was delivered, so nothing was checkpointed
    assert_eq!(poll_loop.offsets().get("/app"), Some(&0));
}

/// Offset write failures are logged and polling carries on.
#[tokio::test]
async fn test_unwritable_offset_file_does_not_stop_polling() {
    let ctx = TestContext::new();
    let blocker = ctx.dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();
    ctx.source.push_page("/app", fixtures::events_at(&[10]), None);

    let mut config = ctx.config(&["/app"]);
    config.sincedb_path = Some(blocker.join(".sincedb"));
    let mut poll_loop = ctx.poll_loop(config);
    poll_loop.initialize().await.unwrap();

    let report = poll_loop.run_cycle().await.unwrap();

    assert!(report.is_complete());
    assert_eq!(poll_loop.offsets().get("/app"), Some(&11));
}

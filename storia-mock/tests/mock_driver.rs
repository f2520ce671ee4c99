use storia_core::{
    BarFeed, CancelFlag, FieldMask, HistoryDriver, HistoryError, Period, PullOutcome, PullRequest,
};
use storia_mock::{MockDriver, day_ts};

fn req() -> PullRequest {
    PullRequest {
        period: Period::Daily,
        start: None,
        end: None,
        fields: FieldMask::PRICE,
    }
}

#[tokio::test]
async fn feed_serves_bars_in_order_then_finishes() {
    let driver = MockDriver::daily("ordered", &[(1, 1.0), (2, 2.0)]);
    let mut feed = driver.begin(&req()).await.unwrap();
    assert_eq!(feed.period(), Period::Daily);
    assert_eq!(feed.fields(), FieldMask::PRICE);

    let PullOutcome::Bar(first) = feed.pull().await.unwrap() else {
        panic!("expected a bar");
    };
    assert_eq!(first.ts, day_ts(1));
    let PullOutcome::Bar(second) = feed.pull().await.unwrap() else {
        panic!("expected a bar");
    };
    assert_eq!(second.ts, day_ts(2));
    assert_eq!(feed.pull().await.unwrap(), PullOutcome::Finished);
    assert_eq!(feed.pull().await.unwrap(), PullOutcome::Finished);
}

#[tokio::test]
async fn feed_filters_to_the_requested_range() {
    let driver = MockDriver::daily("ranged", &[(1, 1.0), (2, 2.0), (3, 3.0), (4, 4.0)]);
    let mut feed = driver
        .begin(&PullRequest {
            start: Some(day_ts(2)),
            end: Some(day_ts(3)),
            ..req()
        })
        .await
        .unwrap();

    let mut seen = Vec::new();
    while let PullOutcome::Bar(bar) = feed.pull().await.unwrap() {
        seen.push(bar.ts);
    }
    assert_eq!(seen, vec![day_ts(2), day_ts(3)]);
}

#[tokio::test]
async fn scripted_begin_failure_surfaces_as_driver_error() {
    let driver = MockDriver::daily("down", &[(1, 1.0)]).will_fail_begin("unreachable");
    let err = driver.begin(&req()).await.err().unwrap();
    assert!(matches!(err, HistoryError::Driver { .. }));
}

#[tokio::test]
async fn scripted_pull_failure_fires_after_n_bars() {
    let driver = MockDriver::daily("flaky", &[(1, 1.0), (2, 2.0), (3, 3.0)]).will_fail_after(2);
    let mut feed = driver.begin(&req()).await.unwrap();
    assert!(matches!(
        feed.pull().await.unwrap(),
        PullOutcome::Bar(_)
    ));
    assert!(matches!(
        feed.pull().await.unwrap(),
        PullOutcome::Bar(_)
    ));
    assert!(feed.pull().await.is_err());
}

#[tokio::test]
async fn drifted_bar_loses_a_declared_field() {
    let driver = MockDriver::daily("drift", &[(1, 1.0), (2, 2.0)]).will_drift_fields_at(1);
    let mut feed = driver.begin(&req()).await.unwrap();
    let PullOutcome::Bar(first) = feed.pull().await.unwrap() else {
        panic!("expected a bar");
    };
    assert_eq!(first.fields(), FieldMask::PRICE);
    let PullOutcome::Bar(second) = feed.pull().await.unwrap() else {
        panic!("expected a bar");
    };
    assert_ne!(second.fields(), FieldMask::PRICE);
}

#[tokio::test]
async fn cancel_trip_flips_the_flag_after_n_bars() {
    let flag = CancelFlag::new();
    let driver = MockDriver::daily("trip", &[(1, 1.0), (2, 2.0), (3, 3.0)])
        .will_trip_cancel_after(2, flag.clone());
    let mut feed = driver.begin(&req()).await.unwrap();

    feed.pull().await.unwrap();
    assert!(!flag.is_cancelled());
    feed.pull().await.unwrap();
    assert!(flag.is_cancelled());
}

#[tokio::test]
async fn cancelled_feed_reports_finished() {
    let driver = MockDriver::daily("cancelled", &[(1, 1.0), (2, 2.0)]);
    let mut feed = driver.begin(&req()).await.unwrap();
    feed.cancel();
    assert_eq!(feed.pull().await.unwrap(), PullOutcome::Finished);
}

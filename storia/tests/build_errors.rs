use std::sync::Arc;

use storia::{AttachParams, FieldMask, HistoryBuilder, HistoryError, Period};
use storia_mock::MockDriver;

fn params() -> AttachParams {
    AttachParams::new(Period::Daily, FieldMask::PRICE)
}

#[tokio::test]
async fn surviving_source_keeps_the_build_alive() {
    let bad = Arc::new(MockDriver::daily("bad", &[(1, 1.0)]).will_fail_begin("unreachable"));
    let good = Arc::new(MockDriver::daily("good", &[(1, 1.0), (2, 2.0)]));

    let mut builder = HistoryBuilder::new();
    builder.attach_source(bad, params()).unwrap();
    builder.attach_source(good, params()).unwrap();

    let history = builder.build().await.unwrap();
    assert_eq!(history.nb_bars(), 2);
}

#[tokio::test]
async fn all_sources_failing_returns_the_first_error() {
    let first = Arc::new(MockDriver::daily("first", &[(1, 1.0)]).will_fail_begin("first down"));
    let second = Arc::new(MockDriver::daily("second", &[(1, 1.0)]).will_fail_begin("second down"));

    let mut builder = HistoryBuilder::new();
    builder.attach_source(first, params()).unwrap();
    builder.attach_source(second, params()).unwrap();

    let err = builder.build().await.unwrap_err();
    match err {
        HistoryError::Driver { driver, msg } => {
            assert_eq!(driver, "first");
            assert!(msg.contains("first down"));
        }
        other => panic!("expected the first driver error, got {other}"),
    }
}

#[tokio::test]
async fn mid_pull_failure_drops_only_that_source() {
    // Fails after two bars; the collected bars are discarded with the
    // session while the other source still merges.
    let flaky = Arc::new(MockDriver::daily("flaky", &[(1, 1.0), (2, 2.0), (3, 3.0)]).will_fail_after(2));
    let steady = Arc::new(MockDriver::daily("steady", &[(5, 5.0), (6, 6.0)]));

    let mut builder = HistoryBuilder::new();
    builder.attach_source(flaky, params()).unwrap();
    builder.attach_source(steady, params()).unwrap();

    let history = builder.build().await.unwrap();
    assert_eq!(history.close, vec![5.0, 6.0]);
}

#[tokio::test]
async fn required_source_failure_is_fatal() {
    let bad = Arc::new(MockDriver::daily("bad", &[(1, 1.0)]).will_fail_begin("unreachable"));
    let good = Arc::new(MockDriver::daily("good", &[(1, 1.0)]));

    let mut builder = HistoryBuilder::new();
    builder.attach_source(bad, params().required()).unwrap();
    builder.attach_source(good, params()).unwrap();

    let err = builder.build().await.unwrap_err();
    assert!(matches!(err, HistoryError::Driver { .. }));
}

#[tokio::test]
async fn field_drift_aborts_the_whole_build() {
    // An invariant violation is fatal even when another source succeeded.
    let drifting =
        Arc::new(MockDriver::daily("drifting", &[(1, 1.0), (2, 2.0)]).will_drift_fields_at(1));
    let good = Arc::new(MockDriver::daily("good", &[(3, 3.0)]));

    let mut builder = HistoryBuilder::new();
    builder.attach_source(drifting, params()).unwrap();
    builder.attach_source(good, params()).unwrap();

    let err = builder.build().await.unwrap_err();
    assert!(matches!(err, HistoryError::Internal(_)));
}

#[tokio::test]
async fn attach_rejects_unsupported_period() {
    // The driver serves daily bars; weekly can be aggregated from them,
    // but minutes cannot be synthesized.
    let daily = Arc::new(MockDriver::daily("daily-only", &[(1, 1.0)]));
    let mut builder = HistoryBuilder::new();
    let err = builder
        .attach_source(
            daily,
            AttachParams::new(Period::Minutes(15), FieldMask::PRICE),
        )
        .unwrap_err();
    assert!(matches!(err, HistoryError::BadParam(_)));
}

#[tokio::test]
async fn attach_rejects_empty_field_mask() {
    let daily = Arc::new(MockDriver::daily("daily", &[(1, 1.0)]));
    let mut builder = HistoryBuilder::new();
    let err = builder
        .attach_source(daily, AttachParams::new(Period::Daily, FieldMask::empty()))
        .unwrap_err();
    assert!(matches!(err, HistoryError::BadParam(_)));
}

use std::sync::Arc;

use storia::{AttachParams, FieldMask, HistoryBuilder, Period};
use storia_mock::{MockDriver, day_ts};

const DAY: i64 = 86_400;
const HOUR: i64 = 3_600;

#[tokio::test]
async fn intraday_source_is_normalized_to_the_coarsest_period() {
    // 24 hourly bars covering epoch day 2, plus a daily source for days
    // 5 and 6. Everything lands on the common daily period.
    let hourly: Vec<(i64, f64)> = (1..=24)
        .map(|h| (2 * DAY + h * HOUR, h as f64))
        .collect();
    let minutes = Arc::new(MockDriver::minutes("intraday", 60, &hourly));
    let daily = Arc::new(MockDriver::daily("eod", &[(5, 50.0), (6, 60.0)]));

    let mut builder = HistoryBuilder::new();
    builder
        .attach_source(
            minutes,
            AttachParams::new(Period::Minutes(60), FieldMask::PRICE),
        )
        .unwrap();
    builder
        .attach_source(daily, AttachParams::new(Period::Daily, FieldMask::PRICE))
        .unwrap();

    let history = builder.build().await.unwrap();
    assert_eq!(history.period, Period::Daily);
    assert_eq!(history.nb_bars(), 3);

    // The aggregated day closes at the day-3 boundary with first/last/max/
    // min taken over its 24 constituent hours.
    assert_eq!(history.timestamp[0], day_ts(3));
    assert_eq!(history.open[0], 1.0);
    assert_eq!(history.close[0], 24.0);
    assert_eq!(history.high[0], 24.0);
    assert_eq!(history.low[0], 1.0);

    assert_eq!(history.timestamp[1], day_ts(5));
    assert_eq!(history.timestamp[2], day_ts(6));
}

#[tokio::test]
async fn lone_intraday_source_keeps_its_native_period() {
    let hourly: Vec<(i64, f64)> = (1..=10)
        .map(|h| (2 * DAY + h * HOUR, h as f64))
        .collect();
    let minutes = Arc::new(MockDriver::minutes("lone", 60, &hourly));

    let mut builder = HistoryBuilder::new();
    builder
        .attach_source(
            minutes,
            AttachParams::new(Period::Minutes(60), FieldMask::PRICE),
        )
        .unwrap();

    let history = builder.build().await.unwrap();
    assert_eq!(history.period, Period::Minutes(60));
    assert_eq!(history.nb_bars(), 10);
}

#[tokio::test]
async fn incomplete_trailing_day_is_not_published() {
    // Only 10 of 24 hourly bars: once the build normalizes to daily, the
    // trailing window never reaches its closing boundary and is dropped.
    let hourly: Vec<(i64, f64)> = (1..=10)
        .map(|h| (2 * DAY + h * HOUR, h as f64))
        .collect();
    let minutes = Arc::new(MockDriver::minutes("partial", 60, &hourly));
    let daily = Arc::new(MockDriver::daily("eod", &[(5, 50.0), (6, 60.0)]));

    let mut builder = HistoryBuilder::new();
    builder
        .attach_source(
            minutes,
            AttachParams::new(Period::Minutes(60), FieldMask::PRICE),
        )
        .unwrap();
    builder
        .attach_source(daily, AttachParams::new(Period::Daily, FieldMask::PRICE))
        .unwrap();

    let history = builder.build().await.unwrap();
    assert_eq!(history.period, Period::Daily);
    assert_eq!(history.close, vec![50.0, 60.0]);
}

#[tokio::test]
async fn requesting_weekly_from_a_daily_driver_transforms_the_result() {
    // Days 4..=10 are one complete Monday-start week; days 11..=12 start
    // the next week but never complete it.
    let rows: Vec<(i64, f64)> = (4..=12).map(|d| (d + 1, d as f64)).collect();
    let daily = Arc::new(MockDriver::daily("eod", &rows));

    let mut builder = HistoryBuilder::new();
    builder
        .attach_source(daily, AttachParams::new(Period::Weekly, FieldMask::PRICE))
        .unwrap();

    let history = builder.build().await.unwrap();
    assert_eq!(history.period, Period::Weekly);
    assert_eq!(history.nb_bars(), 1);
    assert_eq!(history.timestamp[0], day_ts(11));
    assert_eq!(history.open[0], 4.0);
    assert_eq!(history.close[0], 10.0);
}

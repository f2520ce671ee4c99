use std::sync::Arc;

use storia::{AttachParams, FieldMask, HistoryBuilder, Period, SplitAdjust, ValueAdjust};
use storia_mock::{MockDriver, day_ts};

#[tokio::test]
async fn split_rescales_history_before_its_date() {
    // A factor-2 split dated day 4 doubles days 1-3 (prices and volume);
    // day 4 onward is untouched.
    let driver = Arc::new(MockDriver::daily_ohlcv(
        "split-source",
        &[
            (1, 10.0, 10.0, 10.0, 10.0, 100),
            (2, 11.0, 11.0, 11.0, 11.0, 100),
            (3, 12.0, 12.0, 12.0, 12.0, 100),
            (4, 13.0, 13.0, 13.0, 13.0, 100),
            (5, 14.0, 14.0, 14.0, 14.0, 100),
        ],
    ));

    let mut builder = HistoryBuilder::new();
    builder
        .attach_source(
            driver,
            AttachParams::new(Period::Daily, FieldMask::PRICE | FieldMask::VOLUME).with_splits(
                vec![SplitAdjust {
                    ts: day_ts(4),
                    factor: 2.0,
                }],
            ),
        )
        .unwrap();

    let history = builder.build().await.unwrap();
    assert_eq!(history.close, vec![20.0, 22.0, 24.0, 13.0, 14.0]);
    assert_eq!(history.volume, vec![200, 200, 200, 100, 100]);
}

#[tokio::test]
async fn value_adjust_shifts_prices_but_not_volume() {
    let driver = Arc::new(MockDriver::daily_ohlcv(
        "dividend-source",
        &[
            (1, 10.0, 10.0, 10.0, 10.0, 100),
            (2, 10.0, 10.0, 10.0, 10.0, 100),
            (3, 10.0, 10.0, 10.0, 10.0, 100),
        ],
    ));

    let mut builder = HistoryBuilder::new();
    builder
        .attach_source(
            driver,
            AttachParams::new(Period::Daily, FieldMask::PRICE | FieldMask::VOLUME)
                .with_value_adjusts(vec![ValueAdjust {
                    ts: day_ts(3),
                    amount: 0.5,
                }]),
        )
        .unwrap();

    let history = builder.build().await.unwrap();
    assert_eq!(history.close, vec![9.5, 9.5, 10.0]);
    assert_eq!(history.volume, vec![100, 100, 100]);
}

#[tokio::test]
async fn adjustments_only_touch_their_own_source() {
    let adjusted = Arc::new(MockDriver::daily("adjusted", &[(1, 10.0), (2, 10.0)]));
    let plain = Arc::new(MockDriver::daily("plain", &[(3, 10.0), (4, 10.0)]));

    let mut builder = HistoryBuilder::new();
    builder
        .attach_source(
            adjusted,
            AttachParams::new(Period::Daily, FieldMask::PRICE).with_splits(vec![SplitAdjust {
                ts: day_ts(10),
                factor: 2.0,
            }]),
        )
        .unwrap();
    builder
        .attach_source(plain, AttachParams::new(Period::Daily, FieldMask::PRICE))
        .unwrap();

    let history = builder.build().await.unwrap();
    // Both of the adjusted source's bars double; the plain source's bars,
    // although also older than the split date, belong to another source.
    assert_eq!(history.close, vec![20.0, 20.0, 10.0, 10.0]);
}

//! Deterministic bar fixtures shared by the mock driver and tests.

use chrono::{DateTime, Utc};
use storia_core::Bar;

const DAY: i64 = 86_400;

fn ts(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).expect("fixture timestamp within range")
}

/// A bar with every price column set to `close`, stamped at `secs`.
#[must_use]
pub fn flat_bar(secs: i64, close: f64) -> Bar {
    Bar {
        ts: ts(secs),
        open: Some(close),
        high: Some(close),
        low: Some(close),
        close: Some(close),
        volume: None,
        open_interest: None,
    }
}

/// Flat daily bars from `(day, close)` rows, closing at `day * 86_400`.
#[must_use]
pub fn flat_daily(rows: &[(i64, f64)]) -> Vec<Bar> {
    rows.iter()
        .map(|&(day, close)| flat_bar(day * DAY, close))
        .collect()
}

/// Full daily bars from `(day, open, high, low, close, volume)` rows.
#[must_use]
pub fn daily_ohlcv(rows: &[(i64, f64, f64, f64, f64, i64)]) -> Vec<Bar> {
    rows.iter()
        .map(|&(day, open, high, low, close, volume)| Bar {
            ts: ts(day * DAY),
            open: Some(open),
            high: Some(high),
            low: Some(low),
            close: Some(close),
            volume: Some(volume),
            open_interest: None,
        })
        .collect()
}

//! Mock storia driver with deterministic scripted bar data.
//!
//! [`MockDriver`] serves a pre-scripted bar series and can inject the
//! failure modes the builder has to cope with: a refused feed, a pull
//! error after N bars, a mid-stream field drift, and a cancellation
//! tripwire that flips a [`CancelFlag`] after N bars.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use storia_core::{
    Bar, BarFeed, CancelFlag, DriverParameters, FieldMask, HistoryDriver, HistoryError, Period,
    PullOutcome, PullRequest,
};

pub mod fixtures;

const DAY: i64 = 86_400;

/// Scripted in-memory driver used by integration tests and examples.
pub struct MockDriver {
    name: &'static str,
    period: Period,
    fields: FieldMask,
    bars: Vec<Bar>,
    begin_error: Option<&'static str>,
    fail_after: Option<usize>,
    drift_fields_at: Option<usize>,
    cancel_trip: Option<(usize, CancelFlag)>,
}

impl MockDriver {
    /// A driver serving the given bars at `period`, populating `fields`.
    #[must_use]
    pub fn new(name: &'static str, period: Period, fields: FieldMask, bars: Vec<Bar>) -> Self {
        Self {
            name,
            period,
            fields,
            bars,
            begin_error: None,
            fail_after: None,
            drift_fields_at: None,
            cancel_trip: None,
        }
    }

    /// Daily driver from `(day, close)` rows: all price columns carry the
    /// close value and the bar closes at `day * 86_400` seconds from the
    /// epoch.
    #[must_use]
    pub fn daily(name: &'static str, rows: &[(i64, f64)]) -> Self {
        Self::new(
            name,
            Period::Daily,
            FieldMask::PRICE,
            fixtures::flat_daily(rows),
        )
    }

    /// Daily driver from full `(day, open, high, low, close, volume)` rows.
    #[must_use]
    pub fn daily_ohlcv(name: &'static str, rows: &[(i64, f64, f64, f64, f64, i64)]) -> Self {
        Self::new(
            name,
            Period::Daily,
            FieldMask::PRICE | FieldMask::VOLUME,
            fixtures::daily_ohlcv(rows),
        )
    }

    /// Intraday driver with a fixed minute step, from `(ts_secs, close)`
    /// rows stamped verbatim.
    #[must_use]
    pub fn minutes(name: &'static str, step: u32, rows: &[(i64, f64)]) -> Self {
        let bars = rows
            .iter()
            .map(|&(ts, close)| fixtures::flat_bar(ts, close))
            .collect();
        Self::new(name, Period::Minutes(step), FieldMask::PRICE, bars)
    }

    /// Refuse to open a feed, failing every build attempt immediately.
    #[must_use]
    pub const fn will_fail_begin(mut self, msg: &'static str) -> Self {
        self.begin_error = Some(msg);
        self
    }

    /// Return a driver error from `pull` after serving `n` bars.
    #[must_use]
    pub const fn will_fail_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Serve bar `n` with a mutated field set, violating the session
    /// invariant.
    #[must_use]
    pub const fn will_drift_fields_at(mut self, n: usize) -> Self {
        self.drift_fields_at = Some(n);
        self
    }

    /// Flip `flag` after serving `n` bars, exercising cooperative
    /// cancellation mid-pull.
    #[must_use]
    pub fn will_trip_cancel_after(mut self, n: usize, flag: CancelFlag) -> Self {
        self.cancel_trip = Some((n, flag));
        self
    }
}

#[async_trait]
impl HistoryDriver for MockDriver {
    fn name(&self) -> &'static str {
        self.name
    }

    fn parameters(&self) -> DriverParameters {
        DriverParameters {
            periods: vec![self.period],
            fields: self.fields,
        }
    }

    async fn begin(&self, req: &PullRequest) -> Result<Box<dyn BarFeed>, HistoryError> {
        if let Some(msg) = self.begin_error {
            return Err(HistoryError::driver(self.name, msg));
        }
        let bars: Vec<Bar> = self
            .bars
            .iter()
            .copied()
            .filter(|b| req.start.is_none_or(|s| b.ts >= s))
            .filter(|b| req.end.is_none_or(|e| b.ts <= e))
            .collect();
        Ok(Box::new(MockFeed {
            name: self.name,
            period: self.period,
            fields: self.fields,
            bars,
            next: 0,
            fail_after: self.fail_after,
            drift_fields_at: self.drift_fields_at,
            cancel_trip: self.cancel_trip.clone(),
            cancelled: false,
        }))
    }
}

struct MockFeed {
    name: &'static str,
    period: Period,
    fields: FieldMask,
    bars: Vec<Bar>,
    next: usize,
    fail_after: Option<usize>,
    drift_fields_at: Option<usize>,
    cancel_trip: Option<(usize, CancelFlag)>,
    cancelled: bool,
}

#[async_trait]
impl BarFeed for MockFeed {
    fn period(&self) -> Period {
        self.period
    }

    fn fields(&self) -> FieldMask {
        self.fields
    }

    async fn pull(&mut self) -> Result<PullOutcome, HistoryError> {
        if self.cancelled || self.next >= self.bars.len() {
            return Ok(PullOutcome::Finished);
        }
        if self.fail_after == Some(self.next) {
            return Err(HistoryError::driver(self.name, "scripted pull failure"));
        }
        let mut bar = self.bars[self.next];
        if self.drift_fields_at == Some(self.next) {
            bar.close = None;
        }
        self.next += 1;
        if let Some((n, flag)) = &self.cancel_trip
            && self.next >= *n
        {
            flag.cancel();
        }
        Ok(PullOutcome::Bar(bar))
    }

    fn cancel(&mut self) {
        self.cancelled = true;
    }
}

/// Timestamp for the closing boundary of epoch day `day`.
#[must_use]
pub fn day_ts(day: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(day * DAY, 0).expect("day within range")
}

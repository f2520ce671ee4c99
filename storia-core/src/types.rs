use bitflags::bitflags;
use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

const DAY: i64 = 86_400;

/// Sampling granularity of a bar sequence.
///
/// Periods are totally ordered by window length so the builder can resolve
/// the coarsest period among heterogeneous sources. `Minutes(1440)` and
/// `Daily` have equal length but remain distinct values; the ordering
/// breaks the tie on the variant so `Ord` stays lawful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    /// Intraday bars with a fixed step in minutes (e.g. 1, 15, 90).
    Minutes(u32),
    /// Calendar-day bars.
    Daily,
    /// Calendar-week bars (weeks start Monday 00:00).
    Weekly,
    /// Calendar-month bars.
    Monthly,
}

impl Period {
    /// Approximate window length in seconds, used as the coarseness rank.
    #[must_use]
    pub const fn approx_secs(self) -> i64 {
        match self {
            Self::Minutes(m) => m as i64 * 60,
            Self::Daily => DAY,
            Self::Weekly => 7 * DAY,
            Self::Monthly => 30 * DAY,
        }
    }

    const fn variant_rank(self) -> u8 {
        match self {
            Self::Minutes(_) => 0,
            Self::Daily => 1,
            Self::Weekly => 2,
            Self::Monthly => 3,
        }
    }

    /// The opening instant of a bar that closes at `close_ts`.
    ///
    /// Bars are stamped at the closing boundary of their sampling window,
    /// so this walks one period backwards (calendar arithmetic for
    /// `Monthly`). Returns `None` when the instant is not representable.
    #[must_use]
    pub fn window_open(self, close_ts: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Minutes(m) => {
                DateTime::from_timestamp(close_ts.timestamp() - i64::from(m) * 60, 0)
            }
            Self::Daily => DateTime::from_timestamp(close_ts.timestamp() - DAY, 0),
            Self::Weekly => DateTime::from_timestamp(close_ts.timestamp() - 7 * DAY, 0),
            Self::Monthly => close_ts.checked_sub_months(Months::new(1)),
        }
    }

    /// Floor an instant to the start of the window containing it.
    ///
    /// `offset_secs` shifts the day/week/month boundary so windows align to
    /// a market-local midnight instead of UTC.
    #[must_use]
    pub fn window_start(self, ts: DateTime<Utc>, offset_secs: i64) -> Option<DateTime<Utc>> {
        let shifted = ts.timestamp() + offset_secs;
        match self {
            Self::Minutes(m) => {
                let step = i64::from(m) * 60;
                if step == 0 {
                    return None;
                }
                let floored = shifted - shifted.rem_euclid(step);
                DateTime::from_timestamp(floored - offset_secs, 0)
            }
            Self::Daily => {
                let day = shifted.div_euclid(DAY);
                DateTime::from_timestamp(day * DAY - offset_secs, 0)
            }
            Self::Weekly => {
                let day = shifted.div_euclid(DAY);
                // 1970-01-01 is a Thursday; rewind to the Monday of the week.
                let monday = day - (day + 3).rem_euclid(7);
                DateTime::from_timestamp(monday * DAY - offset_secs, 0)
            }
            Self::Monthly => {
                let shifted_dt = DateTime::from_timestamp(shifted, 0)?;
                let date = shifted_dt.date_naive();
                let first = NaiveDate::from_ymd_opt(date.year(), date.month(), 1)?;
                let start = first.and_hms_opt(0, 0, 0)?.and_utc().timestamp();
                DateTime::from_timestamp(start - offset_secs, 0)
            }
        }
    }

    /// Exclusive closing boundary of the window starting at `start`.
    #[must_use]
    pub fn window_end(self, start: DateTime<Utc>, offset_secs: i64) -> Option<DateTime<Utc>> {
        match self {
            Self::Minutes(m) => {
                DateTime::from_timestamp(start.timestamp() + i64::from(m) * 60, 0)
            }
            Self::Daily => DateTime::from_timestamp(start.timestamp() + DAY, 0),
            Self::Weekly => DateTime::from_timestamp(start.timestamp() + 7 * DAY, 0),
            Self::Monthly => {
                let shifted = DateTime::from_timestamp(start.timestamp() + offset_secs, 0)?;
                let next = shifted.checked_add_months(Months::new(1))?;
                DateTime::from_timestamp(next.timestamp() - offset_secs, 0)
            }
        }
    }
}

impl Default for Period {
    fn default() -> Self {
        Self::Daily
    }
}

impl Ord for Period {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        (self.approx_secs(), self.variant_rank())
            .cmp(&(other.approx_secs(), other.variant_rank()))
    }
}

impl PartialOrd for Period {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

bitflags! {
    /// Which of the OHLCV / open-interest columns a source populates.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct FieldMask: u8 {
        /// Opening price.
        const OPEN = 1 << 0;
        /// High price.
        const HIGH = 1 << 1;
        /// Low price.
        const LOW = 1 << 2;
        /// Closing price.
        const CLOSE = 1 << 3;
        /// Traded volume.
        const VOLUME = 1 << 4;
        /// Open interest.
        const OPEN_INTEREST = 1 << 5;

        /// The four price columns.
        const PRICE = Self::OPEN.bits()
            | Self::HIGH.bits()
            | Self::LOW.bits()
            | Self::CLOSE.bits();
        /// Every column a driver can serve.
        const ALL = Self::PRICE.bits()
            | Self::VOLUME.bits()
            | Self::OPEN_INTEREST.bits();
    }
}

/// One pulled price bar, stamped at the closing boundary of its window.
///
/// Columns a driver does not serve are `None`; the populated set must stay
/// identical for every bar of one pull session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    /// Closing instant of the bar's sampling window.
    pub ts: DateTime<Utc>,
    /// Opening price, if served.
    pub open: Option<f64>,
    /// High price, if served.
    pub high: Option<f64>,
    /// Low price, if served.
    pub low: Option<f64>,
    /// Closing price, if served.
    pub close: Option<f64>,
    /// Traded volume, if served.
    pub volume: Option<i64>,
    /// Open interest, if served.
    pub open_interest: Option<i64>,
}

impl Bar {
    /// The set of columns actually populated on this bar.
    #[must_use]
    pub fn fields(&self) -> FieldMask {
        let mut mask = FieldMask::empty();
        if self.open.is_some() {
            mask |= FieldMask::OPEN;
        }
        if self.high.is_some() {
            mask |= FieldMask::HIGH;
        }
        if self.low.is_some() {
            mask |= FieldMask::LOW;
        }
        if self.close.is_some() {
            mask |= FieldMask::CLOSE;
        }
        if self.volume.is_some() {
            mask |= FieldMask::VOLUME;
        }
        if self.open_interest.is_some() {
            mask |= FieldMask::OPEN_INTEREST;
        }
        mask
    }
}

use chrono::{DateTime, Utc};

use crate::types::{Bar, FieldMask, Period};

/// Default number of bars per block before the session rolls to a new one.
///
/// Bounds the size of a single merge copy op while keeping appends
/// amortized through `Vec` growth.
pub const BLOCK_CAPACITY: usize = 4096;

/// One columnar chunk of bars from a single pull session.
///
/// Only the columns named in `fields` are materialized; every materialized
/// column has length `nb_bars()`. Timestamps are strictly increasing
/// within a block (the session enforces this on append).
#[derive(Debug, Clone, PartialEq)]
pub struct DataBlock {
    /// Closing instants, strictly increasing.
    pub timestamp: Vec<DateTime<Utc>>,
    /// Opening prices (empty unless `fields` contains `OPEN`).
    pub open: Vec<f64>,
    /// High prices.
    pub high: Vec<f64>,
    /// Low prices.
    pub low: Vec<f64>,
    /// Closing prices.
    pub close: Vec<f64>,
    /// Traded volume.
    pub volume: Vec<i64>,
    /// Open interest.
    pub open_interest: Vec<i64>,
    /// Native period of every bar in the block.
    pub period: Period,
    /// Columns materialized in this block.
    pub fields: FieldMask,
}

impl DataBlock {
    /// Create an empty block for the given period and column set.
    #[must_use]
    pub fn new(period: Period, fields: FieldMask) -> Self {
        let col = |f: FieldMask| {
            if fields.contains(f) {
                Vec::with_capacity(BLOCK_CAPACITY.min(64))
            } else {
                Vec::new()
            }
        };
        let icol = |f: FieldMask| {
            if fields.contains(f) {
                Vec::with_capacity(BLOCK_CAPACITY.min(64))
            } else {
                Vec::new()
            }
        };
        Self {
            timestamp: Vec::with_capacity(BLOCK_CAPACITY.min(64)),
            open: col(FieldMask::OPEN),
            high: col(FieldMask::HIGH),
            low: col(FieldMask::LOW),
            close: col(FieldMask::CLOSE),
            volume: icol(FieldMask::VOLUME),
            open_interest: icol(FieldMask::OPEN_INTEREST),
            period,
            fields,
        }
    }

    /// Number of bars held by the block.
    #[must_use]
    pub fn nb_bars(&self) -> usize {
        self.timestamp.len()
    }

    /// Whether the block reached its roll capacity.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.nb_bars() >= BLOCK_CAPACITY
    }

    /// Timestamp of the last bar, if any.
    #[must_use]
    pub fn last_ts(&self) -> Option<DateTime<Utc>> {
        self.timestamp.last().copied()
    }

    /// Append a bar whose populated columns match `self.fields`.
    ///
    /// The caller (the session) has already validated the mask and the
    /// timestamp ordering, so missing values here only occur for columns
    /// outside the mask and are simply not materialized.
    pub fn push(&mut self, bar: &Bar) {
        self.timestamp.push(bar.ts);
        if self.fields.contains(FieldMask::OPEN) {
            self.open.push(bar.open.unwrap_or_default());
        }
        if self.fields.contains(FieldMask::HIGH) {
            self.high.push(bar.high.unwrap_or_default());
        }
        if self.fields.contains(FieldMask::LOW) {
            self.low.push(bar.low.unwrap_or_default());
        }
        if self.fields.contains(FieldMask::CLOSE) {
            self.close.push(bar.close.unwrap_or_default());
        }
        if self.fields.contains(FieldMask::VOLUME) {
            self.volume.push(bar.volume.unwrap_or_default());
        }
        if self.fields.contains(FieldMask::OPEN_INTEREST) {
            self.open_interest.push(bar.open_interest.unwrap_or_default());
        }
    }
}

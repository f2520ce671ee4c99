use chrono::{DateTime, Utc};

use crate::HistoryError;
use crate::block::DataBlock;
use crate::pipeline::normalize::rebucket_blocks;
use crate::types::{FieldMask, Period};

/// The final columnar series returned by a build.
///
/// Only the columns named in `fields` are populated; the others are empty.
/// Populated columns all have length `nb_bars()` and `timestamp` is
/// strictly increasing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    /// Closing instants, strictly increasing.
    pub timestamp: Vec<DateTime<Utc>>,
    /// Opening prices.
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
    /// Resolved sampling period of the series.
    pub period: Period,
    /// Columns actually populated.
    pub fields: FieldMask,
}

impl History {
    /// An empty series at the given period and column set.
    #[must_use]
    pub fn empty(period: Period, fields: FieldMask) -> Self {
        Self {
            period,
            fields,
            ..Self::default()
        }
    }

    /// Number of bars in the series.
    #[must_use]
    pub fn nb_bars(&self) -> usize {
        self.timestamp.len()
    }

    /// Whether the series holds no bars.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamp.is_empty()
    }

    /// Copy out the sub-series covering bar indices `start..=end`.
    ///
    /// # Errors
    /// Returns `OutOfRangeStart` when `start` is past the last bar and
    /// `OutOfRangeEnd` when `end` is before `start` or past the last bar.
    pub fn slice(&self, start: usize, end: usize) -> Result<Self, HistoryError> {
        if start >= self.nb_bars() {
            return Err(HistoryError::OutOfRangeStart);
        }
        if end < start || end >= self.nb_bars() {
            return Err(HistoryError::OutOfRangeEnd);
        }
        let range = start..=end;
        let cut_f = |col: &[f64]| {
            if col.is_empty() {
                Vec::new()
            } else {
                col[range.clone()].to_vec()
            }
        };
        let cut_i = |col: &[i64]| {
            if col.is_empty() {
                Vec::new()
            } else {
                col[range.clone()].to_vec()
            }
        };
        Ok(Self {
            timestamp: self.timestamp[range.clone()].to_vec(),
            open: cut_f(&self.open),
            high: cut_f(&self.high),
            low: cut_f(&self.low),
            close: cut_f(&self.close),
            volume: cut_i(&self.volume),
            open_interest: cut_i(&self.open_interest),
            period: self.period,
            fields: self.fields,
        })
    }

    /// Re-sample the series to a coarser period in place.
    ///
    /// `offset_secs` shifts day/week/month boundaries to a market-local
    /// midnight. Transforming to the current period is a no-op.
    ///
    /// # Errors
    /// Returns `BadParam` when `new_period` is finer than the series
    /// period — a coarse series cannot be re-split into finer bars.
    pub fn transform_period(
        &mut self,
        new_period: Period,
        offset_secs: i64,
    ) -> Result<(), HistoryError> {
        if new_period == self.period {
            return Ok(());
        }
        let transformed = self.resampled(new_period, offset_secs)?;
        *self = transformed;
        Ok(())
    }

    /// Re-sample into newly allocated arrays, leaving `self` untouched.
    ///
    /// # Errors
    /// Returns `BadParam` when `new_period` is finer than the series
    /// period.
    pub fn resampled(&self, new_period: Period, offset_secs: i64) -> Result<Self, HistoryError> {
        if new_period < self.period {
            return Err(HistoryError::bad_param(
                "cannot transform a series to a finer period",
            ));
        }
        if new_period == self.period {
            return Ok(self.clone());
        }
        if self.is_empty() {
            return Ok(Self::empty(new_period, self.fields));
        }
        let block = self.as_block();
        let rebucketed = rebucket_blocks(
            std::slice::from_ref(&block),
            self.period,
            new_period,
            offset_secs,
            self.fields,
        )?;
        Ok(Self::from_blocks(rebucketed, new_period, self.fields))
    }

    fn as_block(&self) -> DataBlock {
        DataBlock {
            timestamp: self.timestamp.clone(),
            open: self.open.clone(),
            high: self.high.clone(),
            low: self.low.clone(),
            close: self.close.clone(),
            volume: self.volume.clone(),
            open_interest: self.open_interest.clone(),
            period: self.period,
            fields: self.fields,
        }
    }

    fn from_blocks(blocks: Vec<DataBlock>, period: Period, fields: FieldMask) -> Self {
        let mut out = Self::empty(period, fields);
        for mut block in blocks {
            out.timestamp.append(&mut block.timestamp);
            out.open.append(&mut block.open);
            out.high.append(&mut block.high);
            out.low.append(&mut block.low);
            out.close.append(&mut block.close);
            out.volume.append(&mut block.volume);
            out.open_interest.append(&mut block.open_interest);
        }
        out
    }
}

use chrono::{DateTime, Utc};

use crate::HistoryError;
use crate::history::History;
use crate::pipeline::merge::MergePlan;
use crate::session::DriverSession;
use crate::types::{FieldMask, Period};

fn reserve<T>(v: &mut Vec<T>, n: usize) -> Result<(), HistoryError> {
    v.try_reserve_exact(n)
        .map_err(|e| HistoryError::Alloc(e.to_string()))
}

/// Execute a merge plan into the final columnar series.
///
/// Walks the op list exactly once, bulk-copying each contiguous run from
/// its source block. Consumes the sessions: every block and intermediate
/// list is released exactly once when this call returns, on success and
/// on failure alike.
///
/// # Errors
/// Returns `Alloc` when the output columns cannot be reserved.
pub fn assemble(
    sessions: Vec<DriverSession>,
    plan: &MergePlan,
    fields: FieldMask,
    period: Period,
) -> Result<History, HistoryError> {
    let n = plan.nb_bars;
    let mut timestamp: Vec<DateTime<Utc>> = Vec::new();
    let mut open: Vec<f64> = Vec::new();
    let mut high: Vec<f64> = Vec::new();
    let mut low: Vec<f64> = Vec::new();
    let mut close: Vec<f64> = Vec::new();
    let mut volume: Vec<i64> = Vec::new();
    let mut open_interest: Vec<i64> = Vec::new();

    reserve(&mut timestamp, n)?;
    if fields.contains(FieldMask::OPEN) {
        reserve(&mut open, n)?;
    }
    if fields.contains(FieldMask::HIGH) {
        reserve(&mut high, n)?;
    }
    if fields.contains(FieldMask::LOW) {
        reserve(&mut low, n)?;
    }
    if fields.contains(FieldMask::CLOSE) {
        reserve(&mut close, n)?;
    }
    if fields.contains(FieldMask::VOLUME) {
        reserve(&mut volume, n)?;
    }
    if fields.contains(FieldMask::OPEN_INTEREST) {
        reserve(&mut open_interest, n)?;
    }

    for op in &plan.ops {
        let block = &sessions[op.source].blocks[op.block];
        let range = op.start..op.start + op.len;
        timestamp.extend_from_slice(&block.timestamp[range.clone()]);
        if fields.contains(FieldMask::OPEN) {
            open.extend_from_slice(&block.open[range.clone()]);
        }
        if fields.contains(FieldMask::HIGH) {
            high.extend_from_slice(&block.high[range.clone()]);
        }
        if fields.contains(FieldMask::LOW) {
            low.extend_from_slice(&block.low[range.clone()]);
        }
        if fields.contains(FieldMask::CLOSE) {
            close.extend_from_slice(&block.close[range.clone()]);
        }
        if fields.contains(FieldMask::VOLUME) {
            volume.extend_from_slice(&block.volume[range.clone()]);
        }
        if fields.contains(FieldMask::OPEN_INTEREST) {
            open_interest.extend_from_slice(&block.open_interest[range]);
        }
    }

    Ok(History {
        timestamp,
        open,
        high,
        low,
        close,
        volume,
        open_interest,
        period,
        fields,
    })
}

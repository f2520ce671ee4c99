use chrono::{DateTime, Utc};

use crate::HistoryError;
use crate::block::DataBlock;
use crate::session::DriverSession;
use crate::types::{FieldMask, Period};

/// The build's target period: the coarsest period actually provided among
/// sessions that hold data. `None` when no session produced a bar.
#[must_use]
pub fn resolve_target_period(sessions: &[DriverSession]) -> Option<Period> {
    sessions
        .iter()
        .filter(|s| s.nb_bars() > 0)
        .map(|s| s.period_provided)
        .max()
}

/// Rebucket every finer-period session onto `target`.
///
/// Sessions already at the target pass through untouched; extremes are
/// recomputed for rewritten sessions since window bars carry new
/// timestamps.
///
/// # Errors
/// Returns `Internal` when a bar timestamp cannot be mapped onto a window
/// boundary.
pub fn normalize_sessions(
    sessions: &mut [DriverSession],
    target: Period,
    offset_secs: i64,
) -> Result<(), HistoryError> {
    for session in sessions.iter_mut() {
        if session.period_provided >= target || session.nb_bars() == 0 {
            continue;
        }
        let rebucketed = rebucket_blocks(
            &session.blocks,
            session.period_provided,
            target,
            offset_secs,
            session.field_provided,
        )?;
        session.lowest_ts = rebucketed.first().and_then(|b| b.timestamp.first().copied());
        session.highest_ts = rebucketed.last().and_then(DataBlock::last_ts);
        session.blocks = rebucketed;
        session.period_provided = target;
    }
    Ok(())
}

struct WindowAgg {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: i128,
    open_interest: i64,
    last_bar_ts: DateTime<Utc>,
}

/// Group the bars of `blocks` into non-overlapping `target` windows and
/// aggregate each window into one bar.
///
/// A bar belongs to the window containing its opening instant. Aggregation:
/// open = first, high = max, low = min, close = last, volume = exact sum,
/// open interest = last; the window bar is stamped at the window's closing
/// boundary. A trailing window whose last bar does not reach that boundary
/// is dropped rather than emitted under-sampled.
pub(crate) fn rebucket_blocks(
    blocks: &[DataBlock],
    input: Period,
    target: Period,
    offset_secs: i64,
    fields: FieldMask,
) -> Result<Vec<DataBlock>, HistoryError> {
    let mut out: Vec<DataBlock> = Vec::new();
    let mut cur: Option<WindowAgg> = None;

    for block in blocks {
        for i in 0..block.nb_bars() {
            let ts = block.timestamp[i];
            let open_instant = input
                .window_open(ts)
                .ok_or_else(|| HistoryError::internal("bar timestamp out of range"))?;
            let wstart = target
                .window_start(open_instant, offset_secs)
                .ok_or_else(|| HistoryError::internal("window boundary out of range"))?;

            match cur.as_mut() {
                Some(win) if win.start == wstart => {
                    if fields.contains(FieldMask::HIGH) && block.high[i] > win.high {
                        win.high = block.high[i];
                    }
                    if fields.contains(FieldMask::LOW) && block.low[i] < win.low {
                        win.low = block.low[i];
                    }
                    if fields.contains(FieldMask::CLOSE) {
                        win.close = block.close[i];
                    }
                    if fields.contains(FieldMask::VOLUME) {
                        win.volume += i128::from(block.volume[i]);
                    }
                    if fields.contains(FieldMask::OPEN_INTEREST) {
                        win.open_interest = block.open_interest[i];
                    }
                    win.last_bar_ts = ts;
                }
                _ => {
                    if let Some(win) = cur.take() {
                        emit_window(&mut out, target, fields, win);
                    }
                    let wend = target
                        .window_end(wstart, offset_secs)
                        .ok_or_else(|| HistoryError::internal("window boundary out of range"))?;
                    let price = |col: &[f64], flag: FieldMask| {
                        if fields.contains(flag) { col[i] } else { 0.0 }
                    };
                    cur = Some(WindowAgg {
                        start: wstart,
                        end: wend,
                        open: price(&block.open, FieldMask::OPEN),
                        high: price(&block.high, FieldMask::HIGH),
                        low: price(&block.low, FieldMask::LOW),
                        close: price(&block.close, FieldMask::CLOSE),
                        volume: if fields.contains(FieldMask::VOLUME) {
                            i128::from(block.volume[i])
                        } else {
                            0
                        },
                        open_interest: if fields.contains(FieldMask::OPEN_INTEREST) {
                            block.open_interest[i]
                        } else {
                            0
                        },
                        last_bar_ts: ts,
                    });
                }
            }
        }
    }

    // The final window is only published when its data reaches the closing
    // boundary; a partially covered trailing week/month stays unpublished.
    if let Some(win) = cur.take()
        && win.last_bar_ts == win.end
    {
        emit_window(&mut out, target, fields, win);
    }
    Ok(out)
}

fn emit_window(out: &mut Vec<DataBlock>, target: Period, fields: FieldMask, win: WindowAgg) {
    if out.last().is_none_or(DataBlock::is_full) {
        out.push(DataBlock::new(target, fields));
    }
    let block = out.last_mut().expect("block pushed above");
    block.timestamp.push(win.end);
    if fields.contains(FieldMask::OPEN) {
        block.open.push(win.open);
    }
    if fields.contains(FieldMask::HIGH) {
        block.high.push(win.high);
    }
    if fields.contains(FieldMask::LOW) {
        block.low.push(win.low);
    }
    if fields.contains(FieldMask::CLOSE) {
        block.close.push(win.close);
    }
    if fields.contains(FieldMask::VOLUME) {
        block.volume.push(clamp_volume(win.volume));
    }
    if fields.contains(FieldMask::OPEN_INTEREST) {
        block.open_interest.push(win.open_interest);
    }
}

fn clamp_volume(v: i128) -> i64 {
    i64::try_from(v.min(i128::from(i64::MAX))).unwrap_or(i64::MAX)
}

use chrono::{DateTime, Utc};

use crate::HistoryError;
use crate::block::DataBlock;
use crate::driver::{BarFeed, CancelFlag, PullOutcome};
use crate::pipeline::adjust::{SplitAdjust, ValueAdjust};
use crate::types::{Bar, FieldMask, Period};

/// Lifecycle of one pull session.
///
/// `Finished` and `Errored` are terminal; the pipeline only ever sees
/// terminal sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Attached, not yet pulling.
    Created,
    /// The pull loop is draining the feed.
    Pulling,
    /// Cancellation observed; waiting for the feed to wind down.
    Cancelling,
    /// Drained to completion (or cancelled with data intact).
    Finished,
    /// A sticky error stopped the session.
    Errored,
}

/// Per-source pull state and accumulated blocks for one build request.
///
/// Owned exclusively by its pull future while pulling; frozen and handed
/// to the pipeline once terminal. Extremes are stored by value, never as
/// references into block storage, so block growth cannot dangle them.
#[derive(Debug)]
pub struct DriverSession {
    /// Position in the builder's attach order; the merge tie-break key.
    pub attach_order: usize,
    /// Name of the backing driver, used to tag errors.
    pub driver_name: &'static str,
    /// Period the caller asked for.
    pub requested_period: Period,
    /// Columns the caller asked for.
    pub requested_fields: FieldMask,
    /// Period the feed actually serves.
    pub period_provided: Period,
    /// Columns the feed actually populates.
    pub field_provided: FieldMask,
    /// Accumulated blocks, in pull order.
    pub blocks: Vec<DataBlock>,
    /// Smallest timestamp appended so far.
    pub lowest_ts: Option<DateTime<Utc>>,
    /// Largest timestamp appended so far.
    pub highest_ts: Option<DateTime<Utc>>,
    /// Sticky per-session error; the first failure wins.
    pub status: Option<HistoryError>,
    /// Cooperative cancellation signal for this session.
    pub cancel: CancelFlag,
    /// Whether the build must fail when this session does.
    pub required: bool,
    /// Split adjustments to apply to this session's bars.
    pub splits: Vec<SplitAdjust>,
    /// Value adjustments to apply to this session's bars.
    pub value_adjusts: Vec<ValueAdjust>,
    /// Set during merge planning when the session supplies output bars.
    pub contributing: bool,
    state: SessionState,
}

impl DriverSession {
    /// Create a session in the `Created` state.
    #[must_use]
    pub fn new(
        attach_order: usize,
        driver_name: &'static str,
        requested_period: Period,
        requested_fields: FieldMask,
        cancel: CancelFlag,
        required: bool,
    ) -> Self {
        Self {
            attach_order,
            driver_name,
            requested_period,
            requested_fields,
            period_provided: requested_period,
            field_provided: FieldMask::empty(),
            blocks: Vec::new(),
            lowest_ts: None,
            highest_ts: None,
            status: None,
            cancel,
            required,
            splits: Vec::new(),
            value_adjusts: Vec::new(),
            contributing: false,
            state: SessionState::Created,
        }
    }

    /// Record a failure that happened outside the drain loop (e.g. the
    /// driver refused to open the feed). First failure wins.
    pub fn record_failure(&mut self, err: HistoryError) {
        self.fail(err);
    }

    /// Mark a session that never pulled (empty requested range) terminal.
    pub fn mark_finished(&mut self) {
        self.state = SessionState::Finished;
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the session reached `Finished` or `Errored`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self.state, SessionState::Finished | SessionState::Errored)
    }

    /// Total bars accumulated across all blocks.
    #[must_use]
    pub fn nb_bars(&self) -> usize {
        self.blocks.iter().map(DataBlock::nb_bars).sum()
    }

    fn fail(&mut self, err: HistoryError) {
        #[cfg(feature = "tracing")]
        tracing::warn!(driver = self.driver_name, error = %err, "pull session failed");
        if self.status.is_none() {
            self.status = Some(err);
        }
        self.state = SessionState::Errored;
    }

    /// Append one accepted bar, enforcing the session invariants.
    ///
    /// # Errors
    /// Returns `Internal` when the bar's populated columns deviate from the
    /// feed's declared set, or when its timestamp does not strictly follow
    /// the previous bar.
    pub fn append(&mut self, bar: &Bar) -> Result<(), HistoryError> {
        if bar.fields() != self.field_provided {
            return Err(HistoryError::internal(format!(
                "{}: field set changed mid-stream",
                self.driver_name
            )));
        }
        if let Some(prev) = self.highest_ts
            && bar.ts <= prev
        {
            return Err(HistoryError::internal(format!(
                "{}: non-increasing bar timestamp",
                self.driver_name
            )));
        }
        if self.blocks.last().is_none_or(DataBlock::is_full) {
            self.blocks
                .push(DataBlock::new(self.period_provided, self.field_provided));
        }
        let block = self.blocks.last_mut().expect("block pushed above");
        block.push(bar);
        if self.lowest_ts.is_none() {
            self.lowest_ts = Some(bar.ts);
        }
        self.highest_ts = Some(bar.ts);
        Ok(())
    }

    /// Drain a feed to a terminal state.
    ///
    /// Repeatedly pulls until the feed finishes, fails, violates an
    /// invariant, or the cancel flag is observed. Errors never propagate
    /// out of the loop; they become the session's sticky status so the
    /// builder can apply its error policy after the barrier.
    pub async fn drain(&mut self, feed: &mut dyn BarFeed) {
        self.period_provided = feed.period();
        self.field_provided = feed.fields();
        self.state = SessionState::Pulling;
        loop {
            if self.cancel.is_cancelled() {
                self.state = SessionState::Cancelling;
                feed.cancel();
                break;
            }
            match feed.pull().await {
                Ok(PullOutcome::Bar(bar)) => {
                    if let Err(e) = self.append(&bar) {
                        self.fail(e);
                        return;
                    }
                }
                Ok(PullOutcome::Finished) => break,
                Err(e) => {
                    let tagged = match e {
                        e @ (HistoryError::Driver { .. } | HistoryError::Internal(_)) => e,
                        other => HistoryError::driver(self.driver_name, other.to_string()),
                    };
                    self.fail(tagged);
                    return;
                }
            }
        }
        self.state = SessionState::Finished;
    }
}

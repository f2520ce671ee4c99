use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storia_core::{
    CancelFlag, FieldMask, HistoryDriver, HistoryError, Period, SplitAdjust, ValueAdjust,
};

/// Build-wide configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Seconds to shift day/week/month window boundaries so they align to
    /// a market-local midnight instead of UTC. Positive values move the
    /// boundary west of UTC.
    pub utc_offset_secs: i64,
}

/// Per-source attachment parameters.
///
/// `start > end` is a legal empty range, not an error: the source simply
/// contributes no bars.
#[derive(Debug, Clone)]
pub struct AttachParams {
    /// Requested sampling period. Drivers may serve finer data; the build
    /// normalizes onto the common coarsest period afterwards.
    pub period: Period,
    /// Inclusive lower bound on bar timestamps.
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound on bar timestamps.
    pub end: Option<DateTime<Utc>>,
    /// Columns requested from the driver. `FieldMask::ALL` means
    /// "everything this driver can serve".
    pub fields: FieldMask,
    /// When set, a failure of this source fails the whole build even if
    /// other sources succeed.
    pub required: bool,
    /// Split adjustments applied to this source's bars.
    pub splits: Vec<SplitAdjust>,
    /// Value adjustments applied to this source's bars.
    pub value_adjusts: Vec<ValueAdjust>,
    /// Cancellation flag to wire into the source's pull loop. A fresh flag
    /// is created when unset; either way [`HistoryBuilder::cancel_flag`]
    /// returns the wired flag after attach.
    pub cancel: Option<CancelFlag>,
}

impl AttachParams {
    /// Parameters for the given period and column set, unbounded in time.
    #[must_use]
    pub fn new(period: Period, fields: FieldMask) -> Self {
        Self {
            period,
            start: None,
            end: None,
            fields,
            required: false,
            splits: Vec::new(),
            value_adjusts: Vec::new(),
            cancel: None,
        }
    }

    /// Bound the request to `[start, end]` (both inclusive).
    #[must_use]
    pub const fn between(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    /// Fail the whole build if this source fails.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Attach a split-adjustment timeline to this source.
    #[must_use]
    pub fn with_splits(mut self, splits: Vec<SplitAdjust>) -> Self {
        self.splits = splits;
        self
    }

    /// Attach a value-adjustment timeline to this source.
    #[must_use]
    pub fn with_value_adjusts(mut self, value_adjusts: Vec<ValueAdjust>) -> Self {
        self.value_adjusts = value_adjusts;
        self
    }

    /// Wire a caller-held cancellation flag into the source's pull loop.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }
}

/// Handle to one attached source, usable to look up its cancel flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceId(pub(crate) usize);

pub(crate) struct AttachedSource {
    pub(crate) driver: Arc<dyn HistoryDriver>,
    pub(crate) params: AttachParams,
    pub(crate) cancel: CancelFlag,
}

/// Assembles one coherent OHLCV series out of N attached data sources.
///
/// Usage mirrors the rest of the ecosystem's builders: attach sources,
/// then consume the builder with [`build`](Self::build).
pub struct HistoryBuilder {
    pub(crate) sources: Vec<AttachedSource>,
    pub(crate) cfg: BuildConfig,
}

impl Default for HistoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryBuilder {
    /// Create a builder with no sources and default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            cfg: BuildConfig::default(),
        }
    }

    /// Replace the build configuration.
    #[must_use]
    pub const fn with_config(mut self, cfg: BuildConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Shift window boundaries to a market-local midnight.
    #[must_use]
    pub const fn utc_offset_secs(mut self, secs: i64) -> Self {
        self.cfg.utc_offset_secs = secs;
        self
    }

    /// Register a data source for this build.
    ///
    /// Validation happens here, before the driver is ever pulled: an empty
    /// field mask, a field set the driver cannot serve, or a period the
    /// driver can neither serve nor undercut are all rejected as
    /// `BadParam`. An inverted time range is accepted and resolves to an
    /// empty contribution.
    ///
    /// # Errors
    /// Returns `BadParam` as described above.
    pub fn attach_source(
        &mut self,
        driver: Arc<dyn HistoryDriver>,
        params: AttachParams,
    ) -> Result<SourceId, HistoryError> {
        if params.fields.is_empty() {
            return Err(HistoryError::bad_param("empty field mask"));
        }
        let supported = driver.parameters();
        if params.fields != FieldMask::ALL && !supported.fields.contains(params.fields) {
            return Err(HistoryError::bad_param(format!(
                "{} cannot serve the requested fields",
                driver.name()
            )));
        }
        if !supported.periods.iter().any(|p| *p <= params.period) {
            return Err(HistoryError::bad_param(format!(
                "{} cannot serve the requested period",
                driver.name()
            )));
        }
        let id = SourceId(self.sources.len());
        #[cfg(feature = "tracing")]
        tracing::debug!(driver = driver.name(), source = id.0, "source attached");
        let cancel = params.cancel.clone().unwrap_or_default();
        self.sources.push(AttachedSource {
            driver,
            params,
            cancel,
        });
        Ok(id)
    }

    /// The cooperative cancel flag of an attached source.
    ///
    /// Setting it tells the source's pull loop that enough data arrived;
    /// bars collected before the flag is observed stay in the result.
    #[must_use]
    pub fn cancel_flag(&self, id: SourceId) -> Option<CancelFlag> {
        self.sources.get(id.0).map(|s| s.cancel.clone())
    }
}

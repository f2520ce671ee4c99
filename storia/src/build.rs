use futures::future::join_all;
use storia_core::pipeline::{adjust, assemble, merge, normalize};
use storia_core::{
    DriverSession, FieldMask, History, HistoryError, PullRequest, SessionState,
};

use crate::core::{AttachedSource, HistoryBuilder};

impl HistoryBuilder {
    /// Pull every attached source to completion, then normalize, adjust,
    /// merge, and assemble the final series.
    ///
    /// The call is atomic from the caller's perspective: it returns either
    /// a fully consistent [`History`] or an error, never a partial result.
    /// Per-source failures are tolerated as long as at least one
    /// non-required source survives; the first failure in attach order
    /// becomes the build's error when nothing survives.
    ///
    /// # Errors
    /// - `BadParam` when no source is attached.
    /// - Any fatal (`Internal`, `Alloc`) session error.
    /// - The error of a failed `required` source.
    /// - The first session error when every source failed.
    pub async fn build(self) -> Result<History, HistoryError> {
        if self.sources.is_empty() {
            return Err(HistoryError::bad_param("no data source attached"));
        }
        let cfg = self.cfg;
        let requested_period = self
            .sources
            .iter()
            .map(|s| s.params.period)
            .max()
            .expect("sources is non-empty");
        let requested_fields = self
            .sources
            .iter()
            .fold(FieldMask::empty(), |m, s| m | s.params.fields);

        let mut sessions = join_all(
            self.sources
                .into_iter()
                .enumerate()
                .map(|(order, src)| pull_source(order, src)),
        )
        .await;

        // Sticky error policy: the first failure in attach order is the
        // build's result code when the build cannot proceed.
        let mut first_error: Option<HistoryError> = None;
        for session in &mut sessions {
            let Some(err) = session.status.take() else {
                continue;
            };
            if err.is_fatal() || session.required {
                return Err(err);
            }
            #[cfg(feature = "tracing")]
            tracing::warn!(
                driver = session.driver_name,
                error = %err,
                "dropping failed source from merge"
            );
            if first_error.is_none() {
                first_error = Some(err);
            }
            session.blocks.clear();
        }

        let mut survivors: Vec<DriverSession> = sessions
            .into_iter()
            .filter(|s| s.state() == SessionState::Finished)
            .collect();
        if survivors.is_empty() {
            return match first_error {
                Some(err) => Err(err),
                None => Ok(History::empty(requested_period, requested_fields)),
            };
        }

        let Some(target) = normalize::resolve_target_period(&survivors) else {
            // Every surviving session drained without a single bar: the
            // requested range does not intersect the available data.
            return Ok(History::empty(requested_period, requested_fields));
        };
        normalize::normalize_sessions(&mut survivors, target, cfg.utc_offset_secs)?;

        for session in &mut survivors {
            let splits = std::mem::take(&mut session.splits);
            let value_adjusts = std::mem::take(&mut session.value_adjusts);
            for block in &mut session.blocks {
                adjust::apply_split_adjust(block, &splits);
                adjust::apply_value_adjust(block, &value_adjusts);
            }
        }

        let plan = merge::plan_merge(&mut survivors);
        let output_fields = survivors
            .iter()
            .filter(|s| s.contributing)
            .fold(FieldMask::ALL, |m, s| m & s.field_provided)
            & requested_fields;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            nb_bars = plan.nb_bars,
            nb_ops = plan.ops.len(),
            period = ?target,
            "merge plan finalized"
        );

        let mut history = assemble::assemble(survivors, &plan, output_fields, target)?;
        if requested_period > target {
            history.transform_period(requested_period, cfg.utc_offset_secs)?;
        }
        Ok(history)
    }
}

/// Drain one source to a terminal session. Never returns an error: every
/// failure is recorded as the session's sticky status so the builder can
/// apply its error policy after the barrier.
async fn pull_source(order: usize, src: AttachedSource) -> DriverSession {
    let mut session = DriverSession::new(
        order,
        src.driver.name(),
        src.params.period,
        src.params.fields,
        src.cancel,
        src.params.required,
    );
    session.splits = src.params.splits;
    session.value_adjusts = src.params.value_adjusts;

    if let (Some(start), Some(end)) = (src.params.start, src.params.end)
        && start > end
    {
        // Inverted range: legal, contributes nothing.
        session.mark_finished();
        return session;
    }

    let req = PullRequest {
        period: src.params.period,
        start: src.params.start,
        end: src.params.end,
        fields: src.params.fields,
    };
    match src.driver.begin(&req).await {
        Ok(mut feed) => session.drain(feed.as_mut()).await,
        Err(err) => {
            let tagged = match err {
                e @ (HistoryError::Driver { .. } | HistoryError::Internal(_)) => e,
                other => HistoryError::driver(src.driver.name(), other.to_string()),
            };
            session.record_failure(tagged);
        }
    }
    session
}

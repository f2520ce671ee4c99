use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::HistoryError;
use crate::types::{Bar, FieldMask, Period};

/// What a driver can natively serve, discovered before any pull.
#[derive(Debug, Clone)]
pub struct DriverParameters {
    /// Native sampling periods the driver can produce.
    pub periods: Vec<Period>,
    /// Columns the driver can populate.
    pub fields: FieldMask,
}

/// One history request handed to a driver when a pull session opens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PullRequest {
    /// Requested sampling period. The driver may serve a finer one.
    pub period: Period,
    /// Inclusive lower bound on bar timestamps, if any.
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound on bar timestamps, if any.
    pub end: Option<DateTime<Utc>>,
    /// Columns the caller wants populated.
    pub fields: FieldMask,
}

/// Result of one `pull` invocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PullOutcome {
    /// The next bar of the session, in timestamp order.
    Bar(Bar),
    /// The driver has no more data for the request.
    Finished,
}

/// A data-source driver able to open pull sessions for bar history.
///
/// Driver values are stateless and shared via `Arc`; all per-request state
/// lives in the [`BarFeed`] returned by [`begin`](Self::begin).
#[async_trait]
pub trait HistoryDriver: Send + Sync {
    /// A stable identifier used in error tagging and logs.
    fn name(&self) -> &'static str;

    /// Discover what the driver can natively serve.
    fn parameters(&self) -> DriverParameters;

    /// Open a pull session for the given request.
    ///
    /// # Errors
    /// Returns a driver-scoped error when the session cannot be opened
    /// (e.g. the backing store is unreachable).
    async fn begin(&self, req: &PullRequest) -> Result<Box<dyn BarFeed>, HistoryError>;
}

/// The per-session pull state of one driver.
///
/// `pull` is invoked repeatedly until it reports [`PullOutcome::Finished`],
/// an error, or the owning session observes its cancel flag. The declared
/// `period` and `fields` are fixed for the lifetime of the feed; a bar that
/// deviates from the declared field set is an invariant violation.
#[async_trait]
pub trait BarFeed: Send {
    /// The sampling period the feed actually serves.
    fn period(&self) -> Period;

    /// The columns the feed actually populates.
    fn fields(&self) -> FieldMask;

    /// Produce the next bar, or report completion.
    ///
    /// # Errors
    /// Returns a driver-scoped error; the session records it and stops.
    async fn pull(&mut self) -> Result<PullOutcome, HistoryError>;

    /// Best-effort cancellation hint. The feed may keep returning bars
    /// until the next `pull` observes the hint; collected bars stand.
    fn cancel(&mut self) {}
}

/// Cooperative cancellation signal shared between a build's caller and one
/// pull session.
///
/// Setting the flag guarantees the session stops within its next pull
/// iteration, not immediately; bars collected before cancellation remain
/// part of the result.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create an unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Publishes prior writes to the observer side.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

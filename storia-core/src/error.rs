use thiserror::Error;

/// Unified error type for the storia workspace.
///
/// The variants mirror the flat status taxonomy of the history builder:
/// argument validation, allocation failure, driver-tagged failures,
/// transform range violations, and internal invariant breaks.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Invalid caller argument, rejected before any driver is touched.
    #[error("invalid argument: {0}")]
    BadParam(String),

    /// A transform bound falls before the start of the series.
    #[error("start index out of range")]
    OutOfRangeStart,

    /// A transform bound falls past the end of the series.
    #[error("end index out of range")]
    OutOfRangeEnd,

    /// An allocation was refused. Fatal: the whole build is aborted.
    #[error("allocation failure: {0}")]
    Alloc(String),

    /// An individual driver returned an error. Scoped to one session.
    #[error("{driver} failed: {msg}")]
    Driver {
        /// Driver name that failed.
        driver: String,
        /// Human-readable error message.
        msg: String,
    },

    /// An internal invariant was violated (e.g. a driver changed its field
    /// set mid-stream). Fatal: the whole build is aborted.
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

impl HistoryError {
    /// Helper: build a `BadParam` error from any displayable message.
    pub fn bad_param(msg: impl Into<String>) -> Self {
        Self::BadParam(msg.into())
    }

    /// Helper: build a `Driver` error with the driver name and message.
    pub fn driver(driver: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Driver {
            driver: driver.into(),
            msg: msg.into(),
        }
    }

    /// Helper: build an `Internal` error from any displayable message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error aborts the remaining pipeline stages outright.
    ///
    /// `Driver` errors are scoped to one session and may leave the build
    /// salvageable; everything under this predicate may not.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Alloc(_) | Self::Internal(_))
    }
}

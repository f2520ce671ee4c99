//! storia
//!
//! A pluggable, multi-source OHLCV history builder for Rust.
//!
//! Attach any number of data-source drivers, each with its own period,
//! field set, and time range; `storia` pulls them concurrently, normalizes
//! everything onto the common coarsest period, applies retroactive
//! split/value adjustments, and merges the result into one strictly
//! time-ordered columnar series.
//!
//! ```no_run
//! use std::sync::Arc;
//! use storia::{AttachParams, FieldMask, HistoryBuilder, Period};
//! use storia_mock::MockDriver;
//!
//! # async fn run() -> Result<(), storia::HistoryError> {
//! let mut builder = HistoryBuilder::new();
//! let daily = Arc::new(MockDriver::daily("exchange-a", &[(1, 10.0), (2, 11.0)]));
//! builder.attach_source(daily, AttachParams::new(Period::Daily, FieldMask::PRICE))?;
//! let history = builder.build().await?;
//! assert_eq!(history.nb_bars(), 2);
//! # Ok(())
//! # }
//! ```
#![warn(missing_docs)]

mod build;
mod core;

pub use crate::core::{AttachParams, BuildConfig, HistoryBuilder, SourceId};
pub use storia_core::{
    Bar, BarFeed, CancelFlag, DataBlock, DriverParameters, DriverSession, FieldMask, History,
    HistoryDriver, HistoryError, MergeOp, MergePlan, Period, PullOutcome, PullRequest,
    SessionState, SplitAdjust, ValueAdjust,
};
